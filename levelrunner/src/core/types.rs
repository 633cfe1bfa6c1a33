//! Shared deterministic types for the submission engine.
//!
//! These types define stable contracts between the catalog, reconciler,
//! submitter and sequencer. They should not depend on external state or I/O.

use std::collections::HashSet;

use crate::core::error::EngineError;

/// Raw level metadata prior to validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelInfoParts {
    pub level_nr: u32,
    pub max_level_nr: u32,
    pub is_contest_finished: bool,
    pub stage_names: Vec<String>,
    pub stage_inputs: Vec<String>,
    pub uses_input_files: bool,
    pub uses_output_files: bool,
}

/// Validated metadata for the level currently open on the judge.
///
/// Immutable for the lifetime of a reconciliation pass. Construction enforces
/// `stage_names.len() == stage_inputs.len() > 0` and unique, non-empty names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelInfo {
    level_nr: u32,
    max_level_nr: u32,
    is_contest_finished: bool,
    stage_names: Vec<String>,
    stage_inputs: Vec<String>,
    uses_input_files: bool,
    uses_output_files: bool,
}

impl LevelInfo {
    pub fn new(parts: LevelInfoParts) -> Result<Self, EngineError> {
        let invalid = |msg: String| -> Result<Self, EngineError> {
            Err(EngineError::InvalidLevelInfo(msg))
        };
        if parts.level_nr == 0 {
            return invalid("level_nr must be >= 1".to_string());
        }
        if parts.max_level_nr < parts.level_nr {
            return invalid(format!(
                "max_level_nr {} is below level_nr {}",
                parts.max_level_nr, parts.level_nr
            ));
        }
        if parts.stage_names.is_empty() {
            return invalid("level has no stages".to_string());
        }
        if parts.stage_names.len() != parts.stage_inputs.len() {
            return invalid(format!(
                "{} stage names but {} stage inputs",
                parts.stage_names.len(),
                parts.stage_inputs.len()
            ));
        }
        let mut seen = HashSet::new();
        for name in &parts.stage_names {
            if name.trim().is_empty() {
                return invalid("stage names must be non-empty".to_string());
            }
            if !seen.insert(name.as_str()) {
                return invalid(format!("duplicate stage name '{name}'"));
            }
        }
        Ok(Self {
            level_nr: parts.level_nr,
            max_level_nr: parts.max_level_nr,
            is_contest_finished: parts.is_contest_finished,
            stage_names: parts.stage_names,
            stage_inputs: parts.stage_inputs,
            uses_input_files: parts.uses_input_files,
            uses_output_files: parts.uses_output_files,
        })
    }

    pub fn level_nr(&self) -> u32 {
        self.level_nr
    }

    pub fn max_level_nr(&self) -> u32 {
        self.max_level_nr
    }

    pub fn is_contest_finished(&self) -> bool {
        self.is_contest_finished
    }

    /// Remote stage identifiers, one per test case, in judge order.
    pub fn stage_names(&self) -> &[String] {
        &self.stage_names
    }

    /// Inline input text or remote input reference, parallel to `stage_names`.
    pub fn stage_inputs(&self) -> &[String] {
        &self.stage_inputs
    }

    pub fn uses_input_files(&self) -> bool {
        self.uses_input_files
    }

    pub fn uses_output_files(&self) -> bool {
        self.uses_output_files
    }

    /// True when this is the contest's last level.
    pub fn is_final_level(&self) -> bool {
        self.level_nr == self.max_level_nr
    }
}

/// A local output artifact stem paired with the identifier the judge expects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stage {
    pub local_key: String,
    pub remote_id: String,
}

impl Stage {
    pub fn new(local_key: impl Into<String>, remote_id: impl Into<String>) -> Self {
        Self {
            local_key: local_key.into(),
            remote_id: remote_id.into(),
        }
    }

    /// A stage whose local key doubles as its remote identifier.
    pub fn direct(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            local_key: name.clone(),
            remote_id: name,
        }
    }
}

/// Outcome of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// The judge explicitly marked the answer invalid.
    Rejected,
    /// The attempt never produced a verdict (network, HTTP status, unreadable artifact).
    TransportFailure(String),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// What the submitter does after a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    StopOnFirstFailure,
    ContinueOnFailure,
}

impl FailurePolicy {
    pub fn from_continue_flag(continue_on_failure: bool) -> Self {
        if continue_on_failure {
            FailurePolicy::ContinueOnFailure
        } else {
            FailurePolicy::StopOnFirstFailure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(names: &[&str]) -> LevelInfoParts {
        LevelInfoParts {
            level_nr: 2,
            max_level_nr: 5,
            is_contest_finished: false,
            stage_names: names.iter().map(|n| n.to_string()).collect(),
            stage_inputs: names.iter().map(|n| format!("{n}.in")).collect(),
            uses_input_files: true,
            uses_output_files: true,
        }
    }

    #[test]
    fn accepts_well_formed_level() {
        let info = LevelInfo::new(parts(&["level2_1", "level2_2"])).expect("valid");
        assert_eq!(info.level_nr(), 2);
        assert_eq!(info.stage_names().len(), 2);
        assert!(!info.is_final_level());
    }

    #[test]
    fn rejects_empty_stage_list() {
        let err = LevelInfo::new(parts(&[])).expect_err("no stages");
        assert!(matches!(err, EngineError::InvalidLevelInfo(_)));
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let mut raw = parts(&["1", "2"]);
        raw.stage_inputs.pop();
        let err = LevelInfo::new(raw).expect_err("mismatch");
        assert!(err.to_string().contains("2 stage names but 1 stage inputs"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = LevelInfo::new(parts(&["1", "1"])).expect_err("duplicate");
        assert!(err.to_string().contains("duplicate stage name '1'"));
    }

    #[test]
    fn rejects_level_beyond_max() {
        let mut raw = parts(&["1"]);
        raw.level_nr = 6;
        assert!(LevelInfo::new(raw).is_err());
    }

    #[test]
    fn final_level_when_level_equals_max() {
        let mut raw = parts(&["1"]);
        raw.level_nr = 5;
        let info = LevelInfo::new(raw).expect("valid");
        assert!(info.is_final_level());
    }
}
