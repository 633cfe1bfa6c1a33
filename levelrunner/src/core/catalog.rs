//! Mapping between local artifact stems and remote stage identifiers.
//!
//! Some levels expose only index-like stage names (`"1"`, `"2"`, ...) while the
//! input files on disk carry descriptive stems. Names no longer than
//! [`POSITIONAL_NAME_MAX_LEN`] are treated as positional indices; this is a
//! heuristic over the judge's schema and lives here so it can be replaced.

use std::collections::BTreeSet;

use crate::core::error::EngineError;
use crate::core::types::Stage;

/// Stage names at most this many characters long are positional indices.
pub const POSITIONAL_NAME_MAX_LEN: usize = 2;

/// Stem markers of sample inputs that never map to a judged stage.
const SAMPLE_MARKERS: &[&str] = &["example", "sample"];

/// How local keys were derived from remote stage names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingRegime {
    /// Sorted local input stems zipped with remote names in order.
    Positional,
    /// Local key equals remote id.
    Direct,
}

/// Ordered stage mapping for one level, rebuilt on every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCatalog {
    regime: NamingRegime,
    /// Sorted by `local_key`.
    stages: Vec<Stage>,
}

impl StageCatalog {
    /// Build the catalog from remote stage names and the level's input stems.
    ///
    /// `input_stems` is the raw `*.in` listing; sample inputs are dropped here.
    pub fn build<S: AsRef<str>>(
        stage_names: &[String],
        input_stems: &[S],
    ) -> Result<Self, EngineError> {
        if !is_positional(stage_names) {
            let mut stages: Vec<Stage> = stage_names.iter().map(Stage::direct).collect();
            stages.sort();
            return Ok(Self {
                regime: NamingRegime::Direct,
                stages,
            });
        }

        let mut local: Vec<String> = input_stems
            .iter()
            .map(|stem| stem.as_ref().to_string())
            .filter(|stem| !is_sample_stem(stem))
            .collect();
        local.sort();
        local.dedup();
        if local.len() != stage_names.len() {
            return Err(EngineError::CatalogMismatch {
                local,
                remote: stage_names.to_vec(),
            });
        }
        let stages = local
            .into_iter()
            .zip(stage_names.iter())
            .map(|(key, name)| Stage::new(key, name.clone()))
            .collect();
        Ok(Self {
            regime: NamingRegime::Positional,
            stages,
        })
    }

    pub fn regime(&self) -> NamingRegime {
        self.regime
    }

    /// All stages, ascending by local key.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn get(&self, local_key: &str) -> Option<&Stage> {
        self.stages
            .binary_search_by(|stage| stage.local_key.as_str().cmp(local_key))
            .ok()
            .map(|idx| &self.stages[idx])
    }

    pub fn remote_id(&self, local_key: &str) -> Option<&str> {
        self.get(local_key).map(|stage| stage.remote_id.as_str())
    }

    /// Every remote id the level needs for completion.
    pub fn required_remote_ids(&self) -> BTreeSet<String> {
        self.stages
            .iter()
            .map(|stage| stage.remote_id.clone())
            .collect()
    }
}

/// True when every stage name looks like a small positional index.
pub fn is_positional(stage_names: &[String]) -> bool {
    stage_names
        .iter()
        .all(|name| name.chars().count() <= POSITIONAL_NAME_MAX_LEN)
}

pub fn is_sample_stem(stem: &str) -> bool {
    SAMPLE_MARKERS.iter().any(|marker| stem.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn positional_names_zip_with_sorted_stems() {
        let catalog =
            StageCatalog::build(&names(&["1", "2", "3"]), &["lvl3_b", "lvl3_a", "lvl3_c"])
                .expect("catalog");
        assert_eq!(catalog.regime(), NamingRegime::Positional);
        assert_eq!(
            catalog.stages(),
            &[
                Stage::new("lvl3_a", "1"),
                Stage::new("lvl3_b", "2"),
                Stage::new("lvl3_c", "3"),
            ]
        );
    }

    #[test]
    fn positional_count_mismatch_is_fatal() {
        let err = StageCatalog::build(&names(&["1", "2", "3"]), &["lvl3_b", "lvl3_a"])
            .expect_err("mismatch");
        match err {
            EngineError::CatalogMismatch { local, remote } => {
                assert_eq!(local, names(&["lvl3_a", "lvl3_b"]));
                assert_eq!(remote, names(&["1", "2", "3"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn positional_ignores_sample_inputs() {
        let catalog = StageCatalog::build(
            &names(&["1", "2"]),
            &["level1_example", "level1_2", "level1_1", "sample_small"],
        )
        .expect("catalog");
        assert_eq!(catalog.remote_id("level1_1"), Some("1"));
        assert_eq!(catalog.remote_id("level1_2"), Some("2"));
        assert_eq!(catalog.remote_id("level1_example"), None);
    }

    #[test]
    fn descriptive_names_map_directly() {
        let stems: [&str; 0] = [];
        let catalog =
            StageCatalog::build(&names(&["level5_1", "level5_2"]), &stems).expect("catalog");
        assert_eq!(catalog.regime(), NamingRegime::Direct);
        assert_eq!(catalog.remote_id("level5_1"), Some("level5_1"));
        assert_eq!(catalog.remote_id("level5_2"), Some("level5_2"));
    }

    #[test]
    fn direct_mapping_ignores_disk_listing() {
        let catalog = StageCatalog::build(&names(&["level5_2", "level5_1"]), &["unrelated"])
            .expect("catalog");
        let keys: Vec<&str> = catalog
            .stages()
            .iter()
            .map(|stage| stage.local_key.as_str())
            .collect();
        assert_eq!(keys, vec!["level5_1", "level5_2"]);
    }

    #[test]
    fn one_long_name_disables_positional_mode() {
        assert!(is_positional(&names(&["1", "12"])));
        assert!(!is_positional(&names(&["1", "123"])));
    }

    #[test]
    fn required_ids_cover_every_stage() {
        let catalog = StageCatalog::build(&names(&["1", "2"]), &["b", "a"]).expect("catalog");
        let required: Vec<String> = catalog.required_remote_ids().into_iter().collect();
        assert_eq!(required, names(&["1", "2"]));
    }
}
