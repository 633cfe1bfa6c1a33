//! Decide which stages need a submission attempt in this pass.

use std::collections::BTreeSet;

use crate::core::catalog::StageCatalog;
use crate::core::types::Stage;

/// Output artifacts the caller offers for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducedArtifacts {
    /// Stems of every `*.out` file in the level's output directory.
    Listed(BTreeSet<String>),
    /// A single stage named explicitly by the caller.
    Restricted(String),
}

/// Result of reconciling local artifacts with the catalog and ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Stages to attempt now, ascending by local key.
    pub candidates: Vec<Stage>,
    /// Stages with an artifact that the ledger already records as accepted.
    pub skipped: Vec<Stage>,
    /// Every remote id the level needs for completion.
    pub required_remote_ids: BTreeSet<String>,
    /// No listed artifact matches a catalog stage (solver produced nothing yet).
    pub nothing_submittable: bool,
}

/// Compute submission candidates.
///
/// A stage is a candidate when it has an artifact and its remote id is absent
/// from `ledger`, or when `force_resubmit` is set. A restricted stage unknown
/// to the catalog is still attempted under its own name.
pub fn reconcile(
    catalog: &StageCatalog,
    produced: &ProducedArtifacts,
    ledger: &BTreeSet<String>,
    force_resubmit: bool,
) -> Reconciliation {
    let with_artifact: Vec<Stage> = match produced {
        ProducedArtifacts::Listed(stems) => catalog
            .stages()
            .iter()
            .filter(|stage| stems.contains(&stage.local_key))
            .cloned()
            .collect(),
        ProducedArtifacts::Restricted(key) => vec![
            catalog
                .get(key)
                .cloned()
                .unwrap_or_else(|| Stage::direct(key.clone())),
        ],
    };
    let nothing_submittable =
        matches!(produced, ProducedArtifacts::Listed(_)) && with_artifact.is_empty();

    let (mut candidates, mut skipped): (Vec<Stage>, Vec<Stage>) = with_artifact
        .into_iter()
        .partition(|stage| force_resubmit || !ledger.contains(&stage.remote_id));
    candidates.sort();
    skipped.sort();

    Reconciliation {
        candidates,
        skipped,
        required_remote_ids: catalog.required_remote_ids(),
        nothing_submittable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[&str]) -> StageCatalog {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let stems: [&str; 0] = [];
        StageCatalog::build(&names, &stems).expect("catalog")
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn keys(stages: &[Stage]) -> Vec<&str> {
        stages.iter().map(|s| s.local_key.as_str()).collect()
    }

    #[test]
    fn candidates_require_artifact_and_missing_ledger_entry() {
        let catalog = catalog(&["lvl_a", "lvl_b", "lvl_c", "lvl_d"]);
        let produced = ProducedArtifacts::Listed(set(&["lvl_c", "lvl_a", "lvl_b", "stray"]));
        let plan = reconcile(&catalog, &produced, &set(&["lvl_b"]), false);
        assert_eq!(keys(&plan.candidates), vec!["lvl_a", "lvl_c"]);
        assert_eq!(keys(&plan.skipped), vec!["lvl_b"]);
        assert_eq!(plan.required_remote_ids, set(&["lvl_a", "lvl_b", "lvl_c", "lvl_d"]));
        assert!(!plan.nothing_submittable);
    }

    #[test]
    fn force_resubmit_ignores_ledger() {
        let catalog = catalog(&["lvl_a", "lvl_b"]);
        let produced = ProducedArtifacts::Listed(set(&["lvl_a", "lvl_b"]));
        let plan = reconcile(&catalog, &produced, &set(&["lvl_a", "lvl_b"]), true);
        assert_eq!(keys(&plan.candidates), vec!["lvl_a", "lvl_b"]);
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn no_matching_artifacts_flags_warning() {
        let catalog = catalog(&["lvl_a"]);
        let produced = ProducedArtifacts::Listed(set(&["other"]));
        let plan = reconcile(&catalog, &produced, &BTreeSet::new(), false);
        assert!(plan.candidates.is_empty());
        assert!(plan.nothing_submittable);
    }

    #[test]
    fn fully_recorded_level_is_not_a_warning() {
        let catalog = catalog(&["lvl_a"]);
        let produced = ProducedArtifacts::Listed(set(&["lvl_a"]));
        let plan = reconcile(&catalog, &produced, &set(&["lvl_a"]), false);
        assert!(plan.candidates.is_empty());
        assert!(!plan.nothing_submittable);
    }

    #[test]
    fn restricted_stage_uses_catalog_mapping() {
        let names = vec!["1".to_string(), "2".to_string()];
        let catalog = StageCatalog::build(&names, &["in_b", "in_a"]).expect("catalog");
        let produced = ProducedArtifacts::Restricted("in_b".to_string());
        let plan = reconcile(&catalog, &produced, &BTreeSet::new(), false);
        assert_eq!(plan.candidates, vec![Stage::new("in_b", "2")]);
    }

    #[test]
    fn restricted_unknown_stage_is_still_attempted() {
        let catalog = catalog(&["lvl_a"]);
        let produced = ProducedArtifacts::Restricted("lvl_x".to_string());
        let plan = reconcile(&catalog, &produced, &BTreeSet::new(), false);
        assert_eq!(plan.candidates, vec![Stage::direct("lvl_x")]);
        assert!(!plan.nothing_submittable);
    }

    #[test]
    fn restricted_stage_already_accepted_is_skipped() {
        let catalog = catalog(&["lvl_a"]);
        let produced = ProducedArtifacts::Restricted("lvl_a".to_string());
        let plan = reconcile(&catalog, &produced, &set(&["lvl_a"]), false);
        assert!(plan.candidates.is_empty());
        assert_eq!(keys(&plan.skipped), vec!["lvl_a"]);
    }
}
