//! Completion decision for one reconciliation pass.
//!
//! The sequencer is pure: it decides the pass state and the ledger contents to
//! persist. Persistence, commits and level hand-off happen in [`crate::pass`].

use std::collections::BTreeSet;

use crate::core::types::Stage;

/// Terminal state of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// Every required stage is accepted.
    Complete,
    /// New stages were accepted but some required ones are still missing.
    PartialProgress,
    /// Nothing was accepted this pass.
    NoProgress,
}

/// What the pass must do after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerDecision {
    pub state: PassState,
    /// Full ledger to write, or `None` when the on-disk ledger is already current.
    pub ledger_to_persist: Option<BTreeSet<String>>,
    /// The caller must report failure once persistence and hand-off are done.
    pub report_failure: bool,
}

/// Inputs to [`decide`].
#[derive(Debug, Clone, Copy)]
pub struct PassResults<'a> {
    pub required_remote_ids: &'a BTreeSet<String>,
    /// Ledger as seen by this pass (empty under forced resubmission).
    pub ledger_at_start: &'a BTreeSet<String>,
    /// Ledger as stored on disk; never shrinks.
    pub persisted_ledger: &'a BTreeSet<String>,
    pub accepted: &'a [Stage],
    pub had_failure: bool,
}

/// Decide the pass state and ledger update.
///
/// Completion requires every required id in `ledger_at_start ∪ accepted`. Ids
/// outside the required set (e.g. an explicitly named unknown stage) neither
/// help nor block completion.
pub fn decide(results: PassResults<'_>) -> SequencerDecision {
    let accepted_ids: BTreeSet<String> = results
        .accepted
        .iter()
        .map(|stage| stage.remote_id.clone())
        .collect();

    let covered: BTreeSet<&String> = results
        .ledger_at_start
        .iter()
        .chain(accepted_ids.iter())
        .collect();
    let complete = results
        .required_remote_ids
        .iter()
        .all(|id| covered.contains(id));

    let state = if complete {
        PassState::Complete
    } else if accepted_ids.is_empty() {
        PassState::NoProgress
    } else {
        PassState::PartialProgress
    };

    let merged: BTreeSet<String> = results
        .persisted_ledger
        .union(&accepted_ids)
        .cloned()
        .collect();
    let ledger_to_persist = (merged != *results.persisted_ledger).then_some(merged);

    SequencerDecision {
        state,
        ledger_to_persist,
        report_failure: results.had_failure,
    }
}
