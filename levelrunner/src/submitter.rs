//! Sequential submission of candidate stages against a [`Judge`].
//!
//! The submitter never touches the ledger; it returns what happened and lets
//! the pass decide what to persist.

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::core::types::{FailurePolicy, Stage, Verdict};
use crate::io::judge::{Judge, StageVerdict};
use crate::io::paths::OUTPUT_EXTENSION;

/// One attempted stage and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageAttempt {
    pub stage: Stage,
    pub verdict: Verdict,
}

/// Everything a submission run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionRun {
    /// Attempts in the order they were made.
    pub attempts: Vec<StageAttempt>,
    /// Stages accepted this run.
    pub successful: Vec<Stage>,
    pub had_failure: bool,
}

/// Submit `candidates` in ascending local-key order.
///
/// Judge errors become [`Verdict::TransportFailure`]; they are never retried
/// within the run. Under [`FailurePolicy::StopOnFirstFailure`] the run ends at
/// the first non-accepted stage.
#[instrument(skip_all, fields(candidates = candidates.len(), policy = ?policy))]
pub fn submit_candidates<J: Judge>(
    judge: &J,
    candidates: &[Stage],
    output_dir: &Path,
    uses_output_files: bool,
    policy: FailurePolicy,
) -> SubmissionRun {
    let mut ordered: Vec<&Stage> = candidates.iter().collect();
    ordered.sort();

    let mut run = SubmissionRun::default();
    for stage in ordered {
        let artifact = output_dir.join(format!("{}.{OUTPUT_EXTENSION}", stage.local_key));
        let verdict = match judge.submit(&artifact, &stage.remote_id, uses_output_files) {
            Ok(StageVerdict::Valid) => {
                info!(stage = %stage.local_key, remote_id = %stage.remote_id, "accepted");
                Verdict::Accepted
            }
            Ok(StageVerdict::Invalid) => {
                warn!(stage = %stage.local_key, remote_id = %stage.remote_id, "rejected");
                Verdict::Rejected
            }
            Err(err) => {
                warn!(
                    stage = %stage.local_key,
                    remote_id = %stage.remote_id,
                    error = %format!("{err:#}"),
                    "transport failure"
                );
                Verdict::TransportFailure(format!("{err:#}"))
            }
        };
        let accepted = verdict.is_accepted();
        run.attempts.push(StageAttempt {
            stage: stage.clone(),
            verdict,
        });
        if accepted {
            run.successful.push(stage.clone());
            continue;
        }
        run.had_failure = true;
        if policy == FailurePolicy::StopOnFirstFailure {
            break;
        }
    }
    run
}
