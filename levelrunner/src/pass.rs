//! Orchestration for a single reconciliation pass.
//!
//! A pass builds the stage catalog, reconciles it with produced artifacts and
//! the ledger, submits candidates, and applies the sequencer's decision: ledger
//! persistence, commits and completion side effects. Advancing to the next
//! level is left to [`crate::advance`].

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::catalog::StageCatalog;
use crate::core::error::EngineError;
use crate::core::reconcile::{ProducedArtifacts, Reconciliation, reconcile};
use crate::core::sequencer::{PassResults, PassState, decide};
use crate::core::types::{FailurePolicy, LevelInfo};
use crate::exit_codes;
use crate::io::git::VersionControl;
use crate::io::judge::Judge;
use crate::io::ledger::SubmissionLedger;
use crate::io::paths::{INPUT_EXTENSION, LevelPaths, OUTPUT_EXTENSION, list_stems};
use crate::submitter::{StageAttempt, submit_candidates};

/// Per-call overrides for a pass. None of these are persisted.
#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    /// Ignore the ledger and resubmit every produced stage.
    pub force_resubmit: bool,
    pub policy: FailurePolicy,
    /// Submit only this stage (by local key).
    pub only_stage: Option<String>,
    /// File in the level directory to upload for bonus credit on completion.
    pub bonus_source: Option<String>,
}

/// Everything decided before any submission happens.
#[derive(Debug, Clone)]
pub struct PassPlan {
    pub level: LevelInfo,
    pub paths: LevelPaths,
    pub catalog: StageCatalog,
    /// Ledger as seen by this pass (empty under forced resubmission).
    pub ledger_at_start: BTreeSet<String>,
    /// Ledger as stored on disk.
    pub persisted_ledger: BTreeSet<String>,
    pub reconciliation: Reconciliation,
}

/// Result of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub level_nr: u32,
    /// This level is the contest's last.
    pub final_level: bool,
    pub state: PassState,
    pub attempts: Vec<StageAttempt>,
    pub had_failure: bool,
    /// Ledger contents on disk after the pass.
    pub ledger: BTreeSet<String>,
}

impl PassReport {
    /// Non-zero whenever an attempted stage was not accepted.
    pub fn exit_code(&self) -> i32 {
        if self.had_failure {
            exit_codes::REJECTED
        } else {
            exit_codes::OK
        }
    }
}

/// Fetch level info and compute the submission plan without submitting.
#[instrument(skip_all)]
pub fn plan_pass<J: Judge>(root: &Path, judge: &J, options: &PassOptions) -> Result<PassPlan> {
    let level = judge.level_info().context("fetch level info")?;
    let paths = LevelPaths::new(root, level.level_nr());
    debug!(level = level.level_nr(), dir = %paths.level_dir.display(), "planning pass");
    if !paths.output_dir.is_dir() {
        warn!(dir = %paths.output_dir.display(), "output directory missing, maybe next-level?");
        return Err(EngineError::MissingOutputDir(paths.output_dir.clone()).into());
    }

    let input_stems: Vec<String> = list_stems(&paths.input_dir, INPUT_EXTENSION)?
        .into_iter()
        .collect();
    let catalog = StageCatalog::build(level.stage_names(), &input_stems)?;
    debug!(regime = ?catalog.regime(), stages = catalog.stages().len(), "catalog built");

    let ledger = SubmissionLedger::new(&paths.ledger_path);
    let ledger_at_start = ledger.load(options.force_resubmit)?;
    let persisted_ledger = if options.force_resubmit {
        ledger.load(false)?
    } else {
        ledger_at_start.clone()
    };

    let produced = match &options.only_stage {
        Some(stage) => ProducedArtifacts::Restricted(stage.clone()),
        None => ProducedArtifacts::Listed(list_stems(&paths.output_dir, OUTPUT_EXTENSION)?),
    };
    let reconciliation = reconcile(
        &catalog,
        &produced,
        &ledger_at_start,
        options.force_resubmit,
    );
    if reconciliation.nothing_submittable {
        warn!(dir = %paths.output_dir.display(), "no output files to check");
    }
    for stage in &reconciliation.skipped {
        info!(stage = %stage.local_key, "previously successful, skipping");
    }
    debug!(candidates = ?reconciliation.candidates, "submission candidates");

    Ok(PassPlan {
        level,
        paths,
        catalog,
        ledger_at_start,
        persisted_ledger,
        reconciliation,
    })
}

/// Run one reconciliation pass.
///
/// Structural errors (catalog mismatch, ledger I/O, judge metadata) abort the
/// pass before or instead of persistence. Stage failures are reported through
/// [`PassReport::had_failure`] after the ledger is written.
#[instrument(skip_all, fields(force = options.force_resubmit, only_stage = ?options.only_stage))]
pub fn run_pass<J: Judge, V: VersionControl>(
    root: &Path,
    judge: &J,
    vcs: &V,
    options: &PassOptions,
) -> Result<PassReport> {
    vcs.ensure_ready(false)?;
    let plan = plan_pass(root, judge, options)?;
    let level_nr = plan.level.level_nr();

    let run = submit_candidates(
        judge,
        &plan.reconciliation.candidates,
        &plan.paths.output_dir,
        plan.level.uses_output_files(),
        options.policy,
    );

    let decision = decide(PassResults {
        required_remote_ids: &plan.reconciliation.required_remote_ids,
        ledger_at_start: &plan.ledger_at_start,
        persisted_ledger: &plan.persisted_ledger,
        accepted: &run.successful,
        had_failure: run.had_failure,
    });

    let ledger = match &decision.ledger_to_persist {
        Some(ids) => {
            SubmissionLedger::new(&plan.paths.ledger_path).save(ids)?;
            ids.clone()
        }
        None => plan.persisted_ledger.clone(),
    };

    match decision.state {
        PassState::Complete => complete_level(&plan, judge, vcs, options)?,
        PassState::PartialProgress => {
            let keys: Vec<&str> = run
                .successful
                .iter()
                .map(|stage| stage.local_key.as_str())
                .collect();
            let message = format!("level{level_nr} wip ({} complete)", keys.join(", "));
            vcs.commit(&[plan.paths.output_dir.as_path()], &message)
                .context("commit level progress")?;
        }
        PassState::NoProgress => debug!("no stage accepted, ledger unchanged"),
    }

    if decision.report_failure {
        warn!(level = level_nr, "pass finished with failed stages");
    }
    Ok(PassReport {
        level_nr,
        final_level: plan.level.is_final_level(),
        state: decision.state,
        attempts: run.attempts,
        had_failure: decision.report_failure,
        ledger,
    })
}

/// Side effects of finishing a level: commit and optional bonus upload.
fn complete_level<J: Judge, V: VersionControl>(
    plan: &PassPlan,
    judge: &J,
    vcs: &V,
    options: &PassOptions,
) -> Result<()> {
    let level_nr = plan.level.level_nr();
    vcs.commit(
        &[plan.paths.output_dir.as_path()],
        &format!("level{level_nr} done"),
    )
    .context("commit level completion")?;
    upload_bonus_source(judge, &plan.paths.level_dir, options.bonus_source.as_deref());

    if plan.level.is_final_level() {
        info!(level = level_nr, "congrats, all levels complete");
    } else {
        info!(level = level_nr, "level complete");
    }
    Ok(())
}

/// Best-effort upload of a source file from the level directory.
fn upload_bonus_source<J: Judge>(judge: &J, level_dir: &Path, file_name: Option<&str>) {
    let Some(file_name) = file_name else {
        info!("no solution uploaded for bonus minutes");
        return;
    };
    let path = level_dir.join(file_name);
    if !path.is_file() {
        warn!(path = %path.display(), "could not find bonus source file");
        return;
    }
    match judge.upload_bonus_source(&path) {
        Ok(()) => info!(file = file_name, "solution uploaded for bonus minutes"),
        Err(err) => warn!(file = file_name, error = %format!("{err:#}"), "bonus upload failed"),
    }
}
