//! Level contest runner.
//!
//! Submits a level's output artifacts to the judge, remembers accepted stages
//! in `level<N>/out/.successfully_submitted`, and materializes the next level
//! once every stage is accepted.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::error;

use levelrunner::advance::{AdvanceOutcome, advance_if_complete, next_level};
use levelrunner::core::types::{FailurePolicy, Verdict};
use levelrunner::exit_codes;
use levelrunner::io::config::{
    CONFIG_FILE_NAME, Credentials, RunnerConfig, load_config, process_env,
};
use levelrunner::io::git::Vcs;
use levelrunner::io::judge::CatCoderClient;
use levelrunner::logging;
use levelrunner::pass::{PassOptions, PassReport, plan_pass, run_pass};

#[derive(Parser)]
#[command(
    name = "levelrunner",
    version,
    about = "Stage reconciliation and idempotent submission for level-based contests"
)]
struct Cli {
    /// Contest root containing `level<N>/` directories and the template.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Debug-level diagnostics on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit produced outputs for the current level; advance when complete.
    Submit(SubmitArgs),
    /// Create the directory for the judge's current level.
    NextLevel,
    /// Show what `submit` would attempt, without submitting.
    Status,
}

#[derive(Args, Debug, Default, PartialEq, Eq)]
struct SubmitArgs {
    /// Force re-checking previously successful stages.
    #[arg(long)]
    resubmit_successful: bool,
    /// Do not stop on the first unsuccessful stage.
    #[arg(long)]
    continue_on_error: bool,
    /// Check only the given stage, e.g. `level3_5`.
    #[arg(long, value_name = "STAGE")]
    only_for_stage: Option<String>,
    /// File from the level folder to upload for bonus minutes on completion.
    #[arg(long, value_name = "FILE")]
    upload_solution_for_bonus: Option<String>,
}

impl SubmitArgs {
    fn pass_options(&self, config: &RunnerConfig) -> PassOptions {
        PassOptions {
            force_resubmit: self.resubmit_successful,
            policy: FailurePolicy::from_continue_flag(self.continue_on_error),
            only_stage: self
                .only_for_stage
                .clone()
                .filter(|stage| !stage.trim().is_empty()),
            bonus_source: self
                .upload_solution_for_bonus
                .clone()
                .or_else(|| config.bonus_source_file.clone()),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let root = cli.root;
    load_env_file(&root.join(".env"))?;
    let config = load_config(&root.join(CONFIG_FILE_NAME), &process_env)?;
    let credentials = Credentials::from_env(&process_env)?;
    let judge = CatCoderClient::login(&config.judge, &config.contest_id, &credentials)?;
    let vcs = Vcs::from_mode(&root, config.git_mode);

    match cli.command {
        Command::Submit(args) => {
            let report = run_pass(&root, &judge, &vcs, &args.pass_options(&config))?;
            print_report(&report);
            if let Some(outcome) =
                advance_if_complete(&root, &report, &judge, &vcs, &config.template_dir)?
            {
                print_advance(&outcome);
            }
            Ok(report.exit_code())
        }
        Command::NextLevel => {
            let outcome = next_level(&root, &judge, &vcs, &config.template_dir)?;
            print_advance(&outcome);
            Ok(match outcome {
                AdvanceOutcome::Created { .. } => exit_codes::OK,
                AdvanceOutcome::AlreadyPresent { .. } => exit_codes::INVALID,
            })
        }
        Command::Status => {
            let plan = plan_pass(&root, &judge, &PassOptions::default())?;
            println!(
                "level {}/{} ({:?} naming, {} stages)",
                plan.level.level_nr(),
                plan.level.max_level_nr(),
                plan.catalog.regime(),
                plan.catalog.stages().len()
            );
            for stage in plan.catalog.stages() {
                let state = if plan.ledger_at_start.contains(&stage.remote_id) {
                    "accepted"
                } else if plan.reconciliation.candidates.contains(stage) {
                    "pending"
                } else {
                    "missing output"
                };
                println!("{} -> {}: {}", stage.local_key, stage.remote_id, state);
            }
            Ok(exit_codes::OK)
        }
    }
}

/// Load `KEY=value` pairs from `path` into the process environment. A missing
/// file is fine.
fn load_env_file(path: &Path) -> Result<()> {
    match dotenv::from_path(path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("load .env from {}", path.display())),
    }
}

fn print_report(report: &PassReport) {
    for attempt in &report.attempts {
        let label = match &attempt.verdict {
            Verdict::Accepted => "success".to_string(),
            Verdict::Rejected => "failed".to_string(),
            Verdict::TransportFailure(reason) => format!("error ({reason})"),
        };
        println!("{} {}", attempt.stage.local_key, label);
    }
    println!(
        "level{}: {:?}, {} accepted in ledger",
        report.level_nr,
        report.state,
        report.ledger.len()
    );
}

fn print_advance(outcome: &AdvanceOutcome) {
    match outcome {
        AdvanceOutcome::Created { level_nr, level_dir } => {
            println!("level{level_nr} ready at {}", level_dir.display());
        }
        AdvanceOutcome::AlreadyPresent { level_nr, level_dir } => {
            println!(
                "level{level_nr} already exists at {}, nothing to do",
                level_dir.display()
            );
        }
    }
}
