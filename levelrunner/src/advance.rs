//! Level advancement: materialize the next level's workspace.
//!
//! A pass only reports [`PassState::Complete`]; this module decides whether to
//! advance and builds the new level directory from the previous level (or the
//! template), the judge's level files and its inline inputs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::sequencer::PassState;
use crate::io::archive::{relocate_outputs, unpack_archive};
use crate::io::git::VersionControl;
use crate::io::judge::Judge;
use crate::io::paths::{LevelPaths, level_dir_name};
use crate::io::workspace::{
    copy_level_scaffold, highest_level, prepare_level_dirs, write_inline_inputs,
};
use crate::pass::PassReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// A new level directory was created.
    Created { level_nr: u32, level_dir: PathBuf },
    /// The directory for the judge's current level already exists.
    AlreadyPresent { level_nr: u32, level_dir: PathBuf },
}

/// Create the workspace for the judge's current level.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn next_level<J: Judge, V: VersionControl>(
    root: &Path,
    judge: &J,
    vcs: &V,
    template_dir: &str,
) -> Result<AdvanceOutcome> {
    vcs.ensure_ready(true)?;

    let copy_from = match highest_level(root)? {
        Some(nr) => root.join(level_dir_name(nr)),
        None => root.join(template_dir),
    };
    if !copy_from.is_dir() {
        anyhow::bail!(
            "{} not a valid directory, cannot copy template files",
            copy_from.display()
        );
    }

    let level = judge.level_info().context("fetch level info")?;
    let paths = LevelPaths::new(root, level.level_nr());
    if paths.level_dir.exists() {
        warn!(dir = %paths.level_dir.display(), "level directory already exists, nothing to do");
        return Ok(AdvanceOutcome::AlreadyPresent {
            level_nr: level.level_nr(),
            level_dir: paths.level_dir,
        });
    }

    debug!(from = %copy_from.display(), to = %paths.level_dir.display(), "copying scaffold");
    copy_level_scaffold(&copy_from, &paths.level_dir)?;
    let archive = judge
        .download_level_files(&paths.level_dir, level.uses_input_files())
        .context("download level files")?;
    prepare_level_dirs(&paths)?;

    match archive {
        Some(archive) => {
            unpack_archive(&archive, &paths.input_dir)?;
            fs::remove_file(&archive)
                .with_context(|| format!("remove {}", archive.display()))?;
            let moved = relocate_outputs(&paths.input_dir, &paths.output_dir)?;
            debug!(moved = moved.len(), "relocated shipped outputs");
        }
        None => {
            let written = write_inline_inputs(&paths, &level)?;
            debug!(written = written.len(), "wrote inline inputs");
        }
    }

    vcs.commit(
        &[paths.level_dir.as_path()],
        &format!("level{} start", level.level_nr()),
    )
    .context("commit level start")?;
    info!(level = level.level_nr(), dir = %paths.level_dir.display(), "level ready");
    Ok(AdvanceOutcome::Created {
        level_nr: level.level_nr(),
        level_dir: paths.level_dir,
    })
}

/// Hand off to [`next_level`] after a completed, non-final pass.
pub fn advance_if_complete<J: Judge, V: VersionControl>(
    root: &Path,
    report: &PassReport,
    judge: &J,
    vcs: &V,
    template_dir: &str,
) -> Result<Option<AdvanceOutcome>> {
    if report.state != PassState::Complete || report.final_level {
        return Ok(None);
    }
    next_level(root, judge, vcs, template_dir).map(Some)
}
