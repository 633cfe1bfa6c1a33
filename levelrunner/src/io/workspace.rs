//! Materialization of a level directory from the template or previous level.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::core::types::LevelInfo;
use crate::io::paths::LevelPaths;

/// Extensions of level-specific files never carried into a new level.
const SKIPPED_EXTENSIONS: &[&str] = &["in", "out", "pdf"];

/// Highest `level<N>` directory (N with one or two digits) under `root`.
pub fn highest_level(root: &Path) -> Result<Option<u32>> {
    let re = Regex::new(r"^level(\d{1,2})$").context("compile level dir regex")?;
    let mut highest = None;
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry.context("read root entry")?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(caps) = name.to_str().and_then(|name| re.captures(name)) else {
            continue;
        };
        let nr: u32 = caps[1].parse().context("parse level number")?;
        highest = highest.max(Some(nr));
    }
    Ok(highest)
}

/// Copy `source` into `dest`, skipping level inputs, outputs and descriptions.
pub fn copy_level_scaffold(source: &Path, dest: &Path) -> Result<usize> {
    if !source.is_dir() {
        return Err(anyhow!(
            "{} not a valid directory, cannot copy template files",
            source.display()
        ));
    }
    fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;
    let mut copied = 0;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.with_context(|| format!("walk {}", source.display()))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .context("strip copy source prefix")?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("create {}", target.display()))?;
            continue;
        }
        if is_skipped(entry.path()) {
            continue;
        }
        fs::copy(entry.path(), &target).with_context(|| {
            format!("copy {} to {}", entry.path().display(), target.display())
        })?;
        copied += 1;
    }
    debug!(source = %source.display(), dest = %dest.display(), copied, "scaffold copied");
    Ok(copied)
}

fn is_skipped(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SKIPPED_EXTENSIONS.contains(&ext))
}

/// Create `in/` and `out/` and drop any ledger carried over from the copy source.
pub fn prepare_level_dirs(paths: &LevelPaths) -> Result<()> {
    for dir in [&paths.input_dir, &paths.output_dir] {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    match fs::remove_file(&paths.ledger_path) {
        Ok(()) => debug!(path = %paths.ledger_path.display(), "removed inherited ledger"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("remove {}", paths.ledger_path.display()));
        }
    }
    Ok(())
}

/// Write one `<stage>.in` per stage from the judge's inline inputs.
pub fn write_inline_inputs(paths: &LevelPaths, level: &LevelInfo) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(level.stage_names().len());
    for (name, input) in level.stage_names().iter().zip(level.stage_inputs()) {
        let path = paths.input_artifact(name);
        fs::write(&path, format!("{input}\n"))
            .with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
