//! Canonical on-disk layout of a level directory.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Reserved ledger file name inside a level's output directory.
pub const LEDGER_FILE_NAME: &str = ".successfully_submitted";
pub const INPUT_EXTENSION: &str = "in";
pub const OUTPUT_EXTENSION: &str = "out";

/// All canonical paths for one level under the contest root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPaths {
    pub root: PathBuf,
    pub level_nr: u32,
    pub level_dir: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub ledger_path: PathBuf,
}

impl LevelPaths {
    pub fn new(root: impl Into<PathBuf>, level_nr: u32) -> Self {
        let root = root.into();
        let level_dir = root.join(level_dir_name(level_nr));
        let input_dir = level_dir.join("in");
        let output_dir = level_dir.join("out");
        Self {
            root,
            level_nr,
            ledger_path: output_dir.join(LEDGER_FILE_NAME),
            level_dir,
            input_dir,
            output_dir,
        }
    }

    /// Path of the output artifact for `local_key`.
    pub fn output_artifact(&self, local_key: &str) -> PathBuf {
        self.output_dir.join(format!("{local_key}.{OUTPUT_EXTENSION}"))
    }

    pub fn input_artifact(&self, local_key: &str) -> PathBuf {
        self.input_dir.join(format!("{local_key}.{INPUT_EXTENSION}"))
    }
}

pub fn level_dir_name(level_nr: u32) -> String {
    format!("level{level_nr}")
}

/// File stems of regular files in `dir` with the given extension.
///
/// A missing directory yields an empty set.
pub fn list_stems(dir: &Path, extension: &str) -> Result<BTreeSet<String>> {
    let mut stems = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(stems);
    }
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != extension) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            stems.insert(stem.to_string());
        }
    }
    Ok(stems)
}
