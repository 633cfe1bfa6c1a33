//! Test-only helpers: scripted judge, recording version control and temporary
//! contest roots.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Result, anyhow};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use crate::core::types::{LevelInfo, LevelInfoParts};
use crate::io::git::VersionControl;
use crate::io::judge::{Judge, StageVerdict};
use crate::io::paths::{LevelPaths, list_stems};

/// Name of the input archive [`ScriptedJudge`] writes into the level directory.
pub const SCRIPTED_ARCHIVE_NAME: &str = "inputs.zip";

/// Write a zip archive holding `entries` as `(name, contents)` pairs.
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
    let mut writer = zip::ZipWriter::new(File::create(path)?);
    for (name, contents) in entries {
        writer.start_file(*name, SimpleFileOptions::default())?;
        writer.write_all(contents.as_bytes())?;
    }
    writer.finish()?;
    Ok(())
}

/// Deterministic level with inline inputs and file solutions.
pub fn level_info(level_nr: u32, max_level_nr: u32, stage_names: &[&str]) -> LevelInfo {
    LevelInfo::new(level_parts(level_nr, max_level_nr, stage_names)).expect("valid level info")
}

/// Raw parts for [`level_info`], for tests that tweak individual fields.
pub fn level_parts(level_nr: u32, max_level_nr: u32, stage_names: &[&str]) -> LevelInfoParts {
    LevelInfoParts {
        level_nr,
        max_level_nr,
        is_contest_finished: false,
        stage_names: stage_names.iter().map(|name| name.to_string()).collect(),
        stage_inputs: stage_names
            .iter()
            .map(|name| format!("input for {name}"))
            .collect(),
        uses_input_files: false,
        uses_output_files: true,
    }
}

/// Scripted outcome for one remote stage id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedVerdict {
    Valid,
    Invalid,
    /// `submit` returns an error.
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub artifact: PathBuf,
    pub remote_id: String,
    pub uses_output_files: bool,
}

/// Judge that answers from a script and records every call.
///
/// Stages without a scripted verdict are accepted. `level_info` walks through
/// the queued levels and then keeps returning the last one.
#[derive(Debug)]
pub struct ScriptedJudge {
    levels: RefCell<VecDeque<LevelInfo>>,
    verdicts: HashMap<String, ScriptedVerdict>,
    attempts: RefCell<Vec<RecordedSubmission>>,
    bonus_uploads: RefCell<Vec<PathBuf>>,
    fail_bonus_upload: bool,
    input_archive: Option<Vec<(String, String)>>,
}

impl ScriptedJudge {
    pub fn new(level: LevelInfo) -> Self {
        Self {
            levels: RefCell::new(VecDeque::from([level])),
            verdicts: HashMap::new(),
            attempts: RefCell::new(Vec::new()),
            bonus_uploads: RefCell::new(Vec::new()),
            fail_bonus_upload: false,
            input_archive: None,
        }
    }

    pub fn with_verdict(mut self, remote_id: &str, verdict: ScriptedVerdict) -> Self {
        self.verdicts.insert(remote_id.to_string(), verdict);
        self
    }

    /// Queue the level the judge reports after the current one is consumed.
    pub fn with_next_level(self, level: LevelInfo) -> Self {
        self.levels.borrow_mut().push_back(level);
        self
    }

    pub fn with_failing_bonus_upload(mut self) -> Self {
        self.fail_bonus_upload = true;
        self
    }

    /// Ship these `(name, contents)` entries as a zip input archive for levels
    /// with input files.
    pub fn with_input_archive(mut self, entries: &[(&str, &str)]) -> Self {
        self.input_archive = Some(
            entries
                .iter()
                .map(|(name, contents)| (name.to_string(), contents.to_string()))
                .collect(),
        );
        self
    }

    pub fn attempts(&self) -> Vec<RecordedSubmission> {
        self.attempts.borrow().clone()
    }

    pub fn attempted_ids(&self) -> Vec<String> {
        self.attempts
            .borrow()
            .iter()
            .map(|attempt| attempt.remote_id.clone())
            .collect()
    }

    pub fn clear_attempts(&self) {
        self.attempts.borrow_mut().clear();
    }

    pub fn bonus_uploads(&self) -> Vec<PathBuf> {
        self.bonus_uploads.borrow().clone()
    }
}

impl Judge for ScriptedJudge {
    fn level_info(&self) -> Result<LevelInfo> {
        let mut levels = self.levels.borrow_mut();
        if levels.len() > 1 {
            return levels.pop_front().ok_or_else(|| anyhow!("no scripted level"));
        }
        levels
            .front()
            .cloned()
            .ok_or_else(|| anyhow!("no scripted level"))
    }

    fn submit(
        &self,
        artifact: &Path,
        remote_id: &str,
        uses_output_files: bool,
    ) -> Result<StageVerdict> {
        self.attempts.borrow_mut().push(RecordedSubmission {
            artifact: artifact.to_path_buf(),
            remote_id: remote_id.to_string(),
            uses_output_files,
        });
        match self.verdicts.get(remote_id).copied() {
            None | Some(ScriptedVerdict::Valid) => Ok(StageVerdict::Valid),
            Some(ScriptedVerdict::Invalid) => Ok(StageVerdict::Invalid),
            Some(ScriptedVerdict::Transport) => {
                Err(anyhow!("scripted transport failure for {remote_id}"))
            }
        }
    }

    fn upload_bonus_source(&self, path: &Path) -> Result<()> {
        if self.fail_bonus_upload {
            return Err(anyhow!("scripted bonus upload failure"));
        }
        self.bonus_uploads.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn download_level_files(
        &self,
        dest_dir: &Path,
        uses_input_files: bool,
    ) -> Result<Option<PathBuf>> {
        fs::write(dest_dir.join("description.pdf"), "description")?;
        let Some(entries) = self.input_archive.as_ref().filter(|_| uses_input_files) else {
            return Ok(None);
        };
        let entries: Vec<(&str, &str)> = entries
            .iter()
            .map(|(name, contents)| (name.as_str(), contents.as_str()))
            .collect();
        let archive = dest_dir.join(SCRIPTED_ARCHIVE_NAME);
        write_zip(&archive, &entries)?;
        Ok(Some(archive))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub paths: Vec<PathBuf>,
    pub message: String,
}

/// Version control that records commits instead of running git.
#[derive(Debug, Default)]
pub struct RecordingVcs {
    commits: RefCell<Vec<RecordedCommit>>,
    dirty: bool,
    fail_commits: bool,
}

impl RecordingVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a dirty worktree from `ensure_ready(true)`.
    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    /// Fail every commit.
    pub fn failing() -> Self {
        Self {
            fail_commits: true,
            ..Self::default()
        }
    }

    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.commits.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.commits
            .borrow()
            .iter()
            .map(|commit| commit.message.clone())
            .collect()
    }
}

impl VersionControl for RecordingVcs {
    fn ensure_ready(&self, require_clean: bool) -> Result<()> {
        if require_clean && self.dirty {
            return Err(anyhow!("git repo is dirty, commit your changes"));
        }
        Ok(())
    }

    fn commit(&self, paths: &[&Path], message: &str) -> Result<()> {
        if self.fail_commits {
            return Err(anyhow!("scripted commit failure"));
        }
        self.commits.borrow_mut().push(RecordedCommit {
            paths: paths.iter().map(|path| path.to_path_buf()).collect(),
            message: message.to_string(),
        });
        Ok(())
    }
}

/// Temporary contest root with helpers for level directories and artifacts.
pub struct TestContest {
    temp: TempDir,
}

impl TestContest {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn paths(&self, level_nr: u32) -> LevelPaths {
        LevelPaths::new(self.root(), level_nr)
    }

    /// Create `level<N>/in` and `level<N>/out`.
    pub fn create_level(&self, level_nr: u32) -> Result<LevelPaths> {
        let paths = self.paths(level_nr);
        fs::create_dir_all(&paths.input_dir)?;
        fs::create_dir_all(&paths.output_dir)?;
        Ok(paths)
    }

    pub fn write_inputs(&self, level_nr: u32, stems: &[&str]) -> Result<()> {
        let paths = self.paths(level_nr);
        for stem in stems {
            fs::write(paths.input_artifact(stem), format!("input {stem}\n"))?;
        }
        Ok(())
    }

    pub fn write_outputs(&self, level_nr: u32, stems: &[&str]) -> Result<()> {
        let paths = self.paths(level_nr);
        for stem in stems {
            fs::write(paths.output_artifact(stem), format!("answer {stem}\n"))?;
        }
        Ok(())
    }

    pub fn write_ledger(&self, level_nr: u32, ids: &[&str]) -> Result<()> {
        let mut buf = String::new();
        for id in ids {
            buf.push_str(id);
            buf.push('\n');
        }
        fs::write(self.paths(level_nr).ledger_path, buf)?;
        Ok(())
    }

    /// Raw ledger lines, or `None` when the ledger file does not exist.
    pub fn read_ledger(&self, level_nr: u32) -> Result<Option<Vec<String>>> {
        let path = self.paths(level_nr).ledger_path;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(
            fs::read_to_string(path)?
                .lines()
                .map(str::to_string)
                .collect(),
        ))
    }

    pub fn write_file(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Turn the root into a git repository with everything committed.
    pub fn init_git(&self) -> Result<()> {
        self.git(&["init", "--quiet"])?;
        self.git(&["config", "user.email", "test@example.com"])?;
        self.git(&["config", "user.name", "test"])?;
        self.git(&["add", "--all"])?;
        self.git(&["commit", "--quiet", "--allow-empty", "-m", "init"])?;
        Ok(())
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let status = Command::new("git")
            .args(args)
            .current_dir(self.root())
            .status()?;
        if !status.success() {
            return Err(anyhow!("git {} failed with {status}", args.join(" ")));
        }
        Ok(())
    }

    pub fn input_stems(&self, level_nr: u32) -> Result<Vec<String>> {
        Ok(list_stems(&self.paths(level_nr).input_dir, "in")?
            .into_iter()
            .collect())
    }
}
