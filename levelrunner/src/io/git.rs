//! Version-control adapter for level progress.
//!
//! Progress is recorded by shelling out to `git` in the contest root. The
//! engine depends only on [`VersionControl`] so tests can record commits
//! without a repository.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, instrument, warn};

use crate::io::config::GitMode;

const REMOTE: &str = "origin";

/// Collaborator that records level progress.
pub trait VersionControl {
    /// Fail if the repository cannot take commits (bare, or dirty when `require_clean`).
    fn ensure_ready(&self, require_clean: bool) -> Result<()>;

    /// Stage `paths` plus updates to tracked files and commit with `message`.
    fn commit(&self, paths: &[&Path], message: &str) -> Result<()>;
}

/// Git repository rooted at the contest directory.
#[derive(Debug, Clone)]
pub struct GitRepo {
    workdir: PathBuf,
    /// Pull with rebase and push to `origin` after each commit.
    push: bool,
}

impl GitRepo {
    pub fn new(workdir: impl Into<PathBuf>, push: bool) -> Self {
        Self {
            workdir: workdir.into(),
            push,
        }
    }

    /// Tracked paths with uncommitted changes. Untracked files are ignored.
    pub fn dirty_paths(&self) -> Result<Vec<String>> {
        let status = self.git(&["status", "--porcelain=v1", "--untracked-files=no"])?;
        status
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                porcelain_path(line)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("unexpected git status line: '{line}'"))
            })
            .collect()
    }

    fn is_bare(&self) -> Result<bool> {
        Ok(self.git(&["rev-parse", "--is-bare-repository"])?.trim() == "true")
    }

    fn has_remote(&self) -> Result<bool> {
        Ok(self.git(&["remote"])?.lines().any(|name| name.trim() == REMOTE))
    }

    /// `git diff --cached --quiet` exits 1 when something is staged.
    fn has_staged_changes(&self) -> Result<bool> {
        let output = self.spawn(&["diff", "--cached", "--quiet"])?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(failure(&["diff", "--cached", "--quiet"], &output)),
        }
    }

    #[instrument(skip_all)]
    fn sync_remote(&self) -> Result<()> {
        debug!(remote = REMOTE, "pull --rebase and push");
        self.git(&["pull", "--rebase", REMOTE])?;
        self.git(&["push", REMOTE])?;
        Ok(())
    }

    /// Run git and return stdout, failing on a non-zero exit.
    fn git(&self, args: &[&str]) -> Result<String> {
        let output = self.spawn(args)?;
        if !output.status.success() {
            return Err(failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("run git {} in {}", args.join(" "), self.workdir.display()))
    }
}

impl VersionControl for GitRepo {
    fn ensure_ready(&self, require_clean: bool) -> Result<()> {
        if self.is_bare()? {
            bail!("git repo in {} is a bare repo", self.workdir.display());
        }
        if !require_clean {
            return Ok(());
        }
        let dirty = self.dirty_paths()?;
        if dirty.is_empty() {
            return Ok(());
        }
        warn!(changed = dirty.len(), "git repo is dirty");
        bail!(
            "git repo is dirty, commit your changes first:\n  {}",
            dirty.join("\n  ")
        )
    }

    #[instrument(skip_all, fields(message = %message))]
    fn commit(&self, paths: &[&Path], message: &str) -> Result<()> {
        let mut add = vec!["add".to_string(), "--".to_string()];
        add.extend(paths.iter().map(|path| path.display().to_string()));
        let add: Vec<&str> = add.iter().map(String::as_str).collect();
        self.git(&add)?;
        self.git(&["add", "--update"])?;

        if !self.has_staged_changes()? {
            debug!("nothing staged, no commit");
            return Ok(());
        }
        self.git(&["commit", "--quiet", "-m", message])?;
        info!(message, "committed");
        if self.push && self.has_remote()? {
            self.sync_remote()?;
        }
        Ok(())
    }
}

/// Version control selected by [`GitMode`].
#[derive(Debug, Clone)]
pub enum Vcs {
    Git(GitRepo),
    Disabled,
}

impl Vcs {
    pub fn from_mode(workdir: &Path, mode: GitMode) -> Self {
        match mode {
            GitMode::None => Vcs::Disabled,
            GitMode::Local => Vcs::Git(GitRepo::new(workdir, false)),
            GitMode::Remote => Vcs::Git(GitRepo::new(workdir, true)),
        }
    }
}

impl VersionControl for Vcs {
    fn ensure_ready(&self, require_clean: bool) -> Result<()> {
        match self {
            Vcs::Git(repo) => repo.ensure_ready(require_clean),
            Vcs::Disabled => Ok(()),
        }
    }

    fn commit(&self, paths: &[&Path], message: &str) -> Result<()> {
        match self {
            Vcs::Git(repo) => repo.commit(paths, message),
            Vcs::Disabled => {
                debug!(message, "git disabled, skipping commit");
                Ok(())
            }
        }
    }
}

fn failure(args: &[&str], output: &Output) -> anyhow::Error {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow!("git {} exited with {}: {}", args.join(" "), output.status, stderr.trim())
}

/// Path of a `--porcelain=v1` line; renames report the destination.
fn porcelain_path(line: &str) -> Option<&str> {
    let path = line.get(3..)?.trim();
    let path = path.rsplit_once(" -> ").map_or(path, |(_, to)| to.trim());
    (!path.is_empty()).then_some(path)
}
