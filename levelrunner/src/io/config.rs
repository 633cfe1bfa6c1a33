//! Contest configuration stored in `levelrunner.toml` at the contest root.
//!
//! Values from the file are overridden by environment variables (a `.env`
//! file is loaded by the binary first). Credentials only come from the
//! environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "levelrunner.toml";

pub const ENV_USERNAME: &str = "CCC_USERNAME";
pub const ENV_PASSWORD: &str = "CCC_PASSWORD";
pub const ENV_CONTEST_ID: &str = "CCC_CONTEST_ID";
pub const ENV_GIT_MODE: &str = "CCC_GIT_MODE";
pub const ENV_BONUS_FILE: &str = "CCC_SOLUTION_SUBMIT_FILE";

/// How level progress is recorded in version control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitMode {
    /// No commits at all.
    None,
    /// Commit locally.
    #[default]
    Local,
    /// Commit, then pull --rebase and push when an `origin` remote exists.
    Remote,
}

impl FromStr for GitMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(GitMode::None),
            "local" => Ok(GitMode::Local),
            "remote" => Ok(GitMode::Remote),
            other => Err(anyhow!(
                "unknown git mode '{other}' (expected none, local or remote)"
            )),
        }
    }
}

/// Contest configuration (TOML). Missing fields take defaults.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Contest id used in every judge URL.
    pub contest_id: String,

    pub git_mode: GitMode,

    /// File inside the level directory uploaded for bonus minutes on completion.
    pub bonus_source_file: Option<String>,

    /// Directory copied into the first level when no level exists yet.
    pub template_dir: String,

    pub judge: JudgeConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JudgeConfig {
    pub base_url: String,
    pub login_url: String,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://catcoder.codingcontest.org".to_string(),
            login_url: "https://register.codingcontest.org/auth/login".to_string(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            contest_id: String::new(),
            git_mode: GitMode::default(),
            bonus_source_file: None,
            template_dir: "template".to_string(),
            judge: JudgeConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.contest_id.trim().is_empty() {
            return Err(anyhow!(
                "contest_id must be set ({ENV_CONTEST_ID} or {CONFIG_FILE_NAME})"
            ));
        }
        if self.template_dir.trim().is_empty() {
            return Err(anyhow!("template_dir must be non-empty"));
        }
        if self.judge.base_url.trim().is_empty() || self.judge.login_url.trim().is_empty() {
            return Err(anyhow!("judge.base_url and judge.login_url must be non-empty"));
        }
        Ok(())
    }

    fn apply_env(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(contest_id) = env(ENV_CONTEST_ID) {
            self.contest_id = contest_id;
        }
        if let Some(mode) = env(ENV_GIT_MODE) {
            self.git_mode = mode
                .parse()
                .with_context(|| format!("parse {ENV_GIT_MODE}"))?;
        }
        if let Some(bonus) = env(ENV_BONUS_FILE) {
            self.bonus_source_file = Some(bonus);
        }
        Ok(())
    }
}

/// Judge login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env(env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let username = env(ENV_USERNAME)
            .ok_or_else(|| anyhow!("{ENV_USERNAME} is not set (check your .env file)"))?;
        let password = env(ENV_PASSWORD)
            .ok_or_else(|| anyhow!("{ENV_PASSWORD} is not set (check your .env file)"))?;
        Ok(Self { username, password })
    }
}

/// Non-empty process environment variable.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Load config from a TOML file and apply environment overrides.
///
/// A missing file yields `RunnerConfig::default()` before overrides.
pub fn load_config(path: &Path, env: &dyn Fn(&str) -> Option<String>) -> Result<RunnerConfig> {
    let mut cfg = if path.exists() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    } else {
        RunnerConfig::default()
    };
    cfg.apply_env(env)?;
    cfg.validate()?;
    Ok(cfg)
}
