//! Judge abstraction and the CatCoder HTTP client.
//!
//! The [`Judge`] trait decouples the submission engine from the remote judge.
//! Tests use scripted judges that return predetermined verdicts without any
//! network traffic.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use reqwest::Url;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_DISPOSITION;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{LevelInfo, LevelInfoParts};
use crate::io::config::{Credentials, JudgeConfig};

const SESSION_COOKIE: &str = "SESSION";

/// Judge decision for a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageVerdict {
    Valid,
    Invalid,
}

/// Remote judge capabilities consumed by the engine.
pub trait Judge {
    /// Metadata of the level currently open for this contestant.
    fn level_info(&self) -> Result<LevelInfo>;

    /// Submit the artifact for `remote_id`.
    ///
    /// With `uses_output_files` the file is uploaded; otherwise its first line
    /// is sent as the answer. Errors are transport failures.
    fn submit(
        &self,
        artifact: &Path,
        remote_id: &str,
        uses_output_files: bool,
    ) -> Result<StageVerdict>;

    /// Upload a source file for bonus credit.
    fn upload_bonus_source(&self, path: &Path) -> Result<()>;

    /// Download the level description (and input archive when `uses_input_files`)
    /// into `dest_dir`. Returns the archive path.
    fn download_level_files(
        &self,
        dest_dir: &Path,
        uses_input_files: bool,
    ) -> Result<Option<PathBuf>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInfoDto {
    pub level: u32,
    pub has_input_file: bool,
    pub file_solution: bool,
    pub tests: Vec<TestDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDto {
    pub inputs_dto: Vec<StageInputDto>,
}

#[derive(Debug, Deserialize)]
pub struct StageInputDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDto {
    pub nr_of_levels: u32,
    pub game_finished: bool,
}

#[derive(Debug, Deserialize)]
struct SubmitResponseDto {
    results: HashMap<String, StageVerdict>,
}

#[derive(Debug, Deserialize)]
struct FileRequestDto {
    url: String,
}

/// Convert the two level endpoints' payloads into validated [`LevelInfo`].
///
/// Without input files the judge names stages by 1-based position.
pub fn level_info_from_dtos(info: InputInfoDto, level: LevelDto) -> Result<LevelInfo> {
    let mut stage_names = Vec::with_capacity(info.tests.len());
    let mut stage_inputs = Vec::with_capacity(info.tests.len());
    for (idx, test) in info.tests.into_iter().enumerate() {
        let first = test
            .inputs_dto
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("test {} has no inputs", idx + 1))?;
        let name = if info.has_input_file {
            first
                .name
                .ok_or_else(|| anyhow!("test {} has no input name", idx + 1))?
        } else {
            (idx + 1).to_string()
        };
        stage_names.push(name);
        stage_inputs.push(first.input.unwrap_or_default());
    }
    let parts = LevelInfoParts {
        level_nr: info.level,
        max_level_nr: level.nr_of_levels,
        is_contest_finished: level.game_finished,
        stage_names,
        stage_inputs,
        uses_input_files: info.has_input_file,
        uses_output_files: info.file_solution,
    };
    Ok(LevelInfo::new(parts)?)
}

/// File name from a `Content-Disposition` header, else the URL's last segment.
pub fn download_file_name(content_disposition: Option<&str>, url: &str) -> Result<String> {
    if let Some(header) = content_disposition {
        let re = Regex::new(r#"filename="(.+?)""#).context("compile filename regex")?;
        if let Some(caps) = re.captures(header) {
            return Ok(caps[1].to_string());
        }
    }
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("cannot derive file name from {url}"))
}

/// First line of a text answer, trimmed.
fn read_text_answer(artifact: &Path) -> Result<String> {
    let contents = fs::read_to_string(artifact)
        .with_context(|| format!("read solution {}", artifact.display()))?;
    contents
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .ok_or_else(|| anyhow!("solution {} is empty", artifact.display()))
}

fn text_file_part(path: &Path) -> Result<Part> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
    Part::bytes(bytes)
        .file_name(name)
        .mime_str("text/plain")
        .context("build multipart file part")
}

/// Authenticated session against the CatCoder judge.
pub struct CatCoderClient {
    http: Client,
    jar: Arc<Jar>,
    base_url: Url,
    config: JudgeConfig,
    contest_id: String,
}

impl CatCoderClient {
    /// Log in and return a client with an authenticated session cookie.
    #[instrument(skip_all, fields(contest_id = %contest_id))]
    pub fn login(config: &JudgeConfig, contest_id: &str, credentials: &Credentials) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .context("build http client")?;
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("parse judge base url {}", config.base_url))?;
        let client = Self {
            http,
            jar,
            base_url,
            config: config.clone(),
            contest_id: contest_id.to_string(),
        };

        let session_url = format!(
            "{base}/oauth2/authorization/cc-registration?referer={base}/",
            base = client.base()
        );
        client.send(client.http.get(&session_url), "GET", &session_url)?;
        let first = client
            .session_cookie()
            .ok_or_else(|| anyhow!("judge did not set a {SESSION_COOKIE} cookie"))?;
        debug!("received initial session cookie");

        let login_url = client.config.login_url.clone();
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        client.send(client.http.post(&login_url).form(&form), "POST", &login_url)?;
        let second = client.session_cookie();
        if second.as_deref().is_none_or(|second| second == first) {
            warn!(username = %credentials.username, "login failed");
            bail!(
                "failed login for {}, check CCC_USERNAME and CCC_PASSWORD",
                credentials.username
            );
        }
        info!(username = %credentials.username, "logged in");
        Ok(client)
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn session_cookie(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.to_string())
    }

    fn send(&self, request: RequestBuilder, method: &str, url: &str) -> Result<Response> {
        debug!(method, url, "request");
        let response = request.send().with_context(|| format!("{method} {url}"))?;
        let status = response.status();
        if !status.is_success() {
            warn!(method, url, %status, "unexpected status");
            bail!("received status {status} from {method} {url}");
        }
        Ok(response)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send(self.http.get(url), "GET", url)?
            .json()
            .with_context(|| format!("decode response of GET {url}"))
    }

    fn download_one(&self, dest_dir: &Path, filetype: &str) -> Result<PathBuf> {
        let request_url = format!(
            "{}/api/contest/{}/file-request/{filetype}",
            self.base(),
            self.contest_id
        );
        let FileRequestDto { url } = self.get_json(&request_url)?;
        let response = self.send(self.http.get(&url), "GET", &url)?;
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let name = download_file_name(disposition.as_deref(), &url)?;
        let bytes = response
            .bytes()
            .with_context(|| format!("read body of GET {url}"))?;
        let path = dest_dir.join(name);
        fs::write(&path, &bytes).with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), bytes = bytes.len(), "downloaded level file");
        Ok(path)
    }
}

impl Judge for CatCoderClient {
    #[instrument(skip_all)]
    fn level_info(&self) -> Result<LevelInfo> {
        let info: InputInfoDto = self.get_json(&format!(
            "{}/api/game/input/info/{}",
            self.base(),
            self.contest_id
        ))?;
        let level: LevelDto = self.get_json(&format!(
            "{}/api/game/level/{}",
            self.base(),
            self.contest_id
        ))?;
        level_info_from_dtos(info, level)
    }

    #[instrument(skip_all, fields(remote_id = %remote_id, uses_output_files = uses_output_files))]
    fn submit(
        &self,
        artifact: &Path,
        remote_id: &str,
        uses_output_files: bool,
    ) -> Result<StageVerdict> {
        let response: SubmitResponseDto = if uses_output_files {
            let url = format!(
                "{}/api/game/{}/upload/solution/{remote_id}",
                self.base(),
                self.contest_id
            );
            let form = Form::new().part("file", text_file_part(artifact)?);
            self.send(self.http.post(&url).multipart(form), "POST", &url)?
                .json()
                .with_context(|| format!("decode response of POST {url}"))?
        } else {
            let answer = read_text_answer(artifact)?;
            debug!(answer = %answer, "submitting text answer");
            let url = format!("{}/api/game/{}/submit", self.base(), self.contest_id);
            let body = json!({ "results": { remote_id: answer } });
            self.send(self.http.post(&url).json(&body), "POST", &url)?
                .json()
                .with_context(|| format!("decode response of POST {url}"))?
        };
        response
            .results
            .get(remote_id)
            .copied()
            .ok_or_else(|| anyhow!("judge response has no result for {remote_id}"))
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn upload_bonus_source(&self, path: &Path) -> Result<()> {
        let url = format!("{}/api/game/{}/1/upload", self.base(), self.contest_id);
        let form = Form::new().part("file", text_file_part(path)?);
        self.send(self.http.post(&url).multipart(form), "POST", &url)?;
        Ok(())
    }

    #[instrument(skip_all, fields(dest = %dest_dir.display()))]
    fn download_level_files(
        &self,
        dest_dir: &Path,
        uses_input_files: bool,
    ) -> Result<Option<PathBuf>> {
        self.download_one(dest_dir, "description")?;
        if !uses_input_files {
            return Ok(None);
        }
        self.download_one(dest_dir, "input").map(Some)
    }
}
