//! Client for the separation backend.
//!
//! A submission is two requests against the API base: `info?url=` for the
//! source's metadata, then `demux?url=` which blocks until the stems exist.
//! The demux answer is either a full `stem_urls` map or a folder the five
//! `<stem>.<ext>` files live under. Folders without a scheme are served from
//! the backend's origin.
//!
//! Local files are posted to `file_upload`, which separates them in the same
//! request and answers like demux does.

use crate::config::Config;
use crate::error::JobError;
use crate::stems::StemSet;
use reqwest::Url;
use reqwest::blocking::{Client, multipart};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    /// Source length in seconds; the backend uses it as its estimate.
    #[serde(default)]
    pub eta: Option<f64>,
}

impl VideoInfo {
    pub fn display_name(&self) -> Option<&str> {
        self.title.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    FetchingInfo,
    Demuxing,
}

/// What the upload endpoint hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Separation ran as part of the upload.
    Separated(StemSet),
    /// The backend only stored the file; submit this source through
    /// info and demux.
    Source(String),
}

pub trait JobClient {
    fn fetch_info(&self, source: &str) -> Result<VideoInfo, JobError>;
    fn demux(&self, source: &str, info: &VideoInfo) -> Result<StemSet, JobError>;
}

/// Run both steps of a submission, reporting each phase as it starts.
pub fn submit(
    client: &dyn JobClient,
    source: &str,
    mut on_phase: impl FnMut(SubmitPhase, Option<&VideoInfo>),
) -> Result<(VideoInfo, StemSet), JobError> {
    on_phase(SubmitPhase::FetchingInfo, None);
    let info = client.fetch_info(source)?;
    log::info!(
        "Fetched info for {source}: {}",
        info.display_name().unwrap_or("untitled")
    );

    on_phase(SubmitPhase::Demuxing, Some(&info));
    let stems = client.demux(source, &info)?;
    log::info!("Separation finished for {source}");
    Ok((info, stems))
}

pub struct HttpJobClient {
    client: Client,
    base_url: String,
    info_timeout: Duration,
    demux_timeout: Duration,
    stem_extension: String,
}

impl HttpJobClient {
    pub fn from_config(config: &Config) -> Result<Self, JobError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            info_timeout: Duration::from_secs(config.info_timeout_secs),
            demux_timeout: Duration::from_secs(config.demux_timeout_secs),
            stem_extension: config.stem_extension.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    fn get_json(
        &self,
        path: &str,
        source: &str,
        timeout: Duration,
        what: &'static str,
    ) -> Result<Value, JobError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .query(&[("url", source)])
            .timeout(timeout)
            .send()
            .map_err(|e| timed_out(e, what))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::Status(status.as_u16()));
        }
        response.json::<Value>().map_err(|e| timed_out(e, what))
    }

    /// Send a local file to the backend's upload endpoint. The backend
    /// separates during the request, so this waits as long as demux does.
    pub fn upload(&self, path: &Path) -> Result<UploadOutcome, JobError> {
        let form = multipart::Form::new().file("file", path)?;
        let response = self
            .client
            .post(self.endpoint("file_upload"))
            .multipart(form)
            .timeout(self.demux_timeout)
            .send()
            .map_err(|e| timed_out(e, "upload"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::Status(status.as_u16()));
        }
        let body: Value = response.json().map_err(|e| timed_out(e, "upload"))?;
        parse_upload_response(&body, &self.base_url, &self.stem_extension)
    }
}

impl JobClient for HttpJobClient {
    fn fetch_info(&self, source: &str) -> Result<VideoInfo, JobError> {
        let value = self.get_json("info", source, self.info_timeout, "video info")?;
        serde_json::from_value(value).map_err(|e| JobError::Parse(e.to_string()))
    }

    fn demux(&self, source: &str, info: &VideoInfo) -> Result<StemSet, JobError> {
        let value = self.get_json("demux", source, self.demux_timeout, "separation")?;
        parse_demux_response(&value, info, &self.base_url, &self.stem_extension)
    }
}

fn timed_out(e: reqwest::Error, what: &'static str) -> JobError {
    if e.is_timeout() {
        JobError::Timeout(what)
    } else {
        JobError::Network(e)
    }
}

fn check_status(value: &Value) -> Result<(), JobError> {
    match value.get("status") {
        Some(Value::Number(n)) if n.as_u64() != Some(200) => {
            let code = n.as_u64().and_then(|c| u16::try_from(c).ok()).unwrap_or(0);
            Err(JobError::Status(code))
        }
        Some(Value::String(s)) if s.eq_ignore_ascii_case("failed") => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(s.as_str());
            Err(JobError::Rejected(message.to_string()))
        }
        _ => Ok(()),
    }
}

/// Turn a demux answer into a stem set. A `stem_urls` map wins; otherwise
/// the stems are expected under a folder named by the answer or the info.
pub fn parse_demux_response(
    value: &Value,
    info: &VideoInfo,
    base_url: &str,
    extension: &str,
) -> Result<StemSet, JobError> {
    check_status(value)?;

    if value.get("stem_urls").is_some() {
        return Ok(StemSet::from_value(value)?);
    }

    let folder = value
        .get("folder")
        .and_then(Value::as_str)
        .or(info.folder.as_deref())
        .or_else(|| value.get("message").and_then(Value::as_str))
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| JobError::Parse("response names neither stem_urls nor a folder".to_string()))?;

    Ok(StemSet::from_base(&resolve_folder(base_url, folder), extension))
}

/// Upload answers normally carry the stems; a bare `url` or `id` means the
/// file still has to go through info and demux.
pub fn parse_upload_response(
    value: &Value,
    base_url: &str,
    extension: &str,
) -> Result<UploadOutcome, JobError> {
    check_status(value)?;

    if value.get("stem_urls").is_none()
        && let Some(source) = value
            .get("url")
            .or_else(|| value.get("id"))
            .and_then(Value::as_str)
    {
        return Ok(UploadOutcome::Source(source.to_string()));
    }

    parse_demux_response(value, &VideoInfo::default(), base_url, extension)
        .map(UploadOutcome::Separated)
}

/// URLs, `~` paths and absolute paths that exist locally are kept. Anything
/// else is a path on the backend and is joined to the API base's origin.
pub fn resolve_folder(base_url: &str, folder: &str) -> String {
    let path = Path::new(folder);
    if folder.contains("://") || folder.starts_with('~') || (path.is_absolute() && path.exists()) {
        return folder.to_string();
    }

    let joined = Url::parse(base_url)
        .and_then(|base| base.join("/"))
        .and_then(|origin| origin.join(folder.trim_start_matches("./")));
    match joined {
        Ok(url) => url.to_string(),
        Err(e) => {
            log::warn!("Could not resolve {folder} against {base_url}: {e}");
            folder.to_string()
        }
    }
}
