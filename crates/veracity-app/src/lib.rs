#![warn(missing_docs)]
//! # veracity-app
//!
//! ## Purpose
//! Wires configuration, logging, the status poller and the upload workflow
//! for `veracity`.
//!
//! ## Responsibilities
//! - Resolve configuration from the environment once at startup.
//! - Install the process-wide tracing subscriber.
//! - Load a video from disk with a MIME type derived from its extension.
//! - Project poller and workflow state into a flat page status.
//! - Re-check availability on demand.
//! - Caption upload progress and render a finished verdict as terminal text.
//!
//! ## Data flow
//! Env -> [`AppConfig`] -> `ApiClient` -> `PollerHandle` + `UploadWorkflow`
//! -> [`project_page_status`] / [`render_result`] -> terminal.
//!
//! ## Error model
//! Startup failures are wrapped in [`AppError`]. Workflow failures are state,
//! not errors, and are rendered from the workflow itself.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use veracity_client::{
    ApiClient, ApiConfig, ApiError, DEFAULT_API_URL, ReqwestTransport, VideoFile,
};
use veracity_status::{PollerConfig, PollerHandle, StatusSnapshot};
use veracity_ui::{
    ModelDetails, ResultTab, ResultView, availability_badge, engine_status_line, model_details,
    progress_caption, status_banner,
};
use veracity_upload::{UploadState, UploadWorkflow};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("VERACITY_VERSION");

/// Env var holding the backend base URL.
pub const API_URL_ENV: &str = "VERACITY_API_URL";

/// Env var overriding the short poll interval, in seconds.
pub const POLL_INTERVAL_ENV: &str = "VERACITY_POLL_INTERVAL_SECS";

/// Env var overriding the back-off poll interval, in seconds.
pub const POLL_BACKOFF_ENV: &str = "VERACITY_POLL_BACKOFF_SECS";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// API client settings.
    pub api: ApiConfig,
    /// Status poller settings.
    pub poller: PollerConfig,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for an invalid base URL or a non-positive
    /// interval.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = read(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api = ApiConfig::new(&base_url)
            .map_err(|error| AppError::Config(format!("{API_URL_ENV}: {error}")))?;

        let mut poller = PollerConfig::default();
        if let Some(raw) = read(POLL_INTERVAL_ENV) {
            poller.short_interval = parse_interval(POLL_INTERVAL_ENV, &raw)?;
        }
        if let Some(raw) = read(POLL_BACKOFF_ENV) {
            poller.long_interval = parse_interval(POLL_BACKOFF_ENV, &raw)?;
        }

        Ok(Self { api, poller })
    }
}

fn parse_interval(key: &str, raw: &str) -> Result<Duration, AppError> {
    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(AppError::Config(format!(
            "{key} must be a positive number of seconds, got {raw:?}"
        ))),
    }
}

/// Installs the tracing subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`. Logs go to stderr so
/// stdout carries only rendered output. Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Builds an API client over the production transport.
///
/// # Errors
/// Returns [`AppError::Api`] when the HTTP stack cannot be initialized.
pub fn build_client(config: &AppConfig) -> Result<ApiClient, AppError> {
    let transport = ReqwestTransport::new()?;
    Ok(ApiClient::new(config.api.clone(), Arc::new(transport)))
}

/// Guesses a MIME type from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mpeg" | "mpg") => "video/mpeg",
        Some("ogv") => "video/ogg",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Reads a file from disk into a [`VideoFile`].
///
/// The MIME type is not validated here; the workflow does that.
///
/// # Errors
/// Returns [`AppError::Io`] when the file cannot be read.
pub fn load_video(path: &Path) -> Result<VideoFile, AppError> {
    let bytes = std::fs::read(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(VideoFile::new(name, mime_for_path(path), bytes))
}

/// Flat page status for simple rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStatus {
    /// Availability badge text.
    pub badge: &'static str,
    /// Connection banner, once known.
    pub banner: Option<&'static str>,
    /// Engine status line.
    pub engine: &'static str,
    /// Last known model metadata.
    pub model: Option<ModelDetails>,
    /// Upload state name.
    pub upload: String,
    /// Displayed progress percentage.
    pub progress: u8,
    /// Progress caption while uploading.
    pub progress_caption: Option<&'static str>,
    /// Error or simulation banner.
    pub error: Option<String>,
}

/// Projects poller and workflow state into a [`PageStatus`].
pub fn project_page_status(snapshot: &StatusSnapshot, workflow: &UploadWorkflow) -> PageStatus {
    let model = snapshot.model_status.as_ref();
    let progress = workflow.progress();
    PageStatus {
        badge: availability_badge(snapshot.availability, model).label(),
        banner: status_banner(snapshot.availability),
        engine: engine_status_line(snapshot.availability, model),
        model: model.map(model_details),
        upload: format!("{:?}", workflow.state()),
        progress,
        progress_caption: (workflow.state() == UploadState::Uploading)
            .then(|| progress_caption(progress)),
        error: workflow.error().map(str::to_string),
    }
}

/// Renders the status header.
pub fn render_status(page: &PageStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", page.badge, page.engine);
    if let Some(banner) = page.banner {
        let _ = writeln!(out, "{banner}");
    }
    if let Some(details) = &page.model {
        let _ = writeln!(
            out,
            "Model {} | accuracy {} | trained {}",
            details.version,
            details.accuracy.as_deref().unwrap_or("N/A"),
            details.trained
        );
    }
    out
}

/// Asks the poller for an immediate re-check and waits for it to settle.
///
/// Returns the latest snapshot, settled or not, once `wait` elapses.
pub async fn recheck(poller: &PollerHandle, wait: Duration) -> StatusSnapshot {
    let mut updates = poller.subscribe();
    drop(updates.borrow_and_update());
    if !poller.refresh() {
        tracing::warn!("re-check request dropped");
        return poller.snapshot();
    }

    let settled = tokio::time::timeout(wait, async {
        while updates.changed().await.is_ok() {
            if !updates.borrow_and_update().checking {
                break;
            }
        }
    })
    .await;
    if settled.is_err() {
        tracing::warn!(wait_secs = wait.as_secs(), "re-check did not settle in time");
    }
    poller.snapshot()
}

/// Turns progress updates into caption lines.
///
/// A line is produced when the caption changes, and once on reaching 100.
#[derive(Debug, Clone, Default)]
pub struct ProgressCaptions {
    last: Option<&'static str>,
    completed: bool,
}

impl ProgressCaptions {
    /// Returns the line to print for `progress`, if any.
    pub fn observe(&mut self, progress: u8) -> Option<String> {
        let caption = progress_caption(progress);
        let completes = progress >= 100 && !self.completed;
        if !completes && self.last == Some(caption) {
            return None;
        }
        self.completed |= completes;
        self.last = Some(caption);
        Some(format!("[{progress:>3}%] {caption}"))
    }
}

/// Renders the active tab of a verdict.
pub fn render_tab(view: &ResultView) -> String {
    let mut out = String::new();
    let tab = view.active_tab();
    let _ = writeln!(out, "== {} ==", tab.title());
    match tab {
        ResultTab::Summary => {
            let _ = writeln!(
                out,
                "{} ({} confidence)\n{}",
                view.verdict_label(),
                view.confidence_text(),
                view.verdict_sentence()
            );
            if let Some(disclaimer) = view.demo_disclaimer() {
                let _ = writeln!(out, "{disclaimer}");
            }
        }
        ResultTab::Features => {
            for row in view.feature_rows() {
                let _ = writeln!(out, "{:<20} {:>5.1}%", row.label, row.score);
            }
        }
        ResultTab::Explanation => {
            for row in view.feature_rows() {
                let _ = writeln!(out, "{}: {}", row.label, row.description);
            }
        }
    }
    out
}

/// Renders every tab of a verdict as terminal text.
///
/// `banner` carries the simulation notice when the result was synthesized.
pub fn render_result(view: &ResultView, banner: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(banner) = banner {
        let _ = writeln!(out, "! {banner}");
    }

    let mut pages = view.clone();
    for tab in ResultTab::ALL {
        pages.select_tab(tab);
        out.push_str(&render_tab(&pages));
    }
    out
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid environment configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// API client setup error.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    /// File could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The workflow rejected the input.
    #[error("{0}")]
    Rejected(String),
}
