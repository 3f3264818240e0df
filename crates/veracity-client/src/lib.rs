#![warn(missing_docs)]
//! # veracity-client
//!
//! ## Purpose
//! HTTP client for the deception-detection API: liveness probe, model status
//! and video upload.
//!
//! ## Responsibilities
//! - Validate the configured base URL.
//! - Execute requests through an injectable async transport abstraction.
//! - Bound every request with a timeout.
//! - Classify failures into connectivity, server-reported and unexpected.
//!
//! ## Data flow
//! Caller -> [`ApiClient`] -> [`ApiTransport`] (reqwest in production) ->
//! [`HttpResponse`] -> `veracity-contract` parsing -> typed result.
//!
//! ## Ownership and lifetimes
//! The client is cheap to clone: configuration is owned and the transport is
//! shared behind an `Arc`, so the status poller and the upload workflow can
//! each hold their own copy.
//!
//! ## Error model
//! [`ApiClient::check_availability`] never fails; it folds every problem into
//! `false`. The other calls return [`ApiError`], which
//! [`classify_api_error`] maps onto a [`FailureClass`].
//!
//! ## Example
//! ```rust
//! use veracity_client::{ApiConfig, DEFAULT_API_URL};
//!
//! let config = ApiConfig::new(DEFAULT_API_URL).expect("default url is valid");
//! assert_eq!(config.endpoint("/upload").unwrap().path(), "/upload");
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;
use veracity_contract::{
    ContractError, DetectionResult, ModelStatus, is_video_mime, parse_detection_result,
    parse_error_detail, parse_model_status,
};

/// Base URL used when no override is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Multipart field carrying the uploaded video.
pub const UPLOAD_FIELD: &str = "file";

/// Liveness probe path.
pub const ROOT_PATH: &str = "/";

/// Model status path.
pub const MODEL_STATUS_PATH: &str = "/model/status";

/// Video upload path.
pub const UPLOAD_PATH: &str = "/upload";

/// Upper bound for one liveness probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Upper bound for status and upload requests. Inference on long clips is slow.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Message used when a status request fails without further detail.
pub const MODEL_STATUS_FAILED_MESSAGE: &str = "Failed to get model status";

/// Message used when the server rejects an upload without a `detail` field.
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload video";

const CONNECTIVITY_MARKERS: [&str; 3] = ["fetch", "network", "connect"];

/// Client configuration resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Service root.
    pub base_url: Url,
    /// Timeout for the liveness probe.
    pub probe_timeout: Duration,
    /// Timeout for status and upload requests.
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Creates a configuration with default timeouts.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidEndpoint`] when the URL does not parse or is
    /// not `http`/`https`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            probe_timeout: PROBE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Resolves an absolute endpoint URL below the base URL.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidEndpoint`] when `path` cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut base = self.base_url.clone();
        // Keep a path prefix such as `/api` when joining.
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|error| ApiError::InvalidEndpoint(format!("cannot join {path}: {error}")))
    }
}

/// Validates a service base URL.
///
/// # Errors
/// Returns [`ApiError::InvalidEndpoint`] for unparsable URLs and schemes other
/// than `http`/`https`.
pub fn validate_base_url(raw: &str) -> Result<Url, ApiError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|error| ApiError::InvalidEndpoint(format!("invalid api url: {error}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ApiError::InvalidEndpoint(format!(
            "api url must use http or https, got {other}"
        ))),
    }
}

/// Video file selected by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    /// Original file name.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// File contents. Clones share the buffer.
    pub bytes: Bytes,
}

impl VideoFile {
    /// Creates a file descriptor.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Returns `true` when the declared MIME type is a video type.
    pub fn is_video(&self) -> bool {
        is_video_mime(&self.mime_type)
    }

    /// File size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// File size in mebibytes, for display.
    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / (1024.0 * 1024.0)
    }
}

/// Status code and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for 2xx responses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract transport used by [`ApiClient`].
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Issues a `GET` request expecting JSON, bypassing caches.
    async fn get(&self, url: &Url) -> Result<HttpResponse, ApiError>;

    /// Issues a multipart `POST` carrying `file` under `field`.
    async fn post_file(
        &self,
        url: &Url,
        field: &str,
        file: &VideoFile,
    ) -> Result<HttpResponse, ApiError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with its own connection pool.
    ///
    /// # Errors
    /// Returns [`ApiError::Unexpected`] when the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("veracity/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ApiError::Unexpected(format!("http client setup failed: {error}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, ApiError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_response(response).await
    }

    async fn post_file(
        &self,
        url: &Url,
        field: &str,
        file: &VideoFile,
    ) -> Result<HttpResponse, ApiError> {
        let length = file.bytes.len() as u64;
        let part = reqwest::multipart::Part::stream_with_length(file.bytes.clone(), length)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|error| ApiError::Unexpected(format!("invalid mime type: {error}")))?;
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let response = self
            .client
            .post(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_response(response).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<HttpResponse, ApiError> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(map_reqwest_error)?;
    Ok(HttpResponse { status, body })
}

fn map_reqwest_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else if error.is_connect() || error.is_request() || error.is_body() {
        ApiError::Network(error.to_string())
    } else {
        ApiError::Unexpected(error.to_string())
    }
}

/// Client for the three backend endpoints.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    transport: Arc<dyn ApiTransport>,
}

impl ApiClient {
    /// Creates a client over an arbitrary transport.
    pub fn new(config: ApiConfig, transport: Arc<dyn ApiTransport>) -> Self {
        Self { config, transport }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Probes the service root.
    ///
    /// Returns `true` only for a 2xx answer within the probe timeout. Network
    /// errors, timeouts and non-2xx statuses all yield `false`.
    pub async fn check_availability(&self) -> bool {
        let url = match self.config.endpoint(ROOT_PATH) {
            Ok(url) => url,
            Err(error) => {
                tracing::warn!(%error, "availability probe skipped");
                return false;
            }
        };

        match bounded(self.config.probe_timeout, self.transport.get(&url)).await {
            Ok(response) => {
                let available = response.is_success();
                tracing::debug!(status = response.status, available, "availability probe");
                available
            }
            Err(error) => {
                tracing::debug!(%error, "availability probe failed");
                false
            }
        }
    }

    /// Fetches the backend model metadata.
    ///
    /// # Errors
    /// Returns [`ApiError::Server`] with a generic message for non-2xx
    /// responses, [`ApiError::Decode`] for malformed bodies, and transport
    /// errors as-is.
    pub async fn model_status(&self) -> Result<ModelStatus, ApiError> {
        let url = self.config.endpoint(MODEL_STATUS_PATH)?;
        let response = bounded(self.config.request_timeout, self.transport.get(&url)).await?;

        if !response.is_success() {
            return Err(ApiError::Server {
                status: response.status,
                message: MODEL_STATUS_FAILED_MESSAGE.to_string(),
            });
        }

        let status = parse_model_status(&response.body)?;
        tracing::debug!(
            model_loaded = status.model_loaded,
            version = status.version.as_deref().unwrap_or("unknown"),
            "model status received"
        );
        Ok(status)
    }

    /// Uploads a video and returns the backend verdict.
    ///
    /// # Errors
    /// Returns [`ApiError::Server`] carrying the server `detail` (or
    /// [`UPLOAD_FAILED_MESSAGE`]) for non-2xx responses,
    /// [`ApiError::Decode`] for malformed bodies, and transport errors as-is.
    pub async fn upload_video(&self, file: &VideoFile) -> Result<DetectionResult, ApiError> {
        let url = self.config.endpoint(UPLOAD_PATH)?;
        tracing::info!(file = %file.name, bytes = file.size_bytes(), "uploading video");

        let response = bounded(
            self.config.request_timeout,
            self.transport.post_file(&url, UPLOAD_FIELD, file),
        )
        .await?;

        if !response.is_success() {
            let message = parse_error_detail(&response.body)
                .unwrap_or_else(|| UPLOAD_FAILED_MESSAGE.to_string());
            tracing::warn!(status = response.status, %message, "upload rejected");
            return Err(ApiError::Server {
                status: response.status,
                message,
            });
        }

        Ok(parse_detection_result(&response.body)?)
    }
}

async fn bounded<F>(limit: Duration, request: F) -> Result<HttpResponse, ApiError>
where
    F: Future<Output = Result<HttpResponse, ApiError>>,
{
    tokio::time::timeout(limit, request)
        .await
        .unwrap_or(Err(ApiError::Timeout))
}

/// Failure category used by callers to pick a recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Server unreachable; callers may fall back to simulation.
    Connectivity,
    /// Server answered with an error; surface its message.
    ServerReported,
    /// Anything else.
    Unexpected,
}

/// Classifies an API failure.
///
/// Transport failures and timeouts are connectivity problems. Server answers
/// are never connectivity problems, whatever their text says. Remaining errors
/// are classified by message, matching `fetch`, `network` or `connect`.
pub fn classify_api_error(error: &ApiError) -> FailureClass {
    match error {
        ApiError::Network(_) | ApiError::Timeout => FailureClass::Connectivity,
        ApiError::Server { .. } => FailureClass::ServerReported,
        other if mentions_connectivity(&other.to_string()) => FailureClass::Connectivity,
        _ => FailureClass::Unexpected,
    }
}

/// Returns `true` when `message` reads like a connectivity failure.
pub fn mentions_connectivity(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    CONNECTIVITY_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// API client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Base URL or endpoint violates client requirements.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Request never reached the server.
    #[error("network error: {0}")]
    Network(String),
    /// Request did not settle within its timeout.
    #[error("network request timed out")]
    Timeout,
    /// Server answered with a non-2xx status.
    #[error("{message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided or generic failure reason.
        message: String,
    },
    /// Response body violated the contract.
    #[error("invalid response: {0}")]
    Decode(#[from] ContractError),
    /// Any other failure.
    #[error("{0}")]
    Unexpected(String),
}
