#![warn(missing_docs)]
//! # veracity-contract
//!
//! ## Purpose
//! Defines the wire schema exchanged with the deception-detection API and the
//! client-side validation helpers around it.
//!
//! ## Responsibilities
//! - Parse detection results and model status payloads.
//! - Extract server-provided failure details from error bodies.
//! - Recognize the reserved demo-model version sentinel.
//! - Decide whether a MIME type is acceptable for upload.
//!
//! ## Data flow
//! Raw JSON response -> [`parse_detection_result`] / [`parse_model_status`] ->
//! upload workflow and status poller -> UI projection.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs so they outlive the transient response
//! buffers they were decoded from.
//!
//! ## Error model
//! Invalid JSON or out-of-range percentages return [`ContractError`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Model version reported by the backend when it serves simulated predictions.
pub const DUMMY_MODEL_VERSION: &str = "dummy_model";

/// MIME prefix every uploadable file must carry.
pub const VIDEO_MIME_PREFIX: &str = "video/";

/// Binary verdict returned by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    /// Subject is likely telling the truth.
    Truth,
    /// Subject is likely being deceptive.
    Fake,
}

impl Prediction {
    /// Returns `true` for [`Prediction::Truth`].
    pub fn is_truth(self) -> bool {
        self == Prediction::Truth
    }

    /// Wire representation of the verdict.
    pub fn as_str(self) -> &'static str {
        match self {
            Prediction::Truth => "Truth",
            Prediction::Fake => "Fake",
        }
    }
}

/// Per-cue scores backing a verdict, each a percentage in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureScores {
    /// Facial expression analysis score.
    pub facial_expressions: f64,
    /// Voice stress analysis score.
    pub voice_analysis: f64,
    /// Micro-gesture analysis score.
    pub micro_gestures: f64,
}

/// Finished analysis of one video.
///
/// Produced either by the remote API or synthesized locally when the API is
/// unreachable. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Verdict.
    pub prediction: Prediction,
    /// Confidence percentage in `[0, 100]`.
    pub confidence: f64,
    /// Individual cue scores.
    pub features: FeatureScores,
    /// Set by the backend when the verdict came from its demo model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dummy_model: Option<bool>,
}

impl DetectionResult {
    /// Returns `true` when the backend flagged this result as demo output.
    pub fn is_dummy_model(&self) -> bool {
        self.is_dummy_model.unwrap_or(false)
    }
}

/// Backend model metadata served by `GET /model/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    /// Whether the backend has a model in memory.
    pub model_loaded: bool,
    /// ISO-8601 training timestamp, kept verbatim. Non-string values decode
    /// as `None`.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_trained: Option<String>,
    /// Validation accuracy percentage.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Model version label.
    #[serde(default)]
    pub version: Option<String>,
}

impl ModelStatus {
    /// Returns `true` when the backend runs its demo model.
    pub fn is_dummy_model(&self) -> bool {
        self.version.as_deref() == Some(DUMMY_MODEL_VERSION)
    }

    /// Calendar date of the last training run, if the timestamp parses.
    ///
    /// Accepts RFC 3339 timestamps, offset-less ISO-8601 date-times and plain
    /// ISO-8601 dates.
    pub fn trained_on(&self) -> Option<Date> {
        let raw = self.last_trained.as_deref()?.trim();
        if let Ok(stamp) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Some(stamp.date());
        }
        if let Ok(stamp) = PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT) {
            return Some(stamp.date());
        }
        Date::parse(raw, &Iso8601::DEFAULT).ok()
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(stamp)) => Ok(Some(stamp)),
        _ => Ok(None),
    }
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable failure reason.
    #[serde(default)]
    pub detail: Option<String>,
}

/// Parses and validates a detection result payload.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON.
/// Returns [`ContractError::OutOfRange`] when a percentage is not finite or
/// falls outside `[0, 100]`.
pub fn parse_detection_result(raw: &str) -> Result<DetectionResult, ContractError> {
    let parsed: DetectionResult = serde_json::from_str(raw)?;

    check_percentage("confidence", parsed.confidence)?;
    check_percentage("features.facialExpressions", parsed.features.facial_expressions)?;
    check_percentage("features.voiceAnalysis", parsed.features.voice_analysis)?;
    check_percentage("features.microGestures", parsed.features.micro_gestures)?;

    Ok(parsed)
}

/// Parses and validates a model status payload.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON.
/// Returns [`ContractError::OutOfRange`] when `accuracy` is present but not a
/// valid percentage.
pub fn parse_model_status(raw: &str) -> Result<ModelStatus, ContractError> {
    let parsed: ModelStatus = serde_json::from_str(raw)?;
    if let Some(accuracy) = parsed.accuracy {
        check_percentage("accuracy", accuracy)?;
    }
    Ok(parsed)
}

/// Extracts the `detail` message from an error body.
///
/// Returns `None` for undecodable bodies and blank details, so callers can
/// substitute their own generic message.
pub fn parse_error_detail(raw: &str) -> Option<String> {
    serde_json::from_str::<ErrorDetail>(raw)
        .ok()
        .and_then(|body| body.detail)
        .filter(|detail| !detail.trim().is_empty())
}

/// Returns `true` when `mime_type` names a video format.
pub fn is_video_mime(mime_type: &str) -> bool {
    mime_type
        .trim()
        .to_ascii_lowercase()
        .starts_with(VIDEO_MIME_PREFIX)
}

fn check_percentage(field: &'static str, value: f64) -> Result<(), ContractError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ContractError::OutOfRange { field, value })
    }
}

/// Contract decoding and validation errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// JSON decode failure.
    #[error("response decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// A percentage field is outside `[0, 100]`.
    #[error("{field} must be a percentage in [0, 100], got {value}")]
    OutOfRange {
        /// Offending field path.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
}
