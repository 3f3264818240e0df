#![warn(missing_docs)]
//! # veracity-upload
//!
//! ## Purpose
//! Drives one video from selection to verdict.
//!
//! ## Responsibilities
//! - Validate the selected file's MIME type before any network activity.
//! - Show a simulated progress percentage while the upload is in flight.
//! - Store the backend verdict, or synthesize one when the backend is
//!   unreachable.
//! - Emit toast-style [`Notice`]s for every user-visible transition.
//!
//! ## Data flow
//! [`UploadWorkflow::select_file`] -> [`UploadWorkflow::submit`] ->
//! `ApiClient::upload_video` -> `Done` with a [`DetectionResult`] or `Error`
//! with a message.
//!
//! ## Ownership and lifetimes
//! The progress ticker lives on the stack of [`UploadWorkflow::submit`] and is
//! dropped on every exit path, so no tick can be observed after the request
//! settles. Progress is published on a `watch` channel for concurrent readers.
//!
//! ## Error model
//! Nothing escapes [`UploadWorkflow::submit`]: connectivity failures become a
//! simulated result with a warning banner, everything else becomes an
//! `Error` state with a message.

use std::ops::Range;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use veracity_client::{ApiClient, ApiError, FailureClass, VideoFile, classify_api_error};
use veracity_contract::{DetectionResult, FeatureScores, Prediction};

/// Error shown when a non-video file is selected.
pub const INVALID_FILE_MESSAGE: &str = "Please upload a video file";

/// Error shown when submitting without a file.
pub const NO_FILE_MESSAGE: &str = "Please select a file first";

/// Banner shown when the result was synthesized locally.
pub const SIMULATION_MESSAGE: &str = "Could not connect to analysis server, using simulation mode";

/// Range simulated confidence values are drawn from.
pub const FALLBACK_CONFIDENCE: Range<f64> = 70.0..95.0;

/// Range simulated feature scores are drawn from.
pub const FALLBACK_FEATURE: Range<f64> = 60.0..90.0;

/// Workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Nothing selected.
    Idle,
    /// A valid video is selected and ready to submit.
    FileSelected,
    /// Upload in flight.
    Uploading,
    /// A result is available.
    Done,
    /// Validation or server failure; see [`UploadWorkflow::error`].
    Error,
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Neutral information.
    Info,
    /// Completed action.
    Success,
    /// Degraded but usable outcome.
    Warning,
    /// Failed action.
    Error,
}

/// Toast-style notification for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Message text.
    pub message: String,
}

/// Simulated progress cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressConfig {
    /// Percentage added per tick.
    pub step: u8,
    /// Time between ticks.
    pub cadence: Duration,
    /// Highest value the simulation may reach before completion.
    pub ceiling: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            step: 5,
            cadence: Duration::from_millis(200),
            ceiling: 95,
        }
    }
}

/// Source of results used when the backend cannot be reached.
pub trait FallbackGenerator: Send {
    /// Produces one simulated result.
    fn generate(&mut self) -> DetectionResult;
}

/// Random fallback results: coin-flip verdict, confidence in
/// [`FALLBACK_CONFIDENCE`], features in [`FALLBACK_FEATURE`].
#[derive(Debug, Clone)]
pub struct RandomFallback {
    rng: StdRng,
}

impl RandomFallback {
    /// Seeds from operating system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeds deterministically.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomFallback {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackGenerator for RandomFallback {
    fn generate(&mut self) -> DetectionResult {
        let prediction = if self.rng.random_bool(0.5) {
            Prediction::Truth
        } else {
            Prediction::Fake
        };

        DetectionResult {
            prediction,
            confidence: self.rng.random_range(FALLBACK_CONFIDENCE),
            features: FeatureScores {
                facial_expressions: self.rng.random_range(FALLBACK_FEATURE),
                voice_analysis: self.rng.random_range(FALLBACK_FEATURE),
                micro_gestures: self.rng.random_range(FALLBACK_FEATURE),
            },
            is_dummy_model: None,
        }
    }
}

/// Always returns the same result.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedFallback(pub DetectionResult);

impl FallbackGenerator for FixedFallback {
    fn generate(&mut self) -> DetectionResult {
        self.0.clone()
    }
}

/// Upload state machine for one session.
pub struct UploadWorkflow {
    client: ApiClient,
    fallback: Box<dyn FallbackGenerator>,
    progress_config: ProgressConfig,
    state: UploadState,
    file: Option<VideoFile>,
    result: Option<DetectionResult>,
    error: Option<String>,
    dragging: bool,
    progress: watch::Sender<u8>,
    notices: Vec<Notice>,
}

impl UploadWorkflow {
    /// Creates an idle workflow with random fallback results.
    pub fn new(client: ApiClient) -> Self {
        Self::with_fallback(client, Box::new(RandomFallback::new()))
    }

    /// Creates an idle workflow with a custom fallback generator.
    pub fn with_fallback(client: ApiClient, fallback: Box<dyn FallbackGenerator>) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            client,
            fallback,
            progress_config: ProgressConfig::default(),
            state: UploadState::Idle,
            file: None,
            result: None,
            error: None,
            dragging: false,
            progress,
            notices: Vec::new(),
        }
    }

    /// Overrides the simulated progress cadence.
    pub fn with_progress_config(mut self, config: ProgressConfig) -> Self {
        self.progress_config = config;
        self
    }

    /// Current state.
    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Selected file.
    pub fn file(&self) -> Option<&VideoFile> {
        self.file.as_ref()
    }

    /// Verdict, present only in `Done`.
    pub fn result(&self) -> Option<&DetectionResult> {
        self.result.as_ref()
    }

    /// Error or simulation banner text.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Displayed progress percentage.
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    /// Returns a receiver notified on every progress change.
    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    /// Whether a drag is hovering the drop zone.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Returns `true` when the result was synthesized locally.
    pub fn is_simulated(&self) -> bool {
        self.state == UploadState::Done && self.error.is_some()
    }

    /// Drains pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Marks the drop zone as hovered.
    pub fn drag_enter(&mut self) {
        self.dragging = true;
    }

    /// Clears the hover mark.
    pub fn drag_leave(&mut self) {
        self.dragging = false;
    }

    /// Handles a file picked from the file dialog.
    pub fn select_file(&mut self, file: VideoFile) {
        self.accept_file(file, "Video selected successfully");
    }

    /// Handles a file dropped on the drop zone.
    pub fn drop_file(&mut self, file: VideoFile) {
        self.dragging = false;
        self.accept_file(file, "Video uploaded successfully");
    }

    fn accept_file(&mut self, file: VideoFile, success: &str) {
        self.result = None;
        self.progress.send_replace(0);

        if !file.is_video() {
            tracing::info!(file = %file.name, mime = %file.mime_type, "rejected non-video file");
            self.file = None;
            self.fail(INVALID_FILE_MESSAGE.to_string());
            return;
        }

        tracing::debug!(file = %file.name, bytes = file.size_bytes(), "video selected");
        self.file = Some(file);
        self.error = None;
        self.state = UploadState::FileSelected;
        self.notify(NoticeLevel::Success, success);
    }

    /// Uploads the selected file and settles into `Done` or `Error`.
    ///
    /// Does nothing when a result is already shown; call
    /// [`reset`](Self::reset) first.
    pub async fn submit(&mut self) -> UploadState {
        if self.state == UploadState::Done {
            tracing::debug!("submit ignored; result already shown");
            return self.state;
        }

        let Some(file) = self.file.clone() else {
            self.fail(NO_FILE_MESSAGE.to_string());
            return self.state;
        };

        self.state = UploadState::Uploading;
        self.error = None;
        self.progress.send_replace(0);
        self.notify(NoticeLevel::Info, "Analyzing video...");

        let outcome = self.upload_with_progress(&file).await;
        self.progress.send_replace(100);

        match outcome {
            Ok(result) => {
                tracing::info!(
                    prediction = result.prediction.as_str(),
                    confidence = result.confidence,
                    "analysis completed"
                );
                self.finish(result, None);
                self.notify(NoticeLevel::Success, "Analysis completed!");
            }
            Err(error) => self.recover(error),
        }

        self.state
    }

    async fn upload_with_progress(&self, file: &VideoFile) -> Result<DetectionResult, ApiError> {
        let config = self.progress_config;
        let mut ticker = tokio::time::interval_at(Instant::now() + config.cadence, config.cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let upload = self.client.upload_video(file);
        tokio::pin!(upload);

        loop {
            tokio::select! {
                outcome = &mut upload => return outcome,
                _ = ticker.tick() => {
                    self.progress.send_modify(|value| {
                        *value = value.saturating_add(config.step).min(config.ceiling);
                    });
                }
            }
        }
    }

    fn recover(&mut self, error: ApiError) {
        match classify_api_error(&error) {
            FailureClass::Connectivity => {
                tracing::warn!(%error, "analysis server unreachable; using simulation mode");
                let simulated = self.fallback.generate();
                self.finish(simulated, Some(SIMULATION_MESSAGE.to_string()));
                self.notify(
                    NoticeLevel::Warning,
                    "Using simulation mode due to server connection issue",
                );
            }
            FailureClass::ServerReported => {
                tracing::warn!(%error, "analysis rejected by server");
                self.fail(error.to_string());
            }
            FailureClass::Unexpected => {
                tracing::error!(%error, "analysis failed");
                self.fail(format!("An error occurred: {error}"));
            }
        }
    }

    fn finish(&mut self, result: DetectionResult, banner: Option<String>) {
        self.result = Some(result);
        self.error = banner;
        self.state = UploadState::Done;
    }

    fn fail(&mut self, message: String) {
        self.notify(NoticeLevel::Error, &message);
        self.result = None;
        self.error = Some(message);
        self.state = UploadState::Error;
    }

    /// Clears file, result, error and progress and returns to `Idle`.
    pub fn reset(&mut self) {
        self.file = None;
        self.result = None;
        self.error = None;
        self.dragging = false;
        self.progress.send_replace(0);
        self.state = UploadState::Idle;
        self.notify(
            NoticeLevel::Info,
            "Form reset. Upload a new video to analyze.",
        );
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.notices.push(Notice {
            level,
            message: message.to_string(),
        });
    }
}
