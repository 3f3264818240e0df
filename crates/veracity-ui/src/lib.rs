#![warn(missing_docs)]
//! # veracity-ui
//!
//! ## Purpose
//! Display models for the upload page: availability badge, status banner,
//! progress captions, the result viewer and the static explainer.
//!
//! ## Responsibilities
//! - Map poller availability and model status into badge and banner text.
//! - Caption the simulated progress bar by phase.
//! - Present a finished verdict with tab selection and reset action.
//!
//! ## Data flow
//! `StatusSnapshot` / `DetectionResult` -> view models -> rendered by the app
//! shell.
//!
//! ## Error model
//! Nothing here fails. Missing data renders as placeholders such as `N/A`.

use veracity_contract::{DetectionResult, ModelStatus};
use veracity_status::Availability;

/// Availability badge shown next to the upload zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityBadge {
    /// First probe still pending.
    Checking,
    /// Server reachable, model status not fetched yet.
    Loading,
    /// Server unreachable.
    ApiOffline,
    /// Server runs its demo model.
    DemoMode,
    /// Server reachable with a real model.
    ApiOnline,
}

impl AvailabilityBadge {
    /// Badge text.
    pub fn label(self) -> &'static str {
        match self {
            AvailabilityBadge::Checking => "Checking",
            AvailabilityBadge::Loading => "Loading",
            AvailabilityBadge::ApiOffline => "API Offline",
            AvailabilityBadge::DemoMode => "Demo Mode",
            AvailabilityBadge::ApiOnline => "API Online",
        }
    }
}

/// Picks the badge for the current availability and model status.
pub fn availability_badge(
    availability: Availability,
    model_status: Option<&ModelStatus>,
) -> AvailabilityBadge {
    match (availability, model_status) {
        (Availability::Unknown, _) => AvailabilityBadge::Checking,
        (Availability::Unavailable, _) => AvailabilityBadge::ApiOffline,
        (Availability::Available, None) => AvailabilityBadge::Loading,
        (Availability::Available, Some(status)) if status.is_dummy_model() => {
            AvailabilityBadge::DemoMode
        }
        (Availability::Available, Some(_)) => AvailabilityBadge::ApiOnline,
    }
}

/// Connection banner; `None` until the first probe completes.
pub fn status_banner(availability: Availability) -> Option<&'static str> {
    match availability {
        Availability::Unknown => None,
        Availability::Available => Some("Analysis server connected"),
        Availability::Unavailable => {
            Some("Analysis server not detected - using simulation mode")
        }
    }
}

/// One-line engine status under the page header.
pub fn engine_status_line(
    availability: Availability,
    model_status: Option<&ModelStatus>,
) -> &'static str {
    match model_status {
        None if availability == Availability::Unavailable => "Offline - Results will be simulated",
        Some(status) if status.is_dummy_model() => "Running in demonstration mode",
        Some(_) => "Online and ready for analysis",
        None => "Connecting to analysis service...",
    }
}

/// Model metadata formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDetails {
    /// Version label or `N/A`.
    pub version: String,
    /// Accuracy with one decimal, when reported.
    pub accuracy: Option<String>,
    /// Training date or `Unknown`.
    pub trained: String,
}

/// Formats model metadata.
pub fn model_details(status: &ModelStatus) -> ModelDetails {
    ModelDetails {
        version: status
            .version
            .clone()
            .filter(|version| !version.is_empty())
            .unwrap_or_else(|| "N/A".to_string()),
        accuracy: status.accuracy.map(|accuracy| format!("{accuracy:.1}%")),
        trained: status
            .trained_on()
            .map(|date| date.to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
    }
}

/// Caption for the simulated progress bar.
pub fn progress_caption(progress: u8) -> &'static str {
    match progress {
        0..=29 => "Uploading video...",
        30..=59 => "Extracting features...",
        60..=89 => "Running AI analysis...",
        _ => "Finalizing results...",
    }
}

/// Result viewer tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTab {
    /// Verdict and confidence.
    #[default]
    Summary,
    /// Per-cue scores.
    Features,
    /// What each cue means.
    Explanation,
}

impl ResultTab {
    /// Every tab in display order.
    pub const ALL: [ResultTab; 3] = [
        ResultTab::Summary,
        ResultTab::Features,
        ResultTab::Explanation,
    ];

    /// Tab title.
    pub fn title(self) -> &'static str {
        match self {
            ResultTab::Summary => "Summary",
            ResultTab::Features => "Features",
            ResultTab::Explanation => "Explanation",
        }
    }
}

/// One row of the features tab.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Cue name.
    pub label: &'static str,
    /// Score in `[0, 100]`.
    pub score: f64,
    /// Short description of the cue.
    pub description: &'static str,
}

/// Read-only view over a finished result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    result: DetectionResult,
    active_tab: ResultTab,
}

impl ResultView {
    /// Opens the view on the summary tab.
    pub fn new(result: DetectionResult) -> Self {
        Self {
            result,
            active_tab: ResultTab::Summary,
        }
    }

    /// Underlying result.
    pub fn result(&self) -> &DetectionResult {
        &self.result
    }

    /// Active tab.
    pub fn active_tab(&self) -> ResultTab {
        self.active_tab
    }

    /// Switches tab.
    pub fn select_tab(&mut self, tab: ResultTab) {
        self.active_tab = tab;
    }

    /// Drives truth (green) versus fake (red) styling.
    pub fn is_truth(&self) -> bool {
        self.result.prediction.is_truth()
    }

    /// Verdict headline.
    pub fn verdict_label(&self) -> &'static str {
        if self.is_truth() { "TRUTH" } else { "FAKE" }
    }

    /// Verdict sentence for the summary tab.
    pub fn verdict_sentence(&self) -> &'static str {
        if self.is_truth() {
            "Our analysis indicates that the subject is likely telling the truth."
        } else {
            "Our analysis indicates that the subject is likely being deceptive."
        }
    }

    /// Confidence with one decimal.
    pub fn confidence_text(&self) -> String {
        format!("{:.1}%", self.result.confidence)
    }

    /// Disclaimer shown for demo-model output.
    pub fn demo_disclaimer(&self) -> Option<&'static str> {
        self.result.is_dummy_model().then_some(
            "Demo mode: this result was produced by a demonstration model and is not a real analysis.",
        )
    }

    /// Rows for the features tab.
    pub fn feature_rows(&self) -> [FeatureRow; 3] {
        let features = &self.result.features;
        [
            FeatureRow {
                label: "Facial Expressions",
                score: features.facial_expressions,
                description: "Micro-expressions and facial muscle movements associated with lying.",
            },
            FeatureRow {
                label: "Voice Analysis",
                score: features.voice_analysis,
                description: "Pitch, tremor and pacing changes in the speaker's voice.",
            },
            FeatureRow {
                label: "Micro Gestures",
                score: features.micro_gestures,
                description: "Subtle body movements that are hard to control or detect.",
            },
        ]
    }

    /// Hands control back to the caller's reset action.
    pub fn request_reset<F: FnOnce()>(&self, on_reset: F) {
        on_reset();
    }
}

/// One step of the informational explainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplainerStep {
    /// 1-based position.
    pub number: u8,
    /// Step title.
    pub title: &'static str,
    /// Step body.
    pub description: &'static str,
}

/// Static four-step explainer.
pub const EXPLAINER_STEPS: [ExplainerStep; 4] = [
    ExplainerStep {
        number: 1,
        title: "Upload Video",
        description: "Upload your video through our secure interface. We accept most common video formats.",
    },
    ExplainerStep {
        number: 2,
        title: "Preprocessing",
        description: "We extract frames, detect faces, and analyze audio to prepare for AI processing.",
    },
    ExplainerStep {
        number: 3,
        title: "AI Analysis",
        description: "Our deep learning models analyze multiple behavioral cues to detect deception.",
    },
    ExplainerStep {
        number: 4,
        title: "Results",
        description: "Get detailed analysis with confidence scores and explanations for each detected behavior.",
    },
];
