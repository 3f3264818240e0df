//! Integration tests for projecting poller and workflow state into page status.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedTransport, clip, client, reply};
use veracity_app::{project_page_status, render_status};
use veracity_contract::ModelStatus;
use veracity_status::{Availability, DEFAULT_SHORT_INTERVAL, StatusSnapshot};
use veracity_upload::{INVALID_FILE_MESSAGE, SIMULATION_MESSAGE, UploadWorkflow};

fn snapshot(availability: Availability, version: Option<&str>) -> StatusSnapshot {
    StatusSnapshot {
        availability,
        model_status: version.map(|version| ModelStatus {
            model_loaded: true,
            last_trained: Some("2024-03-09T14:02:11Z".to_string()),
            accuracy: Some(67.29),
            version: Some(version.to_string()),
        }),
        consecutive_failures: 0,
        checking: false,
        interval: DEFAULT_SHORT_INTERVAL,
    }
}

fn idle_workflow() -> UploadWorkflow {
    UploadWorkflow::new(client(Arc::new(ScriptedTransport::new())))
}

#[test]
fn page_status_projection_tests_before_first_probe() {
    let mut status = snapshot(Availability::Unknown, None);
    status.checking = true;

    let page = project_page_status(&status, &idle_workflow());

    assert_eq!(page.badge, "Checking");
    assert_eq!(page.banner, None);
    assert_eq!(page.engine, "Connecting to analysis service...");
    assert_eq!(page.upload, "Idle");
    assert_eq!(page.progress_caption, None);
}

#[test]
fn page_status_projection_tests_online_and_demo_models() {
    let online = project_page_status(
        &snapshot(Availability::Available, Some("cnn-lstm-v2")),
        &idle_workflow(),
    );
    assert_eq!(online.badge, "API Online");
    assert_eq!(online.banner, Some("Analysis server connected"));
    assert_eq!(online.engine, "Online and ready for analysis");

    let demo = project_page_status(
        &snapshot(Availability::Available, Some("dummy_model")),
        &idle_workflow(),
    );
    assert_eq!(demo.badge, "Demo Mode");
    assert_eq!(demo.engine, "Running in demonstration mode");
}

#[test]
fn page_status_projection_tests_offline_without_model() {
    let page = project_page_status(&snapshot(Availability::Unavailable, None), &idle_workflow());

    assert_eq!(page.badge, "API Offline");
    assert_eq!(
        page.banner,
        Some("Analysis server not detected - using simulation mode")
    );
    assert_eq!(page.engine, "Offline - Results will be simulated");
}

#[test]
fn page_status_projection_tests_surfaces_workflow_error() {
    let mut workflow = idle_workflow();
    workflow.select_file(veracity_client::VideoFile::new("a.txt", "text/plain", Vec::new()));

    let page = project_page_status(&snapshot(Availability::Available, None), &workflow);

    assert_eq!(page.badge, "Loading");
    assert_eq!(page.upload, "Error");
    assert_eq!(page.error.as_deref(), Some(INVALID_FILE_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn page_status_projection_tests_simulated_result_keeps_banner() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut workflow = UploadWorkflow::new(client(transport));
    workflow.select_file(clip());
    workflow.submit().await;

    let page = project_page_status(&snapshot(Availability::Unavailable, None), &workflow);

    assert_eq!(page.upload, "Done");
    assert_eq!(page.progress, 100);
    assert_eq!(page.progress_caption, None);
    assert_eq!(page.error.as_deref(), Some(SIMULATION_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn page_status_projection_tests_captions_progress_while_uploading() {
    let transport = Arc::new(ScriptedTransport::new().with_upload_delay(Duration::from_secs(30)));
    transport.push_upload(reply(500, ""));
    let mut workflow = UploadWorkflow::new(client(transport));
    workflow.select_file(clip());

    let abandoned = tokio::time::timeout(Duration::from_millis(500), workflow.submit()).await;
    assert!(abandoned.is_err());

    let page = project_page_status(&snapshot(Availability::Available, None), &workflow);
    assert_eq!(page.upload, "Uploading");
    assert_eq!(page.progress_caption, Some("Uploading video..."));
}

#[test]
fn page_status_projection_tests_render_status_lists_model_details() {
    let page = project_page_status(
        &snapshot(Availability::Available, Some("cnn-lstm-v2")),
        &idle_workflow(),
    );
    let details = page.model.as_ref().expect("model details projected");
    assert_eq!(details.accuracy.as_deref(), Some("67.3%"));

    let rendered = render_status(&page);

    assert!(rendered.starts_with("[API Online] Online and ready for analysis\n"));
    assert!(rendered.contains("Analysis server connected"));
    assert!(rendered.contains("Model cnn-lstm-v2 | accuracy 67.3% | trained 2024-03-09"));
}

#[test]
fn page_status_projection_tests_render_status_offline_has_no_model_line() {
    let page = project_page_status(&snapshot(Availability::Unavailable, None), &idle_workflow());

    assert_eq!(page.model, None);
    assert_eq!(
        render_status(&page),
        "[API Offline] Offline - Results will be simulated\n\
         Analysis server not detected - using simulation mode\n"
    );
}
