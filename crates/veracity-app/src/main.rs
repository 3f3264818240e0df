#![warn(missing_docs)]
//! # veracity-app binary
//!
//! Terminal entry point for veracity.
//!
//! `veracity-app` prints the backend status and the explainer.
//! `veracity-app <video>...` additionally uploads each video in turn and
//! prints its verdict, resetting the workflow between videos.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use veracity_app::{
    AppConfig, AppError, ProgressCaptions, app_version, build_client, init_logging, load_video,
    project_page_status, recheck, render_result, render_status,
};
use veracity_status::{Availability, PollerHandle, StatusSnapshot};
use veracity_ui::{EXPLAINER_STEPS, ResultView};
use veracity_upload::{NoticeLevel, UploadState, UploadWorkflow};

const STATUS_WAIT: Duration = Duration::from_secs(5);

/// CLI entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();

    let videos: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    match run(&videos).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("veracity: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(videos: &[PathBuf]) -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let client = build_client(&config)?;
    tracing::info!(version = app_version(), api = %config.api.base_url, "starting");
    println!("veracity {} ({})", app_version(), config.api.base_url);

    let poller = PollerHandle::spawn(client.clone(), config.poller);
    let mut workflow = UploadWorkflow::new(client);

    let mut snapshot = first_snapshot(&poller).await;
    if !videos.is_empty() && snapshot.availability == Availability::Unavailable {
        tracing::info!("analysis server offline; re-checking before upload");
        snapshot = recheck(&poller, STATUS_WAIT).await;
    }
    print!("{}", render_status(&project_page_status(&snapshot, &workflow)));

    if videos.is_empty() {
        println!();
        for step in EXPLAINER_STEPS {
            println!("{}. {}: {}", step.number, step.title, step.description);
        }
        poller.shutdown().await;
        return Ok(());
    }

    let mut failed = 0usize;
    for path in videos {
        if let Err(error) = analyze(&mut workflow, &poller, path).await {
            eprintln!("veracity: {}: {error}", path.display());
            failed += 1;
        }
    }
    poller.shutdown().await;

    if failed == 0 {
        Ok(())
    } else {
        Err(AppError::Rejected(format!(
            "{failed} of {} videos could not be analyzed",
            videos.len()
        )))
    }
}

async fn first_snapshot(poller: &PollerHandle) -> StatusSnapshot {
    let mut updates = poller.subscribe();
    let settled = tokio::time::timeout(
        STATUS_WAIT,
        updates.wait_for(|snapshot| {
            snapshot.availability != Availability::Unknown && !snapshot.checking
        }),
    )
    .await;

    match settled {
        Ok(Ok(snapshot)) => snapshot.clone(),
        _ => poller.snapshot(),
    }
}

async fn analyze(
    workflow: &mut UploadWorkflow,
    poller: &PollerHandle,
    path: &Path,
) -> Result<(), AppError> {
    let file = load_video(path)?;
    println!("\n{} ({:.2} MB)", file.name, file.size_mb());

    workflow.select_file(file);
    print_notices(workflow);
    if workflow.state() != UploadState::FileSelected {
        let page = project_page_status(&poller.snapshot(), workflow);
        workflow.reset();
        workflow.take_notices();
        return Err(AppError::Rejected(
            page.error.unwrap_or_else(|| "file rejected".to_string()),
        ));
    }

    let mut progress = workflow.subscribe_progress();
    let mut captions = ProgressCaptions::default();
    let state = {
        let submit = workflow.submit();
        tokio::pin!(submit);
        loop {
            tokio::select! {
                state = &mut submit => break state,
                Ok(()) = progress.changed() => {
                    if let Some(line) = captions.observe(*progress.borrow_and_update()) {
                        println!("{line}");
                    }
                }
            }
        }
    };
    if let Some(line) = captions.observe(*progress.borrow_and_update()) {
        println!("{line}");
    }
    print_notices(workflow);

    let page = project_page_status(&poller.snapshot(), workflow);
    let result = workflow.result().cloned();
    let outcome = match (state, result) {
        (UploadState::Done, Some(result)) => {
            let view = ResultView::new(result);
            print!("\n{}", render_result(&view, page.error.as_deref()));
            view.request_reset(|| workflow.reset());
            Ok(())
        }
        _ => {
            workflow.reset();
            Err(AppError::Rejected(
                page.error.unwrap_or_else(|| "analysis failed".to_string()),
            ))
        }
    };
    workflow.take_notices();
    outcome
}

fn print_notices(workflow: &mut UploadWorkflow) {
    for notice in workflow.take_notices() {
        let marker = match notice.level {
            NoticeLevel::Info => "i",
            NoticeLevel::Success => "+",
            NoticeLevel::Warning => "!",
            NoticeLevel::Error => "x",
        };
        println!("{marker} {}", notice.message);
    }
}
