//! Integration tests for the background status poller under paused time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MODEL_STATUS_JSON, ScriptedTransport, client, reply};
use veracity_app::recheck;
use veracity_status::{
    Availability, DEFAULT_LONG_INTERVAL, DEFAULT_SHORT_INTERVAL, PollOutcome, PollerConfig,
    PollerHandle, StatusPoller,
};

#[tokio::test(start_paused = true)]
async fn status_poller_tests_first_poll_is_immediate_and_fetches_model() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_probe(reply(200, "{}"));
    transport.push_status(reply(200, MODEL_STATUS_JSON));

    let handle = PollerHandle::spawn(client(transport.clone()), PollerConfig::default());
    let mut updates = handle.subscribe();
    let snapshot = updates
        .wait_for(|snapshot| snapshot.model_status.is_some())
        .await
        .expect("poller publishes")
        .clone();

    assert_eq!(snapshot.availability, Availability::Available);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert_eq!(snapshot.interval, DEFAULT_SHORT_INTERVAL);
    assert_eq!(transport.probe_calls(), 1);
    assert_eq!(transport.status_calls(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn status_poller_tests_offline_keeps_last_model_status() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_probe(reply(200, "{}"));
    transport.push_status(reply(200, MODEL_STATUS_JSON));

    let handle = PollerHandle::spawn(client(transport.clone()), PollerConfig::default());
    let mut updates = handle.subscribe();
    updates
        .wait_for(|snapshot| snapshot.model_status.is_some())
        .await
        .expect("poller publishes");

    let snapshot = updates
        .wait_for(|snapshot| snapshot.availability == Availability::Unavailable)
        .await
        .expect("second poll fails")
        .clone();

    assert_eq!(snapshot.consecutive_failures, 1);
    assert_eq!(
        snapshot.model_status.and_then(|status| status.version),
        Some("cnn-lstm-v2".to_string())
    );
    assert_eq!(transport.status_calls(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn status_poller_tests_backs_off_after_three_failures() {
    let transport = Arc::new(ScriptedTransport::new());
    let handle = PollerHandle::spawn(client(transport.clone()), PollerConfig::default());
    let mut updates = handle.subscribe();

    let snapshot = updates
        .wait_for(|snapshot| snapshot.consecutive_failures == 3 && !snapshot.checking)
        .await
        .expect("poller publishes")
        .clone();
    assert_eq!(snapshot.interval, DEFAULT_LONG_INTERVAL);
    assert_eq!(transport.probe_calls(), 3);

    tokio::time::sleep(DEFAULT_LONG_INTERVAL - Duration::from_secs(1)).await;
    assert_eq!(transport.probe_calls(), 3);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(transport.probe_calls(), 4);
    assert_eq!(handle.snapshot().interval, DEFAULT_LONG_INTERVAL);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn status_poller_tests_refresh_polls_now_and_restores_short_interval() {
    let transport = Arc::new(ScriptedTransport::new());
    let handle = PollerHandle::spawn(client(transport.clone()), PollerConfig::default());
    let mut updates = handle.subscribe();
    updates
        .wait_for(|snapshot| snapshot.consecutive_failures == 3 && !snapshot.checking)
        .await
        .expect("poller publishes");

    assert!(handle.refresh());
    let snapshot = updates
        .wait_for(|snapshot| snapshot.consecutive_failures == 1 && !snapshot.checking)
        .await
        .expect("refresh publishes")
        .clone();
    assert_eq!(snapshot.interval, DEFAULT_SHORT_INTERVAL);
    assert_eq!(transport.probe_calls(), 4);

    tokio::time::sleep(DEFAULT_SHORT_INTERVAL + Duration::from_secs(1)).await;
    assert_eq!(transport.probe_calls(), 5);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn status_poller_tests_ticks_during_slow_probe_are_skipped() {
    let transport = Arc::new(ScriptedTransport::new().with_probe_delay(Duration::from_secs(10)));
    let config = PollerConfig {
        short_interval: Duration::from_secs(1),
        ..PollerConfig::default()
    };
    let handle = PollerHandle::spawn(client(transport.clone()), config);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(transport.probe_calls(), 1);
    assert!(handle.snapshot().checking);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn status_poller_tests_dropping_handle_stops_polling() {
    let transport = Arc::new(ScriptedTransport::new());
    let handle = PollerHandle::spawn(client(transport.clone()), PollerConfig::default());
    let mut updates = handle.subscribe();
    updates
        .wait_for(|snapshot| snapshot.consecutive_failures == 1)
        .await
        .expect("poller publishes");

    drop(handle);
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(transport.probe_calls(), 1);
}

#[tokio::test]
async fn status_poller_tests_poll_once_tolerates_status_failure() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_probe(reply(200, "{}"));
    transport.push_status(reply(500, "boom"));
    let client = client(transport);

    let mut poller = StatusPoller::new(PollerConfig::default());
    let outcome = poller.poll_once(&client).await;

    assert_eq!(outcome, PollOutcome::Completed(Availability::Available));
    assert!(poller.model_status().is_none());
    assert_eq!(poller.consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn status_poller_tests_recheck_picks_up_recovered_server() {
    let transport = Arc::new(ScriptedTransport::new());
    let handle = PollerHandle::spawn(client(transport.clone()), PollerConfig::default());
    let mut updates = handle.subscribe();
    updates
        .wait_for(|snapshot| snapshot.availability == Availability::Unavailable)
        .await
        .expect("poller publishes");

    transport.push_probe(reply(200, "{}"));
    transport.push_status(reply(200, MODEL_STATUS_JSON));
    let snapshot = recheck(&handle, Duration::from_secs(5)).await;

    assert_eq!(snapshot.availability, Availability::Available);
    assert!(snapshot.model_status.is_some());
    assert!(!snapshot.checking);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert_eq!(transport.probe_calls(), 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn status_poller_tests_recheck_gives_up_after_wait() {
    let transport = Arc::new(ScriptedTransport::new().with_probe_delay(Duration::from_secs(10)));
    let handle = PollerHandle::spawn(client(transport.clone()), PollerConfig::default());
    let mut updates = handle.subscribe();
    updates
        .wait_for(|snapshot| snapshot.availability == Availability::Unavailable)
        .await
        .expect("first check times out");

    let snapshot = recheck(&handle, Duration::from_secs(1)).await;

    assert!(snapshot.checking);
    assert_eq!(transport.probe_calls(), 2);

    handle.shutdown().await;
}
