#![warn(missing_docs)]
//! # veracity-status
//!
//! ## Purpose
//! Tracks whether the analysis backend is reachable and which model it serves.
//!
//! ## Responsibilities
//! - Model availability as an explicit state machine ([`StatusPoller`]).
//! - Skip ticks that arrive while a poll is still in flight.
//! - Switch to a long polling interval after repeated failures, and back on a
//!   manual refresh.
//! - Run the poll loop as an owned background task ([`PollerHandle`]) that is
//!   aborted when the handle goes away.
//!
//! ## Data flow
//! Timer tick / manual refresh -> [`StatusPoller::begin_poll`] -> liveness
//! probe -> optional model status fetch -> [`StatusPoller::complete_poll`] ->
//! [`StatusSnapshot`] published on a `watch` channel.
//!
//! ## Error model
//! Poll failures never escape this crate. They are only observable through
//! [`Availability::Unavailable`] and the failure counter.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use veracity_client::{ApiClient, ApiError};
use veracity_contract::ModelStatus;

/// Interval between polls while the backend answers.
pub const DEFAULT_SHORT_INTERVAL: Duration = Duration::from_secs(60);

/// Interval between polls once the backend looks offline.
pub const DEFAULT_LONG_INTERVAL: Duration = Duration::from_secs(300);

/// Consecutive failed probes before switching to the long interval.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

const COMMAND_BUFFER: usize = 8;

/// Backend reachability as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// No probe has completed yet.
    Unknown,
    /// Last probe succeeded.
    Available,
    /// Last probe failed.
    Unavailable,
}

/// Poll cadence settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Interval used while probes succeed.
    pub short_interval: Duration,
    /// Interval used after `failure_threshold` consecutive failures.
    pub long_interval: Duration,
    /// Failures needed before backing off.
    pub failure_threshold: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            short_interval: DEFAULT_SHORT_INTERVAL,
            long_interval: DEFAULT_LONG_INTERVAL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

/// Whether a poll is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Ready to start a poll.
    Idle,
    /// A poll is in flight; new ticks are ignored.
    Polling,
}

/// Raw outcome of one poll round trip.
#[derive(Debug)]
pub struct PollReport {
    /// Liveness probe result.
    pub available: bool,
    /// Model status fetch result; `None` when the probe failed.
    pub model_status: Option<Result<ModelStatus, ApiError>>,
}

/// Result of asking the poller to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A poll was already in flight.
    Skipped,
    /// The poll ran and left the poller in this availability.
    Completed(Availability),
}

/// Read-only view published to UI consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    /// Current availability.
    pub availability: Availability,
    /// Last successfully fetched model status.
    pub model_status: Option<ModelStatus>,
    /// Consecutive failed probes.
    pub consecutive_failures: u32,
    /// Whether a poll is in flight.
    pub checking: bool,
    /// Interval until the next scheduled poll.
    pub interval: Duration,
}

/// Availability state machine.
///
/// All transitions go through [`begin_poll`](Self::begin_poll),
/// [`complete_poll`](Self::complete_poll) and
/// [`manual_refresh`](Self::manual_refresh).
#[derive(Debug, Clone)]
pub struct StatusPoller {
    config: PollerConfig,
    phase: PollPhase,
    availability: Availability,
    model_status: Option<ModelStatus>,
    consecutive_failures: u32,
}

impl StatusPoller {
    /// Creates a poller in `Unknown` availability with no model status.
    pub fn new(config: PollerConfig) -> Self {
        Self {
            config,
            phase: PollPhase::Idle,
            availability: Availability::Unknown,
            model_status: None,
            consecutive_failures: 0,
        }
    }

    /// Current availability.
    pub fn availability(&self) -> Availability {
        self.availability
    }

    /// Last known model status.
    pub fn model_status(&self) -> Option<&ModelStatus> {
        self.model_status.as_ref()
    }

    /// Current poll phase.
    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Consecutive failed probes.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Transitions `Idle -> Polling`.
    ///
    /// Returns `false`, leaving state untouched, when a poll is already in
    /// flight.
    pub fn begin_poll(&mut self) -> bool {
        match self.phase {
            PollPhase::Idle => {
                self.phase = PollPhase::Polling;
                true
            }
            PollPhase::Polling => false,
        }
    }

    /// Applies a poll report and transitions `Polling -> Idle`.
    ///
    /// A failed model status fetch keeps the previous status and does not
    /// affect availability.
    pub fn complete_poll(&mut self, report: PollReport) -> Availability {
        self.phase = PollPhase::Idle;

        if !report.available {
            self.availability = Availability::Unavailable;
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            tracing::debug!(
                failures = self.consecutive_failures,
                "analysis server unavailable"
            );
            return self.availability;
        }

        self.availability = Availability::Available;
        self.consecutive_failures = 0;
        match report.model_status {
            Some(Ok(status)) => self.model_status = Some(status),
            Some(Err(error)) => {
                tracing::warn!(%error, "model status fetch failed; keeping previous status");
            }
            None => {}
        }
        self.availability
    }

    /// Resets the failure counter so the next interval is the short one.
    pub fn manual_refresh(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Interval to wait before the next scheduled poll.
    pub fn next_interval(&self) -> Duration {
        if self.consecutive_failures >= self.config.failure_threshold {
            self.config.long_interval
        } else {
            self.config.short_interval
        }
    }

    /// Returns a snapshot for publication.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            availability: self.availability,
            model_status: self.model_status.clone(),
            consecutive_failures: self.consecutive_failures,
            checking: self.phase == PollPhase::Polling,
            interval: self.next_interval(),
        }
    }

    /// Runs one complete poll against `client`.
    pub async fn poll_once(&mut self, client: &ApiClient) -> PollOutcome {
        if !self.begin_poll() {
            return PollOutcome::Skipped;
        }
        let report = probe(client.clone()).await;
        PollOutcome::Completed(self.complete_poll(report))
    }
}

/// Probes liveness and, when live, fetches model status.
pub async fn probe(client: ApiClient) -> PollReport {
    let available = client.check_availability().await;
    let model_status = if available {
        Some(client.model_status().await)
    } else {
        None
    };
    PollReport {
        available,
        model_status,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollerCommand {
    Refresh,
    Shutdown,
}

type PollFuture = Pin<Box<dyn Future<Output = PollReport> + Send>>;

enum DriverEvent {
    Tick,
    Report(PollReport),
    Command(Option<PollerCommand>),
}

/// Owner of the background poll task.
///
/// Dropping the handle aborts the task, so no timer outlives its owner.
#[derive(Debug)]
pub struct PollerHandle {
    commands: mpsc::Sender<PollerCommand>,
    snapshots: watch::Receiver<StatusSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Spawns the poll loop on the current tokio runtime.
    ///
    /// The first poll starts immediately.
    pub fn spawn(client: ApiClient, config: PollerConfig) -> Self {
        let poller = StatusPoller::new(config);
        let (snapshot_tx, snapshot_rx) = watch::channel(poller.snapshot());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(drive(poller, client, command_rx, snapshot_tx));

        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            task: Some(task),
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Returns a receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.snapshots.clone()
    }

    /// Requests an immediate re-check and restores the short interval.
    ///
    /// Returns `false` when the request could not be queued.
    pub fn refresh(&self) -> bool {
        self.commands.try_send(PollerCommand::Refresh).is_ok()
    }

    /// Stops the poll loop and waits for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(PollerCommand::Shutdown).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn ticker(period: Duration, first_tick: Instant) -> Interval {
    let mut interval = tokio::time::interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_report(in_flight: &mut Option<PollFuture>) -> PollReport {
    match in_flight {
        Some(poll) => poll.await,
        None => std::future::pending().await,
    }
}

async fn drive(
    mut poller: StatusPoller,
    client: ApiClient,
    mut commands: mpsc::Receiver<PollerCommand>,
    snapshots: watch::Sender<StatusSnapshot>,
) {
    tracing::info!("status poller started");

    let mut period = poller.next_interval();
    let mut schedule = ticker(period, Instant::now());
    let mut in_flight: Option<PollFuture> = None;

    loop {
        let event = tokio::select! {
            _ = schedule.tick() => DriverEvent::Tick,
            report = next_report(&mut in_flight) => DriverEvent::Report(report),
            command = commands.recv() => DriverEvent::Command(command),
        };

        match event {
            DriverEvent::Tick => {
                if poller.begin_poll() {
                    in_flight = Some(Box::pin(probe(client.clone())));
                } else {
                    tracing::debug!("poll still in flight; tick ignored");
                }
            }
            DriverEvent::Report(report) => {
                in_flight = None;
                let availability = poller.complete_poll(report);
                let desired = poller.next_interval();
                if desired != period {
                    tracing::info!(
                        ?availability,
                        interval_secs = desired.as_secs(),
                        "poll interval changed"
                    );
                    period = desired;
                    schedule = ticker(period, Instant::now() + period);
                }
            }
            DriverEvent::Command(Some(PollerCommand::Refresh)) => {
                poller.manual_refresh();
                period = poller.next_interval();
                schedule = ticker(period, Instant::now() + period);
                if poller.begin_poll() {
                    in_flight = Some(Box::pin(probe(client.clone())));
                } else {
                    tracing::debug!("poll still in flight; refresh ignored");
                }
            }
            DriverEvent::Command(Some(PollerCommand::Shutdown)) | DriverEvent::Command(None) => {
                break;
            }
        }

        snapshots.send_replace(poller.snapshot());
    }

    tracing::info!("status poller stopped");
}
