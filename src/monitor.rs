/// The polling loop: read stats, classify against the previous snapshot,
/// fire side effects, reschedule or stop.
///
/// An explicit loop with drift-corrected sleeps, not a self-rescheduling
/// callback. Ticks are strictly sequential; the previous snapshot is
/// owned here and touched by nothing else.
use crate::classify::{classify, Classification, DisplayFields};
use crate::config::MonitorConfig;
use crate::notify::Notify;
use crate::process::ProcessControl;
use crate::stats::{self, Snapshot};
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Delay before the first tick, giving the fuzzer time to populate the
/// stats file after campaign start.
pub const STARTUP_DELAY: Duration = Duration::from_secs(10);

/// Backoff before retrying a failed final notification.
const FINAL_NOTIFY_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Why the monitor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No new coverage for longer than the configured maximum; the
    /// fuzzer was told to stop.
    Stagnation,
    /// The stats file was never readable or vanished, which means the
    /// fuzzing job itself is gone.
    StatsUnavailable,
}

enum TickOutcome {
    Continue,
    Stop(Outcome),
}

pub struct Monitor<N, C> {
    stats_path: PathBuf,
    max_idle_secs: u64,
    check_interval: Duration,
    notifier: N,
    controller: C,
    previous: Option<Snapshot>,
}

impl<N: Notify, C: ProcessControl> Monitor<N, C> {
    pub fn new(config: &MonitorConfig, notifier: N, controller: C) -> Self {
        Self {
            stats_path: config.stats_path(),
            max_idle_secs: config.watchdog.max_time_without_finds_secs,
            check_interval: Duration::from_secs(config.watchdog.check_interval_secs),
            notifier,
            controller,
            previous: None,
        }
    }

    /// Run until stagnation is detected or the stats file goes away.
    pub async fn run(&mut self) -> Outcome {
        self.notify_best_effort("Fuzzing started").await;
        tracing::info!(
            stats = %self.stats_path.display(),
            max_time_without_finds_secs = self.max_idle_secs,
            check_interval_secs = self.check_interval.as_secs(),
            "fuzzing monitor started"
        );

        tokio::time::sleep(STARTUP_DELAY).await;

        loop {
            let tick_start = Instant::now();
            match self.tick().await {
                TickOutcome::Stop(outcome) => return outcome,
                TickOutcome::Continue => {}
            }
            // Next tick is due relative to when this one started, so a
            // slow tick does not push the whole schedule back.
            tokio::time::sleep_until(tick_start + self.check_interval).await;
        }
    }

    async fn tick(&mut self) -> TickOutcome {
        let snapshot = match stats::read_snapshot(&self.stats_path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::debug!(error = %e, "fuzzer stats file not found or unreadable");
                self.notify_best_effort("Could not find stats file, stopping fuzzing")
                    .await;
                return TickOutcome::Stop(Outcome::StatsUnavailable);
            }
        };

        let report = classify(self.previous.as_ref(), &snapshot, self.max_idle_secs);

        if let Classification::Stagnant { idle_secs } = report.classification {
            tracing::info!(
                idle_secs,
                "time since last new path exceeded limit, stopping fuzzer"
            );
            self.controller.terminate();
            let message = format!("Final Update:\n{}", counters_body(&report.display));
            self.notify_with_retry(&message).await;
            return TickOutcome::Stop(Outcome::Stagnation);
        }

        match report.classification {
            Classification::FirstObservation => {
                log_header_row();
                log_data_row(&report.display);
            }
            Classification::Changed => log_data_row(&report.display),
            Classification::Unchanged | Classification::Stagnant { .. } => {}
        }

        if report.crash_delta {
            let message = format!("Update:\n{}", counters_body(&report.display));
            self.notify_best_effort(&message).await;
        }

        self.previous = Some(snapshot);
        TickOutcome::Continue
    }

    /// Send a notification; delivery failure is logged, never fatal.
    async fn notify_best_effort(&self, text: &str) {
        if let Err(e) = self.notifier.send(text).await {
            tracing::warn!(error = %e, "failed to send notification");
        }
    }

    /// The final update gets one retry before we give up and proceed
    /// with shutdown anyway.
    async fn notify_with_retry(&self, text: &str) {
        let Err(first) = self.notifier.send(text).await else {
            return;
        };
        tracing::warn!(error = %first, "final notification failed, retrying once");
        tokio::time::sleep(FINAL_NOTIFY_RETRY_DELAY).await;
        if let Err(e) = self.notifier.send(text).await {
            tracing::warn!(error = %e, "final notification failed again, giving up");
        }
    }
}

/// Notification body shared by the periodic and final updates.
fn counters_body(d: &DisplayFields) -> String {
    format!(
        "Cycles: {}, Corpus: {}\nCrashes: {}, Hangs: {}\nExecs: {}, Edges: {}, Total: {}\n",
        d.cycles, d.corpus, d.crashes, d.hangs, d.execs, d.edges, d.total_edges
    )
}

fn log_header_row() {
    tracing::info!(
        "| {:<20} | {:<13} | {:<13} | {:<13} | {:<11} | {:<13} | {:<11} | {:<13} |",
        "Current Time",
        "Cycles Count",
        "Corpus Count",
        "Saved Crashes",
        "Saved Hangs",
        "Execs Done",
        "Edges Found",
        "Total Edges"
    );
}

fn log_data_row(d: &DisplayFields) {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    tracing::info!(
        "| {:<20} | {:<13} | {:<13} | {:<13} | {:<11} | {:<13} | {:<11} | {:<13} |",
        now,
        d.cycles,
        d.corpus,
        d.crashes,
        d.hangs,
        d.execs,
        d.edges,
        d.total_edges
    );
}
