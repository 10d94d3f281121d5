//! Service scheduler.
//!
//! Runs a [`Cycle`] once immediately and then once per interval until
//! shutdown. At most one cycle runs at a time: the running flag is a
//! single-permit semaphore acquired without waiting, so a tick that lands
//! while a cycle is still running is skipped and counted.
//!
//! ```text
//!   tick ──► try_acquire ──► Ok  ──► spawn cycle (holds permit) ──► Idle
//!                       └──► Err ──► skipped_ticks += 1
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::pipeline::cycle::{Cycle, CycleSummary};

/// Shortest accepted interval between ticks.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Whether a cycle is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// What a tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// A cycle was spawned; the handle resolves when it finishes
    Started(JoinHandle<()>),
    /// A cycle was already running
    Skipped,
}

/// Repeats a cycle on a fixed interval.
pub struct Scheduler {
    cycle: Arc<dyn Cycle>,
    interval: Duration,
    running: Arc<Semaphore>,
    skipped_ticks: AtomicU64,
}

impl Scheduler {
    /// Create a scheduler. Intervals below one second are raised to one
    /// second.
    pub fn new(cycle: Arc<dyn Cycle>, interval: Duration) -> Self {
        Self {
            cycle,
            interval: interval.max(MIN_INTERVAL),
            running: Arc::new(Semaphore::new(1)),
            skipped_ticks: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.available_permits() == 0 {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Ticks skipped because a cycle was still running.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Relaxed)
    }

    /// Start a cycle in the background unless one is already running.
    pub fn try_start(&self) -> TickOutcome {
        let permit = match Arc::clone(&self.running).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                let skipped = self.skipped_ticks.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    cycle = self.cycle.name(),
                    skipped_ticks = skipped,
                    "Previous cycle still running, skipping tick"
                );
                return TickOutcome::Skipped;
            }
        };

        let cycle = Arc::clone(&self.cycle);
        TickOutcome::Started(tokio::spawn(async move {
            let _permit = permit;
            // failures are logged inside; the scheduler only returns to idle
            let _ = run_logged(cycle.as_ref()).await;
        }))
    }

    /// Tick until `shutdown` is cancelled, then wait for a running cycle to
    /// finish.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            cycle = self.cycle.name(),
            interval_secs = self.interval.as_secs(),
            "scheduler starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.try_start();
                }
            }
        }

        if self.state() == SchedulerState::Running {
            info!(cycle = self.cycle.name(), "waiting for running cycle to complete");
        }
        let _ = self.running.acquire().await;

        info!(
            cycle = self.cycle.name(),
            skipped_ticks = self.skipped_ticks(),
            "scheduler stopped"
        );
    }

    /// Run a single cycle in the foreground and return its result.
    pub async fn run_once(&self) -> Result<CycleSummary> {
        let _permit = self.running.acquire().await;
        run_logged(self.cycle.as_ref()).await
    }
}

async fn run_logged(cycle: &dyn Cycle) -> Result<CycleSummary> {
    info!(cycle = cycle.name(), "cycle starting");

    match cycle.run().await {
        Ok(summary) => {
            let elapsed = summary.finished_at - summary.started_at;
            info!(
                cycle = summary.cycle,
                names = summary.names,
                entries = summary.entries,
                resolution_errors = summary.resolution_errors,
                profiles = summary.index.as_ref().map(|r| r.profiles_written),
                elapsed_secs = elapsed.num_seconds(),
                "cycle finished"
            );
            Ok(summary)
        }
        Err(e) => {
            error!(
                cycle = cycle.name(),
                error = %e,
                threatens_current = e.threatens_current(),
                "cycle failed"
            );
            Err(e)
        }
    }
}
