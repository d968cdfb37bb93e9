//! Single elapsed-time counter attached to at most one task.
//!
//! Every [`Stopwatch::start`] opens a new run with its own counter and its own
//! [`CancellationToken`]. Starting again or stopping cancels the previous
//! run's token, so its tick task exits, and a tick that was already in flight
//! lands on the orphaned counter instead of the new one.
//!
//! Ticks come either from [`Stopwatch::tick`] or, once
//! [`Stopwatch::with_ticker`] is set up, from a tokio task that ticks once per
//! period.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopwatchState {
    Idle,
    Running { task: String, elapsed: u64 },
}

impl StopwatchState {
    pub fn is_running(&self) -> bool {
        matches!(self, StopwatchState::Running { .. })
    }
}

struct Run {
    task: String,
    elapsed: Arc<AtomicU64>,
    cancel: CancellationToken,
}

struct Ticker {
    handle: Handle,
    period: Duration,
}

#[derive(Default)]
pub struct Stopwatch {
    run: Option<Run>,
    ticker: Option<Ticker>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive runs from a tokio task on `handle` instead of manual ticks.
    pub fn with_ticker(handle: Handle, period: Duration) -> Self {
        Self {
            run: None,
            ticker: Some(Ticker { handle, period }),
        }
    }

    /// Starts timing `task` from zero, replacing whatever was running.
    pub fn start(&mut self, task: &str) {
        self.cancel_run();

        let run = Run {
            task: task.to_string(),
            elapsed: Arc::new(AtomicU64::new(0)),
            cancel: CancellationToken::new(),
        };

        if let Some(ticker) = &self.ticker {
            let elapsed = Arc::clone(&run.elapsed);
            let cancel = run.cancel.clone();
            let period = ticker.period;
            ticker.handle.spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(period) => {
                            elapsed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }

        info!(task, "stopwatch started");
        self.run = Some(run);
    }

    /// Advances a running stopwatch by one second. Does nothing while idle.
    pub fn tick(&self) -> u64 {
        match &self.run {
            Some(run) => run.elapsed.fetch_add(1, Ordering::Relaxed) + 1,
            None => 0,
        }
    }

    /// Clears the active task and resets to zero. Safe to call while idle.
    pub fn stop(&mut self) {
        if let Some(run) = self.cancel_run() {
            info!(task = %run.task, "stopwatch stopped");
        }
    }

    pub fn elapsed(&self) -> u64 {
        self.run
            .as_ref()
            .map_or(0, |run| run.elapsed.load(Ordering::Relaxed))
    }

    pub fn active_task(&self) -> Option<&str> {
        self.run.as_ref().map(|run| run.task.as_str())
    }

    pub fn state(&self) -> StopwatchState {
        match &self.run {
            Some(run) => StopwatchState::Running {
                task: run.task.clone(),
                elapsed: run.elapsed.load(Ordering::Relaxed),
            },
            None => StopwatchState::Idle,
        }
    }

    fn cancel_run(&mut self) -> Option<Run> {
        let run = self.run.take()?;
        run.cancel.cancel();
        debug!(task = %run.task, "cancelled previous stopwatch run");
        Some(run)
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        self.cancel_run();
    }
}

impl std::fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stopwatch")
            .field("state", &self.state())
            .field("ticker", &self.ticker.as_ref().map(|t| t.period))
            .finish()
    }
}
