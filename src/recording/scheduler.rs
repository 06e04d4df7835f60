// src/recording/scheduler.rs
//! Periodic auto-export timer
//!
//! A single repeating task per archiver. Starting again replaces the
//! running task, so two timers never tick against the same store.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Repeating task with a cancel handle
///
/// The first tick fires one full `period` after spawning. Dropping the
/// handle cancels the task.
pub struct RepeatingTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Spawn `tick` on `runtime` every `period`
    ///
    /// `tick` returns `false` to stop the task from the inside.
    pub fn spawn<F>(runtime: &Handle, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if !tick() {
                            break;
                        }
                    }
                }
            }
            debug!("Repeating task stopped");
        });

        Self { cancel, handle }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Owns at most one running [`RepeatingTask`]
#[derive(Default)]
pub struct AutoExportScheduler {
    task: Option<RepeatingTask>,
}

impl AutoExportScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking, cancelling any previous timer first
    pub fn start<F>(&mut self, runtime: &Handle, period: Duration, tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.stop();
        debug!("Starting auto-export every {:?}", period);
        self.task = Some(RepeatingTask::spawn(runtime, period, tick));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}
