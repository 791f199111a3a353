//! Cancellable repeating task.
//!
//! [`PeriodicTask`] owns at most one running ticker. Starting it again cancels
//! the previous ticker before the new one is spawned, so callers never end up
//! with two tick streams for the same handle. Every start bumps a generation
//! counter that is passed to the tick callback; consumers that receive ticks
//! through a queue can compare it with [`PeriodicTask::generation`] and drop
//! ticks that were already in flight when the ticker was replaced or stopped.
//!
//! ```rust
//! use core_async::periodic::PeriodicTask;
//! use core_async::sync::mpsc;
//! use core_async::time::Duration;
//!
//! # async fn example() {
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let mut poller = PeriodicTask::new("progress");
//! poller.start(Duration::from_millis(500), move |generation| tx.send(generation).is_ok());
//! let first = rx.recv().await;
//! poller.stop();
//! # let _ = first;
//! # }
//! ```

use crate::sync::CancellationToken;
use crate::task::JoinHandle;
use crate::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::trace;

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Handle to a repeating background task with idempotent start.
pub struct PeriodicTask {
    name: &'static str,
    generation: u64,
    running: Option<Running>,
}

impl PeriodicTask {
    /// Creates an idle handle. `name` only shows up in trace logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            running: None,
        }
    }

    /// Starts ticking every `period`, first tick one period from now.
    ///
    /// Any ticker started earlier through this handle is cancelled first.
    /// The callback receives the generation of the ticker that produced the
    /// tick and returns `false` to end the loop on its own.
    ///
    /// Returns the generation assigned to the new ticker.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F) -> u64
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        self.stop();

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let token = CancellationToken::new();
        let child = token.clone();
        let name = self.name;

        let handle = crate::task::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        if !on_tick(generation) {
                            break;
                        }
                    }
                }
            }

            trace!(task = name, generation, "Periodic task finished");
        });

        trace!(task = name, generation, "Periodic task started");
        self.running = Some(Running { token, handle });
        generation
    }

    /// Cancels the running ticker, if any. Safe to call repeatedly.
    ///
    /// The generation counter is bumped so that ticks already queued by the
    /// cancelled ticker no longer match [`generation`](Self::generation).
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.token.cancel();
            self.generation = self.generation.wrapping_add(1);
            trace!(task = self.name, "Periodic task cancelled");
        }
    }

    /// Cancels the ticker and waits for its task to exit.
    pub async fn shutdown(&mut self) {
        if let Some(running) = self.running.take() {
            running.token.cancel();
            self.generation = self.generation.wrapping_add(1);
            let _ = running.handle.await;
        }
    }

    /// Returns `true` while a ticker is active.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|running| !running.handle.is_finished())
            .unwrap_or(false)
    }

    /// Generation of the currently active ticker.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.token.cancel();
        }
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("generation", &self.generation)
            .field("running", &self.is_running())
            .finish()
    }
}
