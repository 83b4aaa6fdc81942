//! Timers and Shutdown
//!
//! Interruptible waits for the orchestrator. Every timed phase of the state
//! machine (play window, energy wait, cooldown, backoff) runs through a
//! [`Countdown`] so a shutdown request can preempt it at the next tick
//! boundary instead of blocking until the timer expires.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;

// ============================================================================
// Shutdown signal
// ============================================================================

/// Create a linked shutdown handle/signal pair
///
/// The handle side triggers shutdown; signal clones are handed to everything
/// that needs to observe it.
#[must_use]
pub fn shutdown_pair() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

/// Trigger side of the shutdown latch
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Request shutdown; all signal clones observe it
    pub fn trigger(&self) {
        debug!("Shutdown triggered");
        let _ = self.tx.send(true);
    }
}

/// Observer side of the shutdown latch
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has been requested
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested
    ///
    /// A dropped [`ShutdownHandle`] counts as triggered, so a detached
    /// orchestrator cannot wait forever.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

// ============================================================================
// Countdown
// ============================================================================

/// What a countdown tick observed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownEvent {
    /// An interval boundary passed; `elapsed` is time since start
    Tick {
        /// Time elapsed since the countdown started
        elapsed: Duration,
    },
    /// The full duration has elapsed
    Elapsed,
    /// Shutdown was requested before the duration elapsed
    Cancelled,
}

/// Outcome of an uninterrupted wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration elapsed
    Elapsed,
    /// Shutdown was requested first
    Cancelled,
}

/// A bounded, tick-granular, shutdown-aware timer
#[derive(Clone, Copy, Debug)]
pub struct Countdown {
    interval: Duration,
    max: Duration,
}

impl Countdown {
    /// Create a countdown of `max` total duration ticking every `interval`
    #[must_use]
    pub fn new(interval: Duration, max: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            max,
        }
    }

    /// Create a countdown with a single tick at the end
    #[must_use]
    pub fn fixed(duration: Duration) -> Self {
        Self::new(duration, duration)
    }

    /// Begin the countdown
    #[must_use]
    pub fn start(&self) -> CountdownRun {
        CountdownRun {
            countdown: *self,
            elapsed: Duration::ZERO,
        }
    }

    /// Wait out the whole duration, without per-tick callbacks
    pub async fn sleep(&self, shutdown: &mut ShutdownSignal) -> WaitOutcome {
        let mut run = self.start();
        loop {
            match run.tick(shutdown).await {
                CountdownEvent::Tick { .. } => {}
                CountdownEvent::Elapsed => return WaitOutcome::Elapsed,
                CountdownEvent::Cancelled => return WaitOutcome::Cancelled,
            }
        }
    }
}

/// An in-progress countdown, advanced one tick at a time by the caller
#[derive(Debug)]
pub struct CountdownRun {
    countdown: Countdown,
    elapsed: Duration,
}

impl CountdownRun {
    /// Time elapsed since the countdown started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Advance to the next tick boundary, the end, or cancellation
    pub async fn tick(&mut self, shutdown: &mut ShutdownSignal) -> CountdownEvent {
        if shutdown.is_triggered() {
            return CountdownEvent::Cancelled;
        }
        if self.elapsed >= self.countdown.max {
            return CountdownEvent::Elapsed;
        }

        let step = (self.countdown.max - self.elapsed).min(self.countdown.interval);
        tokio::select! {
            () = shutdown.triggered() => CountdownEvent::Cancelled,
            () = sleep(step) => {
                self.elapsed += step;
                if self.elapsed >= self.countdown.max {
                    CountdownEvent::Elapsed
                } else {
                    CountdownEvent::Tick { elapsed: self.elapsed }
                }
            }
        }
    }
}
