//! Status Sinks
//!
//! Presentation consumes session snapshots through [`StatusSink`]; the
//! orchestrator pushes and never waits, so a slow or absent consumer cannot
//! stall the state machine.

use tokio::sync::mpsc;
use tracing::debug;

use crate::session::SessionStats;

/// Consumer of session status snapshots
pub trait StatusSink: Send {
    /// Accept a fresh snapshot; must not block
    fn push(&self, stats: &SessionStats);
}

/// Sink that reports snapshots to the tracing log
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn push(&self, stats: &SessionStats) {
        debug!(
            energy = stats.energy,
            total_games = stats.total_games,
            total_points = stats.total_points,
            "Session status"
        );
    }
}

/// Sink that forwards snapshots over an unbounded channel
///
/// Sends are best effort: a dropped receiver is ignored so the orchestrator
/// outlives its display.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionStats>,
}

impl ChannelSink {
    /// Create a sink and the receiver end of its channel
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelSink {
    fn push(&self, stats: &SessionStats) {
        let _ = self.tx.send(stats.clone());
    }
}
