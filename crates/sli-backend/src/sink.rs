use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use sli_types::{LedgerRange, Sequence};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryReason {
    /// Ledger is past the source frontier.
    NotYetClosed,
    Unavailable(String),
}

/// Diagnostic events emitted by a [`LedgerBackend`](crate::LedgerBackend).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendEvent {
    Prepared { range: LedgerRange },
    Fetched { seq: Sequence, attempts: u32 },
    Retrying { seq: Option<Sequence>, attempt: u32, delay: Duration, reason: RetryReason },
    GaveUp { seq: Option<Sequence>, attempts: u32, reason: RetryReason },
    RangeExhausted { end: Sequence },
    Canceled { seq: Option<Sequence> },
    Closed,
}

/// Receiver for backend diagnostics.
///
/// Injected per backend so the engine never depends on global logger state.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: BackendEvent);
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: BackendEvent) {
        match event {
            BackendEvent::Prepared { range } => info!(%range, "backend prepared"),
            BackendEvent::Fetched { seq, attempts } => debug!(seq, attempts, "ledger fetched"),
            BackendEvent::Retrying { seq, attempt, delay, reason } => match reason {
                RetryReason::NotYetClosed => {
                    debug!(?seq, attempt, ?delay, "ledger not closed yet, waiting")
                }
                RetryReason::Unavailable(reason) => {
                    warn!(?seq, attempt, ?delay, %reason, "source unavailable, retrying")
                }
            },
            BackendEvent::GaveUp { seq, attempts, reason } => {
                warn!(?seq, attempts, ?reason, "retry budget exhausted")
            }
            BackendEvent::RangeExhausted { end } => info!(end, "prepared range exhausted"),
            BackendEvent::Canceled { seq } => debug!(?seq, "backend call canceled"),
            BackendEvent::Closed => debug!("backend closed"),
        }
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record(&self, _event: BackendEvent) {}
}

/// Keeps every event in memory; for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<BackendEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of retries recorded so far.
    pub fn retry_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, BackendEvent::Retrying { .. }))
            .count()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: BackendEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
