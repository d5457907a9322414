use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sli_meta::LedgerCloseMeta;
use sli_source::{LedgerSource, SourceError, SourceResult};
use sli_types::{LedgerRange, Sequence};
use tokio_util::sync::CancellationToken;

use crate::config::BackendConfig;
use crate::error::{BackendError, BackendResult};
use crate::sink::{BackendEvent, DiagnosticSink, RetryReason, TracingSink};

/// Lifecycle of a backend. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendState {
    Unprepared,
    Prepared,
    Closed,
}

#[derive(Clone, Copy, Debug)]
enum Cursor {
    Unprepared,
    Prepared { range: LedgerRange, next: Sequence },
    /// Ledger `Sequence::MAX` was delivered; nothing can follow it.
    Exhausted { range: LedgerRange },
    Closed,
}

/// Releases the single-flight flag when a fetch returns or is dropped.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Ordered, retrying access to one stream of ledgers.
///
/// One backend serves one prepared range to one consumer. The source it
/// wraps may be shared with other backends; the cursor never is.
pub struct LedgerBackend {
    source: Arc<dyn LedgerSource>,
    config: BackendConfig,
    sink: Arc<dyn DiagnosticSink>,
    cursor: Mutex<Cursor>,
    in_flight: AtomicBool,
}

impl LedgerBackend {
    pub fn new(source: Arc<dyn LedgerSource>) -> Self {
        Self::with_config(source, BackendConfig::default())
    }

    pub fn with_config(source: Arc<dyn LedgerSource>, config: BackendConfig) -> Self {
        Self {
            source,
            config,
            sink: Arc::new(TracingSink),
            cursor: Mutex::new(Cursor::Unprepared),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Route diagnostics to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn state(&self) -> BackendState {
        match *self.cursor() {
            Cursor::Unprepared => BackendState::Unprepared,
            Cursor::Prepared { .. } | Cursor::Exhausted { .. } => BackendState::Prepared,
            Cursor::Closed => BackendState::Closed,
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.state() == BackendState::Prepared
    }

    pub fn prepared_range(&self) -> Option<LedgerRange> {
        match *self.cursor() {
            Cursor::Prepared { range, .. } | Cursor::Exhausted { range } => Some(range),
            _ => None,
        }
    }

    /// Sequence the next `fetch_ledger` call must ask for.
    pub fn next_sequence(&self) -> Option<Sequence> {
        match *self.cursor() {
            Cursor::Prepared { next, .. } => Some(next),
            _ => None,
        }
    }

    /// Commit this backend to serving `range`. Allowed once per backend.
    pub async fn prepare(&self, cancel: &CancellationToken, range: LedgerRange) -> BackendResult<()> {
        if cancel.is_cancelled() {
            return Err(BackendError::Canceled);
        }
        let prepared = {
            let mut cursor = self.cursor();
            match *cursor {
                Cursor::Unprepared => {
                    *cursor = Cursor::Prepared {
                        range,
                        next: range.start(),
                    };
                    Ok(())
                }
                Cursor::Prepared { range: prepared, .. } | Cursor::Exhausted { range: prepared } => {
                    Err(BackendError::AlreadyPrepared(prepared))
                }
                Cursor::Closed => Err(BackendError::BackendClosed),
            }
        };
        if prepared.is_ok() {
            self.sink.record(BackendEvent::Prepared { range });
        }
        prepared
    }

    /// Fetch ledger `seq`, which must equal [`next_sequence`](Self::next_sequence).
    ///
    /// Waits while the ledger is past the source frontier and retries
    /// transient failures. The cursor only advances when a ledger is
    /// returned, so any error leaves `seq` as the next sequence to fetch.
    pub async fn fetch_ledger(
        &self,
        cancel: &CancellationToken,
        seq: Sequence,
    ) -> BackendResult<LedgerCloseMeta> {
        let _flight = self.begin_flight()?;

        let range = match *self.cursor() {
            Cursor::Unprepared => return Err(BackendError::NotPrepared),
            Cursor::Closed => return Err(BackendError::BackendClosed),
            Cursor::Exhausted { .. } => {
                let end = Sequence::MAX;
                self.sink.record(BackendEvent::RangeExhausted { end });
                return Err(BackendError::RangeExhausted { end });
            }
            Cursor::Prepared { next, .. } if seq != next => {
                return Err(BackendError::SequenceMismatch {
                    expected: next,
                    requested: seq,
                })
            }
            Cursor::Prepared { range, .. } => range,
        };

        if let Some(end) = range.end() {
            if seq > end {
                self.sink.record(BackendEvent::RangeExhausted { end });
                return Err(BackendError::RangeExhausted { end });
            }
        }
        if cancel.is_cancelled() {
            self.sink.record(BackendEvent::Canceled { seq: Some(seq) });
            return Err(BackendError::Canceled);
        }

        let mut attempts = 0u32;
        let mut frontier_waits = 0u32;
        let mut unavailable = 0u32;
        loop {
            attempts += 1;
            let outcome = self
                .attempt(cancel, Some(seq), self.source.fetch_by_sequence(seq))
                .await?;

            let (policy, failures, reason) = match outcome {
                Ok(meta) if meta.sequence() != seq => {
                    return Err(BackendError::Protocol(format!(
                        "source returned ledger {} for sequence {seq}",
                        meta.sequence()
                    )));
                }
                Ok(meta) => {
                    self.advance(seq)?;
                    self.sink.record(BackendEvent::Fetched { seq, attempts });
                    return Ok(meta);
                }
                Err(SourceError::Protocol(reason)) => return Err(BackendError::Protocol(reason)),
                Err(SourceError::NotFound(_)) => {
                    frontier_waits += 1;
                    (&self.config.frontier_backoff, frontier_waits, RetryReason::NotYetClosed)
                }
                Err(SourceError::Unavailable(reason)) => {
                    unavailable += 1;
                    (&self.config.unavailable_backoff, unavailable, RetryReason::Unavailable(reason))
                }
            };

            if !policy.allows_retry(failures) {
                self.sink.record(BackendEvent::GaveUp {
                    seq: Some(seq),
                    attempts,
                    reason: reason.clone(),
                });
                return Err(BackendError::Unavailable(match reason {
                    RetryReason::NotYetClosed => {
                        format!("ledger {seq} still not closed after {failures} attempts")
                    }
                    RetryReason::Unavailable(reason) => {
                        format!("ledger {seq}: {reason} (after {failures} attempts)")
                    }
                }));
            }

            let delay = policy.delay_for(failures - 1);
            self.sink.record(BackendEvent::Retrying {
                seq: Some(seq),
                attempt: attempts,
                delay,
                reason,
            });
            self.backoff(cancel, Some(seq), delay).await?;
        }
    }

    /// Highest sequence the source reports as closed.
    pub async fn latest_sequence(&self, cancel: &CancellationToken) -> BackendResult<Sequence> {
        if matches!(*self.cursor(), Cursor::Closed) {
            return Err(BackendError::BackendClosed);
        }

        let policy = &self.config.unavailable_backoff;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self
                .attempt(cancel, None, self.source.latest_sequence())
                .await?
            {
                Ok(seq) => return Ok(seq),
                Err(SourceError::Unavailable(reason)) => {
                    let reason = RetryReason::Unavailable(reason);
                    if !policy.allows_retry(attempts) {
                        self.sink.record(BackendEvent::GaveUp {
                            seq: None,
                            attempts,
                            reason: reason.clone(),
                        });
                        return Err(BackendError::Unavailable(format!(
                            "latest sequence: {reason:?} (after {attempts} attempts)"
                        )));
                    }
                    let delay = policy.delay_for(attempts - 1);
                    self.sink.record(BackendEvent::Retrying {
                        seq: None,
                        attempt: attempts,
                        delay,
                        reason,
                    });
                    self.backoff(cancel, None, delay).await?;
                }
                Err(SourceError::Protocol(reason)) => return Err(BackendError::Protocol(reason)),
                Err(SourceError::NotFound(seq)) => {
                    return Err(BackendError::Protocol(format!(
                        "latest sequence lookup reported ledger {seq} missing"
                    )))
                }
            }
        }
    }

    /// Release the cursor. Later `prepare`/`fetch_ledger` calls fail with
    /// `BackendClosed`. Idempotent.
    pub fn close(&self) {
        let was_open = {
            let mut cursor = self.cursor();
            !matches!(std::mem::replace(&mut *cursor, Cursor::Closed), Cursor::Closed)
        };
        if was_open {
            self.sink.record(BackendEvent::Closed);
        }
    }

    fn cursor(&self) -> MutexGuard<'_, Cursor> {
        // The cursor is plain data; a panic elsewhere cannot leave it half-written.
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_flight(&self) -> BackendResult<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BackendError::FetchInFlight)?;
        Ok(FlightGuard(&self.in_flight))
    }

    fn advance(&self, seq: Sequence) -> BackendResult<()> {
        let mut cursor = self.cursor();
        match *cursor {
            Cursor::Prepared { range, next } if next == seq => {
                *cursor = match seq.checked_add(1) {
                    Some(next) => Cursor::Prepared { range, next },
                    None => Cursor::Exhausted { range },
                };
                Ok(())
            }
            Cursor::Prepared { next, .. } => Err(BackendError::SequenceMismatch {
                expected: next,
                requested: seq,
            }),
            Cursor::Exhausted { .. } => Err(BackendError::RangeExhausted { end: Sequence::MAX }),
            Cursor::Closed => Err(BackendError::BackendClosed),
            Cursor::Unprepared => Err(BackendError::NotPrepared),
        }
    }

    /// Run one source call under the attempt timeout, racing cancellation.
    async fn attempt<T>(
        &self,
        cancel: &CancellationToken,
        seq: Option<Sequence>,
        call: impl Future<Output = SourceResult<T>>,
    ) -> BackendResult<SourceResult<T>> {
        let timeout = self.config.attempt_timeout();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.sink.record(BackendEvent::Canceled { seq });
                Err(BackendError::Canceled)
            }
            result = tokio::time::timeout(timeout, call) => Ok(result.unwrap_or_else(|_| {
                Err(SourceError::Unavailable(format!(
                    "source call timed out after {}ms",
                    timeout.as_millis()
                )))
            })),
        }
    }

    async fn backoff(
        &self,
        cancel: &CancellationToken,
        seq: Option<Sequence>,
        delay: Duration,
    ) -> BackendResult<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.sink.record(BackendEvent::Canceled { seq });
                Err(BackendError::Canceled)
            }
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

impl Drop for LedgerBackend {
    fn drop(&mut self) {
        self.close();
    }
}
