//! Ledger backend for Sequential Ledger Ingestion.
//!
//! [`LedgerBackend`] owns the retrieval cursor for one stream of ledgers. A
//! caller prepares a range once, then fetches ledgers strictly in order. The
//! backend waits for ledgers that are not closed yet, retries transient
//! source failures with jittered exponential backoff, and observes the
//! caller's cancellation token at every suspension point.

pub mod backend;
pub mod config;
pub mod error;
pub mod retry;
pub mod sink;

pub use backend::{BackendState, LedgerBackend};
pub use config::BackendConfig;
pub use error::{BackendError, BackendResult};
pub use retry::BackoffPolicy;
pub use sink::{BackendEvent, DiagnosticSink, MemorySink, NoopSink, RetryReason, TracingSink};
