//! Transaction-level ingestion for Sequential Ledger Ingestion.
//!
//! This crate turns fetched ledgers into transactions. It provides:
//! - `LedgerTransactionReader`, a forward-only reader over one ledger
//! - `TransactionRecord` and its `TransactionSummary`
//! - `StatsAccumulator` for success/failure and operation counters
//! - `MemoFilter` for selecting transactions by memo
//! - `Ingestor`, the fetch-decode-visit loop over a ledger range

pub mod decoder;
pub mod error;
pub mod memo;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod stats;

pub use error::{IngestError, IngestResult};
pub use memo::MemoFilter;
pub use pipeline::{IngestReport, Ingestor, StopReason};
pub use reader::LedgerTransactionReader;
pub use record::{TransactionRecord, TransactionSummary};
pub use stats::{StateChangePolicy, StatsAccumulator};
