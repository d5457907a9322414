//! Foundation types for Sequential Ledger Ingestion (SLI).
//!
//! Every other SLI crate depends on `sli-types`.
//!
//! # Key Types
//!
//! - [`Sequence`]: Ledger sequence number
//! - [`LedgerRange`]: Bounded or unbounded span of ledgers to ingest
//! - [`TxHash`]: 32-byte transaction identifier
//! - [`NetworkId`]: Identifier derived from a network passphrase

pub mod error;
pub mod hash;
pub mod range;

pub use error::TypeError;
pub use hash::{NetworkId, TxHash};
pub use range::{LedgerRange, RangeKind, Sequence};
