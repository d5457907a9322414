//! Ledger close metadata for Sequential Ledger Ingestion.
//!
//! A closed ledger is shipped as a [`LedgerCloseMeta`]: a header, the
//! transaction set in hash order, and the processing results in apply order.
//!
//! # Architecture
//!
//! - **records**: the metadata tree (envelopes, operations, results, entry changes)
//! - **hasher**: network-bound transaction hashes
//! - **codec**: `SLCM` framing with a CRC-checked bincode payload
//! - **builder**: assembles well-formed metadata for adapters and tests

pub mod builder;
pub mod codec;
pub mod error;
pub mod hasher;
pub mod records;

pub use builder::LedgerCloseMetaBuilder;
pub use codec::{LedgerMetaCodec, FRAME_MAGIC, FRAME_VERSION, MAX_PAYLOAD_SIZE};
pub use error::{MetaError, MetaResult};
pub use hasher::TransactionHasher;
pub use records::{
    EntryKind, LedgerCloseMeta, LedgerEntry, LedgerEntryChange, LedgerHeader, LedgerKey, Memo,
    Operation, OperationBody, TransactionEnvelope, TransactionResult, TransactionResultCode,
    TransactionResultMeta,
};
