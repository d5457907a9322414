//! Ledger sources for Sequential Ledger Ingestion.
//!
//! A [`LedgerSource`] resolves the network frontier and hands out closed
//! ledgers by sequence. Three adapters ship with the crate:
//!
//! - [`InMemorySource`]: ledgers held in memory with a movable frontier
//! - [`FileSource`]: a directory of framed `<seq>.slcm` files
//! - [`RpcSource`]: JSON-RPC over HTTP (`getLatestLedger`, `getLedgers`)

pub mod error;
pub mod file;
pub mod memory;
pub mod rpc;
pub mod traits;

pub use error::{SourceError, SourceResult};
pub use file::FileSource;
pub use memory::InMemorySource;
pub use rpc::{RpcConfig, RpcSource};
pub use traits::LedgerSource;
