use std::vec;

use sli_backend::LedgerBackend;
use sli_meta::{LedgerCloseMeta, LedgerHeader, TransactionHasher};
use sli_types::Sequence;
use tokio_util::sync::CancellationToken;

use crate::decoder::decode_transactions;
use crate::error::{IngestError, IngestResult};
use crate::record::TransactionRecord;

/// Forward-only reader over the transactions of one ledger.
///
/// Decoding happens up front in [`new`](Self::new); a reader that was
/// constructed successfully never fails afterwards except with
/// [`IngestError::EndOfLedger`].
pub struct LedgerTransactionReader {
    header: LedgerHeader,
    records: vec::IntoIter<TransactionRecord>,
    total: usize,
}

impl LedgerTransactionReader {
    pub fn new(network_passphrase: &str, meta: LedgerCloseMeta) -> IngestResult<Self> {
        Self::with_hasher(&TransactionHasher::for_passphrase(network_passphrase), meta)
    }

    pub fn with_hasher(hasher: &TransactionHasher, meta: LedgerCloseMeta) -> IngestResult<Self> {
        let header = meta.header.clone();
        let records = decode_transactions(hasher, meta)?;
        Ok(Self {
            header,
            total: records.len(),
            records: records.into_iter(),
        })
    }

    /// Fetch ledger `seq` from `backend` and decode it.
    pub async fn from_backend(
        backend: &LedgerBackend,
        cancel: &CancellationToken,
        network_passphrase: &str,
        seq: Sequence,
    ) -> IngestResult<Self> {
        let meta = backend.fetch_ledger(cancel, seq).await?;
        Self::new(network_passphrase, meta)
    }

    /// Next transaction in apply order, or `EndOfLedger` once all have been read.
    pub fn read(&mut self) -> IngestResult<TransactionRecord> {
        self.records.next().ok_or(IngestError::EndOfLedger)
    }

    pub fn sequence(&self) -> Sequence {
        self.header.sequence
    }

    pub fn header(&self) -> &LedgerHeader {
        &self.header
    }

    /// Transactions in the ledger.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Transactions not yet read.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }

    /// Drop the decoded transactions. Later reads return `EndOfLedger`.
    pub fn close(&mut self) {
        self.records = Vec::new().into_iter();
    }
}

impl Iterator for LedgerTransactionReader {
    type Item = TransactionRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for LedgerTransactionReader {}
