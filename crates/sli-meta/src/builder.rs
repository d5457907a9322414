use sli_types::{NetworkId, Sequence};

use crate::error::MetaResult;
use crate::hasher::TransactionHasher;
use crate::records::{
    LedgerCloseMeta, LedgerEntryChange, LedgerHeader, TransactionEnvelope, TransactionResult,
    TransactionResultMeta,
};

const DEFAULT_PROTOCOL_VERSION: u32 = 22;

/// Assembles a well-formed [`LedgerCloseMeta`].
///
/// Transactions are applied in the order they are added. The transaction set
/// is emitted in hash order, as the network stores it.
pub struct LedgerCloseMetaBuilder {
    network_id: NetworkId,
    sequence: Sequence,
    previous_ledger_hash: [u8; 32],
    close_time: u64,
    protocol_version: u32,
    transactions: Vec<(TransactionEnvelope, TransactionResult, Vec<LedgerEntryChange>)>,
}

impl LedgerCloseMetaBuilder {
    pub fn new(passphrase: &str, sequence: Sequence) -> Self {
        Self::with_network_id(NetworkId::from_passphrase(passphrase), sequence)
    }

    pub fn with_network_id(network_id: NetworkId, sequence: Sequence) -> Self {
        Self {
            network_id,
            sequence,
            previous_ledger_hash: [0; 32],
            close_time: 0,
            protocol_version: DEFAULT_PROTOCOL_VERSION,
            transactions: Vec::new(),
        }
    }

    pub fn previous_ledger_hash(mut self, hash: [u8; 32]) -> Self {
        self.previous_ledger_hash = hash;
        self
    }

    pub fn close_time(mut self, close_time: u64) -> Self {
        self.close_time = close_time;
        self
    }

    pub fn protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = version;
        self
    }

    pub fn transaction(
        mut self,
        envelope: TransactionEnvelope,
        result: TransactionResult,
        changes: Vec<LedgerEntryChange>,
    ) -> Self {
        self.transactions.push((envelope, result, changes));
        self
    }

    pub fn build(self) -> MetaResult<LedgerCloseMeta> {
        let hasher = TransactionHasher::new(self.network_id);
        let mut hashed_set = Vec::with_capacity(self.transactions.len());
        let mut tx_processing = Vec::with_capacity(self.transactions.len());

        for (envelope, result, changes) in self.transactions {
            let hash = hasher.hash(&envelope)?;
            tx_processing.push(TransactionResultMeta {
                transaction_hash: hash,
                result,
                fee_changes: Vec::new(),
                changes,
            });
            hashed_set.push((hash, envelope));
        }
        hashed_set.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(LedgerCloseMeta {
            header: LedgerHeader {
                sequence: self.sequence,
                network_id: self.network_id,
                previous_ledger_hash: self.previous_ledger_hash,
                close_time: self.close_time,
                protocol_version: self.protocol_version,
            },
            tx_set: hashed_set.into_iter().map(|(_, env)| env).collect(),
            tx_processing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Operation;

    #[test]
    fn empty_ledger() {
        let meta = LedgerCloseMetaBuilder::new("net", 9).build().unwrap();
        assert_eq!(meta.sequence(), 9);
        assert_eq!(meta.transaction_count(), 0);
        assert!(meta.tx_set.is_empty());
        assert_eq!(*meta.network_id(), NetworkId::from_passphrase("net"));
    }

    #[test]
    fn processing_keeps_insertion_order_and_set_is_hash_sorted() {
        let mut builder = LedgerCloseMetaBuilder::new("net", 1);
        for seq in 0..8 {
            builder = builder.transaction(
                TransactionEnvelope::new("GA", seq).with_operation(Operation::payment("GB", "XLM", seq)),
                TransactionResult::success(100),
                vec![],
            );
        }
        let meta = builder.build().unwrap();
        let hasher = TransactionHasher::for_passphrase("net");

        for (i, processed) in meta.tx_processing.iter().enumerate() {
            let expected = hasher
                .hash(&TransactionEnvelope::new("GA", i as i64)
                    .with_operation(Operation::payment("GB", "XLM", i as i64)))
                .unwrap();
            assert_eq!(processed.transaction_hash, expected);
        }

        let set_hashes: Vec<_> = meta.tx_set.iter().map(|e| hasher.hash(e).unwrap()).collect();
        let mut sorted = set_hashes.clone();
        sorted.sort();
        assert_eq!(set_hashes, sorted);
    }
}
