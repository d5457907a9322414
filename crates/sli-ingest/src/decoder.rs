use std::collections::HashMap;

use sli_meta::{LedgerCloseMeta, TransactionEnvelope, TransactionHasher};
use sli_types::TxHash;

use crate::error::{IngestError, IngestResult};
use crate::record::TransactionRecord;

/// Split a ledger into transaction records in apply order.
///
/// The transaction set is stored in hash order and carries no results, so
/// every processing entry is joined back to its envelope by hash. The ledger
/// must belong to the hasher's network.
pub fn decode_transactions(
    hasher: &TransactionHasher,
    meta: LedgerCloseMeta,
) -> IngestResult<Vec<TransactionRecord>> {
    let sequence = meta.sequence();
    if meta.network_id() != hasher.network_id() {
        return Err(IngestError::Protocol(format!(
            "ledger {sequence} belongs to network {}, expected {}",
            meta.network_id().short_hex(),
            hasher.network_id().short_hex()
        )));
    }
    if meta.tx_set.len() != meta.tx_processing.len() {
        return Err(IngestError::Protocol(format!(
            "ledger {sequence}: {} envelopes but {} processing results",
            meta.tx_set.len(),
            meta.tx_processing.len()
        )));
    }

    let mut envelopes: HashMap<TxHash, TransactionEnvelope> =
        HashMap::with_capacity(meta.tx_set.len());
    for envelope in meta.tx_set {
        let hash = hasher.hash(&envelope)?;
        if envelopes.insert(hash, envelope).is_some() {
            return Err(IngestError::Protocol(format!(
                "ledger {sequence}: duplicate envelope {}",
                hash.short_hex()
            )));
        }
    }

    meta.tx_processing
        .into_iter()
        .enumerate()
        .map(|(index, processed)| {
            let hash = processed.transaction_hash;
            let envelope = envelopes.remove(&hash).ok_or_else(|| {
                IngestError::Protocol(format!(
                    "ledger {sequence}: result {index} references unknown or repeated transaction {}",
                    hash.short_hex()
                ))
            })?;
            Ok(TransactionRecord {
                hash,
                ledger_sequence: sequence,
                index,
                envelope,
                successful: processed.result.successful(),
                result: processed.result,
                fee_changes: processed.fee_changes,
                changes: processed.changes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sli_meta::{
        LedgerCloseMetaBuilder, Operation, TransactionResult, TransactionResultCode,
    };

    const NET: &str = "Test SDF Network ; September 2015";

    fn envelope(seq: i64, ops: usize) -> TransactionEnvelope {
        (0..ops).fold(TransactionEnvelope::new("GSOURCE", seq), |env, i| {
            env.with_operation(Operation::payment("GDEST", "XLM", i as i64))
        })
    }

    fn three_tx_ledger() -> LedgerCloseMeta {
        LedgerCloseMetaBuilder::new(NET, 42)
            .transaction(envelope(1, 1), TransactionResult::success(100), vec![])
            .transaction(
                envelope(2, 3),
                TransactionResult::failed(100, TransactionResultCode::Failed),
                vec![],
            )
            .transaction(envelope(3, 2), TransactionResult::success(200), vec![])
            .build()
            .unwrap()
    }

    #[test]
    fn records_follow_apply_order() {
        let hasher = TransactionHasher::for_passphrase(NET);
        let records = decode_transactions(&hasher, three_tx_ledger()).unwrap();

        let seqs: Vec<i64> = records.iter().map(|r| r.envelope.seq_num).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        let indexes: Vec<usize> = records.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(
            records.iter().map(|r| r.successful).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        assert_eq!(records[1].operation_count(), 3);
        assert!(records.iter().all(|r| r.ledger_sequence == 42));
    }

    #[test]
    fn wrong_network_is_protocol_error() {
        let hasher = TransactionHasher::for_passphrase("Public Global Stellar Network ; September 2015");
        let err = decode_transactions(&hasher, three_tx_ledger()).unwrap_err();
        assert!(matches!(err, IngestError::Protocol(msg) if msg.contains("network")));
    }

    #[test]
    fn count_mismatch_is_protocol_error() {
        let mut meta = three_tx_ledger();
        meta.tx_set.pop();
        let hasher = TransactionHasher::for_passphrase(NET);
        assert!(matches!(
            decode_transactions(&hasher, meta),
            Err(IngestError::Protocol(_))
        ));
    }

    #[test]
    fn unknown_result_hash_is_protocol_error() {
        let mut meta = three_tx_ledger();
        meta.tx_processing[2].transaction_hash = TxHash::from([7u8; 32]);
        let hasher = TransactionHasher::for_passphrase(NET);
        let err = decode_transactions(&hasher, meta).unwrap_err();
        assert!(matches!(err, IngestError::Protocol(msg) if msg.contains("result 2")));
    }

    #[test]
    fn duplicate_envelope_is_protocol_error() {
        let mut meta = three_tx_ledger();
        meta.tx_set[1] = meta.tx_set[0].clone();
        let hasher = TransactionHasher::for_passphrase(NET);
        let err = decode_transactions(&hasher, meta).unwrap_err();
        assert!(matches!(err, IngestError::Protocol(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn empty_ledger_has_no_records() {
        let meta = LedgerCloseMetaBuilder::new(NET, 7).build().unwrap();
        let hasher = TransactionHasher::for_passphrase(NET);
        assert!(decode_transactions(&hasher, meta).unwrap().is_empty());
    }
}
