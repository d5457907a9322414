use sli_meta::{LedgerEntryChange, TransactionEnvelope, TransactionResult};
use sli_types::{Sequence, TxHash};

/// One decoded transaction with its result and state changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub ledger_sequence: Sequence,
    /// Position in the ledger's apply order.
    pub index: usize,
    pub envelope: TransactionEnvelope,
    pub successful: bool,
    pub result: TransactionResult,
    pub fee_changes: Vec<LedgerEntryChange>,
    pub changes: Vec<LedgerEntryChange>,
}

impl TransactionRecord {
    /// Operations in the envelope, counted whether or not the transaction
    /// succeeded.
    pub fn operation_count(&self) -> usize {
        self.envelope.operation_count()
    }

    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            hash: self.hash,
            ledger_sequence: self.ledger_sequence,
            successful: self.successful,
            operation_count: self.operation_count(),
            state_changes: self.changes.len(),
        }
    }
}

/// The fields statistics need, detached from the decoded envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionSummary {
    pub hash: TxHash,
    pub ledger_sequence: Sequence,
    pub successful: bool,
    pub operation_count: usize,
    pub state_changes: usize,
}
