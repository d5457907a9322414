use serde::{Deserialize, Serialize};
use sli_types::Sequence;

use crate::record::TransactionSummary;

/// Which transactions contribute to the state-change counter.
///
/// Failed transactions still carry fee and sequence-number changes, so
/// whether they count depends on what the caller is measuring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChangePolicy {
    #[default]
    All,
    SuccessfulOnly,
}

/// Running counters over ingested transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsAccumulator {
    #[serde(skip)]
    policy: StateChangePolicy,
    ledgers: u64,
    first_ledger: Option<Sequence>,
    last_ledger: Option<Sequence>,
    successful_transactions: u64,
    failed_transactions: u64,
    operations_in_successful: u64,
    operations_in_failed: u64,
    state_changes: u64,
}

impl StatsAccumulator {
    pub fn new(policy: StateChangePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> StateChangePolicy {
        self.policy
    }

    pub fn observe_ledger(&mut self, seq: Sequence) {
        self.ledgers += 1;
        self.first_ledger = Some(self.first_ledger.map_or(seq, |first| first.min(seq)));
        self.last_ledger = Some(self.last_ledger.map_or(seq, |last| last.max(seq)));
    }

    pub fn record(&mut self, tx: &TransactionSummary) {
        let ops = tx.operation_count as u64;
        if tx.successful {
            self.successful_transactions += 1;
            self.operations_in_successful += ops;
        } else {
            self.failed_transactions += 1;
            self.operations_in_failed += ops;
        }
        if tx.successful || self.policy == StateChangePolicy::All {
            self.state_changes += tx.state_changes as u64;
        }
    }

    /// Fold another accumulator's counters into this one. The policy of
    /// `self` is kept.
    pub fn merge(&mut self, other: &StatsAccumulator) {
        self.ledgers += other.ledgers;
        self.first_ledger = match (self.first_ledger, other.first_ledger) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_ledger = match (self.last_ledger, other.last_ledger) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.successful_transactions += other.successful_transactions;
        self.failed_transactions += other.failed_transactions;
        self.operations_in_successful += other.operations_in_successful;
        self.operations_in_failed += other.operations_in_failed;
        self.state_changes += other.state_changes;
    }

    pub fn ledgers(&self) -> u64 {
        self.ledgers
    }

    pub fn first_ledger(&self) -> Option<Sequence> {
        self.first_ledger
    }

    pub fn last_ledger(&self) -> Option<Sequence> {
        self.last_ledger
    }

    pub fn successful_transactions(&self) -> u64 {
        self.successful_transactions
    }

    pub fn failed_transactions(&self) -> u64 {
        self.failed_transactions
    }

    pub fn total_transactions(&self) -> u64 {
        self.successful_transactions + self.failed_transactions
    }

    pub fn operations_in_successful(&self) -> u64 {
        self.operations_in_successful
    }

    pub fn operations_in_failed(&self) -> u64 {
        self.operations_in_failed
    }

    pub fn total_operations(&self) -> u64 {
        self.operations_in_successful + self.operations_in_failed
    }

    pub fn state_changes(&self) -> u64 {
        self.state_changes
    }
}
