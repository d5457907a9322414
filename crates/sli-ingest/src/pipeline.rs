use sli_backend::{BackendError, LedgerBackend};
use sli_meta::{LedgerCloseMeta, TransactionHasher};
use sli_types::{LedgerRange, Sequence};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::IngestResult;
use crate::memo::MemoFilter;
use crate::reader::LedgerTransactionReader;
use crate::record::TransactionRecord;
use crate::stats::{StateChangePolicy, StatsAccumulator};

const DEFAULT_MAX_LEDGER_RETRIES: u32 = 3;

/// Why a run ended without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Every ledger of a bounded range was delivered.
    RangeExhausted,
    Canceled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestReport {
    pub range: LedgerRange,
    pub ledgers: u64,
    /// Transactions handed to the visitor after memo filtering.
    pub delivered: u64,
    /// First sequence not ingested. Stays at `Sequence::MAX` once that ledger
    /// has been ingested, since nothing can follow it.
    pub next_sequence: Sequence,
    pub stop: StopReason,
    pub stats: StatsAccumulator,
}

/// Drives one backend through a range: fetch, decode, count, visit.
pub struct Ingestor {
    backend: LedgerBackend,
    hasher: TransactionHasher,
    policy: StateChangePolicy,
    filter: MemoFilter,
    max_ledger_retries: u32,
}

impl Ingestor {
    pub fn new(backend: LedgerBackend, network_passphrase: &str) -> Self {
        Self {
            backend,
            hasher: TransactionHasher::for_passphrase(network_passphrase),
            policy: StateChangePolicy::default(),
            filter: MemoFilter::Any,
            max_ledger_retries: DEFAULT_MAX_LEDGER_RETRIES,
        }
    }

    pub fn with_state_change_policy(mut self, policy: StateChangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_memo_filter(mut self, filter: MemoFilter) -> Self {
        self.filter = filter;
        self
    }

    /// How many times a ledger is re-requested after the backend gives up
    /// on it as unavailable.
    pub fn with_max_ledger_retries(mut self, retries: u32) -> Self {
        self.max_ledger_retries = retries;
        self
    }

    pub fn backend(&self) -> &LedgerBackend {
        &self.backend
    }

    /// Ingest `range` in order, calling `visitor` for each transaction that
    /// passes the memo filter.
    ///
    /// Every transaction is counted in the report's statistics whether or not
    /// it was visited. Fatal errors end the run and are returned as-is.
    pub async fn run<F>(
        &self,
        cancel: &CancellationToken,
        range: LedgerRange,
        mut visitor: F,
    ) -> IngestResult<IngestReport>
    where
        F: FnMut(&TransactionRecord),
    {
        let mut report = IngestReport {
            range,
            ledgers: 0,
            delivered: 0,
            next_sequence: range.start(),
            stop: StopReason::Canceled,
            stats: StatsAccumulator::new(self.policy),
        };

        match self.backend.prepare(cancel, range).await {
            Ok(()) => {}
            Err(BackendError::Canceled) => return Ok(report),
            Err(err) => return Err(err.into()),
        }
        info!(%range, filter = %self.filter, "ingestion started");

        loop {
            let seq = report.next_sequence;
            let meta = match self.fetch(cancel, seq).await {
                Ok(meta) => meta,
                Err(BackendError::RangeExhausted { .. }) => {
                    report.stop = StopReason::RangeExhausted;
                    break;
                }
                Err(BackendError::Canceled) => {
                    report.stop = StopReason::Canceled;
                    break;
                }
                Err(err) => return Err(err.into()),
            };

            let reader = LedgerTransactionReader::with_hasher(&self.hasher, meta)?;
            let transactions = reader.len();
            report.stats.observe_ledger(seq);
            for record in reader {
                report.stats.record(&record.summary());
                if self.filter.matches(&record.envelope) {
                    report.delivered += 1;
                    visitor(&record);
                }
            }
            report.ledgers += 1;
            debug!(seq, transactions, "ledger ingested");

            match seq.checked_add(1) {
                Some(next) => report.next_sequence = next,
                None => {
                    report.stop = StopReason::RangeExhausted;
                    break;
                }
            }
        }

        info!(
            ledgers = report.ledgers,
            transactions = report.stats.total_transactions(),
            stop = ?report.stop,
            "ingestion finished"
        );
        Ok(report)
    }

    async fn fetch(
        &self,
        cancel: &CancellationToken,
        seq: Sequence,
    ) -> Result<LedgerCloseMeta, BackendError> {
        let mut retries = 0;
        loop {
            match self.backend.fetch_ledger(cancel, seq).await {
                Err(err) if err.is_recoverable() && retries < self.max_ledger_retries => {
                    retries += 1;
                    warn!(seq, retries, error = %err, "ledger unavailable, requesting again");
                }
                other => return other,
            }
        }
    }
}
