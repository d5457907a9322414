use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use sli_meta::LedgerCloseMeta;
use sli_types::Sequence;

use crate::error::{SourceError, SourceResult};
use crate::traits::LedgerSource;

/// In-memory ledger source for tests, local demos, and embedding.
///
/// Ledgers past the frontier are held back and answered with `NotFound`
/// until the frontier moves. Faults can be queued per sequence and are
/// consumed one per call.
#[derive(Default)]
pub struct InMemorySource {
    inner: RwLock<SourceState>,
}

#[derive(Default)]
struct SourceState {
    ledgers: BTreeMap<Sequence, LedgerCloseMeta>,
    frontier: Sequence,
    fetch_faults: HashMap<Sequence, VecDeque<SourceError>>,
    latest_faults: VecDeque<SourceError>,
    fetch_delay: Option<Duration>,
    fetch_log: Vec<Sequence>,
    latest_calls: usize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source whose frontier sits at the highest of `ledgers`.
    pub fn with_ledgers(ledgers: impl IntoIterator<Item = LedgerCloseMeta>) -> Self {
        let source = Self::new();
        for meta in ledgers {
            source.publish(meta);
        }
        source
    }

    /// Store a ledger without moving the frontier.
    pub fn insert(&self, meta: LedgerCloseMeta) {
        let mut state = self.inner.write().expect("source lock poisoned");
        state.ledgers.insert(meta.sequence(), meta);
    }

    /// Store a ledger and move the frontier up to it.
    pub fn publish(&self, meta: LedgerCloseMeta) {
        let mut state = self.inner.write().expect("source lock poisoned");
        state.frontier = state.frontier.max(meta.sequence());
        state.ledgers.insert(meta.sequence(), meta);
    }

    pub fn set_frontier(&self, seq: Sequence) {
        self.inner.write().expect("source lock poisoned").frontier = seq;
    }

    /// Move the frontier forward to `seq`; never moves it back.
    pub fn advance_frontier_to(&self, seq: Sequence) {
        let mut state = self.inner.write().expect("source lock poisoned");
        state.frontier = state.frontier.max(seq);
    }

    pub fn frontier(&self) -> Sequence {
        self.inner.read().expect("source lock poisoned").frontier
    }

    /// Queue an error for the next fetch of `seq`.
    pub fn inject_fault(&self, seq: Sequence, err: SourceError) {
        let mut state = self.inner.write().expect("source lock poisoned");
        state.fetch_faults.entry(seq).or_default().push_back(err);
    }

    /// Queue an error for the next `latest_sequence` call.
    pub fn inject_latest_fault(&self, err: SourceError) {
        let mut state = self.inner.write().expect("source lock poisoned");
        state.latest_faults.push_back(err);
    }

    /// Delay every fetch, simulating a slow or hung service.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.inner.write().expect("source lock poisoned").fetch_delay = delay;
    }

    /// Every sequence requested so far, in call order.
    pub fn fetch_log(&self) -> Vec<Sequence> {
        self.inner.read().expect("source lock poisoned").fetch_log.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.read().expect("source lock poisoned").fetch_log.len()
    }

    pub fn latest_calls(&self) -> usize {
        self.inner.read().expect("source lock poisoned").latest_calls
    }

    fn lock_poisoned() -> SourceError {
        SourceError::Unavailable("source lock poisoned".into())
    }
}

#[async_trait]
impl LedgerSource for InMemorySource {
    async fn latest_sequence(&self) -> SourceResult<Sequence> {
        let mut state = self.inner.write().map_err(|_| Self::lock_poisoned())?;
        state.latest_calls += 1;
        if let Some(err) = state.latest_faults.pop_front() {
            return Err(err);
        }
        Ok(state.frontier)
    }

    async fn fetch_by_sequence(&self, seq: Sequence) -> SourceResult<LedgerCloseMeta> {
        let delay = {
            let mut state = self.inner.write().map_err(|_| Self::lock_poisoned())?;
            state.fetch_log.push(seq);
            state.fetch_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.write().map_err(|_| Self::lock_poisoned())?;
        if let Some(err) = state.fetch_faults.get_mut(&seq).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        if seq > state.frontier {
            return Err(SourceError::NotFound(seq));
        }
        state
            .ledgers
            .get(&seq)
            .cloned()
            .ok_or(SourceError::NotFound(seq))
    }
}
