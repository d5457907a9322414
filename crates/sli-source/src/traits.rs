use std::sync::Arc;

use async_trait::async_trait;
use sli_meta::LedgerCloseMeta;
use sli_types::Sequence;

use crate::error::SourceResult;

/// Read boundary to a remote ledger service.
///
/// Implementations must be safe to share between independent backends; the
/// caller bounds each call with its own timeout and cancellation, so a call
/// may be dropped at any await point.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Highest sequence the service currently considers closed.
    async fn latest_sequence(&self) -> SourceResult<Sequence>;

    /// Closing metadata of ledger `seq`.
    ///
    /// Returns `NotFound` when `seq` is past the frontier.
    async fn fetch_by_sequence(&self, seq: Sequence) -> SourceResult<LedgerCloseMeta>;
}

#[async_trait]
impl<S: LedgerSource + ?Sized> LedgerSource for Arc<S> {
    async fn latest_sequence(&self) -> SourceResult<Sequence> {
        (**self).latest_sequence().await
    }

    async fn fetch_by_sequence(&self, seq: Sequence) -> SourceResult<LedgerCloseMeta> {
        (**self).fetch_by_sequence(seq).await
    }
}
