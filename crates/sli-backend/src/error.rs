use sli_types::{LedgerRange, Sequence};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend already prepared for range {0}")]
    AlreadyPrepared(LedgerRange),

    #[error("backend has not been prepared")]
    NotPrepared,

    #[error("backend is closed")]
    BackendClosed,

    #[error("sequence mismatch: expected {expected}, requested {requested}")]
    SequenceMismatch { expected: Sequence, requested: Sequence },

    #[error("another fetch is already in flight on this backend")]
    FetchInFlight,

    #[error("prepared range exhausted after ledger {end}")]
    RangeExhausted { end: Sequence },

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("operation canceled")]
    Canceled,
}

impl BackendError {
    /// Expected end of a stream rather than a failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RangeExhausted { .. } | Self::Canceled)
    }

    /// The same call may be repeated later without breaking the cursor.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Caller broke the backend contract.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::AlreadyPrepared(_)
                | Self::NotPrepared
                | Self::BackendClosed
                | Self::SequenceMismatch { .. }
                | Self::FetchInFlight
        )
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
