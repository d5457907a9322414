use sli_meta::MetaError;
use sli_types::Sequence;
use thiserror::Error;

/// Errors a ledger source may report.
///
/// `NotFound` means "not closed yet, ask again later". `Protocol` means the
/// data itself is wrong and asking again will not help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("ledger {0} not found: past the source frontier")]
    NotFound(Sequence),

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unavailable(_))
    }
}

impl From<MetaError> for SourceError {
    fn from(err: MetaError) -> Self {
        Self::Protocol(err.to_string())
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
