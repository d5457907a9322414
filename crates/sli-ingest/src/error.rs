use sli_backend::BackendError;
use sli_meta::MetaError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("end of ledger")]
    EndOfLedger,

    #[error("invalid memo filter: {0}")]
    InvalidMemoFilter(String),
}

impl IngestError {
    pub fn is_end_of_ledger(&self) -> bool {
        matches!(self, Self::EndOfLedger)
    }
}

impl From<MetaError> for IngestError {
    fn from(err: MetaError) -> Self {
        Self::Protocol(err.to_string())
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
