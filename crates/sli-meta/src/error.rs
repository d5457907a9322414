use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetaError {
    #[error("invalid frame magic: expected SLCM, got {actual:?}")]
    InvalidMagic { actual: String },

    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u32),

    #[error("truncated frame: have {have} bytes, need {need}")]
    Truncated { have: usize, need: usize },

    #[error("trailing bytes after frame: {0}")]
    TrailingBytes(usize),

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("CRC mismatch: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

pub type MetaResult<T> = Result<T, MetaError>;
