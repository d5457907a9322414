use crate::error::{MetaError, MetaResult};
use crate::records::LedgerCloseMeta;

pub const FRAME_MAGIC: &[u8; 4] = b"SLCM";
pub const FRAME_VERSION: u32 = 1;
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// magic + version + length + crc
const HEADER_SIZE: usize = 16;

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// Codec for ledger close metadata blobs.
///
/// Frame layout:
/// ```text
/// [4 bytes: "SLCM"]
/// [4 bytes: version (big-endian u32)]
/// [4 bytes: payload length (big-endian u32)]
/// [4 bytes: CRC32 of payload (big-endian u32)]
/// [N bytes: payload (bincode-serialized LedgerCloseMeta)]
/// ```
pub struct LedgerMetaCodec;

impl LedgerMetaCodec {
    pub fn encode(meta: &LedgerCloseMeta) -> MetaResult<Vec<u8>> {
        let payload = bincode::serialize(meta)
            .map_err(|e| MetaError::Serialization(e.to_string()))?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(MetaError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(FRAME_MAGIC);
        buf.extend_from_slice(&FRAME_VERSION.to_be_bytes());
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&crc32fast::hash(&payload).to_be_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode exactly one frame. Trailing bytes are rejected.
    pub fn decode(data: &[u8]) -> MetaResult<LedgerCloseMeta> {
        if data.len() < HEADER_SIZE {
            return Err(MetaError::Truncated {
                have: data.len(),
                need: HEADER_SIZE,
            });
        }
        if &data[0..4] != FRAME_MAGIC {
            return Err(MetaError::InvalidMagic {
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let version = read_u32(data, 4);
        if version != FRAME_VERSION {
            return Err(MetaError::UnsupportedVersion(version));
        }
        let len = read_u32(data, 8) as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(MetaError::PayloadTooLarge {
                size: len,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let total = HEADER_SIZE + len;
        if data.len() < total {
            return Err(MetaError::Truncated {
                have: data.len(),
                need: total,
            });
        }
        if data.len() > total {
            return Err(MetaError::TrailingBytes(data.len() - total));
        }

        let payload = &data[HEADER_SIZE..total];
        let expected = read_u32(data, 12);
        let actual = crc32fast::hash(payload);
        if expected != actual {
            return Err(MetaError::CrcMismatch { expected, actual });
        }

        bincode::deserialize(payload).map_err(|e| MetaError::Deserialization(e.to_string()))
    }
}
