use bincode::Options;

use crate::entity::Entity;
use crate::error::{CodecError, CodecResult};

/// Leading byte of every encoded entity. Bumped if the layout ever changes.
pub const FORMAT_TAG: u8 = 0x01;

/// Upper bound on the encoded size of an entity (tag included).
pub const MAX_ENCODED_SIZE: usize = 64 * 1024 * 1024;

/// Codec between [`Entity`] values and the bytes stored in the backend.
///
/// Layout: `[1 byte format tag][bincode payload]`, where the payload uses
/// varint integers and rejects trailing bytes. Encoding is deterministic,
/// which lets the write path detect benign duplicate writes with a plain
/// byte comparison.
pub struct EntityCodec;

impl EntityCodec {
    fn options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_limit(MAX_ENCODED_SIZE as u64)
            .reject_trailing_bytes()
    }

    /// Encode an entity for storage.
    pub fn encode(entity: &Entity) -> CodecResult<Vec<u8>> {
        let size = Self::options()
            .serialized_size(entity)
            .map_err(|e| CodecError::Serialization(e.to_string()))? as usize;
        if size + 1 > MAX_ENCODED_SIZE {
            return Err(CodecError::TooLarge {
                size: size + 1,
                max: MAX_ENCODED_SIZE,
            });
        }
        let payload = Self::options()
            .serialize(entity)
            .map_err(|e| CodecError::Serialization(e.to_string()))?;
        let mut buf = Vec::with_capacity(1 + payload.len());
        buf.push(FORMAT_TAG);
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode bytes read from the backend.
    pub fn decode(data: &[u8]) -> CodecResult<Entity> {
        let (&tag, payload) = data.split_first().ok_or(CodecError::Empty)?;
        if tag != FORMAT_TAG {
            return Err(CodecError::UnknownFormat(tag));
        }
        if data.len() > MAX_ENCODED_SIZE {
            return Err(CodecError::TooLarge {
                size: data.len(),
                max: MAX_ENCODED_SIZE,
            });
        }
        Self::options()
            .deserialize(payload)
            .map_err(|e| CodecError::Deserialization(e.to_string()))
    }
}
