//! Codec trait and implementations for persisted data.
//!
//! The roster store serializes its id set through a [`Codec`], so the
//! on-disk format can change without touching the store itself.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` so a codec can live inside long-lived,
/// shared stores.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`. Human-readable, which makes a
/// persisted roster easy to inspect and repair by hand.
///
/// ```rust
/// use tourney_protocol::{Codec, JsonCodec, MemberId};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&vec![MemberId(1), MemberId(2)]).unwrap();
/// assert_eq!(bytes, b"[1,2]");
/// let back: Vec<MemberId> = codec.decode(&bytes).unwrap();
/// assert_eq!(back, vec![MemberId(1), MemberId(2)]);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::MemberId;

    #[test]
    fn test_decode_truncated_input_is_decode_error() {
        let result: Result<Vec<MemberId>, _> = JsonCodec.decode(b"[1,2");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_wrong_shape_is_decode_error() {
        let result: Result<Vec<MemberId>, _> = JsonCodec.decode(b"{\"a\":1}");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
