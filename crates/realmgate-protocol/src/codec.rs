//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The router never touches serde directly; it goes through a [`Codec`]
//! so the framing format can change without touching the handshake or
//! dispatch code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `DeserializeOwned` means decoded values own their data, so the input
/// buffer can be dropped right after decoding.
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

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use realmgate_protocol::{Codec, HelloDetails, JsonCodec, Message};
///
/// let codec = JsonCodec;
/// let hello = Message::Hello(HelloDetails::new("realm1", &["ticket"], Some("peter")));
///
/// let bytes = codec.encode(&hello).unwrap();
/// let decoded: Message = codec.decode(&bytes).unwrap();
/// assert_eq!(hello, decoded);
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
    use crate::{Message, RequestId};

    #[test]
    fn test_json_codec_decodes_text_frame_from_browser() {
        let frame = br#"{"type":"Call","request":7,"procedure":"com.timeservice.now","args":[]}"#;
        let msg: Message = JsonCodec.decode(frame).unwrap();
        assert_eq!(
            msg,
            Message::Call {
                request: RequestId(7),
                procedure: "com.timeservice.now".into(),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_json_codec_decode_error_is_decode_variant() {
        let result: Result<Message, _> = JsonCodec.decode(b"{\"type\":");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
