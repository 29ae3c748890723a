//! Codec trait and implementations for serializing/deserializing envelopes.
//!
//! A "codec" (coder/decoder) converts between [`Envelope`]s and raw bytes.
//! The client doesn't care HOW a frame is serialized; it only needs
//! something that implements [`Codec`]. The production format is
//! [`ProtobufCodec`]; [`JsonCodec`] speaks the same schema as readable
//! JSON for debugging against a local simulator.
//!
//! Both codecs share the envelope validation rules, so a frame that one
//! rejects the other rejects too.

use prost::Message;

use crate::envelope::Package;
use crate::{DecodingError, EncodingError, Envelope};

/// Encodes envelopes to bytes and decodes bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → the codec is shared with the client's background
///   task, which Tokio may run on any worker thread.
/// - `'static` → it owns everything it needs and can live as long as
///   the client.
///
/// Decoding is pure: it never touches connection or session state.
pub trait Codec: Send + Sync + 'static {
    /// Serializes an envelope.
    ///
    /// # Errors
    /// Returns [`EncodingError`] if the payload is missing a required field
    /// or holds an out-of-range opcode.
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, EncodingError>;

    /// Parses one frame.
    ///
    /// # Errors
    /// Returns [`DecodingError`] on truncated input, an unknown tag, or a
    /// tag/payload mismatch.
    fn decode(&self, data: &[u8]) -> Result<Envelope, DecodingError>;
}

// ---------------------------------------------------------------------------
// ProtobufCodec
// ---------------------------------------------------------------------------

/// The wire codec: one protobuf `Package` per frame.
///
/// Frames are self-delimited by the transport (one WebSocket binary
/// message each), so no length prefix is added.
///
/// ```rust
/// use clawlink_protocol::{Codec, Envelope, HeartMessage, ProtobufCodec};
///
/// let codec = ProtobufCodec;
/// let heart = Envelope::Heart(HeartMessage { user_id: "u1".into() });
///
/// let bytes = codec.encode(&heart).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), heart);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufCodec;

impl Codec for ProtobufCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, EncodingError> {
        envelope.validate()?;
        Ok(Package::from(envelope.clone()).encode_to_vec())
    }

    fn decode(&self, data: &[u8]) -> Result<Envelope, DecodingError> {
        let package = Package::decode(data)?;
        Envelope::try_from(package)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that writes the same `Package` schema as JSON, using the
/// protocol's original field names:
///
/// ```json
/// {"packageType":4,"heartMessage":{"userID":"u1"}}
/// ```
///
/// This is behind the `json` feature flag (enabled by default).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, EncodingError> {
        envelope.validate()?;
        serde_json::to_vec(&Package::from(envelope.clone())).map_err(EncodingError::Json)
    }

    fn decode(&self, data: &[u8]) -> Result<Envelope, DecodingError> {
        let package: Package = serde_json::from_slice(data).map_err(DecodingError::Json)?;
        Envelope::try_from(package)
    }
}
