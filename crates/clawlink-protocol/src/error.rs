//! Error types for the protocol layer.
//!
//! Encoding and decoding fail for different reasons and are handled
//! differently by the client (a bad outbound frame is a local bug, a bad
//! inbound frame is dropped and logged), so each direction gets its own
//! enum instead of one shared error type.

use crate::PackageType;

/// An outbound envelope could not be turned into bytes.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// A required field of the variant is empty.
    #[error("{tag} requires field `{field}`")]
    MissingField { tag: PackageType, field: &'static str },

    /// A field holds a value outside its allowed range (e.g. an unknown
    /// direction opcode).
    #[error("{tag} field `{field}` has invalid value {value}")]
    InvalidField {
        tag: PackageType,
        field: &'static str,
        value: i32,
    },

    /// JSON serialization failed.
    #[cfg(feature = "json")]
    #[error("json encode failed: {0}")]
    Json(#[source] serde_json::Error),
}

/// An inbound frame is malformed.
///
/// None of these are fatal to a connection: the frame is dropped and the
/// next one is read.
#[derive(Debug, thiserror::Error)]
pub enum DecodingError {
    /// The bytes are not a valid protobuf `Package` (truncated, garbled).
    #[error("malformed frame: {0}")]
    Malformed(#[from] prost::DecodeError),

    /// The tag number is not one of the known package types.
    #[error("unknown package type {0}")]
    UnknownTag(i32),

    /// The tag names a variant but no payload is present.
    #[error("{0} frame carries no payload")]
    MissingPayload(PackageType),

    /// Exactly one payload is present, but for a different variant.
    #[error("{tag} frame carries a {found} payload")]
    PayloadMismatch { tag: PackageType, found: PackageType },

    /// More than one payload field is populated.
    #[error("{tag} frame carries {count} payloads")]
    MultiplePayloads { tag: PackageType, count: usize },

    /// JSON deserialization failed.
    #[cfg(feature = "json")]
    #[error("json decode failed: {0}")]
    Json(#[source] serde_json::Error),
}
