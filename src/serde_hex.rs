//! Serde helpers to serialize/deserialize block digests as 0x-prefixed hex strings.
//!
//! - `hex32`: for `[u8; 32]` with exact length enforcement.
//! - `opt_hex32`: for `Option<[u8; 32]>`, where `None` is the empty string.
//!   This is how the genesis block's missing previous hash appears on the wire.
//!
//! Encoding is always lowercase with a `0x` prefix.

use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

/// Errors that can occur during hex (de)serialization.
#[derive(Debug, Error)]
pub enum HexSerdeError {
    /// Input string must begin with `0x` prefix.
    #[error("missing 0x prefix")]
    MissingPrefix,

    /// Input contained non-hex characters or odd-length digits.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Decoded byte length did not match the digest size.
    #[error("length mismatch: expected {expected} bytes, got {actual} bytes")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Render a digest the way it appears on the wire and in log fields.
pub fn encode_prefixed(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    out.push_str(&hex::encode(bytes));
    out
}

/// Parse a `0x`-prefixed 32-byte digest.
pub fn decode_prefixed32(s: &str) -> Result<[u8; 32], HexSerdeError> {
    let hex_part = s.strip_prefix("0x").ok_or(HexSerdeError::MissingPrefix)?;
    let bytes = hex::decode(hex_part).map_err(|e| HexSerdeError::InvalidHex(e.to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| HexSerdeError::LengthMismatch {
        expected: 32,
        actual: bytes.len(),
    })
}

/// Serde helpers for `[u8; 32]` as 0x-hex.
pub mod hex32 {
    use super::*;

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&encode_prefixed(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        decode_prefixed32(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for `Option<[u8; 32]>` as 0x-hex, with `""` standing for `None`.
pub mod opt_hex32 {
    use super::*;

    pub fn serialize<S>(bytes: &Option<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_str(&encode_prefixed(b)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(None);
        }
        decode_prefixed32(&s).map(Some).map_err(serde::de::Error::custom)
    }
}
