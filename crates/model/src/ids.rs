//! Fixed-width trace and span identifiers

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing an identifier from hex text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// 16-byte trace identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId([u8; 16]);

impl TraceId {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Returns the trace ID as a lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TraceId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        let actual = bytes.len();
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|_| IdParseError::Length { expected: 16, actual })?;
        Ok(Self(bytes))
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// 8-byte span identifier
///
/// Storage keeps span IDs as signed 64-bit integers. The conversion is a
/// big-endian reinterpretation of the bits, so it is lossless in both
/// directions. The all-zero ID is the "absent" sentinel used for spans
/// without a parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId([u8; 8]);

impl SpanId {
    /// Sentinel meaning "no span"
    pub const EMPTY: SpanId = SpanId([0; 8]);

    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Reinterprets a stored 64-bit span ID
    pub const fn from_i64(value: i64) -> Self {
        Self(value.to_be_bytes())
    }

    /// Maps a nullable stored span ID, with NULL becoming [`SpanId::EMPTY`]
    pub fn from_nullable(value: Option<i64>) -> Self {
        value.map(Self::from_i64).unwrap_or(Self::EMPTY)
    }

    /// Inverse of [`SpanId::from_i64`]
    pub const fn to_i64(self) -> i64 {
        i64::from_be_bytes(self.0)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for SpanId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        let actual = bytes.len();
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| IdParseError::Length { expected: 8, actual })?;
        Ok(Self(bytes))
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
