//! Core data types for session samples
//!
//! This module defines the fundamental value types:
//! - `DataType`: on-disk representation of one raw sample
//! - `PhysicalRange`: expected bounds of a parameter in physical units
//! - `DataPoint`: one timestamped sample returned from a query

use serde::{Deserialize, Serialize};

/// On-disk representation of a single raw sample
///
/// All values are stored little-endian and widen losslessly to f64
/// (integer types are at most 64-bit, so `i64`/`u64` extremes may round).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Signed8,
    Signed16,
    Signed32,
    Signed64,
    Unsigned8,
    Unsigned16,
    Unsigned32,
    Unsigned64,
    Float32,
    Float64,
}

impl DataType {
    /// Size of one encoded sample in bytes
    pub fn size(&self) -> usize {
        match self {
            DataType::Signed8 | DataType::Unsigned8 => 1,
            DataType::Signed16 | DataType::Unsigned16 => 2,
            DataType::Signed32 | DataType::Unsigned32 | DataType::Float32 => 4,
            DataType::Signed64 | DataType::Unsigned64 | DataType::Float64 => 8,
        }
    }

    /// Append one value to a raw payload buffer
    ///
    /// Out-of-range values saturate at the type bounds.
    pub fn encode_into(&self, value: f64, out: &mut Vec<u8>) {
        match self {
            DataType::Signed8 => out.extend_from_slice(&(value as i8).to_le_bytes()),
            DataType::Signed16 => out.extend_from_slice(&(value as i16).to_le_bytes()),
            DataType::Signed32 => out.extend_from_slice(&(value as i32).to_le_bytes()),
            DataType::Signed64 => out.extend_from_slice(&(value as i64).to_le_bytes()),
            DataType::Unsigned8 => out.extend_from_slice(&(value as u8).to_le_bytes()),
            DataType::Unsigned16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
            DataType::Unsigned32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
            DataType::Unsigned64 => out.extend_from_slice(&(value as u64).to_le_bytes()),
            DataType::Float32 => out.extend_from_slice(&(value as f32).to_le_bytes()),
            DataType::Float64 => out.extend_from_slice(&value.to_le_bytes()),
        }
    }

    /// Decode one value from the front of a raw slice
    ///
    /// The slice must hold at least `size()` bytes.
    pub fn decode(&self, bytes: &[u8]) -> f64 {
        fn arr<const N: usize>(bytes: &[u8]) -> [u8; N] {
            let mut buf = [0u8; N];
            buf.copy_from_slice(&bytes[..N]);
            buf
        }
        match self {
            DataType::Signed8 => i8::from_le_bytes(arr(bytes)) as f64,
            DataType::Signed16 => i16::from_le_bytes(arr(bytes)) as f64,
            DataType::Signed32 => i32::from_le_bytes(arr(bytes)) as f64,
            DataType::Signed64 => i64::from_le_bytes(arr(bytes)) as f64,
            DataType::Unsigned8 => u8::from_le_bytes(arr(bytes)) as f64,
            DataType::Unsigned16 => u16::from_le_bytes(arr(bytes)) as f64,
            DataType::Unsigned32 => u32::from_le_bytes(arr(bytes)) as f64,
            DataType::Unsigned64 => u64::from_le_bytes(arr(bytes)) as f64,
            DataType::Float32 => f32::from_le_bytes(arr(bytes)) as f64,
            DataType::Float64 => f64::from_le_bytes(arr(bytes)),
        }
    }

    /// Decode a full payload of consecutive samples
    ///
    /// Trailing bytes that do not fill a whole sample are ignored;
    /// payload lengths are validated at write time.
    pub fn decode_all(&self, payload: &[u8]) -> Vec<f64> {
        payload
            .chunks_exact(self.size())
            .map(|chunk| self.decode(chunk))
            .collect()
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Signed8 => write!(f, "i8"),
            DataType::Signed16 => write!(f, "i16"),
            DataType::Signed32 => write!(f, "i32"),
            DataType::Signed64 => write!(f, "i64"),
            DataType::Unsigned8 => write!(f, "u8"),
            DataType::Unsigned16 => write!(f, "u16"),
            DataType::Unsigned32 => write!(f, "u32"),
            DataType::Unsigned64 => write!(f, "u64"),
            DataType::Float32 => write!(f, "f32"),
            DataType::Float64 => write!(f, "f64"),
        }
    }
}

/// Expected physical bounds of a parameter, in engineering units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhysicalRange {
    pub min: f64,
    pub max: f64,
}

impl PhysicalRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// A single timestamped sample returned from a query
///
/// The value is always in physical units (rate conversion applied).
/// Text parameters additionally carry the decoded label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    /// Tick timestamp (nanoseconds since midnight)
    pub timestamp: i64,
    /// Physical value
    pub value: f64,
    /// Decoded label for text parameters
    #[serde(default)]
    pub label: Option<String>,
}

impl DataPoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value,
            label: None,
        }
    }

    pub fn with_label(timestamp: i64, value: f64, label: impl Into<String>) -> Self {
        Self {
            timestamp,
            value,
            label: Some(label.into()),
        }
    }
}
