//! Rate conversions
//!
//! Every parameter owns a conversion that turns raw channel values into
//! physical values. Rational conversions apply a linear scale; lookup
//! conversions map integer codes to labels and pass the code through as
//! the physical value.

use serde::{Deserialize, Serialize};

use super::data::PhysicalRange;

/// One code-to-label mapping in a lookup conversion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupEntry {
    /// Raw channel code
    pub raw: f64,
    /// Label shown for this code
    pub label: String,
}

impl LookupEntry {
    pub fn new(raw: f64, label: impl Into<String>) -> Self {
        Self {
            raw,
            label: label.into(),
        }
    }
}

/// The mapping a conversion applies to raw values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ConversionKind {
    /// Linear scale: physical = raw * factor + offset
    Rational { factor: f64, offset: f64 },
    /// Code-to-label table with a default for unmapped codes
    Lookup {
        entries: Vec<LookupEntry>,
        default: String,
    },
}

/// A named conversion shared between a parameter and its channels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversion {
    /// Unique identifier within the session
    pub identifier: String,
    /// Display format hint (printf-style)
    pub format: String,
    /// Engineering units of the physical value
    pub units: String,
    /// Expected physical bounds
    pub physical_range: PhysicalRange,
    pub kind: ConversionKind,
}

impl Conversion {
    /// Create an identity rational conversion
    pub fn rational(
        identifier: impl Into<String>,
        units: impl Into<String>,
        physical_range: PhysicalRange,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            format: "%5.2f".to_string(),
            units: units.into(),
            physical_range,
            kind: ConversionKind::Rational {
                factor: 1.0,
                offset: 0.0,
            },
        }
    }

    /// Create a lookup conversion
    ///
    /// The physical range is derived from the lowest and highest codes
    /// unless overridden later.
    pub fn lookup(
        identifier: impl Into<String>,
        entries: Vec<LookupEntry>,
        default: impl Into<String>,
    ) -> Self {
        let min = entries.iter().map(|e| e.raw).fold(f64::INFINITY, f64::min);
        let max = entries
            .iter()
            .map(|e| e.raw)
            .fold(f64::NEG_INFINITY, f64::max);
        let physical_range = if entries.is_empty() {
            PhysicalRange::new(0.0, 0.0)
        } else {
            PhysicalRange::new(min, max)
        };
        Self {
            identifier: identifier.into(),
            format: "%s".to_string(),
            units: String::new(),
            physical_range,
            kind: ConversionKind::Lookup {
                entries,
                default: default.into(),
            },
        }
    }

    /// Builder: set the linear scale of a rational conversion
    ///
    /// No effect on lookup conversions.
    pub fn linear_scale(mut self, factor: f64, offset: f64) -> Self {
        if let ConversionKind::Rational {
            factor: f,
            offset: o,
        } = &mut self.kind
        {
            *f = factor;
            *o = offset;
        }
        self
    }

    /// Builder: override the physical range
    pub fn physical_range(mut self, range: PhysicalRange) -> Self {
        self.physical_range = range;
        self
    }

    /// Builder: override the display format
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Convert a raw channel value to its physical value
    pub fn apply(&self, raw: f64) -> f64 {
        match &self.kind {
            ConversionKind::Rational { factor, offset } => raw * factor + offset,
            // Lookup codes pass through; the label carries the meaning
            ConversionKind::Lookup { .. } => raw,
        }
    }

    /// Decode the label for a raw code
    ///
    /// Returns None for rational conversions. Unmapped codes get the
    /// default label.
    pub fn label_for(&self, raw: f64) -> Option<String> {
        match &self.kind {
            ConversionKind::Rational { .. } => None,
            ConversionKind::Lookup { entries, default } => Some(
                entries
                    .iter()
                    .find(|e| e.raw == raw)
                    .map(|e| e.label.clone())
                    .unwrap_or_else(|| default.clone()),
            ),
        }
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self.kind, ConversionKind::Lookup { .. })
    }
}
