//! Property values carried by visual nodes and applied to live units.
//!
//! A [`PropertyValue`] is the untyped payload of a property map entry. The
//! declared [`PropertyKind`](crate::PropertyKind) of the matching
//! [`PropertySpec`](crate::PropertySpec) decides how a value is validated and
//! coerced before it reaches a live unit.
//!
//! Values serialize untagged, so a property map round-trips through JSON as a
//! plain object: `{"frequency": 440.0, "type": "sine", "autostart": true}`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A single property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag (e.g. `autostart`, `loop`).
    Bool(bool),
    /// Numeric value. Integers are carried as `f64` as well.
    Number(f64),
    /// Free text or an enumerated option name.
    Text(String),
}

impl PropertyValue {
    /// Returns the numeric payload, if this is a number.
    ///
    /// Booleans convert to `0.0`/`1.0`, text is parsed as a float when possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Returns the text payload, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    ///
    /// Numbers are truthy when non-zero; the strings `"true"`/`"false"` are accepted.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(*n != 0.0),
            Self::Text(s) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }

    /// Returns `true` for numbers that are NaN or infinite.
    pub fn is_non_finite_number(&self) -> bool {
        matches!(self, Self::Number(n) if !n.is_finite())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
