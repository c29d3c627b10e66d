//! Node and edge identifiers, parameters and fields.

use std::fmt;

/// Identifier of a node inside an [`AudioContext`](crate::AudioContext).
///
/// Node IDs are assigned sequentially and never reused within a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNodeId(pub(crate) u32);

impl HostNodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HostNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostNodeId({})", self.0)
    }
}

/// Identifier of an edge inside an [`AudioContext`](crate::AudioContext).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostEdgeId(pub(crate) u32);

impl HostEdgeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HostEdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostEdgeId({})", self.0)
    }
}

/// Where an edge delivers its signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeTarget {
    /// Summed into the target's signal input.
    Input,
    /// Added to the named parameter of the target, per sample.
    Param(&'static str),
}

/// A continuously settable numeric parameter.
///
/// The effective per-sample value is the base value plus the sum of every
/// signal connected to the parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParam {
    name: &'static str,
    value: f32,
    default: f32,
    min: f32,
    max: f32,
}

impl AudioParam {
    /// Creates a parameter with its default value and nominal range.
    pub fn new(name: &'static str, default: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            value: default,
            default,
            min,
            max,
        }
    }

    /// Parameter name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current base value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Value at construction.
    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// Nominal `(min, max)` range.
    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Sets the base value, clamped to the nominal range.
    pub(crate) fn set(&mut self, value: f32) {
        self.value = value.clamp(self.min, self.max);
    }
}

/// Value of a non-parameter field (waveform type, loop flag, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Numeric field.
    Number(f64),
    /// Text or enumerated field.
    Text(String),
    /// Boolean flag.
    Bool(bool),
}

impl FieldValue {
    /// Numeric view; booleans map to 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(_) => None,
        }
    }

    /// Text view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view; numbers are true when non-zero.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Number(n) => Some(*n != 0.0),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Playback state of a startable source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Constructed, never started (or stopped and ready to start again).
    #[default]
    Idle,
    /// Producing output.
    Playing,
    /// Stopped explicitly or ran out of data.
    Ended,
}

/// Signal level of the last rendered block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Level {
    /// Root mean square, smoothed across blocks.
    pub rms: f32,
    /// Absolute peak of the last block.
    pub peak: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_clamps_to_range() {
        let mut p = AudioParam::new("gain", 1.0, 0.0, 10.0);
        p.set(20.0);
        assert_eq!(p.value(), 10.0);
        p.set(-1.0);
        assert_eq!(p.value(), 0.0);
        assert_eq!(p.default_value(), 1.0);
    }

    #[test]
    fn field_value_views() {
        assert_eq!(FieldValue::from(true).as_f64(), Some(1.0));
        assert_eq!(FieldValue::from("sine").as_str(), Some("sine"));
        assert_eq!(FieldValue::from(0.0).as_bool(), Some(false));
        assert!(FieldValue::from("x").as_f64().is_none());
    }
}
