//! Built-in processors, one per host constructor.

mod analyser;
mod biquad;
mod buffer_source;
mod constant;
mod delay;
mod destination;
mod gain;
mod oscillator;

pub use analyser::Analyser;
pub use biquad::{BiquadFilter, FilterType};
pub use buffer_source::BufferSource;
pub use constant::ConstantSource;
pub use delay::Delay;
pub use destination::Destination;
pub use gain::Gain;
pub use oscillator::{Oscillator, Waveform};

use crate::error::HostError;
use crate::node::FieldValue;

/// Error for a field given the wrong kind of value.
pub(crate) fn invalid_field(field: &str, reason: impl Into<String>) -> HostError {
    HostError::InvalidFieldValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Reads a finite number out of a field value.
pub(crate) fn finite_number(field: &str, value: &FieldValue) -> Result<f64, HostError> {
    match value.as_f64() {
        Some(n) if n.is_finite() => Ok(n),
        Some(_) => Err(invalid_field(field, "value must be finite")),
        None => Err(invalid_field(field, "expected a number")),
    }
}

/// Converts detune in cents to a frequency ratio.
#[inline]
pub(crate) fn cents_to_ratio(cents: f32) -> f32 {
    libm::exp2f(cents / 1200.0)
}
