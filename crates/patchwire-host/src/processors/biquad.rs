use core::f32::consts::PI;

use libm::{cosf, powf, sinf};

use super::{cents_to_ratio, invalid_field};
use crate::error::HostError;
use crate::node::{AudioParam, FieldValue};
use crate::processor::{ParamBlock, Processor};

/// Response shape of a [`BiquadFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    /// 12 dB/oct lowpass.
    #[default]
    Lowpass,
    /// 12 dB/oct highpass.
    Highpass,
    /// Constant 0 dB peak gain bandpass.
    Bandpass,
    /// Band-reject.
    Notch,
    /// Peaking EQ bell, uses `gain` in dB.
    Peaking,
}

impl FilterType {
    /// Parses a filter type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "lowpass" => Some(Self::Lowpass),
            "highpass" => Some(Self::Highpass),
            "bandpass" => Some(Self::Bandpass),
            "notch" => Some(Self::Notch),
            "peaking" => Some(Self::Peaking),
            _ => None,
        }
    }

    /// Name as accepted by [`from_name`](Self::from_name).
    pub fn name(self) -> &'static str {
        match self {
            Self::Lowpass => "lowpass",
            Self::Highpass => "highpass",
            Self::Bandpass => "bandpass",
            Self::Notch => "notch",
            Self::Peaking => "peaking",
        }
    }
}

/// RBJ cookbook biquad, Direct Form I.
///
/// Parameters: `frequency`, `Q`, `gain` (dB), `detune` (cents). Field: `type`.
/// Coefficients are recomputed only when the effective parameters change.
#[derive(Debug)]
pub struct BiquadFilter {
    sample_rate: f32,
    filter_type: FilterType,
    coeffs: [f32; 5],
    last: Option<(f32, f32, f32)>,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadFilter {
    /// Creates a lowpass filter.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            filter_type: FilterType::Lowpass,
            coeffs: [1.0, 0.0, 0.0, 0.0, 0.0],
            last: None,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn update_coefficients(&mut self, frequency: f32, q: f32, gain_db: f32) {
        if self.last == Some((frequency, q, gain_db)) {
            return;
        }
        self.last = Some((frequency, q, gain_db));

        let nyquist = self.sample_rate / 2.0;
        let f = frequency.clamp(1.0, nyquist * 0.999);
        let q = q.max(1.0e-4);
        let omega = 2.0 * PI * f / self.sample_rate;
        let (sin_w, cos_w) = (sinf(omega), cosf(omega));
        let alpha = sin_w / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::Lowpass => {
                let b = (1.0 - cos_w) / 2.0;
                (b, 1.0 - cos_w, b, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
            }
            FilterType::Highpass => {
                let b = (1.0 + cos_w) / 2.0;
                (b, -(1.0 + cos_w), b, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
            }
            FilterType::Bandpass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha),
            FilterType::Notch => (
                1.0,
                -2.0 * cos_w,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterType::Peaking => {
                let a = powf(10.0, gain_db / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w,
                    1.0 - alpha / a,
                )
            }
        };

        self.coeffs = [b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0];
    }
}

impl Processor for BiquadFilter {
    fn type_name(&self) -> &'static str {
        "BiquadFilter"
    }

    fn params(&self) -> Vec<AudioParam> {
        let nyquist = self.sample_rate / 2.0;
        vec![
            AudioParam::new("frequency", 350.0, 0.0, nyquist),
            AudioParam::new("Q", 1.0, -1.0e6, 1.0e6),
            AudioParam::new("gain", 0.0, -1.0e6, 1541.0),
            AudioParam::new("detune", 0.0, -153_600.0, 153_600.0),
        ]
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        (name == "type").then(|| FieldValue::from(self.filter_type.name()))
    }

    fn set_field(&mut self, name: &str, value: &FieldValue) -> Result<(), HostError> {
        if name != "type" {
            return Err(HostError::UnknownField {
                node_type: self.type_name(),
                field: name.to_string(),
            });
        }
        self.filter_type = value
            .as_str()
            .and_then(FilterType::from_name)
            .ok_or_else(|| invalid_field(name, "unknown filter type"))?;
        self.last = None;
        Ok(())
    }

    fn process(&mut self, input: &[f32], params: &ParamBlock<'_>, output: &mut [f32]) {
        for (i, (out, &x)) in output.iter_mut().zip(input).enumerate() {
            let freq = params.at(0, i) * cents_to_ratio(params.at(3, i));
            self.update_coefficients(freq, params.at(1, i), params.at(2, i));
            let [b0, b1, b2, a1, a2] = self.coeffs;
            let y = b0 * x + b1 * self.x1 + b2 * self.x2 - a1 * self.y1 - a2 * self.y2;
            self.x2 = self.x1;
            self.x1 = x;
            self.y2 = self.y1;
            self.y1 = if y.is_finite() { y } else { 0.0 };
            *out = self.y1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &mut BiquadFilter, input: &[f32], freq: f32) -> Vec<f32> {
        let n = input.len();
        let values = vec![vec![freq; n], vec![0.707; n], vec![0.0; n], vec![0.0; n]];
        let mut out = vec![0.0; n];
        filter.process(input, &ParamBlock::new(&values), &mut out);
        out
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = BiquadFilter::new(48000.0);
        let out = run(&mut f, &[1.0; 4800], 1000.0);
        assert!((out[4799] - 1.0).abs() < 0.01);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = BiquadFilter::new(48000.0);
        f.set_field("type", &FieldValue::from("highpass")).unwrap();
        let out = run(&mut f, &[1.0; 4800], 1000.0);
        assert!(out[4799].abs() < 0.01);
    }

    #[test]
    fn unknown_type_keeps_previous() {
        let mut f = BiquadFilter::new(48000.0);
        assert!(f.set_field("type", &FieldValue::from("comb")).is_err());
        assert_eq!(f.field("type"), Some(FieldValue::from("lowpass")));
    }
}
