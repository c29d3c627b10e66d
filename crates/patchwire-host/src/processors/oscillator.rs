use core::f32::consts::PI;

use libm::sinf;

use super::{cents_to_ratio, invalid_field};
use crate::error::HostError;
use crate::node::{AudioParam, FieldValue};
use crate::processor::{ParamBlock, Processor};

/// Oscillator waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    /// Pure sine.
    #[default]
    Sine,
    /// Band-limited square.
    Square,
    /// Band-limited rising sawtooth.
    Sawtooth,
    /// Triangle.
    Triangle,
}

impl Waveform {
    /// Parses a waveform name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sine" => Some(Self::Sine),
            "square" => Some(Self::Square),
            "sawtooth" => Some(Self::Sawtooth),
            "triangle" => Some(Self::Triangle),
            _ => None,
        }
    }

    /// Name as accepted by [`from_name`](Self::from_name).
    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Square => "square",
            Self::Sawtooth => "sawtooth",
            Self::Triangle => "triangle",
        }
    }
}

/// Phase-accumulator oscillator with PolyBLEP edges.
///
/// Parameters: `frequency` (Hz), `detune` (cents). Field: `type`.
#[derive(Debug)]
pub struct Oscillator {
    sample_rate: f32,
    waveform: Waveform,
    phase: f32,
}

impl Oscillator {
    /// Creates a sine oscillator.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            waveform: Waveform::Sine,
            phase: 0.0,
        }
    }

    #[inline]
    fn sample(&self, dt: f32) -> f32 {
        let p = self.phase;
        match self.waveform {
            Waveform::Sine => sinf(2.0 * PI * p),
            Waveform::Sawtooth => 2.0 * p - 1.0 - poly_blep(p, dt),
            Waveform::Square => {
                let naive = if p < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(p, dt) - poly_blep((p + 0.5).fract(), dt)
            }
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        }
    }
}

/// Second-order PolyBLEP residual around a phase wrap.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let n = t / dt;
        n + n - n * n - 1.0
    } else if t > 1.0 - dt {
        let n = (t - 1.0) / dt;
        n * n + n + n + 1.0
    } else {
        0.0
    }
}

impl Processor for Oscillator {
    fn type_name(&self) -> &'static str {
        "Oscillator"
    }

    fn params(&self) -> Vec<AudioParam> {
        let nyquist = self.sample_rate / 2.0;
        vec![
            AudioParam::new("frequency", 440.0, -nyquist, nyquist),
            AudioParam::new("detune", 0.0, -153_600.0, 153_600.0),
        ]
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        (name == "type").then(|| FieldValue::from(self.waveform.name()))
    }

    fn set_field(&mut self, name: &str, value: &FieldValue) -> Result<(), HostError> {
        if name != "type" {
            return Err(HostError::UnknownField {
                node_type: self.type_name(),
                field: name.to_string(),
            });
        }
        let waveform = value
            .as_str()
            .and_then(Waveform::from_name)
            .ok_or_else(|| invalid_field(name, "unknown waveform"))?;
        self.waveform = waveform;
        Ok(())
    }

    fn is_source(&self) -> bool {
        true
    }

    fn has_input(&self) -> bool {
        false
    }

    fn on_start(&mut self) {
        self.phase = 0.0;
    }

    fn process(&mut self, _input: &[f32], params: &ParamBlock<'_>, output: &mut [f32]) {
        for (i, out) in output.iter_mut().enumerate() {
            let freq = params.at(0, i) * cents_to_ratio(params.at(1, i));
            let dt = (freq / self.sample_rate).abs().min(0.5);
            *out = self.sample(dt);
            self.phase = (self.phase + freq / self.sample_rate).rem_euclid(1.0);
            if !self.phase.is_finite() {
                self.phase = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(osc: &mut Oscillator, freq: f32, frames: usize) -> Vec<f32> {
        let values = vec![vec![freq; frames], vec![0.0; frames]];
        let block = ParamBlock::new(&values);
        let mut out = vec![0.0; frames];
        osc.process(&[], &block, &mut out);
        out
    }

    #[test]
    fn sine_starts_at_zero_and_peaks_at_quarter() {
        let mut osc = Oscillator::new(48000.0);
        let out = render(&mut osc, 1000.0, 48);
        assert!(out[0].abs() < 1e-6);
        assert!((out[12] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn waveforms_stay_bounded() {
        for name in ["sine", "square", "sawtooth", "triangle"] {
            let mut osc = Oscillator::new(48000.0);
            osc.set_field("type", &FieldValue::from(name)).unwrap();
            let out = render(&mut osc, 3000.0, 4800);
            let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!(peak <= 1.1, "{name} peak {peak}");
            assert!(peak > 0.5, "{name} too quiet");
        }
    }

    #[test]
    fn rejects_unknown_waveform() {
        let mut osc = Oscillator::new(48000.0);
        let err = osc.set_field("type", &FieldValue::from("wobble"));
        assert!(matches!(err, Err(HostError::InvalidFieldValue { .. })));
        assert_eq!(osc.field("type"), Some(FieldValue::from("sine")));
    }

    #[test]
    fn detune_of_one_octave_doubles_frequency() {
        assert!((cents_to_ratio(1200.0) - 2.0).abs() < 1e-5);
    }
}
