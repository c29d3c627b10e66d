use super::finite_number;
use crate::error::HostError;
use crate::node::{FieldValue, Level};
use crate::processor::{ParamBlock, Processor};

/// Pass-through level meter.
///
/// Field: `smoothing` in `[0, 1]`, the weight of the previous RMS reading.
#[derive(Debug, Default)]
pub struct Analyser {
    smoothing: f32,
    level: Level,
}

impl Analyser {
    /// Creates an analyser with the conventional 0.8 smoothing.
    pub fn new() -> Self {
        Self {
            smoothing: 0.8,
            level: Level::default(),
        }
    }
}

impl Processor for Analyser {
    fn type_name(&self) -> &'static str {
        "Analyser"
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        (name == "smoothing").then(|| FieldValue::Number(f64::from(self.smoothing)))
    }

    fn set_field(&mut self, name: &str, value: &FieldValue) -> Result<(), HostError> {
        if name != "smoothing" {
            return Err(HostError::UnknownField {
                node_type: self.type_name(),
                field: name.to_string(),
            });
        }
        self.smoothing = (finite_number(name, value)? as f32).clamp(0.0, 1.0);
        Ok(())
    }

    fn process(&mut self, input: &[f32], _params: &ParamBlock<'_>, output: &mut [f32]) {
        output.copy_from_slice(input);
        if input.is_empty() {
            return;
        }
        let sum_sq: f32 = input.iter().map(|s| s * s).sum();
        let rms = (sum_sq / input.len() as f32).sqrt();
        let peak = input.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        self.level = Level {
            rms: self.smoothing * self.level.rms + (1.0 - self.smoothing) * rms,
            peak,
        };
    }

    fn level(&self) -> Option<Level> {
        Some(self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_rms_and_peak() {
        let mut a = Analyser::new();
        a.set_field("smoothing", &FieldValue::Number(0.0)).unwrap();
        let input = [1.0, -1.0, 1.0, -1.0];
        let mut out = [0.0; 4];
        a.process(&input, &ParamBlock::new(&[]), &mut out);
        assert_eq!(out, input);
        let level = a.level().unwrap();
        assert!((level.rms - 1.0).abs() < 1e-6);
        assert_eq!(level.peak, 1.0);
    }
}
