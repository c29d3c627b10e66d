use super::{finite_number, invalid_field};
use crate::error::HostError;
use crate::node::{AudioParam, FieldValue};
use crate::processor::{ParamBlock, Processor};

/// Fractional delay line with linear interpolation.
///
/// Parameter: `delayTime` (seconds, clamped to the line's capacity).
/// Field: `maxDelayTime` (seconds); setting it reallocates and clears the line.
#[derive(Debug)]
pub struct Delay {
    sample_rate: f32,
    max_delay: f32,
    buffer: Vec<f32>,
    write_pos: usize,
}

impl Delay {
    /// Upper bound for `maxDelayTime`.
    pub const MAX_SECONDS: f32 = 180.0;

    /// Creates a delay line holding up to `max_seconds`.
    pub fn new(sample_rate: f32, max_seconds: f32) -> Self {
        let max_delay = max_seconds.clamp(0.0, Self::MAX_SECONDS);
        Self {
            sample_rate,
            max_delay,
            buffer: vec![0.0; (sample_rate * max_delay) as usize + 2],
            write_pos: 0,
        }
    }

    #[inline]
    fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let d = delay_samples.clamp(0.0, (len - 2) as f32);
        let whole = d as usize;
        let frac = d - whole as f32;
        let a = self.buffer[(self.write_pos + len - whole) % len];
        let b = self.buffer[(self.write_pos + len - whole - 1) % len];
        a + (b - a) * frac
    }
}

impl Processor for Delay {
    fn type_name(&self) -> &'static str {
        "Delay"
    }

    fn params(&self) -> Vec<AudioParam> {
        vec![AudioParam::new("delayTime", 0.0, 0.0, Self::MAX_SECONDS)]
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        (name == "maxDelayTime").then(|| FieldValue::Number(f64::from(self.max_delay)))
    }

    fn set_field(&mut self, name: &str, value: &FieldValue) -> Result<(), HostError> {
        if name != "maxDelayTime" {
            return Err(HostError::UnknownField {
                node_type: self.type_name(),
                field: name.to_string(),
            });
        }
        let seconds = finite_number(name, value)? as f32;
        if seconds <= 0.0 || seconds > Self::MAX_SECONDS {
            return Err(invalid_field(name, "out of range"));
        }
        *self = Self::new(self.sample_rate, seconds);
        Ok(())
    }

    fn process(&mut self, input: &[f32], params: &ParamBlock<'_>, output: &mut [f32]) {
        let len = self.buffer.len();
        for (i, (out, &x)) in output.iter_mut().zip(input).enumerate() {
            self.buffer[self.write_pos] = x;
            *out = self.read(params.at(0, i) * self.sample_rate);
            self.write_pos = (self.write_pos + 1) % len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_impulse_by_whole_samples() {
        let mut d = Delay::new(1000.0, 1.0);
        let mut input = vec![0.0; 20];
        input[0] = 1.0;
        let values = vec![vec![0.01; 20]];
        let mut out = vec![0.0; 20];
        d.process(&input, &ParamBlock::new(&values), &mut out);
        assert_eq!(out[10], 1.0);
        assert_eq!(out.iter().filter(|s| **s != 0.0).count(), 1);
    }

    #[test]
    fn zero_delay_is_identity() {
        let mut d = Delay::new(1000.0, 0.1);
        let input = [0.25, -0.5, 0.75];
        let values = vec![vec![0.0; 3]];
        let mut out = vec![0.0; 3];
        d.process(&input, &ParamBlock::new(&values), &mut out);
        assert_eq!(out, input);
    }

    #[test]
    fn max_delay_field_reallocates() {
        let mut d = Delay::new(1000.0, 1.0);
        d.set_field("maxDelayTime", &FieldValue::Number(2.0)).unwrap();
        assert_eq!(d.field("maxDelayTime"), Some(FieldValue::Number(2.0)));
        assert!(d.set_field("maxDelayTime", &FieldValue::Number(-1.0)).is_err());
    }
}
