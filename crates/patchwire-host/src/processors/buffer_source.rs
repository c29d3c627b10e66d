use super::cents_to_ratio;
use crate::buffer::AudioBuffer;
use crate::error::HostError;
use crate::node::{AudioParam, FieldValue};
use crate::processor::{ParamBlock, Processor};

/// Plays an [`AudioBuffer`], optionally looping.
///
/// Parameters: `playbackRate`, `detune` (cents). Fields: `loop`, and the
/// read-only `loaded` / `duration`. Without a buffer the source is silent.
#[derive(Debug)]
pub struct BufferSource {
    sample_rate: f32,
    buffer: Option<AudioBuffer>,
    looping: bool,
    position: f64,
    finished: bool,
}

impl BufferSource {
    /// Creates an empty, non-looping source.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            buffer: None,
            looping: false,
            position: 0.0,
            finished: false,
        }
    }
}

impl Processor for BufferSource {
    fn type_name(&self) -> &'static str {
        "BufferSource"
    }

    fn params(&self) -> Vec<AudioParam> {
        vec![
            AudioParam::new("playbackRate", 1.0, -1.0e6, 1.0e6),
            AudioParam::new("detune", 0.0, -153_600.0, 153_600.0),
        ]
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "loop" => Some(FieldValue::Bool(self.looping)),
            "loaded" => Some(FieldValue::Bool(self.buffer.is_some())),
            "duration" => Some(FieldValue::Number(f64::from(
                self.buffer.as_ref().map_or(0.0, AudioBuffer::duration),
            ))),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: &FieldValue) -> Result<(), HostError> {
        match name {
            "loop" => {
                self.looping = value.as_bool().ok_or_else(|| HostError::InvalidFieldValue {
                    field: name.to_string(),
                    reason: "expected a boolean".to_string(),
                })?;
                Ok(())
            }
            "loaded" | "duration" => Err(HostError::InvalidFieldValue {
                field: name.to_string(),
                reason: "read-only".to_string(),
            }),
            _ => Err(HostError::UnknownField {
                node_type: self.type_name(),
                field: name.to_string(),
            }),
        }
    }

    fn is_source(&self) -> bool {
        true
    }

    fn has_input(&self) -> bool {
        false
    }

    fn on_start(&mut self) {
        self.position = 0.0;
        self.finished = false;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn set_buffer(&mut self, buffer: AudioBuffer) -> Result<(), HostError> {
        self.buffer = Some(buffer);
        self.position = 0.0;
        Ok(())
    }

    fn process(&mut self, _input: &[f32], params: &ParamBlock<'_>, output: &mut [f32]) {
        let Some(buffer) = self.buffer.as_ref().filter(|b| !b.is_empty()) else {
            output.fill(0.0);
            return;
        };
        let data = buffer.samples();
        let len = data.len() as f64;
        let base_step = f64::from(buffer.sample_rate() / self.sample_rate);

        for (i, out) in output.iter_mut().enumerate() {
            if self.finished {
                *out = 0.0;
                continue;
            }
            let idx = self.position as usize;
            let frac = (self.position - idx as f64) as f32;
            let a = data[idx.min(data.len() - 1)];
            let b = data[(idx + 1) % data.len()];
            *out = a + (b - a) * frac;

            let rate = params.at(0, i) * cents_to_ratio(params.at(1, i));
            self.position += base_step * f64::from(rate);
            if self.position >= len || self.position < 0.0 {
                if self.looping {
                    self.position = self.position.rem_euclid(len);
                } else {
                    self.finished = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(rate: f32, n: usize) -> Vec<Vec<f32>> {
        vec![vec![rate; n], vec![0.0; n]]
    }

    #[test]
    fn silent_without_buffer() {
        let mut src = BufferSource::new(100.0);
        let mut out = vec![1.0; 8];
        src.process(&[], &ParamBlock::new(&block(1.0, 8)), &mut out);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(src.field("loaded"), Some(FieldValue::Bool(false)));
    }

    #[test]
    fn one_shot_finishes() {
        let mut src = BufferSource::new(100.0);
        src.set_buffer(AudioBuffer::from_samples(vec![0.5; 4], 100.0))
            .unwrap();
        let mut out = vec![0.0; 8];
        src.process(&[], &ParamBlock::new(&block(1.0, 8)), &mut out);
        assert_eq!(&out[..4], &[0.5; 4]);
        assert_eq!(&out[4..], &[0.0; 4]);
        assert!(src.is_finished());
    }

    #[test]
    fn looping_wraps() {
        let mut src = BufferSource::new(100.0);
        src.set_field("loop", &FieldValue::Bool(true)).unwrap();
        src.set_buffer(AudioBuffer::from_samples(vec![1.0, 0.0], 100.0))
            .unwrap();
        let mut out = vec![0.0; 6];
        src.process(&[], &ParamBlock::new(&block(1.0, 6)), &mut out);
        assert_eq!(out, vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        assert!(!src.is_finished());
    }

    #[test]
    fn loaded_is_read_only() {
        let mut src = BufferSource::new(100.0);
        assert!(src.set_field("loaded", &FieldValue::Bool(true)).is_err());
    }
}
