//! Sample buffers for buffer-backed sources.
//!
//! Buffers are mono `f32` at their own sample rate; playback resamples by
//! linear interpolation. Noise buffers are synthesized deterministically from a
//! seed so that a rebuilt graph sounds identical.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::error::HostError;

/// Spectral color of a generated noise buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseColor {
    /// Flat spectrum.
    #[default]
    White,
    /// -3 dB/octave (Paul Kellet's economy filter).
    Pink,
    /// -6 dB/octave (leaky integrated white noise).
    Brown,
}

impl NoiseColor {
    /// Parses a color name (`"white"`, `"pink"`, `"brown"`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "white" => Some(Self::White),
            "pink" => Some(Self::Pink),
            "brown" => Some(Self::Brown),
            _ => None,
        }
    }
}

/// Decoded or generated mono audio data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: f32,
}

impl AudioBuffer {
    /// Wraps raw samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Generates `seconds` of noise of the given color.
    pub fn noise(color: NoiseColor, seconds: f32, sample_rate: f32, seed: u32) -> Self {
        let len = ((seconds.max(0.0) * sample_rate) as usize).max(1);
        // xorshift32 must not start at zero
        let mut state = if seed == 0 { 0x9E37_79B9 } else { seed };
        let mut white = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as i32 as f32) / (i32::MAX as f32)
        };

        let samples = match color {
            NoiseColor::White => (0..len).map(|_| white()).collect(),
            NoiseColor::Pink => {
                let (mut b0, mut b1, mut b2) = (0.0f32, 0.0f32, 0.0f32);
                (0..len)
                    .map(|_| {
                        let w = white();
                        b0 = 0.99765 * b0 + w * 0.0990460;
                        b1 = 0.96300 * b1 + w * 0.2965164;
                        b2 = 0.57000 * b2 + w * 1.0526913;
                        (b0 + b1 + b2 + w * 0.1848) * 0.11
                    })
                    .collect()
            }
            NoiseColor::Brown => {
                let mut last = 0.0f32;
                (0..len)
                    .map(|_| {
                        last = (last + 0.02 * white()) / 1.02;
                        last * 3.5
                    })
                    .collect()
            }
        };

        Self {
            samples,
            sample_rate,
        }
    }

    /// Decodes WAV bytes, mixing multi-channel audio down to mono.
    pub fn decode_wav(bytes: &[u8]) -> Result<Self, HostError> {
        let reader = WavReader::new(Cursor::new(bytes))?;
        Self::from_reader(reader)
    }

    /// Reads and decodes a WAV file.
    pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Self, HostError> {
        let reader = WavReader::open(path)?;
        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(reader: WavReader<R>) -> Result<Self, HostError> {
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let mono = if channels > 1 {
            samples
                .chunks(channels)
                .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
                .collect()
        } else {
            samples
        };

        Ok(Self {
            samples: mono,
            sample_rate: spec.sample_rate as f32,
        })
    }

    /// Sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Native sample rate of the data.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        if self.sample_rate > 0.0 {
            self.samples.len() as f32 / self.sample_rate
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn wav_bytes(channels: u16, frames: &[[i16; 2]]) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for frame in frames {
                for &s in &frame[..usize::from(channels)] {
                    writer.write_sample(s).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn noise_is_deterministic_per_seed() {
        let a = AudioBuffer::noise(NoiseColor::White, 0.1, 48000.0, 7);
        let b = AudioBuffer::noise(NoiseColor::White, 0.1, 48000.0, 7);
        let c = AudioBuffer::noise(NoiseColor::White, 0.1, 48000.0, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 4800);
    }

    #[test]
    fn noise_stays_bounded() {
        for color in [NoiseColor::White, NoiseColor::Pink, NoiseColor::Brown] {
            let buf = AudioBuffer::noise(color, 0.5, 48000.0, 1);
            let peak = buf.samples().iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!(peak > 0.01, "{color:?} is silent");
            assert!(peak <= 1.5, "{color:?} peak {peak}");
        }
    }

    #[test]
    fn decode_mono_pcm() {
        let bytes = wav_bytes(1, &[[16384, 0], [-16384, 0], [0, 0]]);
        let buf = AudioBuffer::decode_wav(&bytes).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.sample_rate(), 22050.0);
        assert!((buf.samples()[0] - 0.5).abs() < 1e-4);
        assert!((buf.samples()[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn decode_mixes_stereo_to_mono() {
        let bytes = wav_bytes(2, &[[16384, 0], [16384, 16384]]);
        let buf = AudioBuffer::decode_wav(&bytes).unwrap();
        assert_eq!(buf.len(), 2);
        assert!((buf.samples()[0] - 0.25).abs() < 1e-4);
        assert!((buf.samples()[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = AudioBuffer::decode_wav(b"definitely not a wav file");
        assert!(matches!(result, Err(HostError::Decode(_))));
    }

    #[test]
    fn color_names() {
        assert_eq!(NoiseColor::from_name("pink"), Some(NoiseColor::Pink));
        assert_eq!(NoiseColor::from_name("blue"), None);
    }
}
