//! The [`Processor`] trait implemented by every node kind.

use crate::buffer::AudioBuffer;
use crate::error::HostError;
use crate::node::{AudioParam, FieldValue, Level};

/// Per-sample parameter values for one block.
///
/// Index `i` matches the `i`-th entry of [`Processor::params`].
pub struct ParamBlock<'a> {
    values: &'a [Vec<f32>],
}

impl<'a> ParamBlock<'a> {
    pub(crate) fn new(values: &'a [Vec<f32>]) -> Self {
        Self { values }
    }

    /// Effective value of parameter `param` at frame `frame`.
    #[inline]
    pub fn at(&self, param: usize, frame: usize) -> f32 {
        self.values
            .get(param)
            .and_then(|v| v.get(frame))
            .copied()
            .unwrap_or(0.0)
    }
}

/// A node's signal-processing behavior.
///
/// Parameters are owned by the context (so that edges can modulate them);
/// processors only see their per-sample values through [`ParamBlock`].
/// Fields are everything else: waveform selectors, loop flags, buffer sizes.
pub trait Processor: Send {
    /// Type name used in errors and logs (e.g. `"Oscillator"`).
    fn type_name(&self) -> &'static str;

    /// Parameters this processor reads, in [`ParamBlock`] index order.
    fn params(&self) -> Vec<AudioParam> {
        Vec::new()
    }

    /// Reads a field.
    fn field(&self, _name: &str) -> Option<FieldValue> {
        None
    }

    /// Writes a field.
    fn set_field(&mut self, name: &str, _value: &FieldValue) -> Result<(), HostError> {
        Err(HostError::UnknownField {
            node_type: self.type_name(),
            field: name.to_string(),
        })
    }

    /// Sources produce output only while started.
    fn is_source(&self) -> bool {
        false
    }

    /// Whether the node accepts incoming signal edges.
    fn has_input(&self) -> bool {
        true
    }

    /// Whether the node can feed other nodes.
    fn has_output(&self) -> bool {
        true
    }

    /// Renders one block. `input` is the sum of every connected signal.
    fn process(&mut self, input: &[f32], params: &ParamBlock<'_>, output: &mut [f32]);

    /// Called when a source transitions to playing.
    fn on_start(&mut self) {}

    /// A source that ran out of data reports `true`; the context then ends it.
    fn is_finished(&self) -> bool {
        false
    }

    /// Installs sample data on a buffer-backed source.
    fn set_buffer(&mut self, _buffer: AudioBuffer) -> Result<(), HostError> {
        Err(HostError::InvalidOperation(format!(
            "{} does not accept buffers",
            self.type_name()
        )))
    }

    /// Level of the last block, for analysis nodes.
    fn level(&self) -> Option<Level> {
        None
    }
}
