use crate::node::AudioParam;
use crate::processor::{ParamBlock, Processor};

/// Emits its `offset` parameter as a signal.
#[derive(Debug, Default)]
pub struct ConstantSource;

impl Processor for ConstantSource {
    fn type_name(&self) -> &'static str {
        "ConstantSource"
    }

    fn params(&self) -> Vec<AudioParam> {
        vec![AudioParam::new("offset", 1.0, -1.0e6, 1.0e6)]
    }

    fn is_source(&self) -> bool {
        true
    }

    fn has_input(&self) -> bool {
        false
    }

    fn process(&mut self, _input: &[f32], params: &ParamBlock<'_>, output: &mut [f32]) {
        for (i, out) in output.iter_mut().enumerate() {
            *out = params.at(0, i);
        }
    }
}
