use crate::node::AudioParam;
use crate::processor::{ParamBlock, Processor};

/// Linear gain stage.
#[derive(Debug, Default)]
pub struct Gain;

impl Processor for Gain {
    fn type_name(&self) -> &'static str {
        "Gain"
    }

    fn params(&self) -> Vec<AudioParam> {
        vec![AudioParam::new("gain", 1.0, -1.0e6, 1.0e6)]
    }

    fn process(&mut self, input: &[f32], params: &ParamBlock<'_>, output: &mut [f32]) {
        for (i, (out, x)) in output.iter_mut().zip(input).enumerate() {
            *out = x * params.at(0, i);
        }
    }
}
