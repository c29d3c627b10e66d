use crate::processor::{ParamBlock, Processor};

/// The context's output sink. Passes its summed input through.
#[derive(Debug, Default)]
pub struct Destination;

impl Processor for Destination {
    fn type_name(&self) -> &'static str {
        "AudioDestination"
    }

    fn has_output(&self) -> bool {
        false
    }

    fn process(&mut self, input: &[f32], _params: &ParamBlock<'_>, output: &mut [f32]) {
        output.copy_from_slice(input);
    }
}
