//! Reference host audio engine for patchwire.
//!
//! An [`AudioContext`] owns a graph of processing nodes: sources (oscillator,
//! constant, buffer playback), effects (gain, biquad, delay), an analyser and
//! a fixed destination. Edges either feed a node's signal input or modulate one
//! of its parameters. The context renders mono `f32` blocks on demand, which
//! makes everything the runtime synchronizer does observable offline.
//!
//! The API is shaped after the browser audio engine: nodes are built through a
//! `create<Type>` constructor table, sources must be started explicitly and
//! may only be started once while playing, and a context can be created
//! suspended until a user gesture resumes it.

mod buffer;
mod context;
mod error;
mod node;
mod processor;
pub mod processors;

pub use buffer::{AudioBuffer, NoiseColor};
pub use context::{AudioContext, ContextOptions, ContextState, NodeConstructor};
pub use error::HostError;
pub use node::{AudioParam, EdgeTarget, FieldValue, HostEdgeId, HostNodeId, Level, PlaybackState};
pub use processor::{ParamBlock, Processor};
