//! Patchwire Core - graph runtime synchronization
//!
//! Keeps three views of one patch graph consistent under continuous editing:
//! a serializable, undoable [`GraphDocument`], a live graph on the host audio
//! engine, and a push-based network of control units that the host engine
//! never sees.
//!
//! # Components
//!
//! ## Declarative state
//!
//! - [`GraphDocument`] - ordered [`VisualNode`]s and [`VisualEdge`]s
//! - [`Mutation`] / [`PatchSet`] - invertible, index-addressed changes
//! - [`UndoHistory`] - bounded undo/redo stacks with batching
//!
//! ## Runtime
//!
//! - [`UnitFactory`] - type name plus properties to a live unit
//! - [`ConnectionRouter`] - port validation and routing-kind selection
//! - [`PropertyUpdateEngine`] - coercion and in-place application
//! - [`Propagator`] - synchronous, depth-bounded control fan-out
//! - [`GraphSynchronizer`] - the structural mutation API tying it together
//!
//! ## Reporting
//!
//! - [`Diagnostics`] - append-only queue of warnings and errors, drained by
//!   collaborators after each batch of operations
//!
//! Nothing here terminates the process. A failure means one unit, edge or
//! property did not apply; the rest of the graph stays usable.
//!
//! # Example
//!
//! ```rust
//! use patchwire_core::{GraphSynchronizer, Position, PropertyValue};
//!
//! let mut sync = GraphSynchronizer::default();
//! let slider = sync.add_node("Slider", Position::new(0.0, 0.0)).unwrap();
//! let osc = sync.add_node("Oscillator", Position::new(100.0, 0.0)).unwrap();
//! let out = sync.add_node("AudioDestination", Position::new(200.0, 0.0)).unwrap();
//! sync.update_property(slider, "max", 880.0).unwrap();
//! sync.add_edge(slider, osc, "value", "frequency").unwrap();
//! sync.add_edge(osc, out, "output", "input").unwrap();
//!
//! sync.start();
//! sync.interact(slider, "value", 220.0).unwrap();
//! assert_eq!(sync.property_value(osc, "frequency"), Some(PropertyValue::Number(220.0)));
//!
//! let block = sync.render(1024).unwrap();
//! assert_eq!(block.len(), 1024);
//! assert!(sync.drain_diagnostics().is_empty());
//! ```

mod config;
pub mod control;
mod diagnostics;
mod document;
mod error;
mod factory;
mod history;
mod live;
mod patch;
mod propagator;
mod properties;
mod router;
mod sync;

pub use config::EngineConfig;
pub use diagnostics::{Category, Diagnostic, Diagnostics, Severity};
pub use document::{EdgeId, GraphDocument, NodeId, Position, VisualEdge, VisualNode};
pub use error::{
    ConfigError, ConnectionError, FactoryError, GraphError, PatchError, PortDirection,
    PropertyError,
};
pub use factory::{TriggerOutcome, UnitFactory};
pub use history::UndoHistory;
pub use live::{LiveConnection, LiveEngine, LiveNode, LiveUnit, PendingLoad, Routing, RoutingKind};
pub use patch::{Mutation, Op, PatchSet, apply_all};
pub use propagator::{Propagator, RouteId, RouteSource, RouteTarget};
pub use properties::{PropertyUpdateEngine, UpdateOutcome, write_modulation_target};
pub use router::{ConnectionRouter, PortPlan};
pub use sync::{GraphSynchronizer, PlayState};

pub use patchwire_catalog::{Catalog, PropertyValue, UnitSpec};
