//! The outward diagnostics channel.
//!
//! Components report problems here instead of failing the whole operation.
//! Collaborators drain the queue after each batch of operations. Every entry
//! is mirrored to `tracing` at the matching level when reported.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::document::NodeId;

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The operation went through with an adjusted value.
    Warning,
    /// Part of the operation did not apply.
    Error,
}

/// Which subsystem raised a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Unit construction.
    Factory,
    /// Edge validation and routing.
    Connection,
    /// Property coercion and live application.
    Property,
    /// Host engine calls that failed at the unit boundary.
    Host,
    /// Control network fan-out.
    Propagation,
    /// Undo/redo.
    History,
    /// Play state and lifecycle.
    Playback,
    /// External buffer loading.
    Loading,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Factory => "factory",
            Category::Connection => "connection",
            Category::Property => "property",
            Category::Host => "host",
            Category::Propagation => "propagation",
            Category::History => "history",
            Category::Playback => "playback",
            Category::Loading => "loading",
        };
        f.write_str(name)
    }
}

/// One entry of the diagnostics channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Warning or error.
    pub severity: Severity,
    /// Raising subsystem.
    pub category: Category,
    /// Human-readable summary.
    pub message: String,
    /// Node the diagnostic is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    /// Extra context (underlying error, original value, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Diagnostic {
    /// Creates a warning.
    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            message: message.into(),
            node_id: None,
            details: None,
        }
    }

    /// Creates an error.
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::warning(category, message)
        }
    }

    /// Attaches the node the diagnostic is about.
    pub fn with_node(mut self, node: Option<NodeId>) -> Self {
        self.node_id = node;
        self
    }

    /// Attaches extra context.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{level}/{}] {}", self.category, self.message)?;
        if let Some(node) = self.node_id {
            write!(f, " ({node})")?;
        }
        if let Some(details) = &self.details {
            write!(f, ": {details}")?;
        }
        Ok(())
    }
}

/// Shared handle to the append-only diagnostics queue.
///
/// Cloning the handle shares the queue. The engine is single-threaded, so the
/// handle is neither `Send` nor `Sync`.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    queue: Rc<RefCell<VecDeque<Diagnostic>>>,
}

impl Diagnostics {
    /// Creates an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic and mirrors it to `tracing`.
    pub fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(
                category = %diagnostic.category,
                node = ?diagnostic.node_id,
                "{}",
                diagnostic.message
            ),
            Severity::Error => tracing::error!(
                category = %diagnostic.category,
                node = ?diagnostic.node_id,
                details = diagnostic.details.as_deref().unwrap_or(""),
                "{}",
                diagnostic.message
            ),
        }
        self.queue.borrow_mut().push_back(diagnostic);
    }

    /// Removes and returns every queued diagnostic, oldest first.
    pub fn drain(&self) -> Vec<Diagnostic> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Copies the queue without draining it.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.queue.borrow().iter().cloned().collect()
    }

    /// Number of queued diagnostics.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Number of queued errors.
    pub fn error_count(&self) -> usize {
        self.queue
            .borrow()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_queue() {
        let a = Diagnostics::new();
        let b = a.clone();
        b.report(Diagnostic::warning(Category::Property, "clamped"));
        assert_eq!(a.len(), 1);
        let drained = a.drain();
        assert_eq!(drained[0].message, "clamped");
        assert!(b.is_empty());
    }

    #[test]
    fn counts_errors() {
        let d = Diagnostics::new();
        d.report(Diagnostic::warning(Category::Property, "w"));
        d.report(Diagnostic::error(Category::Connection, "e"));
        assert_eq!(d.error_count(), 1);
        assert_eq!(d.snapshot().len(), 2);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn display_includes_node_and_details() {
        let diag = Diagnostic::error(Category::Factory, "no constructor")
            .with_node(Some(NodeId::from_raw(4)))
            .with_details("Theremin");
        assert_eq!(
            diag.to_string(),
            "[error/factory] no constructor (NodeId(4)): Theremin"
        );
    }

    #[test]
    fn serializes_lowercase() {
        let diag = Diagnostic::warning(Category::Playback, "inaudible");
        let json = serde_json::to_string(&diag).unwrap();
        assert_eq!(
            json,
            r#"{"severity":"warning","category":"playback","message":"inaudible"}"#
        );
    }
}
