//! Invertible mutation log.
//!
//! Every structural change to a [`GraphDocument`] is recorded at the moment it
//! happens as a forward [`Mutation`] plus the mutation that undoes it. Paths
//! are index-based and JSON-pointer-like:
//!
//! | Path | Addresses |
//! |---|---|
//! | `/nodes/3` | the fourth node |
//! | `/nodes/3/properties/frequency` | one property of that node |
//! | `/nodes/3/position` | its canvas position |
//! | `/edges/1` | the second edge |
//!
//! Property names are escaped as in JSON pointers (`~0` for `~`, `~1` for `/`).

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::{GraphDocument, Position, VisualEdge, VisualNode};
use crate::error::PatchError;

/// Kind of change at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Insert at an index, or set a property that was absent.
    Add,
    /// Delete.
    Remove,
    /// Overwrite.
    Replace,
}

/// A single change to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Location of the change.
    pub path: String,
    /// What happens there.
    pub op: Op,
    /// New value for `add` and `replace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Mutation {
    /// An `add` mutation.
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            op: Op::Add,
            value: Some(value),
        }
    }

    /// A `remove` mutation.
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            op: Op::Remove,
            value: None,
        }
    }

    /// A `replace` mutation.
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            op: Op::Replace,
            value: Some(value),
        }
    }

    /// Path of a node.
    pub fn node_path(index: usize) -> String {
        format!("/nodes/{index}")
    }

    /// Path of a node property.
    pub fn property_path(index: usize, name: &str) -> String {
        format!("/nodes/{index}/properties/{}", escape(name))
    }

    /// Path of a node position.
    pub fn position_path(index: usize) -> String {
        format!("/nodes/{index}/position")
    }

    /// Path of an edge.
    pub fn edge_path(index: usize) -> String {
        format!("/edges/{index}")
    }

    /// Applies this mutation to `doc`.
    pub fn apply(&self, doc: &mut GraphDocument) -> Result<(), PatchError> {
        match parse_path(&self.path)? {
            Target::Node(index) => {
                apply_list(&mut doc.nodes, index, self, |v| decode::<VisualNode>(&self.path, v))
            }
            Target::Edge(index) => {
                apply_list(&mut doc.edges, index, self, |v| decode::<VisualEdge>(&self.path, v))
            }
            Target::Property(index, name) => {
                let len = doc.nodes.len();
                let node = doc.nodes.get_mut(index).ok_or_else(|| PatchError::IndexOutOfRange {
                    path: self.path.clone(),
                    index,
                    len,
                })?;
                match self.op {
                    Op::Add | Op::Replace => {
                        let value = decode(&self.path, self.value()?)?;
                        node.properties.insert(name, value);
                    }
                    Op::Remove => {
                        node.properties.remove(&name);
                    }
                }
                Ok(())
            }
            Target::Position(index) => {
                let len = doc.nodes.len();
                let node = doc.nodes.get_mut(index).ok_or_else(|| PatchError::IndexOutOfRange {
                    path: self.path.clone(),
                    index,
                    len,
                })?;
                match self.op {
                    Op::Add | Op::Replace => {
                        node.position = decode::<Position>(&self.path, self.value()?)?;
                        Ok(())
                    }
                    Op::Remove => Err(PatchError::InvalidPath(format!(
                        "{} cannot be removed",
                        self.path
                    ))),
                }
            }
        }
    }

    fn value(&self) -> Result<&Value, PatchError> {
        self.value
            .as_ref()
            .ok_or_else(|| PatchError::MissingValue(self.path.clone()))
    }
}

/// An atomic, invertible group of mutations.
///
/// `inverse` is stored in application order: applying `forward` and then
/// `inverse`, each front to back, restores the original document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatchSet {
    /// Mutations that perform the change.
    pub forward: Vec<Mutation>,
    /// Mutations that revert it.
    pub inverse: Vec<Mutation>,
}

impl PatchSet {
    /// Creates an empty patch set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one change and its inverse.
    pub fn record(&mut self, forward: Mutation, inverse: Mutation) {
        self.forward.push(forward);
        self.inverse.insert(0, inverse);
    }

    /// Appends every change of `other` after the changes already held.
    pub fn extend(&mut self, other: PatchSet) {
        self.forward.extend(other.forward);
        let mut inverse = other.inverse;
        inverse.append(&mut self.inverse);
        self.inverse = inverse;
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Number of forward mutations.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Applies `forward` to `doc`.
    pub fn apply_forward(&self, doc: &mut GraphDocument) -> Result<(), PatchError> {
        apply_all(&self.forward, doc)
    }

    /// Applies `inverse` to `doc`.
    pub fn apply_inverse(&self, doc: &mut GraphDocument) -> Result<(), PatchError> {
        apply_all(&self.inverse, doc)
    }
}

/// Applies mutations front to back.
pub fn apply_all(mutations: &[Mutation], doc: &mut GraphDocument) -> Result<(), PatchError> {
    for mutation in mutations {
        mutation.apply(doc)?;
    }
    Ok(())
}

enum Target {
    Node(usize),
    Edge(usize),
    Property(usize, String),
    Position(usize),
}

fn parse_path(path: &str) -> Result<Target, PatchError> {
    let invalid = || PatchError::InvalidPath(path.to_string());
    let rest = path.strip_prefix('/').ok_or_else(invalid)?;
    let segments: Vec<&str> = rest.split('/').collect();
    let index = |s: &str| s.parse::<usize>().map_err(|_| invalid());
    match segments.as_slice() {
        ["nodes", i] => Ok(Target::Node(index(*i)?)),
        ["edges", i] => Ok(Target::Edge(index(*i)?)),
        ["nodes", i, "position"] => Ok(Target::Position(index(*i)?)),
        ["nodes", i, "properties", name] if !name.is_empty() => {
            Ok(Target::Property(index(*i)?, unescape(name)))
        }
        _ => Err(invalid()),
    }
}

fn apply_list<T>(
    list: &mut Vec<T>,
    index: usize,
    mutation: &Mutation,
    decode_value: impl Fn(&Value) -> Result<T, PatchError>,
) -> Result<(), PatchError> {
    let len = list.len();
    let out_of_range = || PatchError::IndexOutOfRange {
        path: mutation.path.clone(),
        index,
        len,
    };
    match mutation.op {
        Op::Add => {
            if index > len {
                return Err(out_of_range());
            }
            list.insert(index, decode_value(mutation.value()?)?);
        }
        Op::Remove => {
            if index >= len {
                return Err(out_of_range());
            }
            list.remove(index);
        }
        Op::Replace => {
            let value = decode_value(mutation.value()?)?;
            *list.get_mut(index).ok_or_else(out_of_range)? = value;
        }
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(path: &str, value: &Value) -> Result<T, PatchError> {
    serde_json::from_value(value.clone()).map_err(|source| PatchError::InvalidValue {
        path: path.to_string(),
        source,
    })
}

fn escape(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
