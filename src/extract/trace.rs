use std::collections::{HashMap, HashSet};

use slotmap::SecondaryMap;

use crate::error::GraphError;
use crate::graph::{Graph, NodeKey};
use crate::tensor::{Shape, Tensor};

/// What a tracer records while running a model against sample input.
///
/// Nodes are the units that were called, in call order, plus any tensor-only
/// nodes the tracer chose to record (those carry no element). Edges carry the
/// shape of the value that flowed along them. Units nested inside other units
/// point at their owner through [`Trace::set_parent`].
#[derive(Debug)]
pub struct Trace<U> {
    pub graph: Graph<U>,
    output_shapes: SecondaryMap<NodeKey, Shape>,
    parents: SecondaryMap<NodeKey, NodeKey>,
}

impl<U> Default for Trace<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> Trace<U> {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            output_shapes: SecondaryMap::new(),
            parents: SecondaryMap::new(),
        }
    }

    /// Records a call to `name`. Calling the same name again returns the
    /// existing node and only refreshes its output shape.
    pub fn record_call(
        &mut self,
        name: &str,
        unit: Option<U>,
        output_shape: Option<Shape>,
    ) -> Result<NodeKey, GraphError> {
        let key = match self.graph.key(name) {
            Some(key) => key,
            None => self.graph.add_node(name, unit)?,
        };
        if let Some(shape) = output_shape {
            self.output_shapes.insert(key, shape);
        }
        Ok(key)
    }

    /// Records a value of `shape` flowing from `from` into `to`.
    pub fn record_flow(&mut self, from: NodeKey, to: NodeKey, shape: impl Into<Shape>) -> bool {
        self.graph.add_edge_with_shape(from, to, Some(shape.into()))
    }

    pub fn set_parent(&mut self, child: NodeKey, parent: NodeKey) {
        self.parents.insert(child, parent);
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.parents.get(key).copied()
    }

    pub fn output_shape(&self, key: NodeKey) -> Option<&Shape> {
        self.output_shapes.get(key)
    }

    /// Removes every node without a unit, connecting each of its
    /// predecessors straight to each of its successors.
    pub fn ignore_tensors(mut self) -> Self {
        let tensors: Vec<NodeKey> = self
            .graph
            .node_list()
            .iter()
            .copied()
            .filter(|&key| !self.graph.is_mapped(key))
            .collect();

        for key in tensors {
            let Some((node, _)) = self.graph.remove_node(key) else {
                continue;
            };
            for &source in node.incoming.keys() {
                for (&target, shape) in &node.outgoing {
                    if source != target {
                        self.graph.add_edge_with_shape(source, target, shape.clone());
                    }
                }
            }
            self.forget(key);
        }
        self
    }

    /// Collapses every unit nested (at any depth) inside a unit matching
    /// `ignore` into that unit. When matches are nested, the outermost one
    /// absorbs the rest. Edges are redirected to the absorbing unit and
    /// edges that would become self-loops are dropped.
    pub fn ignore_submodules_of(mut self, ignore: impl Fn(&U) -> bool) -> Self {
        let mut absorbed_by: HashMap<NodeKey, NodeKey> = HashMap::new();
        for &key in self.graph.node_list() {
            if let Some(owner) = self.outermost_match(key, &ignore) {
                absorbed_by.insert(key, owner);
            }
        }
        if absorbed_by.is_empty() {
            return self;
        }

        let resolve = |key: NodeKey| absorbed_by.get(&key).copied().unwrap_or(key);
        let mut rewired = Vec::new();
        for (key, node) in self.graph.iter() {
            for (&target, shape) in &node.outgoing {
                if !absorbed_by.contains_key(&key) && !absorbed_by.contains_key(&target) {
                    continue;
                }
                let (from, to) = (resolve(key), resolve(target));
                if from != to {
                    rewired.push((from, to, shape.clone()));
                }
            }
        }

        // An owner without a recorded shape takes the one of its last child.
        let inherits: HashSet<NodeKey> = absorbed_by
            .values()
            .copied()
            .filter(|&owner| !self.output_shapes.contains_key(owner))
            .collect();

        let keys = self.graph.node_list().to_vec();
        for key in keys {
            let Some(&owner) = absorbed_by.get(&key) else {
                continue;
            };
            if let Some(shape) = self.output_shapes.remove(key) {
                if inherits.contains(&owner) {
                    self.output_shapes.insert(owner, shape);
                }
            }
            self.graph.remove_node(key);
            self.parents.remove(key);
        }

        for (from, to, shape) in rewired {
            self.graph.add_edge_with_shape(from, to, shape);
        }
        self
    }

    fn outermost_match(&self, key: NodeKey, ignore: &impl Fn(&U) -> bool) -> Option<NodeKey> {
        let mut found = None;
        let mut current = key;
        // Bounded walk so a malformed ownership chain cannot loop forever.
        for _ in 0..self.graph.len() {
            let Some(parent) = self.parent(current) else {
                break;
            };
            if self.graph.elem(parent).is_some_and(|unit| ignore(unit)) {
                found = Some(parent);
            }
            current = parent;
        }
        found
    }

    fn forget(&mut self, key: NodeKey) {
        self.output_shapes.remove(key);
        self.parents.remove(key);
    }
}

/// A model that can run itself against sample input and report what it did.
pub trait Traceable {
    type Unit;

    /// Whether the model is a container of other units rather than a single
    /// unit.
    fn has_children(&self) -> bool;

    /// Runs the model on `sample` and records every call. When `model_name`
    /// is given, the model itself is recorded as one node of that name.
    fn trace(&self, sample: &Tensor, model_name: Option<&str>) -> Result<Trace<Self::Unit>, GraphError>;
}
