use std::collections::HashMap;

use slotmap::{SecondaryMap, SlotMap};

use super::topology::{resolve_order, TopologyError};
use super::types::{Node, NodeKey};
use crate::error::GraphError;
use crate::tensor::Shape;

/// Named nodes joined by directed, shape-annotated edges. Each node may carry
/// an element `T` (a unit, or whatever a tracer recorded); nodes without one
/// are structural boundary markers.
#[derive(Debug)]
pub struct Graph<T> {
    nodes: SlotMap<NodeKey, Node>,
    elems: SecondaryMap<NodeKey, T>,
    names: HashMap<String, NodeKey>,
    node_list: Vec<NodeKey>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl<T> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Graph<T> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            elems: SecondaryMap::new(),
            names: HashMap::new(),
            node_list: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn add_node(&mut self, name: impl Into<String>, elem: Option<T>) -> Result<NodeKey, GraphError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }

        let key = self.nodes.insert(Node::new(name.clone()));
        if let Some(elem) = elem {
            self.elems.insert(key, elem);
        }
        self.names.insert(name, key);
        self.node_list.push(key);
        Ok(key)
    }

    /// Connects `from` to `to`. Returns false if either key is stale or the
    /// edge already exists.
    pub fn add_edge(&mut self, from: NodeKey, to: NodeKey) -> bool {
        self.add_edge_with_shape(from, to, None)
    }

    pub fn add_edge_with_shape(&mut self, from: NodeKey, to: NodeKey, shape: Option<Shape>) -> bool {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return false;
        }
        if self.nodes[from].outgoing.contains_key(&to) {
            return false;
        }

        self.nodes[from].outgoing.insert(to, shape.clone());
        self.nodes[to].incoming.insert(from, shape);
        true
    }

    pub fn connect(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let from = self.require(from)?;
        let to = self.require(to)?;
        self.add_edge(from, to);
        Ok(())
    }

    pub fn remove_edge(&mut self, from: NodeKey, to: NodeKey) -> Option<Option<Shape>> {
        let shape = self.nodes.get_mut(from)?.outgoing.shift_remove(&to)?;
        if let Some(node) = self.nodes.get_mut(to) {
            node.incoming.shift_remove(&from);
        }
        Some(shape)
    }

    /// Removes a node along with every edge touching it.
    pub fn remove_node(&mut self, key: NodeKey) -> Option<(Node, Option<T>)> {
        let node = self.nodes.remove(key)?;
        let elem = self.elems.remove(key);

        for source in node.incoming.keys() {
            if let Some(source) = self.nodes.get_mut(*source) {
                source.outgoing.shift_remove(&key);
            }
        }
        for target in node.outgoing.keys() {
            if let Some(target) = self.nodes.get_mut(*target) {
                target.incoming.shift_remove(&key);
            }
        }

        self.names.remove(&node.name);
        self.node_list.retain(|&k| k != key);
        Some((node, elem))
    }

    pub fn key(&self, name: &str) -> Option<NodeKey> {
        self.names.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<NodeKey, GraphError> {
        self.key(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn name(&self, key: NodeKey) -> Option<&str> {
        self.nodes.get(key).map(|node| node.name.as_str())
    }

    pub fn elem(&self, key: NodeKey) -> Option<&T> {
        self.elems.get(key)
    }

    pub fn is_mapped(&self, key: NodeKey) -> bool {
        self.elems.contains_key(key)
    }

    /// Node keys in insertion order.
    pub fn node_list(&self) -> &[NodeKey] {
        &self.node_list
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> + '_ {
        self.node_list
            .iter()
            .filter_map(move |&key| self.nodes.get(key).map(|node| (key, node)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes without incoming edges, in insertion order.
    pub fn get_root(&self) -> Vec<NodeKey> {
        self.iter()
            .filter(|(_, node)| node.is_root())
            .map(|(key, _)| key)
            .collect()
    }

    pub fn find_source_nodes_of(&self, key: NodeKey) -> Vec<NodeKey> {
        self.nodes
            .get(key)
            .map(|node| node.incoming.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn successors(&self, key: NodeKey) -> Vec<NodeKey> {
        self.nodes
            .get(key)
            .map(|node| node.outgoing.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Resolves the single-pass execution order from the declared input.
    pub fn execution_order(&self) -> Result<Vec<NodeKey>, TopologyError> {
        if self.inputs.len() != 1 {
            return Err(TopologyError::InputCount {
                found: self.inputs.len(),
            });
        }
        let inputs: Vec<NodeKey> = self.inputs.iter().filter_map(|name| self.key(name)).collect();
        resolve_order(inputs, |key| self.successors(*key))
    }

    /// Splits the graph into its topology and its elements. The topology
    /// keeps a `()` marker wherever an element was attached.
    pub fn into_parts(self) -> (Graph<()>, SecondaryMap<NodeKey, T>) {
        let markers = self.elems.keys().map(|key| (key, ())).collect();
        let topology = Graph {
            nodes: self.nodes,
            elems: markers,
            names: self.names,
            node_list: self.node_list,
            inputs: self.inputs,
            outputs: self.outputs,
        };
        (topology, self.elems)
    }
}
