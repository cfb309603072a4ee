//! Portable graph intermediate representation.
//!
//! An [`IrGraph`] is a set of named [`IrNode`]s plus `(source, destination)`
//! edges. Input and output markers carry the shape crossing the graph
//! boundary; leaves are opaque to this crate and are interpreted by the
//! mapping functions handed to extraction and reconstruction.

mod io;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::tensor::{Shape, Tensor};

pub use io::{read, write};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IrNode {
    Input { shape: Shape },
    Output { shape: Shape },
    Subgraph(IrGraph),
    Leaf(Leaf),
}

impl IrNode {
    pub fn input(shape: impl Into<Shape>) -> Self {
        IrNode::Input {
            shape: shape.into(),
        }
    }

    pub fn output(shape: impl Into<Shape>) -> Self {
        IrNode::Output {
            shape: shape.into(),
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, IrNode::Input { .. } | IrNode::Output { .. })
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            IrNode::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }
}

impl From<Leaf> for IrNode {
    fn from(leaf: Leaf) -> Self {
        IrNode::Leaf(leaf)
    }
}

impl From<IrGraph> for IrNode {
    fn from(graph: IrGraph) -> Self {
        IrNode::Subgraph(graph)
    }
}

/// A node whose meaning is defined by the mapping functions: a kind tag plus
/// named tensor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub kind: String,
    #[serde(default)]
    pub params: IndexMap<String, Tensor>,
}

impl Leaf {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: IndexMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Tensor) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn param(&self, name: &str) -> Option<&Tensor> {
        self.params.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<f32> {
        self.param(name).and_then(Tensor::as_scalar)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrGraph {
    pub nodes: IndexMap<String, IrNode>,
    #[serde(default)]
    pub edges: Vec<(String, String)>,
}

impl IrGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, name: impl Into<String>, node: impl Into<IrNode>) -> Self {
        self.nodes.insert(name.into(), node.into());
        self
    }

    pub fn with_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    pub fn node(&self, name: &str) -> Option<&IrNode> {
        self.nodes.get(name)
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, IrNode::Input { .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, IrNode::Output { .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.iter().any(|(src, dst)| src == from && dst == to)
    }
}
