use indexmap::IndexMap;
use slotmap::new_key_type;

use crate::tensor::Shape;

/// Upper bound on the positional arguments a unit receives in one call: the
/// combined data input plus carried hidden values.
pub const MAX_UNIT_ARGS: usize = 16;

new_key_type! { pub struct NodeKey; }

/// Adjacency of one node. Every entry records the shape that flows along the
/// edge, when known.
pub type Adjacency = IndexMap<NodeKey, Option<Shape>>;

/// A named vertex of a [`Graph`](super::Graph). The element attached to the
/// node, if any, lives in the graph next to it.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub incoming: Adjacency,
    pub outgoing: Adjacency,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            incoming: IndexMap::new(),
            outgoing: IndexMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.incoming.is_empty()
    }

    pub fn is_sink(&self) -> bool {
        self.outgoing.is_empty()
    }
}
