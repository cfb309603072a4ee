mod graph_impl;
pub mod topology;
mod traits;
pub mod types;

#[cfg(test)]
mod tests;

pub use graph_impl::Graph;
pub use topology::{resolve_order, TopologyError};
pub use traits::{StateSpec, Unit, UnitError};
pub use types::{Adjacency, Node, NodeKey, MAX_UNIT_ARGS};
