use thiserror::Error;

use crate::graph::{TopologyError, UnitError};
use crate::tensor::TensorError;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph is empty")]
    Empty,
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("no inputs found for node {node}")]
    NoInputs { node: String },
    #[error("node {0} already exists")]
    DuplicateNode(String),
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("subgraph {node} contains nested subgraph {member}, only one level of nesting is supported")]
    NestedSubgraph { node: String, member: String },
    #[error("no output shape was recorded for node {node}")]
    UnknownShape { node: String },
    #[error("no output node produced a value")]
    MissingOutput,
    #[error("node {node} would receive {count} arguments, at most {max} are supported")]
    TooManyArguments {
        node: String,
        count: usize,
        max: usize,
    },
    #[error("node {node} returned no values")]
    EmptyResult { node: String },
    #[error("unit at node {node} failed: {source}")]
    Unit {
        node: String,
        #[source]
        source: UnitError,
    },
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
