pub mod executor;
pub mod extract;
pub mod graph;
pub mod ir;
pub mod reconstruct;
pub mod tensor;
pub mod units;

mod error;

pub use error::GraphError;
pub use executor::{ExecutionState, ExecutorConfig, GraphExecutor, OutputPolicy};
pub use extract::{extract_ir, ExtractOptions, Trace, Traceable};
pub use graph::*;
pub use ir::{IrGraph, IrNode, Leaf};
pub use reconstruct::{load, load_with_config, to_graph, IrSource};
pub use tensor::{Shape, Tensor, TensorError};
