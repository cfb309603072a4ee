use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// Everything one forward pass hands to the next: the hidden values of
/// stateful nodes and the last output of every node. Keyed by node name.
///
/// Each call to [`GraphExecutor::forward`](super::GraphExecutor::forward)
/// returns a fresh state. Pass it back into the next call to carry recurrence
/// forward; clone it to branch or checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub hidden: HashMap<String, Vec<Tensor>>,
    pub cache: HashMap<String, Tensor>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hidden(&self, node: &str) -> Option<&[Tensor]> {
        self.hidden.get(node).map(Vec::as_slice)
    }

    pub fn cached(&self, node: &str) -> Option<&Tensor> {
        self.cache.get(node)
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty() && self.cache.is_empty()
    }
}
