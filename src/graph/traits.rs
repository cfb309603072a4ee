use thiserror::Error;

use crate::tensor::{Tensor, TensorError};

/// How a unit threads hidden values from one call to the next.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StateSpec {
    /// The result is the visible output only.
    Stateless,
    /// `result[0]` is the visible output; `result[1..]` is carried into the
    /// next call as trailing arguments.
    Trailing,
    /// `result[0]` is the visible output and the whole result, visible
    /// output included, is carried into the next call.
    Whole,
}

impl StateSpec {
    pub fn is_stateful(self) -> bool {
        !matches!(self, StateSpec::Stateless)
    }
}

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("expected at most {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },
    #[error("missing parameter {0}")]
    MissingParam(&'static str),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// A concrete computational unit placed at a graph node.
pub trait Unit: Send + std::fmt::Debug {
    /// Runs one step. `args[0]` is the node's combined data input; any further
    /// arguments are the hidden values this unit returned on the previous
    /// call. The first call of a stateful unit gets no hidden values.
    ///
    /// The result must hold at least one tensor.
    fn forward(&mut self, args: &[Tensor]) -> Result<Vec<Tensor>, UnitError>;

    /// Number of positional arguments `forward` accepts.
    fn arity(&self) -> usize {
        1
    }

    /// A unit taking more than its primary input is stateful by default.
    /// Units with an explicit configuration flag override this.
    fn state_spec(&self) -> StateSpec {
        if self.arity() > 1 {
            StateSpec::Trailing
        } else {
            StateSpec::Stateless
        }
    }
}
