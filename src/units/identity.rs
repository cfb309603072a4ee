use crate::graph::{Unit, UnitError};
use crate::tensor::Tensor;

/// Passes its input through unchanged. Stands in for input and output
/// markers that the caller's mapping leaves unmapped.
#[derive(Debug, Default, Clone)]
pub struct Identity;

impl Identity {
    pub fn new() -> Self {
        Self
    }
}

impl Unit for Identity {
    fn forward(&mut self, args: &[Tensor]) -> Result<Vec<Tensor>, UnitError> {
        match args {
            [input] => Ok(vec![input.clone()]),
            _ => Err(UnitError::Arity {
                expected: 1,
                found: args.len(),
            }),
        }
    }
}
