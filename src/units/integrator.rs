use crate::graph::{StateSpec, Unit, UnitError};
use crate::ir::{IrNode, Leaf};
use crate::tensor::Tensor;

/// Running sum of its input. The output doubles as the carried state.
#[derive(Debug, Default, Clone)]
pub struct Integrator;

impl Integrator {
    pub fn new() -> Self {
        Self
    }

    pub fn to_ir(&self) -> IrNode {
        Leaf::new("integrator").into()
    }
}

impl Unit for Integrator {
    fn forward(&mut self, args: &[Tensor]) -> Result<Vec<Tensor>, UnitError> {
        match args {
            [input] => Ok(vec![input.clone()]),
            [input, total] => Ok(vec![input.add(total)?]),
            _ => Err(UnitError::Arity {
                expected: 2,
                found: args.len(),
            }),
        }
    }

    fn arity(&self) -> usize {
        2
    }

    fn state_spec(&self) -> StateSpec {
        StateSpec::Whole
    }
}
