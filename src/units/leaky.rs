use crate::graph::{StateSpec, Unit, UnitError};
use crate::ir::{IrNode, Leaf};
use crate::tensor::Tensor;

/// Leaky integrate-and-fire neuron with reset by subtraction.
///
/// Each step computes `mem = beta * mem + input`, emits a spike wherever
/// `mem` exceeds `threshold` and subtracts `threshold` from the membrane at
/// those positions. The result is `[spikes, mem]`.
///
/// With `init_hidden` set the neuron keeps the membrane itself and returns
/// only the spikes, so the executor treats it as stateless.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaky {
    beta: f32,
    threshold: f32,
    init_hidden: bool,
    membrane: Option<Tensor>,
}

impl Leaky {
    pub fn new(beta: f32, threshold: f32) -> Self {
        Self {
            beta,
            threshold,
            init_hidden: false,
            membrane: None,
        }
    }

    pub fn with_init_hidden(mut self, init_hidden: bool) -> Self {
        self.init_hidden = init_hidden;
        self
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn init_hidden(&self) -> bool {
        self.init_hidden
    }

    /// One integration step from an explicit membrane value.
    pub fn step(&self, input: &Tensor, membrane: &Tensor) -> Result<(Tensor, Tensor), UnitError> {
        let threshold = self.threshold;
        let integrated = membrane.zip_map(input, |m, x| self.beta * m + x)?;
        let spikes = integrated.map(|m| if m > threshold { 1.0 } else { 0.0 });
        let membrane = integrated.zip_map(&spikes, |m, s| m - s * threshold)?;
        Ok((spikes, membrane))
    }

    pub fn to_ir(&self) -> IrNode {
        Leaf::new("leaky")
            .with_param("beta", Tensor::scalar(self.beta))
            .with_param("threshold", Tensor::scalar(self.threshold))
            .into()
    }

    pub fn from_leaf(leaf: &Leaf) -> Result<Self, UnitError> {
        let beta = leaf.scalar("beta").ok_or(UnitError::MissingParam("beta"))?;
        let threshold = leaf.scalar("threshold").unwrap_or(1.0);
        Ok(Self::new(beta, threshold))
    }
}

impl Unit for Leaky {
    fn forward(&mut self, args: &[Tensor]) -> Result<Vec<Tensor>, UnitError> {
        if self.init_hidden {
            let [input] = args else {
                return Err(UnitError::Arity {
                    expected: 1,
                    found: args.len(),
                });
            };
            let membrane = self
                .membrane
                .take()
                .unwrap_or_else(|| Tensor::zeros_like(input));
            let (spikes, membrane) = self.step(input, &membrane)?;
            self.membrane = Some(membrane);
            return Ok(vec![spikes]);
        }

        let (input, membrane) = match args {
            [input] => (input, Tensor::zeros_like(input)),
            [input, membrane] => (input, membrane.clone()),
            _ => {
                return Err(UnitError::Arity {
                    expected: 2,
                    found: args.len(),
                })
            }
        };
        let (spikes, membrane) = self.step(input, &membrane)?;
        Ok(vec![spikes, membrane])
    }

    fn arity(&self) -> usize {
        2
    }

    fn state_spec(&self) -> StateSpec {
        if self.init_hidden {
            StateSpec::Stateless
        } else {
            StateSpec::Trailing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_integrates_and_fires() {
        let mut lif = Leaky::new(0.5, 1.0);
        let input = Tensor::from_vec(vec![0.8, 0.2]);

        let out = lif.forward(&[input.clone()]).unwrap();
        assert_eq!(out[0].data(), &[0.0, 0.0]);
        assert_approx_eq!(f32, out[1].data()[0], 0.8, epsilon = 1e-6);

        // 0.5 * 0.8 + 0.8 = 1.2 crosses the threshold and resets to 0.2
        let out = lif.forward(&[input, out[1].clone()]).unwrap();
        assert_eq!(out[0].data(), &[1.0, 0.0]);
        assert_approx_eq!(f32, out[1].data()[0], 0.2, epsilon = 1e-6);
        assert_approx_eq!(f32, out[1].data()[1], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_init_hidden_keeps_membrane() {
        let mut lif = Leaky::new(0.5, 1.0).with_init_hidden(true);
        assert_eq!(lif.state_spec(), StateSpec::Stateless);

        let input = Tensor::from_vec(vec![0.8]);
        assert_eq!(lif.forward(&[input.clone()]).unwrap()[0].data(), &[0.0]);
        assert_eq!(lif.forward(&[input]).unwrap()[0].data(), &[1.0]);
    }

    #[test]
    fn test_explicit_state_by_default() {
        let lif = Leaky::new(0.9, 1.0);
        assert_eq!(lif.state_spec(), StateSpec::Trailing);
    }

    #[test]
    fn test_too_many_arguments() {
        let mut lif = Leaky::new(0.9, 1.0);
        let x = Tensor::scalar(0.0);
        assert!(matches!(
            lif.forward(&[x.clone(), x.clone(), x]),
            Err(UnitError::Arity { expected: 2, found: 3 })
        ));
    }
}
