use crate::graph::{Unit, UnitError};
use crate::ir::{IrNode, Leaf};
use crate::tensor::{Shape, Tensor, TensorError};

/// `y = W x + b` applied along the last axis of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    weight: Tensor,
    bias: Tensor,
}

impl Affine {
    /// `weight` has shape `[out, in]` and `bias` shape `[out]`.
    pub fn new(weight: Tensor, bias: Tensor) -> Result<Self, TensorError> {
        let [out_features, in_features] = weight.shape().dims() else {
            return Err(TensorError::ShapeMismatch {
                left: weight.shape().clone(),
                right: bias.shape().clone(),
            });
        };
        if *in_features == 0 || bias.shape().dims() != [*out_features] {
            return Err(TensorError::ShapeMismatch {
                left: weight.shape().clone(),
                right: bias.shape().clone(),
            });
        }
        Ok(Self { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape().dims()[1]
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape().dims()[0]
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    /// Shape produced for an input of shape `input`.
    pub fn output_shape(&self, input: &Shape) -> Shape {
        let mut dims = input.dims().to_vec();
        match dims.last_mut() {
            Some(last) => *last = self.out_features(),
            None => dims.push(self.out_features()),
        }
        Shape::new(dims)
    }

    pub fn apply(&self, input: &Tensor) -> Result<Tensor, TensorError> {
        let in_features = self.in_features();
        let out_features = self.out_features();
        if input.shape().dims().last() != Some(&in_features) {
            return Err(TensorError::ShapeMismatch {
                left: input.shape().clone(),
                right: self.weight.shape().clone(),
            });
        }

        let weight = self.weight.data();
        let bias = self.bias.data();
        let mut out = Vec::with_capacity(input.len() / in_features * out_features);
        for row in input.data().chunks(in_features) {
            for o in 0..out_features {
                let w = &weight[o * in_features..(o + 1) * in_features];
                let dot: f32 = w.iter().zip(row).map(|(a, b)| a * b).sum();
                out.push(dot + bias[o]);
            }
        }
        Tensor::new(self.output_shape(input.shape()), out)
    }

    pub fn to_ir(&self) -> IrNode {
        Leaf::new("affine")
            .with_param("weight", self.weight.clone())
            .with_param("bias", self.bias.clone())
            .into()
    }

    pub fn from_leaf(leaf: &Leaf) -> Result<Self, UnitError> {
        let weight = leaf.param("weight").ok_or(UnitError::MissingParam("weight"))?;
        let bias = leaf.param("bias").ok_or(UnitError::MissingParam("bias"))?;
        Ok(Self::new(weight.clone(), bias.clone())?)
    }
}

impl Unit for Affine {
    fn forward(&mut self, args: &[Tensor]) -> Result<Vec<Tensor>, UnitError> {
        match args {
            [input] => Ok(vec![self.apply(input)?]),
            _ => Err(UnitError::Arity {
                expected: 1,
                found: args.len(),
            }),
        }
    }
}
