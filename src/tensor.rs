//! Dense `f32` tensors and the shapes that flow along graph edges.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("shape mismatch: {left} vs {right}")]
    ShapeMismatch { left: Shape, right: Shape },
    #[error("shape {shape} needs {expected} elements, got {found}")]
    DataLength {
        shape: Shape,
        expected: usize,
        found: usize,
    },
    #[error("dimension {dim} is out of range for shape {shape}")]
    InvalidDim { dim: usize, shape: Shape },
}

/// Logical dimensions of a tensor. A rank-0 shape describes a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new<D: Into<Vec<usize>>>(dims: D) -> Self {
        Shape { dims: dims.into() }
    }

    pub fn scalar() -> Self {
        Shape { dims: Vec::new() }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns a copy with the listed axes removed, e.g. to drop batch and
    /// time dimensions before declaring an IR input. Duplicate axes are
    /// removed once.
    pub fn without_dims(&self, dims: &[usize]) -> Result<Shape, TensorError> {
        if let Some(&dim) = dims.iter().find(|&&dim| dim >= self.rank()) {
            return Err(TensorError::InvalidDim {
                dim,
                shape: self.clone(),
            });
        }

        let kept = self
            .dims
            .iter()
            .enumerate()
            .filter(|(axis, _)| !dims.contains(axis))
            .map(|(_, &size)| size)
            .collect::<Vec<_>>();
        Ok(Shape::new(kept))
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, "]")
    }
}

/// Row-major dense tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor")]
pub struct Tensor {
    shape: Shape,
    data: Vec<f32>,
}

/// Deserialized form of a [`Tensor`] before its length is checked.
#[derive(Deserialize)]
struct RawTensor {
    shape: Shape,
    data: Vec<f32>,
}

impl TryFrom<RawTensor> for Tensor {
    type Error = TensorError;

    fn try_from(raw: RawTensor) -> Result<Self, Self::Error> {
        Tensor::new(raw.shape, raw.data)
    }
}

impl Tensor {
    pub fn new(shape: impl Into<Shape>, data: Vec<f32>) -> Result<Self, TensorError> {
        let shape = shape.into();
        let expected = shape.num_elements();
        if data.len() != expected {
            return Err(TensorError::DataLength {
                shape,
                expected,
                found: data.len(),
            });
        }
        Ok(Tensor { shape, data })
    }

    /// One-dimensional tensor holding `data`.
    pub fn from_vec(data: Vec<f32>) -> Self {
        Tensor {
            shape: Shape::new(vec![data.len()]),
            data,
        }
    }

    pub fn scalar(value: f32) -> Self {
        Tensor {
            shape: Shape::scalar(),
            data: vec![value],
        }
    }

    pub fn full(shape: impl Into<Shape>, value: f32) -> Self {
        let shape = shape.into();
        let data = vec![value; shape.num_elements()];
        Tensor { shape, data }
    }

    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, 0.0)
    }

    pub fn zeros_like(other: &Tensor) -> Self {
        Self::zeros(other.shape.clone())
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// First element, used for rank-0 parameters.
    pub fn as_scalar(&self) -> Option<f32> {
        self.data.first().copied()
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    pub fn zip_map(
        &self,
        other: &Tensor,
        f: impl Fn(f32, f32) -> f32,
    ) -> Result<Tensor, TensorError> {
        self.check_same_shape(other)?;
        Ok(Tensor {
            shape: self.shape.clone(),
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    pub fn add(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        self.zip_map(other, |a, b| a + b)
    }

    pub fn add_assign(&mut self, other: &Tensor) -> Result<(), TensorError> {
        self.check_same_shape(other)?;
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
        Ok(())
    }

    /// Elementwise sum of all `tensors`; `None` when the slice is empty.
    pub fn sum_all(tensors: &[&Tensor]) -> Result<Option<Tensor>, TensorError> {
        let Some((first, rest)) = tensors.split_first() else {
            return Ok(None);
        };

        let mut total = (*first).clone();
        for tensor in rest {
            total.add_assign(tensor)?;
        }
        Ok(Some(total))
    }

    fn check_same_shape(&self, other: &Tensor) -> Result<(), TensorError> {
        if self.shape != other.shape {
            return Err(TensorError::ShapeMismatch {
                left: self.shape.clone(),
                right: other.shape.clone(),
            });
        }
        Ok(())
    }
}
