//! Owned numeric buffers passed to and from a model.

use thiserror::Error;

use crate::labels::{LabelError, LabelSet};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("shape {shape:?} needs {expected} values, got {actual}")]
    LengthMismatch {
        shape: [usize; 4],
        expected: usize,
        actual: usize,
    },
}

/// Channel-first image batch: `[batch, channels, height, width]`.
///
/// Dropping the tensor releases its buffer; moving it into a model call ties
/// its lifetime to that call.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl InputTensor {
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, TensorError> {
        let expected = shape.iter().product();
        if data.len() != expected {
            return Err(TensorError::LengthMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn batch(&self) -> usize {
        self.shape[0]
    }

    pub fn channels(&self) -> usize {
        self.shape[1]
    }

    pub fn height(&self) -> usize {
        self.shape[2]
    }

    pub fn width(&self) -> usize {
        self.shape[3]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Smallest and largest value, or `None` for an empty tensor.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.data.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// Raw model output whose width has been checked against a [`LabelSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Scores {
    values: Vec<f32>,
}

impl Scores {
    /// Accept `values` only if there is exactly one score per label.
    pub fn validate(values: Vec<f32>, labels: &LabelSet) -> Result<Self, LabelError> {
        labels.check_width(values.len())?;
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}
