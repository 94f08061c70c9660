use csi_pulse_common::Real;
use ndarray::Array2;
use std::collections::VecDeque;
use thiserror::Error;

/// A full window in arrival order, one conditioned vector per row.
pub(crate) type WindowTensor = Array2<f32>;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum WindowError {
    #[error("Window length must be at least one")]
    ZeroCapacity,
    #[error("Vector has {actual} values, the window expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result of pushing a vector into a [WindowBuffer].
#[derive(Debug, PartialEq)]
pub(crate) enum WindowPush {
    /// The window is full; holds its contents.
    Full(WindowTensor),
    /// The window is still filling; holds `(current_length, capacity)`.
    Progress(usize, usize),
}

/// Holds the most recent `capacity` conditioned vectors, each of a fixed dimension.
#[derive(Debug)]
pub(crate) struct WindowBuffer {
    capacity: usize,
    dimension: usize,
    vectors: VecDeque<Vec<Real>>,
}

impl WindowBuffer {
    pub(crate) fn new(capacity: usize, dimension: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            dimension,
            vectors: VecDeque::with_capacity(capacity + 1),
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Appends `vector`, evicting the oldest when over capacity.
    ///
    /// Once the window is full every push returns the whole window.
    /// A vector of the wrong dimension is refused and leaves the window unchanged.
    pub(crate) fn push(&mut self, vector: Vec<Real>) -> Result<WindowPush, WindowError> {
        if vector.len() != self.dimension {
            return Err(WindowError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.vectors.push_back(vector);
        if self.vectors.len() > self.capacity {
            self.vectors.pop_front();
        }

        if self.vectors.len() == self.capacity {
            Ok(WindowPush::Full(self.tensor()))
        } else {
            Ok(WindowPush::Progress(self.vectors.len(), self.capacity))
        }
    }

    fn tensor(&self) -> WindowTensor {
        let mut tensor = Array2::zeros((self.capacity, self.dimension));
        for (mut row, vector) in tensor.rows_mut().into_iter().zip(&self.vectors) {
            for (cell, value) in row.iter_mut().zip(vector) {
                *cell = *value as f32;
            }
        }
        tensor
    }
}
