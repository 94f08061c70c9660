//! Maps a full window to a scalar prediction.
use crate::buffer::WindowTensor;
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum EstimatorError {
    #[error("Cannot open weights file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot parse weights file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Estimator expects {expected} weights, found {actual}")]
    WeightCount { expected: usize, actual: usize },
    #[error("Window has shape {actual:?}, the estimator expects {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("Estimator produced a non-finite value")]
    NonFinite,
}

/// Something which turns a `(window_length, subcarriers)` tensor into one value.
pub(crate) trait Estimator {
    fn estimate(&mut self, window: &WindowTensor) -> Result<f32, EstimatorError>;
}

/// On disk layout of a [LinearEstimator].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LinearWeights {
    /// One weight per tensor element, row major.
    weights: Vec<f32>,
    #[serde(default)]
    bias: f32,
}

/// Weighted sum of every tensor element plus a bias.
#[derive(Debug)]
pub(crate) struct LinearEstimator {
    shape: (usize, usize),
    weights: WindowTensor,
    bias: f32,
}

impl LinearEstimator {
    pub(crate) fn new(
        window_length: usize,
        subcarriers: usize,
        weights: Vec<f32>,
        bias: f32,
    ) -> Result<Self, EstimatorError> {
        let shape = (window_length, subcarriers);
        let actual = weights.len();
        let weights =
            WindowTensor::from_shape_vec(shape, weights).map_err(|_| EstimatorError::WeightCount {
                expected: window_length * subcarriers,
                actual,
            })?;
        Ok(Self {
            shape,
            weights,
            bias,
        })
    }

    /// Loads the weights and bias from a JSON file of the form
    /// `{ "weights": [...], "bias": 0.0 }`.
    pub(crate) fn from_file(
        path: &Path,
        window_length: usize,
        subcarriers: usize,
    ) -> Result<Self, EstimatorError> {
        let LinearWeights { weights, bias } =
            serde_json::from_reader(BufReader::new(File::open(path)?))?;
        info!("Loaded {} estimator weights from {path:?}", weights.len());
        Self::new(window_length, subcarriers, weights, bias)
    }
}

impl Estimator for LinearEstimator {
    fn estimate(&mut self, window: &WindowTensor) -> Result<f32, EstimatorError> {
        if window.dim() != self.shape {
            return Err(EstimatorError::ShapeMismatch {
                expected: self.shape,
                actual: window.dim(),
            });
        }
        let value = (window * &self.weights).sum() + self.bias;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EstimatorError::NonFinite)
        }
    }
}
