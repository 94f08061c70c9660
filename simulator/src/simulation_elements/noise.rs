use super::utils::{Interval, JsonValueError, NumExpression};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;
use std::collections::VecDeque;

/// Noise added to the amplitudes of a band of subcarriers.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct NoiseSource {
    /// Subcarriers the noise applies to.
    bounds: Interval<usize>,
    attributes: NoiseAttributes,
    /// Length of the moving average window to apply to the noise, along the subcarrier axis.
    /// If no smoothing is required, set this to
    /// ```json
    /// "smoothing-window-length": { "const": 1 }
    /// ```
    smoothing_window_length: NumExpression<usize>,
}

impl NoiseSource {
    pub(crate) fn sample<R: Rng>(
        &self,
        rng: &mut R,
        subcarrier: usize,
        frame_index: usize,
    ) -> Result<f64, JsonValueError> {
        if self.bounds.is_in(subcarrier) {
            match &self.attributes {
                NoiseAttributes::Uniform(Interval { min, max }) => {
                    let (min, max) = (min.value(frame_index)?, max.value(frame_index)?);
                    Ok((max - min) * rng.random::<f64>() + min)
                }
                NoiseAttributes::Gaussian { mean, sd } => {
                    Ok(Normal::new(mean.value(frame_index)?, sd.value(frame_index)?)?.sample(rng))
                }
            }
        } else {
            Ok(f64::default())
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "noise-type")]
pub(crate) enum NoiseAttributes {
    Uniform(Interval<NumExpression<f64>>),
    Gaussian {
        mean: NumExpression<f64>,
        sd: NumExpression<f64>,
    },
}

/// Applies one [NoiseSource] across the subcarriers of a single frame.
pub(crate) struct Noise<'a> {
    source: &'a NoiseSource,
    prev: VecDeque<f64>,
}

impl<'a> Noise<'a> {
    pub(crate) fn new(source: &'a NoiseSource) -> Self {
        Self {
            source,
            prev: Default::default(),
        }
    }

    pub(crate) fn noisify<R: Rng>(
        &mut self,
        rng: &mut R,
        value: f64,
        subcarrier: usize,
        frame_index: usize,
    ) -> Result<f64, JsonValueError> {
        let window_len = self
            .source
            .smoothing_window_length
            .value(frame_index)?
            .max(1);
        while self.prev.len() >= window_len {
            self.prev.pop_front();
        }
        self.prev
            .push_back(self.source.sample(rng, subcarrier, frame_index)?);
        Ok(value + self.prev.iter().sum::<f64>() / self.prev.len() as f64)
    }
}
