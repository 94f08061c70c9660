//! Savitzky-Golay smoothing by local polynomial least squares.
use super::{ConfigurationError, linalg::solve};
use csi_pulse_common::Real;
use ndarray::Array2;
use tracing::trace;

/// Computes the hat matrix `V (VᵀV)⁻¹ Vᵀ` of a polynomial fit over `window_length` points.
///
/// Row `r` holds the weights which, applied to the window's values, give the fitted
/// polynomial's value at position `r`. The middle row is the classic smoothing kernel;
/// the others evaluate the fit at the edges of a signal.
fn fit_projection(window_length: usize, polyorder: usize) -> Option<Array2<Real>> {
    let centre = (window_length / 2) as Real;
    let vandermonde = Array2::from_shape_fn((window_length, polyorder + 1), |(i, k)| {
        (i as Real - centre).powi(k as i32)
    });
    let normal = vandermonde.t().dot(&vandermonde);
    let pseudo_inverse = solve(normal, vandermonde.t().to_owned())?;
    Some(vandermonde.dot(&pseudo_inverse))
}

/// Savitzky-Golay smoother with a fixed nominal window.
#[derive(Clone, Debug)]
pub(crate) struct SavitzkyGolay {
    window_length: usize,
    polyorder: usize,
    projection: Array2<Real>,
}

impl SavitzkyGolay {
    /// Creates the smoother, rounding an even window length up to the next odd value.
    ///
    /// Fails if the window cannot hold `polyorder + 2` points.
    pub(crate) fn new(window_length: usize, polyorder: usize) -> Result<Self, ConfigurationError> {
        let window_length = if window_length % 2 == 0 {
            window_length + 1
        } else {
            window_length
        };
        if window_length < polyorder + 2 {
            return Err(ConfigurationError::SmoothingWindowTooSmall {
                window_length,
                polyorder,
            });
        }
        let projection = fit_projection(window_length, polyorder).ok_or(
            ConfigurationError::SmoothingWindowTooSmall {
                window_length,
                polyorder,
            },
        )?;
        Ok(Self {
            window_length,
            polyorder,
            projection,
        })
    }

    pub(crate) fn window_length(&self) -> usize {
        self.window_length
    }

    /// The window used for a signal of the given length, or [None] if smoothing is skipped.
    ///
    /// A window at least as long as the signal falls back to the largest odd length
    /// strictly shorter than the signal, provided that still holds `polyorder + 2` points.
    pub(crate) fn effective_window(&self, signal_length: usize) -> Option<usize> {
        if signal_length == 0 {
            return None;
        }
        if self.window_length < signal_length {
            return Some(self.window_length);
        }
        let candidate = signal_length - 1;
        let candidate = if candidate % 2 == 0 {
            candidate.saturating_sub(1)
        } else {
            candidate
        };
        (candidate >= self.polyorder + 2).then_some(candidate)
    }

    /// Smooths `signal`, returning a vector of the same length.
    ///
    /// Points within half a window of either end take the value of the polynomial
    /// fitted to the first or last full window.
    pub(crate) fn smooth(&self, signal: &[Real]) -> Vec<Real> {
        let Some(window_length) = self.effective_window(signal.len()) else {
            trace!(
                "Signal of length {} too short to smooth, passing through",
                signal.len()
            );
            return signal.to_vec();
        };

        let fallback;
        let projection = if window_length == self.window_length {
            &self.projection
        } else {
            match fit_projection(window_length, self.polyorder) {
                Some(projection) => {
                    fallback = projection;
                    &fallback
                }
                None => return signal.to_vec(),
            }
        };

        let half = window_length / 2;
        let last_start = signal.len() - window_length;
        (0..signal.len())
            .map(|i| {
                let start = i.saturating_sub(half).min(last_start);
                projection
                    .row(i - start)
                    .iter()
                    .zip(&signal[start..start + window_length])
                    .map(|(w, x)| w * x)
                    .sum::<Real>()
            })
            .collect()
    }
}
