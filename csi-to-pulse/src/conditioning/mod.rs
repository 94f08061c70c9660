//! The three stage filter chain applied to every amplitude vector.
//!
//! The subcarrier index is treated as time, sampled at [ConditioningParameters::sample_rate].
//! Each stage is a pure function of its parameters and its input, so the chain holds
//! no state between frames.
mod butterworth;
mod linalg;
mod savitzky_golay;
mod zero_phase;

use crate::parameters::ConditioningParameters;
use butterworth::BandPass;
use csi_pulse_common::{Amplitude, Real};
use savitzky_golay::SavitzkyGolay;
use thiserror::Error;
use tracing::{debug, instrument};

/// Invalid filter parameters, detected when the [Conditioner] is built.
#[derive(Debug, Error)]
pub(crate) enum ConfigurationError {
    #[error("Sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(Real),
    #[error("Filter order must be at least one")]
    ZeroFilterOrder,
    #[error("Band {lowcut}-{highcut} Hz does not satisfy 0 < lowcut < highcut < {nyquist} Hz")]
    InvalidBand {
        lowcut: Real,
        highcut: Real,
        nyquist: Real,
    },
    #[error("Band {lowcut}-{highcut} Hz yields a filter without a steady state")]
    UnstableFilter { lowcut: Real, highcut: Real },
    #[error("Smoothing window {window_length} is too small for polynomial order {polyorder}")]
    SmoothingWindowTooSmall {
        window_length: usize,
        polyorder: usize,
    },
}

/// Removes stationary noise, isolates the pulse band and smooths the result.
#[derive(Clone, Debug)]
pub(crate) struct Conditioner {
    dc_removal: BandPass,
    pulse_extraction: BandPass,
    smoothing: SavitzkyGolay,
}

impl Conditioner {
    pub(crate) fn new(parameters: &ConditioningParameters) -> Result<Self, ConfigurationError> {
        let dc_removal = BandPass::new(
            parameters.filter_order,
            parameters.dc_removal_lowcut,
            parameters.dc_removal_highcut,
            parameters.sample_rate,
        )?;
        let pulse_extraction = BandPass::new(
            parameters.filter_order,
            parameters.pulse_lowcut,
            parameters.pulse_highcut,
            parameters.sample_rate,
        )?;
        let smoothing =
            SavitzkyGolay::new(parameters.smoothing_window, parameters.smoothing_polyorder)?;
        debug!(
            "Conditioner ready, smoothing window {}",
            smoothing.window_length()
        );
        Ok(Self {
            dc_removal,
            pulse_extraction,
            smoothing,
        })
    }

    /// Runs the three stages in order. The output has the length of the input.
    #[instrument(skip_all, level = "trace", fields(len = amplitudes.len()))]
    pub(crate) fn condition(&self, amplitudes: &[Amplitude]) -> Vec<Real> {
        let stationary_removed = self.dc_removal.apply(amplitudes);
        let pulse = self.pulse_extraction.apply(&stationary_removed);
        self.smoothing.smooth(&pulse)
    }
}
