//! Defines the session parameters of the pipeline.
use clap::{Args, Subcommand};
use csi_pulse_common::Real;
use std::path::PathBuf;

/// Parameters of the three conditioning stages.
#[derive(Debug, Clone, Args)]
pub(crate) struct ConditioningParameters {
    /// Sampling frequency assigned to the subcarrier axis, in Hz.
    #[clap(long, default_value = "20.0")]
    pub(crate) sample_rate: Real,

    /// Order of the Butterworth prototype used by both band-pass stages.
    #[clap(long, default_value = "3")]
    pub(crate) filter_order: usize,

    /// Lower edge of the stationary noise removal band, in Hz.
    #[clap(long, default_value = "2.0")]
    pub(crate) dc_removal_lowcut: Real,

    /// Upper edge of the stationary noise removal band, in Hz.
    #[clap(long, default_value = "5.0")]
    pub(crate) dc_removal_highcut: Real,

    /// Lower edge of the pulse band, in Hz.
    #[clap(long, default_value = "0.8")]
    pub(crate) pulse_lowcut: Real,

    /// Upper edge of the pulse band, in Hz.
    #[clap(long, default_value = "2.17")]
    pub(crate) pulse_highcut: Real,

    /// Savitzky-Golay window length. Even values are rounded up.
    #[clap(long, default_value = "15")]
    pub(crate) smoothing_window: usize,

    /// Savitzky-Golay polynomial order.
    #[clap(long, default_value = "3")]
    pub(crate) smoothing_polyorder: usize,
}

impl Default for ConditioningParameters {
    fn default() -> Self {
        Self {
            sample_rate: 20.0,
            filter_order: 3,
            dc_removal_lowcut: 2.0,
            dc_removal_highcut: 5.0,
            pulse_lowcut: 0.8,
            pulse_highcut: 2.17,
            smoothing_window: 15,
            smoothing_polyorder: 3,
        }
    }
}

/// Parameters of the sliding window handed to the estimator.
#[derive(Debug, Clone, Args)]
pub(crate) struct WindowParameters {
    /// Number of conditioned vectors in each window.
    #[clap(long, default_value = "100")]
    pub(crate) window_length: usize,

    /// Number of subcarriers in each vector. Frames of any other width stop the stream.
    #[clap(long, default_value = "192")]
    pub(crate) subcarriers: usize,
}

/// Specifies what is done with the conditioned vectors.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Mode {
    /// Windows the conditioned vectors and feeds every full window to a linear estimator.
    Predict(PredictParameters),
    /// Appends each conditioned vector to a training file as one comma separated line.
    Collect(CollectParameters),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct PredictParameters {
    /// JSON file holding the estimator's weights and bias.
    #[clap(long)]
    pub(crate) weights: PathBuf,

    #[clap(flatten)]
    pub(crate) window: WindowParameters,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct CollectParameters {
    /// File the conditioned vectors are appended to.
    #[clap(long, default_value = "./csi_training_data.csv")]
    pub(crate) output: PathBuf,
}
