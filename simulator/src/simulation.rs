use crate::simulation_elements::{
    AmplitudePattern, Corruption, Layout, Noise, NoiseSource, RecordFields, corrupt,
    format_record,
    utils::{FloatRandomDistribution, IntRandomDistribution, JsonValueError, NumConstant, TextConstant},
};
use csi_pulse_common::{Gain, RawSample};
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{instrument, trace};

///
/// This struct is created from the configuration JSON file.
///
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Simulation {
    #[serde(default)]
    pub(crate) layout: Layout,
    //  Number of subcarriers per frame, each carried as an (imaginary, real) pair
    pub(crate) subcarriers: NumConstant<usize>,
    //  Number of lines to emit
    pub(crate) frames: NumConstant<usize>,
    pub(crate) mac: TextConstant,
    pub(crate) channel: NumConstant<i32>,
    //  Advance of the chip's local timestamp between frames, in microseconds
    pub(crate) frame_interval_us: NumConstant<i64>,
    pub(crate) amplitude: AmplitudePattern,
    //  Phase of each subcarrier, in radians
    pub(crate) phase: FloatRandomDistribution<f64>,
    #[serde(default)]
    pub(crate) noises: Vec<NoiseSource>,
    pub(crate) rssi: IntRandomDistribution<i32>,
    pub(crate) noise_floor: IntRandomDistribution<i32>,
    pub(crate) agc_gain: IntRandomDistribution<Gain>,
    pub(crate) fft_gain: IntRandomDistribution<Gain>,
    //  Probability that a line is damaged
    #[serde(default)]
    pub(crate) malformed_rate: f64,
}

#[derive(Debug, Error)]
pub(crate) enum SimulationError {
    #[error("Malformed rate {0} is not a probability")]
    InvalidMalformedRate(f64),
    #[error("Json Value error: {0}")]
    JsonValue(#[from] JsonValueError),
}

impl Simulation {
    pub(crate) fn validate(&self) -> Result<(), SimulationError> {
        if (0.0..=1.0).contains(&self.malformed_rate) {
            Ok(())
        } else {
            Err(SimulationError::InvalidMalformedRate(self.malformed_rate))
        }
    }

    /// Generates the interleaved (imaginary, real) samples of one frame.
    #[instrument(skip_all, level = "trace", err(level = "error"))]
    pub(crate) fn generate_samples<R: Rng>(
        &self,
        rng: &mut R,
        frame_index: usize,
    ) -> Result<Vec<RawSample>, SimulationError> {
        let subcarriers = self.subcarriers.value()?;
        let mut noises = self.noises.iter().map(Noise::new).collect::<Vec<_>>();
        let mut samples = Vec::with_capacity(2 * subcarriers);
        for subcarrier in 0..subcarriers {
            let mut amplitude = self.amplitude.amplitude(subcarrier, frame_index)?;
            for noise in &mut noises {
                amplitude = noise.noisify(rng, amplitude, subcarrier, frame_index)?;
            }
            let amplitude = amplitude.max(0.0);
            let phase = self.phase.sample(rng, frame_index)?;
            samples.push((amplitude * phase.sin()).round() as RawSample);
            samples.push((amplitude * phase.cos()).round() as RawSample);
        }
        Ok(samples)
    }

    /// Generates the line for one frame, damaged with probability `malformed_rate`.
    #[instrument(skip_all, level = "debug", err(level = "error"))]
    pub(crate) fn generate_line<R: Rng>(
        &self,
        rng: &mut R,
        frame_index: usize,
    ) -> Result<String, SimulationError> {
        let samples = self.generate_samples(rng, frame_index)?;
        let fields = RecordFields {
            id: frame_index,
            mac: self.mac.value()?,
            rssi: self.rssi.sample(rng, frame_index)?,
            noise_floor: self.noise_floor.sample(rng, frame_index)?,
            agc_gain: self.agc_gain.sample(rng, frame_index)?,
            fft_gain: self.fft_gain.sample(rng, frame_index)?,
            channel: self.channel.value()?,
            local_timestamp: self.frame_interval_us.value()? * frame_index as i64,
        };
        if rng.random_bool(self.malformed_rate) {
            let corruption = Corruption::choose(rng);
            trace!("Damaging frame {frame_index}: {corruption:?}");
            Ok(corrupt(corruption, self.layout, &fields, &samples))
        } else {
            Ok(format_record(self.layout, &fields, &samples, samples.len()))
        }
    }
}
