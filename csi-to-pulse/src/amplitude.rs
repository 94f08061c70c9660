//! Converts interleaved CSI samples into per-subcarrier amplitudes.
use csi_pulse_common::{Amplitude, RawSample, Real};
use num::complex::Complex;

/// Computes the magnitude of each subcarrier.
///
/// Each consecutive pair holds the imaginary part first and the real part second.
/// The caller guarantees an even number of samples; a trailing unpaired sample is ignored.
pub(crate) fn extract(raw_samples: &[RawSample]) -> Vec<Amplitude> {
    raw_samples
        .chunks_exact(2)
        .map(|pair| match pair {
            &[imag, real] => Complex::new(real as Real, imag as Real).norm(),
            _ => Amplitude::default(),
        })
        .collect()
}
