//! Digital Butterworth band-pass design by the bilinear transform.
use super::{
    ConfigurationError,
    zero_phase::{filtfilt, steady_state},
};
use csi_pulse_common::Real;
use num::complex::Complex;
use std::f64::consts::PI;

type Cplx = Complex<Real>;

/// Sampling frequency of the normalised digital domain, in which Nyquist is one.
const NORMALISED_SAMPLE_RATE: Real = 2.0;

/// Poles of the analog lowpass prototype with unit cutoff.
fn prototype_poles(order: usize) -> Vec<Cplx> {
    let n = order as Real;
    (0..order)
        .map(|i| {
            let m = 1.0 - n + 2.0 * i as Real;
            -Cplx::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect()
}

/// Expands `∏ (x - rootᵢ)` into coefficients, highest power first.
fn polynomial_from_roots(roots: &[Cplx]) -> Vec<Cplx> {
    roots.iter().fold(vec![Cplx::from(1.0)], |coefficients, root| {
        let mut expanded = coefficients.clone();
        expanded.push(Cplx::from(0.0));
        for (k, c) in coefficients.iter().enumerate() {
            expanded[k + 1] -= root * c;
        }
        expanded
    })
}

/// Designs the transfer function of a digital Butterworth band-pass filter.
///
/// Returns `(b, a)`, each of length `2 · order + 1`, with `a[0] == 1`.
/// # Parameters
/// - order: order of the lowpass prototype.
/// - low: lower edge, as a fraction of Nyquist.
/// - high: upper edge, as a fraction of Nyquist.
fn design(order: usize, low: Real, high: Real) -> (Vec<Real>, Vec<Real>) {
    let fs = NORMALISED_SAMPLE_RATE;
    let warp = |w: Real| 2.0 * fs * (PI * w / fs).tan();
    let (warped_low, warped_high) = (warp(low), warp(high));
    let bandwidth = warped_high - warped_low;
    let centre = (warped_low * warped_high).sqrt();

    // Lowpass to bandpass: every prototype pole splits into two, and `order` zeros appear at the origin.
    let (upper, lower): (Vec<_>, Vec<_>) = prototype_poles(order)
        .into_iter()
        .map(|p| {
            let p = p * (bandwidth / 2.0);
            let offset = (p * p - centre * centre).sqrt();
            (p + offset, p - offset)
        })
        .unzip();
    let analog_poles = upper.into_iter().chain(lower).collect::<Vec<_>>();
    let analog_gain = bandwidth.powi(order as i32);

    // Bilinear transform: zeros at the origin map to z = 1, the excess degree adds zeros at z = -1.
    let fs2 = Cplx::from(2.0 * fs);
    let digital_zeros = std::iter::repeat_n(Cplx::from(1.0), order)
        .chain(std::iter::repeat_n(Cplx::from(-1.0), order))
        .collect::<Vec<_>>();
    let digital_poles = analog_poles
        .iter()
        .map(|p| (fs2 + p) / (fs2 - p))
        .collect::<Vec<_>>();
    let zeros_term = Cplx::from((2.0 * fs).powi(order as i32));
    let poles_term = analog_poles
        .iter()
        .fold(Cplx::from(1.0), |product, p| product * (fs2 - p));
    let digital_gain = analog_gain * (zeros_term / poles_term).re;

    let b = polynomial_from_roots(&digital_zeros)
        .into_iter()
        .map(|c| digital_gain * c.re)
        .collect();
    let a = polynomial_from_roots(&digital_poles)
        .into_iter()
        .map(|c| c.re)
        .collect();
    (b, a)
}

/// A zero-phase Butterworth band-pass filter with fixed parameters.
#[derive(Clone, Debug)]
pub(crate) struct BandPass {
    numerator: Vec<Real>,
    denominator: Vec<Real>,
    initial_state: Vec<Real>,
}

impl BandPass {
    /// Designs the filter, failing unless `0 < lowcut < highcut < sample_rate / 2`.
    /// # Parameters
    /// - order: order of the lowpass prototype, the band-pass has twice this order.
    /// - lowcut: lower edge of the pass band in Hz.
    /// - highcut: upper edge of the pass band in Hz.
    /// - sample_rate: sampling frequency in Hz.
    pub(crate) fn new(
        order: usize,
        lowcut: Real,
        highcut: Real,
        sample_rate: Real,
    ) -> Result<Self, ConfigurationError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ConfigurationError::InvalidSampleRate(sample_rate));
        }
        if order == 0 {
            return Err(ConfigurationError::ZeroFilterOrder);
        }
        let nyquist = 0.5 * sample_rate;
        if !(0.0 < lowcut && lowcut < highcut && highcut < nyquist) {
            return Err(ConfigurationError::InvalidBand {
                lowcut,
                highcut,
                nyquist,
            });
        }

        let (numerator, denominator) = design(order, lowcut / nyquist, highcut / nyquist);
        let initial_state = steady_state(&numerator, &denominator)
            .ok_or(ConfigurationError::UnstableFilter { lowcut, highcut })?;
        Ok(Self {
            numerator,
            denominator,
            initial_state,
        })
    }

    /// Applies the filter forwards and backwards. The output has the length of the input.
    pub(crate) fn apply(&self, signal: &[Real]) -> Vec<Real> {
        filtfilt(
            &self.numerator,
            &self.denominator,
            &self.initial_state,
            signal,
        )
    }

    /// Magnitude of the single pass frequency response at `frequency` Hz.
    #[cfg(test)]
    pub(crate) fn gain(&self, frequency: Real, sample_rate: Real) -> Real {
        let z_inv = Cplx::from_polar(1.0, -2.0 * PI * frequency / sample_rate);
        let evaluate = |coefficients: &[Real]| {
            coefficients
                .iter()
                .rev()
                .fold(Cplx::from(0.0), |acc, &c| acc * z_inv + c)
        };
        (evaluate(&self.numerator) / evaluate(&self.denominator)).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const FS: Real = 20.0;

    #[test]
    fn coefficient_structure() {
        let filter = BandPass::new(3, 2.0, 5.0, FS).unwrap();
        assert_eq!(filter.numerator.len(), 7);
        assert_eq!(filter.denominator.len(), 7);
        assert_eq!(filter.initial_state.len(), 6);
        assert_approx_eq!(filter.denominator[0], 1.0);

        // b is proportional to (1 - z⁻²)³ = 1 - 3z⁻² + 3z⁻⁴ - z⁻⁶.
        let b = &filter.numerator;
        let k = b[0];
        assert!(k > 0.0);
        for (i, expected) in [1.0, 0.0, -3.0, 0.0, 3.0, 0.0, -1.0].into_iter().enumerate() {
            assert_approx_eq!(b[i], k * expected, 1e-12);
        }
    }

    #[test]
    fn reference_coefficients() {
        // butter(3, [0.2, 0.5], btype = "band")
        let (b, a) = design(3, 0.2, 0.5);
        let expected_b = [
            0.04953299635725316,
            0.0,
            -0.14859898907175947,
            0.0,
            0.14859898907175947,
            0.0,
            -0.04953299635725316,
        ];
        let expected_a = [
            1.0,
            -2.120602876626562,
            2.72474920276848,
            -2.2895181180768036,
            1.4662465331703471,
            -0.5651792123082665,
            0.1377613012598929,
        ];
        for (actual, expected) in b.iter().zip(expected_b) {
            assert_approx_eq!(actual, expected, 1e-12);
        }
        for (actual, expected) in a.iter().zip(expected_a) {
            assert_approx_eq!(actual, expected, 1e-12);
        }
    }

    #[test]
    fn reference_step_response() {
        let filter = BandPass::new(3, 2.0, 5.0, FS).unwrap();
        let step = (0..24)
            .map(|i| if i >= 8 { 1.0 } else { 0.0 })
            .collect::<Vec<_>>();
        let filtered = filter.apply(&step);
        let expected = [
            -0.00029732815375899634,
            0.03717648644483659,
            0.09545443076635993,
            0.1449755765501201,
        ];
        for (actual, expected) in filtered.iter().zip(expected) {
            assert_approx_eq!(actual, expected, 1e-9);
        }
    }

    #[test]
    fn half_power_at_band_edges() {
        for (low, high) in [(2.0, 5.0), (0.8, 2.17)] {
            let filter = BandPass::new(3, low, high, FS).unwrap();
            assert_approx_eq!(filter.gain(low, FS), Real::sqrt(0.5), 1e-9);
            assert_approx_eq!(filter.gain(high, FS), Real::sqrt(0.5), 1e-9);
        }
    }

    #[test]
    fn rejects_dc_and_nyquist() {
        let filter = BandPass::new(3, 2.0, 5.0, FS).unwrap();
        assert!(filter.gain(0.0, FS) < 1e-9);
        assert!(filter.gain(FS / 2.0, FS) < 1e-9);
        assert!(filter.gain(3.2, FS) > 0.99);
    }

    #[test]
    fn constant_signal_is_removed() {
        let filter = BandPass::new(3, 2.0, 5.0, FS).unwrap();
        let output = filter.apply(&[7.5; 96]);
        assert_eq!(output.len(), 96);
        for y in output {
            assert!(y.abs() < 1e-9, "{y}");
        }
    }

    #[test]
    fn in_band_sinusoid_is_not_shifted() {
        let filter = BandPass::new(3, 2.0, 5.0, FS).unwrap();
        let frequency = 3.3;
        let gain = filter.gain(frequency, FS);
        let signal = (0..400)
            .map(|i| (2.0 * PI * frequency * i as Real / FS).sin())
            .collect::<Vec<_>>();
        let output = filter.apply(&signal);
        for i in 150..250 {
            assert_approx_eq!(output[i], gain * gain * signal[i], 1e-6);
        }
    }

    #[test]
    fn invalid_bands() {
        for (low, high) in [(0.0, 5.0), (-1.0, 5.0), (5.0, 2.0), (3.0, 3.0), (2.0, 10.0), (2.0, 12.0)] {
            assert!(
                matches!(
                    BandPass::new(3, low, high, FS),
                    Err(ConfigurationError::InvalidBand { .. })
                ),
                "({low}, {high})"
            );
        }
    }

    #[test]
    fn invalid_rate_and_order() {
        assert!(matches!(
            BandPass::new(3, 2.0, 5.0, 0.0),
            Err(ConfigurationError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            BandPass::new(0, 2.0, 5.0, FS),
            Err(ConfigurationError::ZeroFilterOrder)
        ));
    }

    #[test]
    fn short_signals_are_filtered() {
        let filter = BandPass::new(3, 0.8, 2.17, FS).unwrap();
        for n in [1, 2, 10, 21, 22] {
            let signal = (0..n).map(|i| (i % 3) as Real).collect::<Vec<_>>();
            let output = filter.apply(&signal);
            assert_eq!(output.len(), n);
            assert!(output.iter().all(|y| y.is_finite()));
        }
    }
}
