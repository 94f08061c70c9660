//! Direct form II transposed IIR filtering and forward-backward (zero-phase) application.
use super::linalg::solve_vector;
use csi_pulse_common::Real;
use ndarray::Array2;

/// Applies the rational transfer function `b / a` to `signal`, starting from the delay line `state`.
///
/// `a[0]` must be one and `state` must hold `max(a.len(), b.len()) - 1` values.
pub(super) fn lfilter(b: &[Real], a: &[Real], signal: &[Real], state: &[Real]) -> Vec<Real> {
    let taps = a.len().max(b.len());
    let coefficient = |c: &[Real], k: usize| c.get(k).copied().unwrap_or_default();
    let mut z = state.to_vec();
    z.resize(taps.saturating_sub(1), 0.0);

    signal
        .iter()
        .map(|&x| {
            let y = coefficient(b, 0) * x + z.first().copied().unwrap_or_default();
            for k in 1..taps {
                let next = z.get(k).copied().unwrap_or_default();
                if let Some(delay) = z.get_mut(k - 1) {
                    *delay = coefficient(b, k) * x + next - coefficient(a, k) * y;
                }
            }
            y
        })
        .collect()
}

/// Computes the delay line for which a unit step input produces the filter's steady state output.
///
/// Scaling the result by the first sample of a signal suppresses the start-up transient.
/// Returns [None] if the system is singular, which happens when `a` has a pole at `z = 1`.
pub(super) fn steady_state(b: &[Real], a: &[Real]) -> Option<Vec<Real>> {
    let taps = a.len().max(b.len());
    if taps < 2 {
        return Some(Vec::new());
    }
    let coefficient = |c: &[Real], k: usize| c.get(k).copied().unwrap_or_default();
    let order = taps - 1;

    // (I - Aᵀ) where A is the companion matrix of the denominator.
    let mut system = Array2::<Real>::eye(order);
    for row in 0..order {
        system[[row, 0]] += coefficient(a, row + 1);
        if row + 1 < order {
            system[[row, row + 1]] -= 1.0;
        }
    }
    let rhs = (1..taps)
        .map(|k| coefficient(b, k) - coefficient(a, k) * coefficient(b, 0))
        .collect::<Vec<_>>();
    solve_vector(system, &rhs)
}

/// Extends `signal` at both ends by `padding` samples of its point reflection about the end values.
fn odd_extension(signal: &[Real], padding: usize) -> Vec<Real> {
    let (Some(&first), Some(&last)) = (signal.first(), signal.last()) else {
        return Vec::new();
    };
    let n = signal.len();
    let head = (1..=padding).rev().map(|i| 2.0 * first - signal[i]);
    let tail = (1..=padding).map(|i| 2.0 * last - signal[n - 1 - i]);
    head.chain(signal.iter().copied()).chain(tail).collect()
}

/// Filters `signal` forwards and then backwards so that the output has no phase distortion.
///
/// The signal is padded by odd extension of `3 · max(a.len(), b.len())` samples at each end,
/// reduced to `signal.len() - 1` for signals too short to carry the full padding.
/// The output has the same length as the input.
/// # Parameters
/// - b: numerator coefficients.
/// - a: denominator coefficients, `a[0] == 1`.
/// - initial_state: the filter's [steady_state].
/// - signal: the values to filter.
pub(super) fn filtfilt(
    b: &[Real],
    a: &[Real],
    initial_state: &[Real],
    signal: &[Real],
) -> Vec<Real> {
    if signal.is_empty() {
        return Vec::new();
    }
    let padding = (3 * a.len().max(b.len())).min(signal.len() - 1);
    let extended = odd_extension(signal, padding);

    let scaled = |scale: Real| initial_state.iter().map(|z| z * scale).collect::<Vec<_>>();

    let x0 = extended.first().copied().unwrap_or_default();
    let mut forward = lfilter(b, a, &extended, &scaled(x0));
    forward.reverse();

    let y0 = forward.first().copied().unwrap_or_default();
    let mut backward = lfilter(b, a, &forward, &scaled(y0));
    backward.reverse();

    backward
        .into_iter()
        .skip(padding)
        .take(signal.len())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn identity() {
        let x = [1.0, -2.0, 3.5];
        assert_eq!(lfilter(&[1.0], &[1.0], &x, &[]), x.to_vec());
    }

    #[test]
    fn recursive_impulse_response() {
        let y = lfilter(&[1.0], &[1.0, -0.5], &[1.0, 0.0, 0.0, 0.0], &[0.0]);
        assert_eq!(y, vec![1.0, 0.5, 0.25, 0.125]);
    }

    #[test]
    fn fir_with_initial_state() {
        // y[n] = x[n] + x[n - 1], with x[-1] = 2 held in the delay line.
        let y = lfilter(&[1.0, 1.0], &[1.0], &[1.0, 1.0, 1.0], &[2.0]);
        assert_eq!(y, vec![3.0, 2.0, 2.0]);
    }

    #[test]
    fn steady_state_removes_transient() {
        let (b, a) = ([0.2], [1.0, -0.8]);
        let zi = steady_state(&b, &a).unwrap();
        assert_eq!(zi.len(), 1);
        assert_approx_eq!(zi[0], 0.8);
        for y in lfilter(&b, &a, &[1.0; 10], &zi) {
            assert_approx_eq!(y, 1.0);
        }
    }

    #[test]
    fn steady_state_of_integrator_is_singular() {
        assert!(steady_state(&[1.0], &[1.0, -1.0]).is_none());
    }

    #[test]
    fn odd_extension_reflects_about_ends() {
        let extended = odd_extension(&[1.0, 2.0, 4.0, 7.0], 2);
        assert_eq!(extended, vec![-2.0, 0.0, 1.0, 2.0, 4.0, 7.0, 10.0, 12.0]);
        assert!(odd_extension(&[], 3).is_empty());
    }

    #[test]
    fn filtfilt_preserves_length() {
        let (b, a) = ([0.2], [1.0, -0.8]);
        let zi = steady_state(&b, &a).unwrap();
        for n in [0, 1, 2, 5, 6, 7, 50] {
            let x = (0..n).map(|i| i as Real).collect::<Vec<_>>();
            assert_eq!(filtfilt(&b, &a, &zi, &x).len(), n);
        }
    }

    #[test]
    fn filtfilt_lowpass_passes_constant() {
        let (b, a) = ([0.2], [1.0, -0.8]);
        let zi = steady_state(&b, &a).unwrap();
        for y in filtfilt(&b, &a, &zi, &[3.0; 40]) {
            assert_approx_eq!(y, 3.0);
        }
    }

    #[test]
    fn filtfilt_has_no_delay() {
        // A one-pole lowpass delays a ramp when applied forwards only.
        let (b, a) = ([0.2], [1.0, -0.8]);
        let zi = steady_state(&b, &a).unwrap();
        let ramp = (0..200).map(|i| i as Real).collect::<Vec<_>>();
        let y = filtfilt(&b, &a, &zi, &ramp);
        for i in 90..110 {
            assert_approx_eq!(y[i], ramp[i], 1e-6);
        }
    }
}
