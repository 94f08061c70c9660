use super::utils::{JsonValueError, NumExpression};
use serde::Deserialize;
use std::f64::consts::PI;

/// A sinusoidal ripple across the subcarriers which drifts from frame to frame.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Ripple {
    amplitude: NumExpression<f64>,
    /// Cycles per subcarrier.
    frequency: NumExpression<f64>,
    /// Phase advance per frame, in radians.
    #[serde(default)]
    drift: f64,
}

/// Noise free amplitude of every subcarrier as a function of the frame index.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct AmplitudePattern {
    baseline: NumExpression<f64>,
    #[serde(default)]
    ripples: Vec<Ripple>,
}

impl AmplitudePattern {
    pub(crate) fn amplitude(&self, subcarrier: usize, frame_index: usize) -> Result<f64, JsonValueError> {
        let k = subcarrier as f64;
        self.ripples
            .iter()
            .try_fold(self.baseline.value(frame_index)?, |sum, ripple| {
                let phase = 2.0 * PI * ripple.frequency.value(frame_index)? * k
                    + ripple.drift * frame_index as f64;
                Ok(sum + ripple.amplitude.value(frame_index)? * phase.sin())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_plus_ripple() {
        let pattern: AmplitudePattern = serde_json::from_str(
            r#"{
                "baseline": { "const": 20 },
                "ripples": [{ "amplitude": { "const": 4 }, "frequency": { "const": 0.25 } }]
            }"#,
        )
        .unwrap();
        assert!((pattern.amplitude(0, 0).unwrap() - 20.0).abs() < 1e-12);
        assert!((pattern.amplitude(1, 0).unwrap() - 24.0).abs() < 1e-12);
        assert!((pattern.amplitude(3, 5).unwrap() - 16.0).abs() < 1e-12);
    }

    #[test]
    fn drift_moves_the_ripple() {
        let pattern: AmplitudePattern = serde_json::from_str(
            r#"{
                "baseline": { "const": 0 },
                "ripples": [{ "amplitude": { "const": 1 }, "frequency": { "const": 0 }, "drift": 1.5707963267948966 }]
            }"#,
        )
        .unwrap();
        assert!(pattern.amplitude(0, 0).unwrap().abs() < 1e-12);
        assert!((pattern.amplitude(0, 1).unwrap() - 1.0).abs() < 1e-12);
    }
}
