//! Robust beam likelihood for laser scans
//!
//! Each evaluated beam compares an observed range with the range predicted
//! by ray casting from a particle pose:
//! - observed outside `[s_min, s_max]` or not finite: probability 1
//! - observed shorter than predicted by more than `d_short`: Gaussian penalty
//!   clipped at `d_short`
//! - observed longer than predicted by more than `d_long`: Gaussian penalty
//!   clipped at `d_long`
//! - otherwise: unnormalized Gaussian of the discrepancy with `sigma`
//!
//! Beams are treated as independent, so the joint log-likelihood is the sum
//! of the per-beam log probabilities scaled by `gamma`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::{LocalizationError, LocalizationResult};
use crate::mapping::PredictedScan;

/// Configuration for the beam model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorModelConfig {
    /// Short-return clipping threshold [m]
    pub d_short: f64,
    /// Long-return clipping threshold [m]
    pub d_long: f64,
    /// Smallest observed range that is scored [m]
    pub s_min: f64,
    /// Largest observed range that is scored [m]
    pub s_max: f64,
    /// Range noise std-dev [m]
    pub sigma: f64,
    /// Exponent on the joint likelihood, 1 = independent beams
    pub gamma: f64,
    /// Approximate number of beams evaluated per scan
    pub num_beams: usize,
    /// Forward offset of the laser from the robot origin [m]
    pub offset: f64,
}

impl Default for SensorModelConfig {
    fn default() -> Self {
        Self {
            d_short: 0.5,
            d_long: 1.0,
            s_min: 0.5,
            s_max: 10.0,
            sigma: 0.1,
            gamma: 1.0,
            num_beams: 10,
            offset: 0.2,
        }
    }
}

impl SensorModelConfig {
    pub fn validate(&self) -> LocalizationResult<()> {
        let check = |ok: bool, msg: &str| {
            if ok {
                Ok(())
            } else {
                Err(LocalizationError::InvalidParameter(format!("sensor.{}", msg)))
            }
        };
        check(self.sigma > 0.0 && self.sigma.is_finite(), "sigma must be positive")?;
        check(self.d_short >= 0.0 && self.d_long >= 0.0, "d_short and d_long must be non-negative")?;
        check(self.s_min <= self.s_max, "s_min must not exceed s_max")?;
        check(self.gamma > 0.0 && self.gamma.is_finite(), "gamma must be positive")?;
        check(self.num_beams > 0, "num_beams must be positive")?;
        check(self.offset.is_finite(), "offset must be finite")
    }
}

/// Beam likelihood model
#[derive(Debug, Clone)]
pub struct SensorModel {
    config: SensorModelConfig,
}

impl SensorModel {
    pub fn new(config: SensorModelConfig) -> Self {
        SensorModel { config }
    }

    pub fn config(&self) -> &SensorModelConfig {
        &self.config
    }

    /// Log probability of one beam. Readings that are not finite or lie
    /// outside `[s_min, s_max]` carry no information and score 0.
    pub fn beam_log_probability(&self, observed: f64, predicted: f64) -> f64 {
        let c = &self.config;
        if !(observed >= c.s_min && observed <= c.s_max) {
            return 0.0;
        }

        let discrepancy = if observed < predicted - c.d_short {
            c.d_short
        } else if observed > predicted + c.d_long {
            c.d_long
        } else {
            observed - predicted
        };

        -0.5 * discrepancy * discrepancy / (c.sigma * c.sigma)
    }

    /// Probability of one beam, in (0, 1]
    pub fn beam_probability(&self, observed: f64, predicted: f64) -> f64 {
        self.beam_log_probability(observed, predicted).exp()
    }

    /// Joint log-likelihood of `observed` (full scan) given a prediction.
    ///
    /// Only the rays the prediction evaluated are scored, using the
    /// prediction's own stride.
    pub fn log_likelihood(&self, observed: &[f64], predicted: &PredictedScan) -> LocalizationResult<f64> {
        let stride = predicted.stride.max(1);
        let expected = (observed.len() + stride - 1) / stride;
        if expected != predicted.len() {
            let msg = format!(
                "{} observed rays at stride {} need {} predictions, got {}",
                observed.len(),
                stride,
                expected,
                predicted.len()
            );
            warn!("{}", msg);
            return Err(LocalizationError::InvalidScan(msg));
        }

        let sum: f64 = observed
            .iter()
            .step_by(stride)
            .zip(predicted.ranges())
            .map(|(&z, z_hat)| self.beam_log_probability(z, z_hat))
            .sum();
        Ok(self.config.gamma * sum)
    }

    /// Joint likelihood in (0, 1]. Underflows to 0 for long scans; combine
    /// [`SensorModel::log_likelihood`] values instead when accumulating.
    pub fn likelihood(&self, observed: &[f64], predicted: &PredictedScan) -> LocalizationResult<f64> {
        self.log_likelihood(observed, predicted).map(f64::exp)
    }
}
