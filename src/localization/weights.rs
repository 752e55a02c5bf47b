//! Importance weight bookkeeping: log-domain renormalization, effective
//! sample size, and cumulative sums

use crate::common::{LocalizationError, LocalizationResult};

/// Allowed distance of a normalized weight sum from 1
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Turn per-particle log weights into normalized weights.
///
/// Each weight is `exp(log_w - max_log_w)` floored at `f64::MIN_POSITIVE`,
/// then divided by the sum, so the result sums to 1 and no weight is 0.
/// Fails when no log weight is finite.
pub fn normalize_log_weights(log_weights: &[f64]) -> LocalizationResult<Vec<f64>> {
    let max_log = log_weights
        .iter()
        .copied()
        .filter(|w| !w.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);

    if !max_log.is_finite() {
        return Err(LocalizationError::WeightNormalization(format!(
            "max log weight is {} over {} particles",
            max_log,
            log_weights.len()
        )));
    }

    let mut weights: Vec<f64> = log_weights
        .iter()
        .map(|&lw| (lw - max_log).exp().max(f64::MIN_POSITIVE))
        .collect();
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    Ok(weights)
}

/// `N_eff = 1 / sum(w_i^2)`; 0 for an empty or all-zero population
pub fn effective_sample_size<I>(weights: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let sum_sq: f64 = weights.into_iter().map(|w| w * w).sum();
    if sum_sq > 0.0 {
        1.0 / sum_sq
    } else {
        0.0
    }
}

/// True when fewer than half the particles carry the probability mass
pub fn is_degenerate(effective_sample_size: f64, num_particles: usize) -> bool {
    effective_sample_size < 0.5 * num_particles as f64
}

/// Cumulative sums `[0, w0, w0 + w1, ..., sum]`, length `N + 1`.
///
/// Fails unless every weight is finite and non-negative and the total is
/// within [`WEIGHT_SUM_TOLERANCE`] of 1.
pub fn cumulative_weights(weights: &[f64]) -> LocalizationResult<Vec<f64>> {
    if let Some((i, w)) = weights.iter().enumerate().find(|(_, w)| !w.is_finite() || **w < 0.0) {
        return Err(LocalizationError::WeightNormalization(format!("weight {} is {}", i, w)));
    }

    let mut cumsum = Vec::with_capacity(weights.len() + 1);
    cumsum.push(0.0);
    let mut acc = 0.0;
    for w in weights {
        acc += w;
        cumsum.push(acc);
    }

    if (acc - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(LocalizationError::WeightNormalization(format!(
            "cumulative weight ends at {} instead of 1",
            acc
        )));
    }
    Ok(cumsum)
}
