//! Resampling schemes
//!
//! Both schemes map draws in `[0, total)` onto the cumulative weight array
//! with inclusive-lower, exclusive-upper brackets, so every draw lands in
//! exactly one particle. A zero-weight particle has an empty bracket and is
//! only picked when it is the last one and a draw reaches the end of the
//! cumulative sum, which `select_index` clamps to the last particle.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::common::LocalizationResult;
use crate::localization::weights::cumulative_weights;

/// How survivors are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingScheme {
    /// One independent uniform draw per output slot
    #[default]
    Multinomial,
    /// Systematic resampling: one draw, then evenly spaced picks
    LowVariance,
}

/// Index `i` such that `cumsum[i] <= pick < cumsum[i + 1]`.
///
/// `cumsum` must start at 0 and be non-decreasing. Picks at or past the end
/// map to the last particle.
pub fn select_index(cumsum: &[f64], pick: f64) -> usize {
    let n = cumsum.len().saturating_sub(1);
    let upper = cumsum.partition_point(|&c| c <= pick);
    upper.saturating_sub(1).min(n.saturating_sub(1))
}

/// Draw `weights.len()` particle indices proportionally to `weights`
pub fn resample_indices<R: Rng + ?Sized>(
    weights: &[f64],
    scheme: ResamplingScheme,
    rng: &mut R,
) -> LocalizationResult<Vec<usize>> {
    let cumsum = cumulative_weights(weights)?;
    let n = weights.len();
    let total = cumsum[n];

    let indices = match scheme {
        ResamplingScheme::Multinomial => (0..n)
            .map(|_| select_index(&cumsum, rng.gen::<f64>() * total))
            .collect(),
        ResamplingScheme::LowVariance => {
            let step = total / n as f64;
            let start = rng.gen::<f64>() * step;
            (0..n)
                .map(|m| select_index(&cumsum, start + m as f64 * step))
                .collect()
        }
    };
    Ok(indices)
}
