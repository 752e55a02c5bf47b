//! Particle filter configuration
//!
//! Every field has a default, so a TOML file only needs the values it
//! overrides:
//!
//! ```toml
//! num_particles = 100
//! seed = 7
//!
//! [sensor]
//! sigma = 0.15
//! num_beams = 20
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::{LocalizationError, LocalizationResult};
use crate::localization::motion_model::MotionNoise;
use crate::localization::resampling::ResamplingScheme;
use crate::localization::sensor_model::SensorModelConfig;

/// Per-axis standard deviations [m, m, rad]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseStd {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl NoiseStd {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    fn is_valid(&self) -> bool {
        [self.x, self.y, self.yaw].iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Configuration for [`ParticleFilter`](crate::localization::ParticleFilter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleFilterConfig {
    /// Population size, fixed for the filter's lifetime
    pub num_particles: usize,
    /// RNG seed; `None` seeds from OS entropy
    pub seed: Option<u64>,
    /// Directory holding `<map name>.txt` files
    pub map_dir: PathBuf,
    /// Odometry travel required between sensor updates [m], 0 disables
    pub min_update_distance: f64,
    /// Odometry rotation required between sensor updates [rad], 0 disables
    pub min_update_angle: f64,
    pub resampling: ResamplingScheme,
    /// Spread of the initial population around the seed pose
    pub initial_noise: NoiseStd,
    /// Jitter applied to every survivor after resampling
    pub resample_noise: NoiseStd,
    pub motion_noise: MotionNoise,
    pub sensor: SensorModelConfig,
}

impl Default for ParticleFilterConfig {
    fn default() -> Self {
        Self {
            num_particles: 30,
            seed: None,
            map_dir: PathBuf::from("maps"),
            min_update_distance: 0.0,
            min_update_angle: 0.0,
            resampling: ResamplingScheme::default(),
            initial_noise: NoiseStd::new(0.25, 0.25, 0.1),
            resample_noise: NoiseStd::new(0.02, 0.02, 0.02),
            motion_noise: MotionNoise::default(),
            sensor: SensorModelConfig::default(),
        }
    }
}

impl ParticleFilterConfig {
    pub fn from_toml_str(text: &str) -> LocalizationResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> LocalizationResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> LocalizationResult<()> {
        if self.num_particles == 0 {
            return Err(invalid("num_particles must be positive"));
        }
        if !(self.min_update_distance >= 0.0 && self.min_update_angle >= 0.0) {
            return Err(invalid("update thresholds must be non-negative"));
        }
        if !self.initial_noise.is_valid() {
            return Err(invalid("initial_noise must be finite and non-negative"));
        }
        if !self.resample_noise.is_valid() {
            return Err(invalid("resample_noise must be finite and non-negative"));
        }
        if !self.motion_noise.gains().iter().all(|k| k.is_finite() && *k >= 0.0) {
            return Err(invalid("motion_noise gains must be finite and non-negative"));
        }
        self.sensor.validate()
    }
}

fn invalid(msg: &str) -> LocalizationError {
    LocalizationError::InvalidParameter(msg.to_string())
}
