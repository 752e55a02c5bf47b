// Localization algorithms module

pub mod config;
pub mod dead_reckoning;
pub mod motion_model;
pub mod particle_filter;
pub mod resampling;
pub mod sensor_model;
pub mod weights;

// Re-exports
pub use config::{NoiseStd, ParticleFilterConfig};
pub use dead_reckoning::DeadReckoning;
pub use motion_model::{BodyMotion, MotionNoise, OdometryTracker};
pub use particle_filter::{FilterState, Particle, ParticleFilter};
pub use resampling::ResamplingScheme;
pub use sensor_model::{SensorModel, SensorModelConfig};
