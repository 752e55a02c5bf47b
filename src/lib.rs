//! vector_mcl - Monte Carlo Localization against 2D line-segment maps
//!
//! This crate provides a particle filter that tracks a robot pose from
//! odometry and laser scans, together with the map, motion, and sensor
//! models it is built from.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod localization;
pub mod mapping;

// Re-export common types for convenience
pub use common::{LocalizationError, LocalizationResult, Localizer, Pose2D, ScanOutcome};
pub use localization::{DeadReckoning, Particle, ParticleFilter, ParticleFilterConfig};
pub use mapping::{LaserScan, Line2D, VectorMap};
