//! Utility modules for vector_mcl

pub mod visualization;

pub use visualization::{colors, PathStyle, PointStyle, Visualizer};
