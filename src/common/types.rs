//! Common types used throughout vector_mcl

use nalgebra::{Rotation2, Vector2};

use crate::common::angle::normalize_angle;

/// 2D pose: location in the map frame plus heading
///
/// The heading is not wrapped on construction. Headings accumulated by the
/// motion model may leave `(-pi, pi]`; use [`Pose2D::normalized`] before
/// reporting or comparing raw values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    pub location: Vector2<f64>,
    pub heading: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { location: Vector2::new(x, y), heading }
    }

    pub fn from_parts(location: Vector2<f64>, heading: f64) -> Self {
        Self { location, heading }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn x(&self) -> f64 {
        self.location.x
    }

    pub fn y(&self) -> f64 {
        self.location.y
    }

    /// Copy of this pose with heading wrapped to (-pi, pi]
    pub fn normalized(&self) -> Self {
        Self { location: self.location, heading: normalize_angle(self.heading) }
    }

    /// Map a point expressed in this pose's body frame into the parent frame
    pub fn transform_point(&self, local: &Vector2<f64>) -> Vector2<f64> {
        self.location + Rotation2::new(self.heading) * local
    }

    pub fn distance(&self, other: &Pose2D) -> f64 {
        (self.location - other.location).norm()
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::origin()
    }
}

impl From<(f64, f64, f64)> for Pose2D {
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}
