//! Common traits defining interfaces for localization algorithms

use crate::common::error::LocalizationResult;
use crate::common::types::Pose2D;
use crate::mapping::LaserScan;

/// What a localizer did with a laser observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanOutcome {
    /// The scan was scored against the map. `resampled` tells whether the
    /// population was degenerate afterwards and got redrawn.
    Updated { effective_sample_size: f64, resampled: bool },
    /// The robot has not moved far enough since the last update
    Skipped,
    /// The localizer does not use scans
    Ignored,
}

/// Trait for pose estimators fed by odometry and range scans
pub trait Localizer {
    /// Feed one raw odometry sample (odometry-local frame)
    fn observe_odometry(&mut self, odom: &Pose2D);

    /// Feed one laser observation (sensor frame)
    fn observe_laser(&mut self, scan: &LaserScan) -> LocalizationResult<ScanOutcome>;

    /// Current best pose in the map frame, heading wrapped to (-pi, pi]
    fn estimate(&self) -> Pose2D;
}
