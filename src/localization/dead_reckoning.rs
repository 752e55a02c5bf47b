//! Odometry-only pose integration
//!
//! Replays the same body-frame motion the particle filter uses on a single
//! pose and ignores laser scans. Useful as a drift baseline.

use tracing::debug;

use crate::common::{LocalizationResult, Localizer, Pose2D, ScanOutcome};
use crate::localization::motion_model::OdometryTracker;
use crate::mapping::LaserScan;

#[derive(Debug, Clone, Default)]
pub struct DeadReckoning {
    pose: Pose2D,
    odometry: OdometryTracker,
}

impl DeadReckoning {
    pub fn new(initial: Pose2D) -> Self {
        DeadReckoning { pose: initial, odometry: OdometryTracker::new() }
    }

    /// Jump to `pose` and forget the previous odometry sample
    pub fn reset(&mut self, pose: Pose2D) {
        self.pose = pose;
        self.odometry.reset();
    }

    /// Integrated pose, heading not wrapped
    pub fn pose(&self) -> Pose2D {
        self.pose
    }
}

impl Localizer for DeadReckoning {
    fn observe_odometry(&mut self, odom: &Pose2D) {
        if let Some(motion) = self.odometry.observe(odom) {
            self.pose = motion.apply(&self.pose);
        }
    }

    fn observe_laser(&mut self, scan: &LaserScan) -> LocalizationResult<ScanOutcome> {
        scan.validate()?;
        debug!("dead reckoning ignores laser scans");
        Ok(ScanOutcome::Ignored)
    }

    fn estimate(&self) -> Pose2D {
        self.pose.normalized()
    }
}
