//! Odometry motion model
//!
//! Successive raw odometry poses are turned into a displacement expressed
//! in the robot body frame at the previous pose. That displacement is then
//! replayed on every hypothesis in its own heading frame, so odometry drift
//! in the odometry-local frame never leaks into the map frame.

use nalgebra::{Rotation2, Vector2};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::common::{normalize_angle, Pose2D};

/// Relative motion in the body frame of the previous pose
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyMotion {
    pub translation: Vector2<f64>,
    pub rotation: f64,
}

impl BodyMotion {
    pub fn new(dx: f64, dy: f64, rotation: f64) -> Self {
        Self { translation: Vector2::new(dx, dy), rotation }
    }

    /// Motion between two raw odometry poses.
    ///
    /// The translation is the odometry delta rotated by `-prev.heading`; the
    /// rotation is the raw heading difference.
    pub fn between(prev: &Pose2D, current: &Pose2D) -> Self {
        let translation = Rotation2::new(-prev.heading) * (current.location - prev.location);
        Self { translation, rotation: current.heading - prev.heading }
    }

    pub fn is_zero(&self) -> bool {
        self.translation == Vector2::zeros() && self.rotation == 0.0
    }

    /// Replay this motion starting from `pose`
    pub fn apply(&self, pose: &Pose2D) -> Pose2D {
        Pose2D {
            location: pose.transform_point(&self.translation),
            heading: pose.heading + self.rotation,
        }
    }
}

/// Tracks the last raw odometry pose.
///
/// The first sample only seeds the tracker; every later sample yields the
/// motion since the previous one.
#[derive(Debug, Clone, Default)]
pub struct OdometryTracker {
    last: Option<Pose2D>,
}

impl OdometryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, odom: &Pose2D) -> Option<BodyMotion> {
        let motion = self.last.map(|prev| BodyMotion::between(&prev, odom));
        self.last = Some(*odom);
        motion
    }

    pub fn is_initialized(&self) -> bool {
        self.last.is_some()
    }

    pub fn last_pose(&self) -> Option<Pose2D> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Odometry-proportional process noise.
///
/// Standard deviations per step:
/// - translation (each body axis): `k_trans_trans * |t| + k_trans_rot * |r|`
/// - rotation: `k_rot_rot * |r| + k_rot_trans * |t|`
///
/// where `|t|` is the translation length and `|r|` the wrapped rotation
/// magnitude. All gains default to zero, which disables the noise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionNoise {
    pub k_trans_trans: f64,
    pub k_trans_rot: f64,
    pub k_rot_rot: f64,
    pub k_rot_trans: f64,
}

impl MotionNoise {
    pub fn is_enabled(&self) -> bool {
        self.gains().iter().any(|&k| k > 0.0)
    }

    pub(crate) fn gains(&self) -> [f64; 4] {
        [self.k_trans_trans, self.k_trans_rot, self.k_rot_rot, self.k_rot_trans]
    }

    /// (translation std, rotation std) for one step of `motion`
    pub fn std_devs(&self, motion: &BodyMotion) -> (f64, f64) {
        let t = motion.translation.norm();
        let r = normalize_angle(motion.rotation).abs();
        (
            self.k_trans_trans * t + self.k_trans_rot * r,
            self.k_rot_rot * r + self.k_rot_trans * t,
        )
    }

    /// Noisy copy of `motion`; a zero motion stays exactly zero
    pub fn perturb<R: Rng + ?Sized>(&self, motion: &BodyMotion, rng: &mut R) -> BodyMotion {
        let (trans_std, rot_std) = self.std_devs(motion);
        BodyMotion {
            translation: motion.translation
                + Vector2::new(gaussian_noise(rng, trans_std), gaussian_noise(rng, trans_std)),
            rotation: motion.rotation + gaussian_noise(rng, rot_std),
        }
    }
}

/// Zero-mean Gaussian sample; zero when `std_dev` is not positive
pub(crate) fn gaussian_noise<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    Normal::new(0.0, std_dev).map(|n| n.sample(rng)).unwrap_or(0.0)
}
