//! Monte Carlo localization against a vector map
//!
//! Odometry drives every particle through the body-frame motion model.
//! Laser scans are ray-cast from each particle pose, scored with the beam
//! model, and folded into the weights in log space. When the effective
//! sample size falls below half the population the particles are redrawn.

use std::sync::Arc;

use nalgebra::{Matrix3, Vector2, Vector3};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::common::{
    angle_diff, weighted_circular_mean, LocalizationError, LocalizationResult, Localizer, Pose2D, ScanOutcome,
};
use crate::localization::config::ParticleFilterConfig;
use crate::localization::motion_model::{gaussian_noise, BodyMotion, OdometryTracker};
use crate::localization::resampling::resample_indices;
use crate::localization::sensor_model::SensorModel;
use crate::localization::weights::{effective_sample_size, is_degenerate, normalize_log_weights};
use crate::mapping::{beam_stride, predict_scan, LaserScan, PredictedScan, ScanGeometry, VectorMap};

/// One pose hypothesis with its importance weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub location: Vector2<f64>,
    /// Map-frame heading, not wrapped
    pub heading: f64,
    pub weight: f64,
}

impl Particle {
    pub fn new(location: Vector2<f64>, heading: f64, weight: f64) -> Self {
        Particle { location, heading, weight }
    }

    pub fn pose(&self) -> Pose2D {
        Pose2D::from_parts(self.location, self.heading)
    }

    pub fn set_pose(&mut self, pose: &Pose2D) {
        self.location = pose.location;
        self.heading = pose.heading;
    }
}

/// Degeneracy state of the population
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Weights are spread over at least half the population
    Tracking,
    /// A few particles carry most of the mass; resample before the next update
    Degenerate,
}

/// Particle filter localizer
pub struct ParticleFilter {
    config: ParticleFilterConfig,
    sensor_model: SensorModel,
    map: Arc<VectorMap>,
    particles: Vec<Particle>,
    odometry: OdometryTracker,
    /// Odometry pose at the last sensor update
    last_update_odom: Option<Pose2D>,
    rng: StdRng,
}

impl ParticleFilter {
    /// Create an empty filter; call one of the `initialize` methods before use
    pub fn new(config: ParticleFilterConfig) -> LocalizationResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::from_valid_config(ParticleFilterConfig::default())
    }

    fn from_valid_config(config: ParticleFilterConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        ParticleFilter {
            sensor_model: SensorModel::new(config.sensor),
            config,
            map: Arc::new(VectorMap::default()),
            particles: Vec::new(),
            odometry: OdometryTracker::new(),
            last_update_odom: None,
            rng,
        }
    }

    /// Load `<map_dir>/<map_name>.txt` and reseed around `pose`.
    ///
    /// On a map loading error the previous map and population are kept.
    pub fn initialize(&mut self, map_name: &str, pose: Pose2D) -> LocalizationResult<()> {
        let map = VectorMap::load(&self.config.map_dir, map_name).map_err(|e| {
            warn!(map = map_name, "failed to load map: {}", e);
            e
        })?;
        self.initialize_with_map(Arc::new(map), pose);
        Ok(())
    }

    /// Replace the map, forget odometry, and reseed the population with
    /// Gaussian spread around `pose`
    pub fn initialize_with_map(&mut self, map: Arc<VectorMap>, pose: Pose2D) {
        let n = self.config.num_particles;
        let noise = self.config.initial_noise;
        let weight = 1.0 / n as f64;
        let rng = &mut self.rng;

        self.particles = (0..n)
            .map(|_| {
                let location = pose.location
                    + Vector2::new(gaussian_noise(rng, noise.x), gaussian_noise(rng, noise.y));
                Particle::new(location, pose.heading + gaussian_noise(rng, noise.yaw), weight)
            })
            .collect();
        self.map = map;
        self.odometry.reset();
        self.last_update_odom = None;

        info!(
            particles = n,
            segments = self.map.len(),
            x = pose.x(),
            y = pose.y(),
            heading = pose.heading,
            "particle filter initialized"
        );
    }

    pub fn is_initialized(&self) -> bool {
        !self.particles.is_empty()
    }

    pub fn config(&self) -> &ParticleFilterConfig {
        &self.config
    }

    pub fn map(&self) -> &VectorMap {
        &self.map
    }

    /// Shared handle to the map for other consumers
    pub fn map_handle(&self) -> Arc<VectorMap> {
        Arc::clone(&self.map)
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Copy of the current population
    pub fn snapshot(&self) -> Vec<Particle> {
        self.particles.clone()
    }

    /// Feed one raw odometry sample. The first sample after initialization
    /// only seeds the odometry state.
    pub fn observe_odometry(&mut self, odom: &Pose2D) {
        if let Some(motion) = self.odometry.observe(odom) {
            self.apply_motion(&motion);
        }
    }

    /// Move every particle by `motion` expressed in its own body frame
    pub fn apply_motion(&mut self, motion: &BodyMotion) {
        let noise = self.config.motion_noise;
        let noisy = noise.is_enabled();
        for particle in &mut self.particles {
            let step = if noisy { noise.perturb(motion, &mut self.rng) } else { *motion };
            particle.set_pose(&step.apply(&particle.pose()));
        }
    }

    /// Feed one laser scan: gate, update weights, resample if degenerate
    pub fn observe_laser(&mut self, scan: &LaserScan) -> LocalizationResult<ScanOutcome> {
        if !self.is_initialized() {
            warn!("laser scan received before initialization");
            return Err(LocalizationError::NotInitialized);
        }
        scan.validate()?;

        if !self.should_update() {
            debug!("robot has not moved enough, skipping sensor update");
            return Ok(ScanOutcome::Skipped);
        }

        self.update(scan)?;
        self.last_update_odom = self.odometry.last_pose();

        let n_eff = self.effective_sample_size();
        let resampled = match self.state() {
            FilterState::Degenerate => {
                self.resample()?;
                true
            }
            FilterState::Tracking => false,
        };

        Ok(ScanOutcome::Updated { effective_sample_size: n_eff, resampled })
    }

    fn should_update(&self) -> bool {
        let (last, current) = match (self.last_update_odom, self.odometry.last_pose()) {
            (Some(last), Some(current)) => (last, current),
            _ => return true,
        };
        let min_dist = self.config.min_update_distance;
        let min_angle = self.config.min_update_angle;
        if min_dist <= 0.0 && min_angle <= 0.0 {
            return true;
        }

        let moved = min_dist > 0.0 && last.distance(&current) >= min_dist;
        let turned = min_angle > 0.0 && angle_diff(current.heading, last.heading).abs() >= min_angle;
        moved || turned
    }

    /// Stride between evaluated rays for a scan with `num_rays` rays
    pub fn beam_stride(&self, num_rays: usize) -> usize {
        beam_stride(num_rays, self.config.sensor.num_beams)
    }

    /// Predicted scan for `pose`, subsampled with the filter's beam stride
    pub fn predicted_scan(&self, pose: &Pose2D, geometry: &ScanGeometry) -> PredictedScan {
        let stride = self.beam_stride(geometry.num_rays);
        predict_scan(&self.map, pose, self.config.sensor.offset, geometry, stride)
    }

    /// Sensor update: multiply every weight by its scan likelihood (in log
    /// space) and renormalize.
    ///
    /// The population is only modified once every particle has been scored.
    pub fn update(&mut self, scan: &LaserScan) -> LocalizationResult<()> {
        if !self.is_initialized() {
            return Err(LocalizationError::NotInitialized);
        }
        scan.validate()?;

        let geometry = scan.geometry();
        let mut log_weights = Vec::with_capacity(self.particles.len());
        let mut max_log_weight = f64::NEG_INFINITY;
        for particle in &self.particles {
            let predicted = self.predicted_scan(&particle.pose(), &geometry);
            let log_likelihood = self.sensor_model.log_likelihood(&scan.ranges, &predicted)?;
            let log_weight = particle.weight.ln() + log_likelihood;
            max_log_weight = max_log_weight.max(log_weight);
            log_weights.push(log_weight);
        }
        debug!(max_log_weight, "scored {} particles", log_weights.len());

        self.reweight(&log_weights)
    }

    fn reweight(&mut self, log_weights: &[f64]) -> LocalizationResult<()> {
        match normalize_log_weights(log_weights) {
            Ok(weights) => {
                for (particle, w) in self.particles.iter_mut().zip(weights) {
                    particle.weight = w;
                }
                Ok(())
            }
            Err(e) => {
                error!("{}; resetting to uniform weights", e);
                self.uniformize();
                Err(e)
            }
        }
    }

    fn uniformize(&mut self) {
        let w = 1.0 / self.particles.len() as f64;
        for particle in &mut self.particles {
            particle.weight = w;
        }
    }

    /// `1 / sum(w_i^2)`
    pub fn effective_sample_size(&self) -> f64 {
        effective_sample_size(self.particles.iter().map(|p| p.weight))
    }

    pub fn state(&self) -> FilterState {
        if is_degenerate(self.effective_sample_size(), self.particles.len()) {
            FilterState::Degenerate
        } else {
            FilterState::Tracking
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.state() == FilterState::Degenerate
    }

    /// Draw a new population proportionally to weight. Survivors get weight
    /// `1/N` and independent Gaussian jitter per axis. The old population is
    /// replaced in one step.
    pub fn resample(&mut self) -> LocalizationResult<()> {
        let n = self.particles.len();
        if n == 0 {
            return Err(LocalizationError::NotInitialized);
        }

        let weights: Vec<f64> = self.particles.iter().map(|p| p.weight).collect();
        let indices = match resample_indices(&weights, self.config.resampling, &mut self.rng) {
            Ok(indices) => indices,
            Err(e) => {
                error!("{}; resetting to uniform weights", e);
                self.uniformize();
                return Err(e);
            }
        };

        let noise = self.config.resample_noise;
        let weight = 1.0 / n as f64;
        let rng = &mut self.rng;
        let resampled: Vec<Particle> = indices
            .into_iter()
            .map(|i| {
                let src = &self.particles[i];
                let jitter = Vector2::new(gaussian_noise(rng, noise.x), gaussian_noise(rng, noise.y));
                Particle::new(src.location + jitter, src.heading + gaussian_noise(rng, noise.yaw), weight)
            })
            .collect();

        debug!(scheme = ?self.config.resampling, "resampled {} particles", n);
        self.particles = resampled;
        Ok(())
    }

    /// Weighted mean location and weighted circular mean heading.
    /// `None` before initialization.
    pub fn try_estimate(&self) -> Option<Pose2D> {
        let total: f64 = self.particles.iter().map(|p| p.weight).sum();
        if self.particles.is_empty() || !(total > 0.0) {
            return None;
        }

        let location = self
            .particles
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.location * p.weight)
            / total;
        let heading = weighted_circular_mean(self.particles.iter().map(|p| (p.heading, p.weight)));
        Some(Pose2D::from_parts(location, heading))
    }

    /// Weighted covariance of (x, y, heading) around the estimate
    pub fn covariance(&self) -> Option<Matrix3<f64>> {
        let mean = self.try_estimate()?;
        let total: f64 = self.particles.iter().map(|p| p.weight).sum();
        let cov = self.particles.iter().fold(Matrix3::zeros(), |acc, p| {
            let d = Vector3::new(
                p.location.x - mean.x(),
                p.location.y - mean.y(),
                angle_diff(p.heading, mean.heading),
            );
            acc + d * d.transpose() * p.weight
        });
        Some(cov / total)
    }

    /// Copy of the highest-weight particle
    pub fn best_particle(&self) -> Option<Particle> {
        self.particles.iter().max_by_key(|p| OrderedFloat(p.weight)).copied()
    }
}

impl Localizer for ParticleFilter {
    fn observe_odometry(&mut self, odom: &Pose2D) {
        ParticleFilter::observe_odometry(self, odom);
    }

    fn observe_laser(&mut self, scan: &LaserScan) -> LocalizationResult<ScanOutcome> {
        ParticleFilter::observe_laser(self, scan)
    }

    fn estimate(&self) -> Pose2D {
        self.try_estimate().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::config::NoiseStd;
    use crate::localization::motion_model::MotionNoise;
    use crate::localization::sensor_model::SensorModelConfig;
    use crate::mapping::Line2D;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn quiet_config(num_particles: usize) -> ParticleFilterConfig {
        ParticleFilterConfig {
            num_particles,
            seed: Some(17),
            initial_noise: NoiseStd::zero(),
            resample_noise: NoiseStd::zero(),
            ..Default::default()
        }
    }

    fn room() -> Arc<VectorMap> {
        Arc::new(VectorMap::new(vec![
            Line2D::from_coords(-5.0, -5.0, 5.0, -5.0),
            Line2D::from_coords(5.0, -5.0, 5.0, 5.0),
            Line2D::from_coords(5.0, 5.0, -5.0, 5.0),
            Line2D::from_coords(-5.0, 5.0, -5.0, -5.0),
            Line2D::from_coords(1.0, 2.0, 3.0, 2.0),
        ]))
    }

    fn scan_from(map: &VectorMap, pose: &Pose2D, offset: f64, num_rays: usize) -> LaserScan {
        let geometry = ScanGeometry {
            num_rays,
            range_min: 0.0,
            range_max: 10.0,
            angle_min: -PI,
            angle_max: PI,
        };
        let ranges = predict_scan(map, pose, offset, &geometry, 1).ranges().collect();
        LaserScan::new(ranges, geometry.range_min, geometry.range_max, geometry.angle_min, geometry.angle_max)
    }

    fn weight_sum(pf: &ParticleFilter) -> f64 {
        pf.particles().iter().map(|p| p.weight).sum()
    }

    #[test]
    fn test_initialize_seeds_population() {
        let mut pf = ParticleFilter::new(quiet_config(25)).unwrap();
        assert!(!pf.is_initialized());
        pf.initialize_with_map(room(), Pose2D::new(1.0, -1.0, 0.3));

        assert_eq!(pf.num_particles(), 25);
        assert_relative_eq!(weight_sum(&pf), 1.0, epsilon = 1e-12);
        for p in pf.particles() {
            assert_eq!(p.pose(), Pose2D::new(1.0, -1.0, 0.3));
            assert_relative_eq!(p.weight, 1.0 / 25.0);
        }
        assert_relative_eq!(pf.effective_sample_size(), 25.0, epsilon = 1e-9);
        assert_eq!(pf.state(), FilterState::Tracking);
    }

    #[test]
    fn test_initialize_with_noise_spreads_particles() {
        let config = ParticleFilterConfig { num_particles: 200, seed: Some(3), ..Default::default() };
        let mut pf = ParticleFilter::new(config).unwrap();
        pf.initialize_with_map(room(), Pose2D::new(0.0, 0.0, 0.0));
        let est = pf.estimate();
        assert!(est.location.norm() < 0.1);
        let cov = pf.covariance().unwrap();
        assert_relative_eq!(cov[(0, 0)].sqrt(), 0.25, epsilon = 0.05);
        assert_relative_eq!(cov[(2, 2)].sqrt(), 0.1, epsilon = 0.03);
    }

    #[test]
    fn test_initialize_from_map_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wall.txt"), "5,-1,5,1\n").unwrap();
        let config = ParticleFilterConfig { map_dir: dir.path().to_path_buf(), ..quiet_config(4) };
        let mut pf = ParticleFilter::new(config).unwrap();

        pf.initialize("wall", Pose2D::origin()).unwrap();
        assert_eq!(pf.map().len(), 1);

        // a missing map keeps the previous state
        assert!(pf.initialize("missing", Pose2D::new(9.0, 9.0, 0.0)).is_err());
        assert_eq!(pf.map().len(), 1);
        assert_eq!(pf.particles()[0].pose(), Pose2D::origin());
    }

    #[test]
    fn test_first_odometry_only_seeds() {
        let mut pf = ParticleFilter::new(quiet_config(5)).unwrap();
        pf.initialize_with_map(room(), Pose2D::origin());
        pf.observe_odometry(&Pose2D::new(100.0, 50.0, 1.0));
        for p in pf.particles() {
            assert_eq!(p.pose(), Pose2D::origin());
        }
    }

    #[test]
    fn test_odometry_moves_particles_in_their_frame() {
        let mut pf = ParticleFilter::new(quiet_config(3)).unwrap();
        pf.initialize_with_map(room(), Pose2D::new(0.0, 0.0, FRAC_PI_2));

        // odometry frame is rotated relative to the map
        pf.observe_odometry(&Pose2D::new(10.0, 10.0, PI));
        pf.observe_odometry(&Pose2D::new(9.0, 10.0, PI));

        for p in pf.particles() {
            assert_relative_eq!(p.location.x, 0.0, epsilon = 1e-9);
            assert_relative_eq!(p.location.y, 1.0, epsilon = 1e-9);
            assert_relative_eq!(p.heading, FRAC_PI_2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_odometry_motion_is_identity() {
        let config = ParticleFilterConfig {
            seed: Some(8),
            motion_noise: MotionNoise { k_trans_trans: 0.1, k_trans_rot: 0.1, k_rot_rot: 0.1, k_rot_trans: 0.1 },
            ..Default::default()
        };
        let mut pf = ParticleFilter::new(config).unwrap();
        pf.initialize_with_map(room(), Pose2D::new(1.0, 1.0, 0.5));
        let before = pf.snapshot();

        pf.observe_odometry(&Pose2D::new(2.0, 3.0, 0.1));
        pf.observe_odometry(&Pose2D::new(2.0, 3.0, 0.1));
        assert_eq!(pf.particles(), before.as_slice());
    }

    #[test]
    fn test_update_normalizes_weights() {
        let config = ParticleFilterConfig { num_particles: 50, seed: Some(21), ..Default::default() };
        let mut pf = ParticleFilter::new(config).unwrap();
        let map = room();
        pf.initialize_with_map(Arc::clone(&map), Pose2D::new(0.0, 0.0, 0.0));

        let scan = scan_from(&map, &Pose2D::new(0.1, 0.0, 0.0), 0.2, 90);
        pf.update(&scan).unwrap();

        assert_relative_eq!(weight_sum(&pf), 1.0, epsilon = 1e-6);
        assert!(pf.particles().iter().all(|p| p.weight > 0.0));
        assert!(pf.effective_sample_size() < 50.0);
    }

    #[test]
    fn test_end_to_end_single_particle() {
        let config = ParticleFilterConfig {
            sensor: SensorModelConfig { offset: 0.0, ..Default::default() },
            ..quiet_config(1)
        };
        let mut pf = ParticleFilter::new(config).unwrap();
        let map = Arc::new(VectorMap::new(vec![Line2D::from_coords(5.0, -1.0, 5.0, 1.0)]));
        pf.initialize_with_map(map, Pose2D::origin());

        let geometry = ScanGeometry { num_rays: 1, range_min: 0.0, range_max: 10.0, angle_min: 0.0, angle_max: 0.0 };
        let predicted = pf.predicted_scan(&Pose2D::origin(), &geometry);
        assert_relative_eq!(predicted.endpoints[0].x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(predicted.endpoints[0].y, 0.0, epsilon = 1e-9);

        let model = &pf.sensor_model;
        assert_relative_eq!(model.likelihood(&[5.0], &predicted).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(model.likelihood(&[20.0], &predicted).unwrap(), 1.0);
        let short = model.likelihood(&[3.0], &predicted).unwrap();
        assert!(short < 1.0);
        assert_relative_eq!(short, model.beam_probability(4.5, 5.0), epsilon = 1e-12);

        // a single particle always keeps the whole mass
        let outcome = pf.observe_laser(&LaserScan::new(vec![3.0], 0.0, 10.0, 0.0, 0.0)).unwrap();
        assert_eq!(outcome, ScanOutcome::Updated { effective_sample_size: 1.0, resampled: false });
        assert_relative_eq!(pf.particles()[0].weight, 1.0);
    }

    #[test]
    fn test_resample_resets_weights() {
        let mut pf = ParticleFilter::new(quiet_config(8)).unwrap();
        pf.initialize_with_map(room(), Pose2D::origin());
        for (i, p) in pf.particles.iter_mut().enumerate() {
            p.location.x = i as f64;
            p.weight = if i == 5 { 0.93 } else { 0.01 };
        }
        assert_eq!(pf.state(), FilterState::Degenerate);

        pf.resample().unwrap();
        assert_eq!(pf.num_particles(), 8);
        for p in pf.particles() {
            assert_eq!(p.weight, 1.0 / 8.0);
            // zero jitter: every survivor is an exact copy of an old particle
            assert_eq!(p.location.x.fract(), 0.0);
            assert!(p.location.x >= 0.0 && p.location.x < 8.0);
        }
        assert_eq!(pf.state(), FilterState::Tracking);
    }

    #[test]
    fn test_resample_with_bad_weights_recovers() {
        let mut pf = ParticleFilter::new(quiet_config(4)).unwrap();
        pf.initialize_with_map(room(), Pose2D::origin());
        for p in pf.particles.iter_mut() {
            p.weight = 0.0;
        }
        let result = pf.resample();
        assert!(matches!(result, Err(LocalizationError::WeightNormalization(_))));
        assert_relative_eq!(weight_sum(&pf), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_observe_laser_contract_violations() {
        let mut pf = ParticleFilter::new(quiet_config(4)).unwrap();
        let scan = LaserScan::new(vec![1.0], 0.0, 10.0, 0.0, 0.0);
        assert!(matches!(pf.observe_laser(&scan), Err(LocalizationError::NotInitialized)));

        pf.initialize_with_map(room(), Pose2D::origin());
        let before = pf.snapshot();
        let empty = LaserScan::new(vec![], 0.0, 10.0, 0.0, 0.0);
        assert!(matches!(pf.observe_laser(&empty), Err(LocalizationError::InvalidScan(_))));
        assert_eq!(pf.particles(), before.as_slice());
    }

    #[test]
    fn test_non_finite_ranges_keep_weights() {
        let mut pf = ParticleFilter::new(quiet_config(4)).unwrap();
        pf.initialize_with_map(room(), Pose2D::origin());
        for (p, w) in pf.particles.iter_mut().zip([0.3, 0.3, 0.2, 0.2]) {
            p.weight = w;
        }
        let before = pf.snapshot();

        let mut ranges = vec![f64::NAN; 12];
        ranges[3] = f64::INFINITY;
        ranges[7] = f64::NEG_INFINITY;
        let scan = LaserScan::new(ranges, 0.0, 10.0, -PI, PI);
        let outcome = pf.observe_laser(&scan).unwrap();
        assert!(matches!(outcome, ScanOutcome::Updated { resampled: false, .. }));

        for (p, q) in pf.particles().iter().zip(&before) {
            assert_eq!(p.location, q.location);
            assert_relative_eq!(p.weight, q.weight, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_single_missing_return_keeps_evidence() {
        let map = room();
        let run = |first_range: f64| {
            let config = ParticleFilterConfig { num_particles: 20, seed: Some(5), ..Default::default() };
            let mut pf = ParticleFilter::new(config).unwrap();
            pf.initialize_with_map(Arc::clone(&map), Pose2D::origin());
            let mut scan = scan_from(&map, &Pose2D::new(0.1, 0.0, 0.0), 0.2, 90);
            pf.update(&scan).unwrap();
            // ray 0 is always scored
            scan.ranges[0] = first_range;
            pf.update(&scan).unwrap();
            pf.snapshot()
        };

        let missing = run(f64::NAN);
        let beyond_max = run(20.0);
        assert!(missing.iter().any(|p| (p.weight - 1.0 / 20.0).abs() > 1e-6));
        for (p, q) in missing.iter().zip(&beyond_max) {
            assert_relative_eq!(p.weight, q.weight, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_update_gating() {
        let config = ParticleFilterConfig { min_update_distance: 0.5, ..quiet_config(4) };
        let mut pf = ParticleFilter::new(config).unwrap();
        let map = room();
        pf.initialize_with_map(Arc::clone(&map), Pose2D::origin());
        let scan = scan_from(&map, &Pose2D::origin(), 0.2, 36);

        pf.observe_odometry(&Pose2D::origin());
        assert!(matches!(pf.observe_laser(&scan).unwrap(), ScanOutcome::Updated { .. }));
        assert_eq!(pf.observe_laser(&scan).unwrap(), ScanOutcome::Skipped);

        pf.observe_odometry(&Pose2D::new(0.3, 0.0, 0.0));
        assert_eq!(pf.observe_laser(&scan).unwrap(), ScanOutcome::Skipped);
        pf.observe_odometry(&Pose2D::new(0.6, 0.0, 0.0));
        assert!(matches!(pf.observe_laser(&scan).unwrap(), ScanOutcome::Updated { .. }));
    }

    #[test]
    fn test_converges_near_true_pose() {
        let config = ParticleFilterConfig {
            num_particles: 300,
            seed: Some(1234),
            initial_noise: NoiseStd::new(0.3, 0.3, 0.1),
            ..Default::default()
        };
        let mut pf = ParticleFilter::new(config).unwrap();
        let map = room();
        let truth = Pose2D::new(-1.0, 0.5, 0.2);
        pf.initialize_with_map(Arc::clone(&map), truth);

        let scan = scan_from(&map, &truth, 0.2, 180);
        for _ in 0..5 {
            pf.observe_laser(&scan).unwrap();
        }

        let est = pf.estimate();
        assert!(est.distance(&truth) < 0.15, "estimate {:?}", est);
        assert!(angle_diff(est.heading, truth.heading).abs() < 0.1);
        assert_relative_eq!(weight_sum(&pf), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_estimate_is_weighted_and_wraps() {
        let mut pf = ParticleFilter::new(quiet_config(2)).unwrap();
        pf.initialize_with_map(room(), Pose2D::origin());
        pf.particles[0] = Particle::new(Vector2::new(0.0, 0.0), PI - 0.1, 0.75);
        pf.particles[1] = Particle::new(Vector2::new(4.0, 0.0), 3.0 * PI + 0.1, 0.25);

        let est = pf.estimate();
        assert_relative_eq!(est.x(), 1.0, epsilon = 1e-12);
        assert!(est.heading > -PI && est.heading <= PI);
        assert!(angle_diff(est.heading, PI).abs() < 0.1);

        let best = pf.best_particle().unwrap();
        assert_eq!(best.weight, 0.75);
    }

    #[test]
    fn test_estimate_before_initialize() {
        let pf = ParticleFilter::with_defaults();
        assert!(pf.try_estimate().is_none());
        assert_eq!(Localizer::estimate(&pf), Pose2D::origin());
        assert!(pf.covariance().is_none());
        assert!(pf.best_particle().is_none());
    }
}
