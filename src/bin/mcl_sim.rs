//! Monte Carlo localization simulation
//!
//! A robot drives circles inside a rectangular room. Noisy odometry and
//! laser scans are fed to a particle filter and to plain dead reckoning,
//! and the pose error of both is logged.
//!
//! Usage: mcl_sim [config.toml]

use std::f64::consts::PI;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, error, info, warn};

use vector_mcl::localization::BodyMotion;
use vector_mcl::mapping::{predict_scan, ScanGeometry};
use vector_mcl::utils::{colors, PathStyle, PointStyle, Visualizer};
use vector_mcl::{
    DeadReckoning, LaserScan, Line2D, LocalizationError, LocalizationResult, Localizer,
    ParticleFilter, ParticleFilterConfig, Pose2D, ScanOutcome, VectorMap,
};

const SHOW_PLOT: bool = false;
const MAP_NAME: &str = "square_room";
const SIM_STEPS: usize = 300;

// robot motion per step
const SPEED: f64 = 0.1;
const YAW_RATE: f64 = 0.05;

// simulated laser
const NUM_RAYS: usize = 181;
const RANGE_MIN: f64 = 0.1;
const RANGE_MAX: f64 = 10.0;
const RANGE_NOISE: f64 = 0.03;

// odometry noise per step
const ODOM_TRANS_NOISE: f64 = 0.01;
const ODOM_ROT_NOISE: f64 = 0.01;

fn room_map() -> VectorMap {
    VectorMap::new(vec![
        Line2D::from_coords(0.0, 0.0, 10.0, 0.0),
        Line2D::from_coords(10.0, 0.0, 10.0, 8.0),
        Line2D::from_coords(10.0, 8.0, 0.0, 8.0),
        Line2D::from_coords(0.0, 8.0, 0.0, 0.0),
        // pillar
        Line2D::from_coords(4.5, 3.5, 5.5, 3.5),
        Line2D::from_coords(5.5, 3.5, 5.5, 4.5),
        Line2D::from_coords(5.5, 4.5, 4.5, 4.5),
        Line2D::from_coords(4.5, 4.5, 4.5, 3.5),
    ])
}

fn load_config() -> LocalizationResult<ParticleFilterConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "loading configuration");
            ParticleFilterConfig::from_file(path)
        }
        None => {
            info!("no configuration given, using defaults");
            Ok(ParticleFilterConfig::default())
        }
    }
}

/// Ray-cast the true pose and corrupt the ranges with Gaussian noise
fn simulate_scan(map: &VectorMap, pose: &Pose2D, offset: f64, rng: &mut StdRng) -> LocalizationResult<LaserScan> {
    let geometry = ScanGeometry {
        num_rays: NUM_RAYS,
        range_min: RANGE_MIN,
        range_max: RANGE_MAX,
        angle_min: -PI / 2.0,
        angle_max: PI / 2.0,
    };
    let truth = predict_scan(map, pose, offset, &geometry, 1);

    let noise = Normal::new(0.0, RANGE_NOISE)
        .map_err(|e| LocalizationError::InvalidParameter(e.to_string()))?;
    let ranges = truth
        .ranges()
        .map(|r| (r + noise.sample(rng)).clamp(RANGE_MIN, RANGE_MAX))
        .collect();
    Ok(LaserScan::new(ranges, RANGE_MIN, RANGE_MAX, geometry.angle_min, geometry.angle_max))
}

fn feed(localizer: &mut dyn Localizer, odom: &Pose2D, scan: &LaserScan) -> Option<ScanOutcome> {
    localizer.observe_odometry(odom);
    match localizer.observe_laser(scan) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!("scan rejected: {}", e);
            None
        }
    }
}

fn run() -> LocalizationResult<()> {
    let config = load_config()?;
    let offset = config.sensor.offset;
    let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or(7));

    let mut true_pose = Pose2D::new(5.0, 1.5, 0.0);
    // odometry lives in its own frame; only its increments matter
    let mut odom_pose = Pose2D::new(-3.0, 2.0, 1.0);

    let mut filter = ParticleFilter::new(config)?;
    if filter.initialize(MAP_NAME, true_pose).is_err() {
        warn!("falling back to the built-in room map");
        filter.initialize_with_map(Arc::new(room_map()), true_pose);
    }
    let map = filter.map_handle();
    let mut dead_reckoning = DeadReckoning::new(true_pose);

    let trans_noise = Normal::new(0.0, ODOM_TRANS_NOISE)
        .map_err(|e| LocalizationError::InvalidParameter(e.to_string()))?;
    let rot_noise = Normal::new(0.0, ODOM_ROT_NOISE)
        .map_err(|e| LocalizationError::InvalidParameter(e.to_string()))?;

    let mut hist_true = vec![true_pose];
    let mut hist_mcl = vec![true_pose];
    let mut hist_dr = vec![true_pose];
    let mut updates = 0usize;
    let mut resamples = 0usize;

    for step in 0..=SIM_STEPS {
        if step > 0 {
            let motion = BodyMotion::new(SPEED, 0.0, YAW_RATE);
            true_pose = motion.apply(&true_pose).normalized();

            let measured = BodyMotion::new(
                SPEED + trans_noise.sample(&mut rng),
                trans_noise.sample(&mut rng),
                YAW_RATE + rot_noise.sample(&mut rng),
            );
            odom_pose = measured.apply(&odom_pose);
        }

        let scan = simulate_scan(&map, &true_pose, offset, &mut rng)?;

        if let Some(ScanOutcome::Updated { effective_sample_size, resampled }) =
            feed(&mut filter, &odom_pose, &scan)
        {
            updates += 1;
            if resampled {
                resamples += 1;
            }
            debug!(step, n_eff = effective_sample_size, resampled, "filter updated");
        }
        feed(&mut dead_reckoning, &odom_pose, &scan);

        let mcl_est = filter.estimate();
        let dr_est = dead_reckoning.estimate();
        hist_true.push(true_pose);
        hist_mcl.push(mcl_est);
        hist_dr.push(dr_est);

        if step % 50 == 0 {
            info!(
                step,
                mcl_error = mcl_est.distance(&true_pose),
                dead_reckoning_error = dr_est.distance(&true_pose),
                "pose error [m]"
            );
        }
    }

    let final_true = hist_true.last().copied().unwrap_or_default();
    let final_mcl = filter.estimate();
    info!(
        updates,
        resamples,
        mcl_error = final_mcl.distance(&final_true),
        dead_reckoning_error = dead_reckoning.estimate().distance(&final_true),
        "simulation finished"
    );

    if SHOW_PLOT {
        let mut vis = Visualizer::new();
        vis.set_title("Monte Carlo Localization");
        vis.plot_map(&map)
            .plot_particles(filter.particles())
            .plot_trajectory(&hist_true, &PathStyle::new(colors::GROUND_TRUTH, "Ground Truth"))
            .plot_trajectory(&hist_dr, &PathStyle::new(colors::DEAD_RECKONING, "Dead Reckoning"))
            .plot_trajectory(&hist_mcl, &PathStyle::new(colors::ESTIMATED, "MCL"))
            .plot_pose(&final_mcl, &PointStyle::new(colors::ESTIMATED, "Estimate"));

        if let Err(e) = vis.save_png("img/localization/mcl_result.png", 800, 640) {
            warn!("failed to save plot: {}", e);
        }
        if let Err(e) = vis.show() {
            warn!("failed to show plot: {}", e);
        }
    }

    Ok(())
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).compact().init();

    info!("Monte Carlo localization start!!");
    if let Err(e) = run() {
        error!("simulation failed: {}", e);
        std::process::exit(1);
    }
    info!("Monte Carlo localization finish!!");
}
