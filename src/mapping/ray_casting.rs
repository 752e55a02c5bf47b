//! Predicted range scans by ray casting against a vector map
//!
//! Casting one ray costs O(map segments), so a full prediction is
//! O(rays x segments). Only every `stride`-th ray is evaluated; the same
//! stride must be used when the prediction is scored (see
//! [`beam_stride`]).

use nalgebra::Vector2;
use tracing::warn;

use crate::common::{LocalizationError, LocalizationResult, Pose2D};
use crate::mapping::vector_map::VectorMap;

/// One laser observation in the sensor frame
#[derive(Debug, Clone, PartialEq)]
pub struct LaserScan {
    pub ranges: Vec<f64>,
    pub range_min: f64,
    pub range_max: f64,
    pub angle_min: f64,
    pub angle_max: f64,
}

impl LaserScan {
    pub fn new(ranges: Vec<f64>, range_min: f64, range_max: f64, angle_min: f64, angle_max: f64) -> Self {
        Self { ranges, range_min, range_max, angle_min, angle_max }
    }

    pub fn num_rays(&self) -> usize {
        self.ranges.len()
    }

    pub fn geometry(&self) -> ScanGeometry {
        ScanGeometry {
            num_rays: self.ranges.len(),
            range_min: self.range_min,
            range_max: self.range_max,
            angle_min: self.angle_min,
            angle_max: self.angle_max,
        }
    }

    /// Check the input contract; logs and returns `InvalidScan` on violation.
    ///
    /// Non-finite ranges are accepted: they mark beams without a return and
    /// are scored as uninformative.
    pub fn validate(&self) -> LocalizationResult<()> {
        let reason = if self.ranges.is_empty() {
            Some("ranges array is empty".to_string())
        } else if ![self.range_min, self.range_max, self.angle_min, self.angle_max]
            .iter()
            .all(|v| v.is_finite())
        {
            Some("scan geometry is not finite".to_string())
        } else if self.range_min < 0.0 || self.range_min > self.range_max {
            Some(format!("bad range limits [{}, {}]", self.range_min, self.range_max))
        } else {
            None
        };

        match reason {
            Some(msg) => {
                warn!(rays = self.ranges.len(), "rejecting laser scan: {}", msg);
                Err(LocalizationError::InvalidScan(msg))
            }
            None => Ok(()),
        }
    }
}

/// Scan geometry without the measured ranges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanGeometry {
    pub num_rays: usize,
    pub range_min: f64,
    pub range_max: f64,
    pub angle_min: f64,
    pub angle_max: f64,
}

impl ScanGeometry {
    pub fn angle_increment(&self) -> f64 {
        if self.num_rays == 0 {
            return 0.0;
        }
        (self.angle_max - self.angle_min) / self.num_rays as f64
    }

    /// Angle of ray `index` relative to the sensor heading
    pub fn ray_angle(&self, index: usize) -> f64 {
        self.angle_min + index as f64 * self.angle_increment()
    }
}

/// Stride between evaluated rays so that about `num_beams` rays are used
pub fn beam_stride(num_rays: usize, num_beams: usize) -> usize {
    if num_beams == 0 {
        return 1;
    }
    (num_rays / num_beams).max(1)
}

/// World-frame position of a sensor mounted `offset` metres ahead of `pose`
pub fn sensor_origin(pose: &Pose2D, offset: f64) -> Vector2<f64> {
    pose.transform_point(&Vector2::new(offset, 0.0))
}

/// Simulated scan for one hypothesized pose.
///
/// Holds only the evaluated rays: entry `k` belongs to ray `k * stride`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedScan {
    pub stride: usize,
    pub origin: Vector2<f64>,
    pub endpoints: Vec<Vector2<f64>>,
}

impl PredictedScan {
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Ray index of evaluated entry `k`
    pub fn ray_index(&self, k: usize) -> usize {
        k * self.stride
    }

    /// Distance from the sensor origin to each endpoint
    pub fn ranges(&self) -> impl Iterator<Item = f64> + '_ {
        self.endpoints.iter().map(move |p| (p - self.origin).norm())
    }
}

/// Ray-cast every `stride`-th ray of `geometry` from `pose` against `map`
pub fn predict_scan(
    map: &VectorMap,
    pose: &Pose2D,
    sensor_offset: f64,
    geometry: &ScanGeometry,
    stride: usize,
) -> PredictedScan {
    let stride = stride.max(1);
    let origin = sensor_origin(pose, sensor_offset);

    let endpoints = (0..geometry.num_rays)
        .step_by(stride)
        .map(|i| {
            let angle = pose.heading + geometry.ray_angle(i);
            let dir = Vector2::new(angle.cos(), angle.sin());
            let start = origin + dir * geometry.range_min;
            let end = origin + dir * geometry.range_max;
            map.closest_intersection(start, end)
        })
        .collect();

    PredictedScan { stride, origin, endpoints }
}
