//! Vector map: an immutable set of line segments in the world frame
//!
//! Map files hold one segment per line as `x0, y0, x1, y1`. Blank lines and
//! lines starting with `#` are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use nalgebra::Vector2;
use tracing::info;

use crate::common::{LocalizationError, LocalizationResult};

/// Lateral distance [m] under which parallel segments count as collinear
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2D {
    pub p0: Vector2<f64>,
    pub p1: Vector2<f64>,
}

impl Line2D {
    pub fn new(p0: Vector2<f64>, p1: Vector2<f64>) -> Self {
        Self { p0, p1 }
    }

    pub fn from_coords(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(Vector2::new(x0, y0), Vector2::new(x1, y1))
    }

    /// Vector from `p0` to `p1` (not normalized)
    pub fn direction(&self) -> Vector2<f64> {
        self.p1 - self.p0
    }

    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Intersection point of two segments, endpoints included.
    ///
    /// Collinear overlapping segments meet at the overlap point closest to
    /// `self.p0`. Parallel segments on different lines never intersect, nor
    /// does a zero-length `self`.
    pub fn intersection(&self, other: &Line2D) -> Option<Vector2<f64>> {
        let d1 = self.direction();
        let d2 = other.direction();
        let origin_diff = other.p0 - self.p0;

        let cross = d1.perp(&d2);
        if cross.abs() < f64::EPSILON {
            return self.collinear_overlap(other);
        }

        let t = origin_diff.perp(&d2) / cross;
        let s = origin_diff.perp(&d1) / cross;

        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&s) {
            Some(self.p0 + d1 * t)
        } else {
            None
        }
    }

    fn collinear_overlap(&self, other: &Line2D) -> Option<Vector2<f64>> {
        let d1 = self.direction();
        let len_sq = d1.norm_squared();
        if len_sq < f64::EPSILON {
            return None;
        }
        // distance of `other` from the carrier line of `self`
        if ((other.p0 - self.p0).perp(&d1) / len_sq.sqrt()).abs() > COLLINEAR_TOLERANCE {
            return None;
        }

        let u0 = (other.p0 - self.p0).dot(&d1) / len_sq;
        let u1 = (other.p1 - self.p0).dot(&d1) / len_sq;
        let lo = u0.min(u1).max(0.0);
        let hi = u0.max(u1).min(1.0);
        (lo <= hi).then(|| self.p0 + d1 * lo)
    }
}

/// Immutable, ordered set of map segments
#[derive(Debug, Clone, Default)]
pub struct VectorMap {
    lines: Vec<Line2D>,
}

impl VectorMap {
    pub fn new(lines: Vec<Line2D>) -> Self {
        Self { lines }
    }

    /// Load `<map_dir>/<name>.txt`
    pub fn load<P: AsRef<Path>>(map_dir: P, name: &str) -> LocalizationResult<Self> {
        let path: PathBuf = map_dir.as_ref().join(format!("{}.txt", name));
        Self::from_file(&path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> LocalizationResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let map = Self::parse(&text)?;
        info!(path = %path.as_ref().display(), segments = map.len(), "loaded vector map");
        Ok(map)
    }

    /// Parse map text, one `x0, y0, x1, y1` segment per line
    pub fn parse(text: &str) -> LocalizationResult<Self> {
        let mut lines = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            lines.push(parse_segment(trimmed, idx + 1)?);
        }
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[Line2D] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// First obstacle hit along the segment `start -> end`.
    ///
    /// The ray is shortened every time a segment crosses it, so the returned
    /// point is the intersection closest to `start`. Returns `end` if nothing
    /// is hit.
    pub fn closest_intersection(&self, start: Vector2<f64>, end: Vector2<f64>) -> Vector2<f64> {
        let mut closest = end;
        for line in &self.lines {
            let ray = Line2D::new(start, closest);
            if let Some(hit) = ray.intersection(line) {
                closest = hit;
            }
        }
        closest
    }
}

fn parse_segment(text: &str, line: usize) -> LocalizationResult<Line2D> {
    let values = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|e| LocalizationError::MapParse {
                line,
                message: format!("'{}': {}", s, e),
            })
        })
        .collect::<LocalizationResult<Vec<f64>>>()?;

    let count = values.len();
    let (x0, y0, x1, y1) = values.into_iter().collect_tuple().ok_or_else(|| {
        LocalizationError::MapParse { line, message: format!("expected 4 values, found {}", count) }
    })?;
    Ok(Line2D::from_coords(x0, y0, x1, y1))
}
