//! Visualization utilities for vector_mcl
//!
//! Collects map segments, particles, scans, and trajectories as layers and
//! renders them onto a single gnuplot axes.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::Pose2D;
use crate::localization::Particle;
use crate::mapping::{PredictedScan, VectorMap};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const MAP: &str = BLACK;
    pub const PARTICLE: &str = GRAY;
    pub const SCAN: &str = ORANGE;
    pub const ESTIMATED: &str = "#35C788";
    pub const GROUND_TRUTH: &str = BLUE;
    pub const DEAD_RECKONING: &str = RED;
}

/// Style for line rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

#[derive(Debug, Clone)]
enum Layer {
    Lines { x: Vec<f64>, y: Vec<f64>, style: PathStyle, show_caption: bool },
    Points { x: Vec<f64>, y: Vec<f64>, style: PointStyle },
}

/// Layered 2D plot
pub struct Visualizer {
    layers: Vec<Layer>,
    title: String,
    x_label: String,
    y_label: String,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Draw every map segment; only the first one gets a legend entry
    pub fn plot_map(&mut self, map: &VectorMap) -> &mut Self {
        let style = PathStyle::new(colors::MAP, "Map").with_line_width(1.5);
        for (i, line) in map.lines().iter().enumerate() {
            self.layers.push(Layer::Lines {
                x: vec![line.p0.x, line.p1.x],
                y: vec![line.p0.y, line.p1.y],
                style: style.clone(),
                show_caption: i == 0,
            });
        }
        self
    }

    pub fn plot_particles(&mut self, particles: &[Particle]) -> &mut Self {
        let x = particles.iter().map(|p| p.location.x).collect();
        let y = particles.iter().map(|p| p.location.y).collect();
        let style = PointStyle::new(colors::PARTICLE, "Particles").with_size(0.5).with_symbol('.');
        self.layers.push(Layer::Points { x, y, style });
        self
    }

    /// Plot ray endpoints of a predicted or simulated scan
    pub fn plot_scan(&mut self, scan: &PredictedScan) -> &mut Self {
        let x = scan.endpoints.iter().map(|p| p.x).collect();
        let y = scan.endpoints.iter().map(|p| p.y).collect();
        let style = PointStyle::new(colors::SCAN, "Scan").with_size(0.7).with_symbol('x');
        self.layers.push(Layer::Points { x, y, style });
        self
    }

    pub fn plot_trajectory(&mut self, poses: &[Pose2D], style: &PathStyle) -> &mut Self {
        self.layers.push(Layer::Lines {
            x: poses.iter().map(|p| p.x()).collect(),
            y: poses.iter().map(|p| p.y()).collect(),
            style: style.clone(),
            show_caption: true,
        });
        self
    }

    /// Plot a pose with a short heading indicator
    pub fn plot_pose(&mut self, pose: &Pose2D, style: &PointStyle) -> &mut Self {
        self.layers.push(Layer::Points { x: vec![pose.x()], y: vec![pose.y()], style: style.clone() });

        let arrow_len = 0.5;
        let end_x = pose.x() + arrow_len * pose.heading.cos();
        let end_y = pose.y() + arrow_len * pose.heading.sin();
        self.layers.push(Layer::Lines {
            x: vec![pose.x(), end_x],
            y: vec![pose.y(), end_y],
            style: PathStyle::new(&style.color, ""),
            show_caption: false,
        });
        self
    }

    pub fn show(&self) -> Result<(), String> {
        self.render().show().map_err(|e| e.to_string()).map(|_| ())
    }

    pub fn save_png(&self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.render().save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();

        for layer in &self.layers {
            match layer {
                Layer::Lines { x, y, style, show_caption } => {
                    let caption = if *show_caption { style.caption.as_str() } else { "" };
                    axes.lines(x, y, &[Caption(caption), Color(&style.color), LineWidth(style.line_width)]);
                }
                Layer::Points { x, y, style } => {
                    axes.points(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        PointSymbol(style.symbol),
                        PointSize(style.size),
                    ]);
                }
            }
        }

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
        figure
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
