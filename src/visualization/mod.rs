//! Heatmap rendering for 8x8 zone grids.
//!
//! Each heatmap draws one colored cell per zone with its value annotated,
//! row 0 at the top as the sensor reports it, plus a color bar on the right.

use std::path::Path;

use ndarray::Array2;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::processors::aggregate::{grid_range, Metric};

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Empty grid")]
    EmptyGrid,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
pub const DEFAULT_WIDTH: u32 = 1000;

/// Default plot height in pixels.
pub const DEFAULT_HEIGHT: u32 = 800;

/// Width reserved for the color bar.
const COLORBAR_WIDTH: u32 = 130;

/// Number of bands drawn in the color bar.
const COLORBAR_STEPS: usize = 64;

/// Color palettes, one per metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    /// Dark purple through orange to yellow.
    Plasma,
    /// Black through red and yellow to white.
    Hot,
    /// Red through yellow to green.
    RdYlGn,
}

const PLASMA_STOPS: &[(u8, u8, u8)] = &[
    (13, 8, 135),
    (84, 2, 163),
    (139, 10, 165),
    (185, 50, 137),
    (219, 92, 104),
    (244, 136, 73),
    (254, 188, 43),
    (240, 249, 33),
];

const HOT_STOPS: &[(u8, u8, u8)] = &[
    (10, 0, 0),
    (230, 0, 0),
    (255, 210, 0),
    (255, 255, 255),
];

const RDYLGN_STOPS: &[(u8, u8, u8)] = &[
    (165, 0, 38),
    (244, 109, 67),
    (254, 224, 139),
    (217, 239, 139),
    (102, 189, 99),
    (0, 104, 55),
];

impl Palette {
    fn stops(self) -> &'static [(u8, u8, u8)] {
        match self {
            Palette::Plasma => PLASMA_STOPS,
            Palette::Hot => HOT_STOPS,
            Palette::RdYlGn => RDYLGN_STOPS,
        }
    }

    /// Color at position `t` in [0, 1]; values outside are clamped.
    pub fn color(self, t: f64) -> RGBColor {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let scaled = t * (stops.len() - 1) as f64;
        let idx = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - idx as f64;

        let (r0, g0, b0) = stops[idx];
        let (r1, g1, b1) = stops[idx + 1];
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;

        RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
    }
}

impl From<Metric> for Palette {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::DistanceMean => Palette::Plasma,
            Metric::DistanceStd => Palette::Hot,
            Metric::Validity => Palette::RdYlGn,
        }
    }
}

/// Image size and palette for a heatmap.
#[derive(Debug, Clone)]
pub struct HeatmapStyle {
    pub width: u32,
    pub height: u32,
    pub palette: Palette,
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            palette: Palette::Plasma,
        }
    }
}

/// Normalize `value` into [0, 1] over `[lo, hi]`. A flat range maps to the middle.
fn normalize(value: f64, lo: f64, hi: f64) -> f64 {
    if (hi - lo).abs() < f64::EPSILON {
        0.5
    } else {
        (value - lo) / (hi - lo)
    }
}

/// Tick label for a cell index axis: the index at whole cells, blank elsewhere.
fn cell_tick_label(value: f64, count: usize) -> String {
    let index = value.round();
    if (value - index).abs() < 1e-6 && index >= 0.0 && index < count as f64 {
        (index as usize).to_string()
    } else {
        String::new()
    }
}

/// Returns true if black text reads better than white on `color`.
fn is_bright(color: RGBColor) -> bool {
    let RGBColor(r, g, b) = color;
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64 > 150.0
}

/// Plot a grid as an annotated heatmap and save as PNG.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `grid` - Values to plot, row 0 drawn at the top
/// * `title` - Plot caption
/// * `style` - Image size and palette
pub fn plot_heatmap(output_path: &Path, grid: &Array2<f64>, title: &str, style: &HeatmapStyle) -> Result<()> {
    if grid.is_empty() {
        return Err(VisualizationError::EmptyGrid);
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let (rows, cols) = grid.dim();
    let (lo, hi) = grid_range(grid);

    let root = BitMapBackend::new(output_path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let (heat_area, bar_area) = root.split_horizontally(style.width.saturating_sub(COLORBAR_WIDTH));

    // Cell (r, c) is centered on (c, rows - 1 - r), so integer ticks fall on
    // cell centers and row 0 is the top band.
    let mut chart = ChartBuilder::on(&heat_area)
        .caption(title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(-0.5f64..cols as f64 - 0.5, -0.5f64..rows as f64 - 0.5)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("X Position")
        .y_desc("Y Position")
        .x_labels(cols)
        .y_labels(rows)
        .x_label_formatter(&|x| cell_tick_label(*x, cols))
        .y_label_formatter(&|y| cell_tick_label(rows as f64 - 1.0 - y, rows))
        .draw()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let cell_center = |r: usize, c: usize| (c as f64, (rows - 1 - r) as f64);

    chart
        .draw_series(grid.indexed_iter().map(|((r, c), &v)| {
            let (x, y) = cell_center(r, c);
            let color = style.palette.color(normalize(v, lo, hi));
            Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], color.filled())
        }))
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let annotation = TextStyle::from(("sans-serif", 14).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    let light_text = annotation.color(&WHITE);
    let dark_text = annotation.color(&BLACK);

    chart
        .draw_series(grid.indexed_iter().map(|((r, c), &v)| {
            let cell = style.palette.color(normalize(v, lo, hi));
            let text_style = if is_bright(cell) {
                dark_text.clone()
            } else {
                light_text.clone()
            };
            Text::new(format!("{:.1}", v), cell_center(r, c), text_style)
        }))
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    draw_colorbar(&bar_area, lo, hi, style.palette)?;

    root.present()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    lo: f64,
    hi: f64,
    palette: Palette,
) -> Result<()> {
    let (lo_axis, hi_axis) = if (hi - lo).abs() < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    };

    let mut bar = ChartBuilder::on(area)
        .margin_top(55)
        .margin_bottom(60)
        .margin_right(10)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..1f64, lo_axis..hi_axis)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc("Value")
        .y_labels(6)
        .y_label_formatter(&|y| format!("{:.1}", y))
        .draw()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let step = (hi_axis - lo_axis) / COLORBAR_STEPS as f64;
    bar.draw_series((0..COLORBAR_STEPS).map(|i| {
        let y0 = lo_axis + step * i as f64;
        let t = (i as f64 + 0.5) / COLORBAR_STEPS as f64;
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], palette.color(t).filled())
    }))
    .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}
