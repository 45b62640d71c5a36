//! Standalone figures: the running-estimate scatter and the sampled points.
//!
//! Both render through the plotters SVG backend so the artifacts open in any
//! browser without external scripts.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;

use crate::estimate::RunResult;
use crate::geometry::{Point, Region, RegionPair};

/// Reference line drawn across every estimate figure.
#[allow(clippy::approx_constant)]
pub const PI_REFERENCE: f64 = 3.14159265359;

const X_DESC: &str = "observations";
const Y_DESC: &str = "pi_estimate";
const MAX_MARKERS: usize = 5_000;

#[derive(Clone, Debug)]
struct FigureSeries {
    label: Option<String>,
    points: Vec<(u64, f64)>,
}

/// Scatter of (observation, estimate) pairs, one colour per series.
#[derive(Clone, Debug, Default)]
pub struct EstimateFigure {
    series: Vec<FigureSeries>,
}

impl EstimateFigure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_series(mut self, label: Option<String>, points: Vec<(u64, f64)>) -> Self {
        self.series.push(FigureSeries { label, points });
        self
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn render_svg(&self) -> Result<String> {
        let all = self.series.iter().flat_map(|s| s.points.iter());
        let (mut x_max, mut y_min, mut y_max) = (1_u64, PI_REFERENCE, PI_REFERENCE);
        for &(x, y) in all {
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        let pad = ((y_max - y_min) * 0.05).max(0.01);
        let x_hi = (x_max as f64).max(2.0);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (960, 540)).into_drawing_area();
            root.fill(&WHITE)?;
            let mut chart = ChartBuilder::on(&root)
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(0.0..x_hi, (y_min - pad)..(y_max + pad))?;

            chart
                .configure_mesh()
                .x_desc(X_DESC)
                .y_desc(Y_DESC)
                .draw()?;

            for (idx, series) in self.series.iter().enumerate() {
                let color = Palette99::pick(idx).mix(0.9);
                let markers = thin(&series.points, MAX_MARKERS)
                    .into_iter()
                    .map(move |(x, y)| Circle::new((x as f64, y), 2, color.filled()));
                let anno = chart.draw_series(markers)?;
                if let Some(label) = &series.label {
                    anno.label(label.as_str())
                        .legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
                        });
                }
            }

            chart.draw_series(std::iter::once(PathElement::new(
                vec![(0.0, PI_REFERENCE), (x_hi, PI_REFERENCE)],
                RED.stroke_width(2),
            )))?;

            if self.series.iter().any(|s| s.label.is_some()) {
                chart
                    .configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()?;
            }

            root.present()?;
        }
        Ok(svg)
    }

    pub fn render_html(&self) -> Result<String> {
        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{Y_DESC} vs {X_DESC}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
            self.render_svg()?
        ))
    }

    pub fn write_html(&self, path: impl AsRef<Path>) -> Result<()> {
        write_file(path.as_ref(), &self.render_html()?)
    }
}

/// Square, circle and the first `observations` sampled points; inside points
/// in red, outside in blue.
pub struct PointsFigure<'a> {
    regions: &'a RegionPair,
    run: &'a RunResult,
    observations: usize,
}

impl<'a> PointsFigure<'a> {
    pub fn new(regions: &'a RegionPair, run: &'a RunResult, observations: usize) -> Self {
        Self {
            regions,
            run,
            observations,
        }
    }

    pub fn render_svg(&self) -> Result<String> {
        let bounds = self.regions.sampling.bounds();
        let pad = bounds.width().max(bounds.height()) * 0.02;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (600, 600)).into_drawing_area();
            root.fill(&WHITE)?;
            let mut chart = ChartBuilder::on(&root)
                .margin(10)
                .x_label_area_size(30)
                .y_label_area_size(40)
                .build_cartesian_2d(
                    (bounds.min_x - pad)..(bounds.max_x + pad),
                    (bounds.min_y - pad)..(bounds.max_y + pad),
                )?;
            chart.configure_mesh().disable_mesh().draw()?;

            let rings = [
                self.regions.sampling.exterior(),
                self.regions.target.exterior(),
            ];
            chart.draw_series(rings.into_iter().map(|ring| {
                let mut path: Vec<(f64, f64)> = ring.iter().map(|p| (p.x, p.y)).collect();
                if let Some(&first) = path.first() {
                    path.push(first);
                }
                PathElement::new(path, BLACK.stroke_width(1))
            }))?;

            let window = self.run.window(self.observations);
            chart.draw_series(window.iter().zip(&self.run.points).map(
                |(record, &Point { x, y })| {
                    let color = if record.inside { RED } else { BLUE };
                    Circle::new((x, y), 2, color.filled())
                },
            ))?;

            root.present()?;
        }
        Ok(svg)
    }

    pub fn write_svg(&self, path: impl AsRef<Path>) -> Result<()> {
        write_file(path.as_ref(), &self.render_svg()?)
    }
}

/// Fixed-stride thinning that always keeps the last point.
fn thin(points: &[(u64, f64)], max_markers: usize) -> Vec<(u64, f64)> {
    if points.len() <= max_markers {
        return points.to_vec();
    }
    let stride = points.len().div_ceil(max_markers);
    let mut kept: Vec<(u64, f64)> = points.iter().copied().step_by(stride).collect();
    if let (Some(last), Some(kept_last)) = (points.last(), kept.last()) {
        if last != kept_last {
            kept.push(*last);
        }
    }
    kept
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
