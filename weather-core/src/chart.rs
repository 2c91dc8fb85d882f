//! Six-panel PNG summary of a snapshot.
//!
//! Text is drawn with an embedded DejaVu Sans registered as `sans-serif`,
//! so rendering does not depend on fonts installed on the host.

use std::{fmt::Display, path::Path, sync::OnceLock};

use plotters::{
    coord::Shift,
    prelude::*,
    style::{FontStyle, register_font},
};
use thiserror::Error;
use tracing::info;

use crate::{
    stats::{self, Metric, Summary, UvBand},
    store::Snapshot,
};

const SIZE: (u32, u32) = (1800, 1200);
const TEMPERATURE_BINS: usize = 10;
const TOP_CONDITIONS: usize = 8;
const TOP_PRESSURE: usize = 10;

const ORANGE: RGBColor = RGBColor(255, 165, 0);
const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const LIGHT_GREEN: RGBColor = RGBColor(144, 238, 144);
const PURPLE: RGBColor = RGBColor(128, 0, 128);
const UV_COLORS: [RGBColor; 5] = [GREEN, YELLOW, ORANGE, RED, PURPLE];

const FONT_FAMILY: &str = "sans-serif";
static FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("No weather data to plot")]
    Empty,

    #[error("Failed to render chart: {0}")]
    Render(String),
}

fn render_err<E: Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

// Plotters panics on text without a font, so this must succeed before drawing.
fn ensure_font() -> Result<(), ChartError> {
    let ok = *FONT_REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_DATA).is_ok());
    if ok { Ok(()) } else { Err(ChartError::Render("embedded font could not be loaded".into())) }
}

/// Render the summary chart for `snapshot` into a PNG at `path`.
pub fn render(snapshot: &Snapshot, path: &Path) -> Result<(), ChartError> {
    if snapshot.is_empty() {
        return Err(ChartError::Empty);
    }
    ensure_font()?;

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;
    let root = root.titled("East Java Weather Analysis", (FONT_FAMILY, 36)).map_err(render_err)?;

    let panels = root.split_evenly((2, 3));
    temperature_histogram(&panels[0], snapshot)?;
    condition_bars(&panels[1], snapshot)?;
    temperature_vs_humidity(&panels[2], snapshot)?;
    wind_box(&panels[3], snapshot)?;
    pressure_bars(&panels[4], snapshot)?;
    uv_bars(&panels[5], snapshot)?;

    root.present().map_err(render_err)?;
    info!(path = %path.display(), "chart written");
    Ok(())
}

// Axis range around `values`, widened so a single value still has extent.
fn padded(values: &[f64], pad: f64) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    (lo - pad, hi + pad)
}

fn count_axis(max: usize) -> std::ops::Range<u32> {
    0..(max as u32 + 1)
}

fn temperature_histogram(area: &Panel<'_>, snapshot: &Snapshot) -> Result<(), ChartError> {
    let temps = stats::values(snapshot, Metric::Temperature);
    let (lo, hi) = padded(&temps, 0.5);
    let width = (hi - lo) / TEMPERATURE_BINS as f64;

    let mut bins = [0usize; TEMPERATURE_BINS];
    for t in &temps {
        let idx = ((t - lo) / width) as usize;
        bins[idx.min(TEMPERATURE_BINS - 1)] += 1;
    }

    let mut chart = ChartBuilder::on(area)
        .caption("Temperature distribution", (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(lo..hi, count_axis(bins.iter().copied().max().unwrap_or(0)))
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("Temperature (°C)")
        .y_desc("Districts")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(bins.iter().enumerate().map(|(i, &count)| {
            let x0 = lo + width * i as f64;
            Rectangle::new([(x0, 0), (x0 + width, count as u32)], ORANGE.mix(0.7).filled())
        }))
        .map_err(render_err)?;

    Ok(())
}

fn condition_bars(area: &Panel<'_>, snapshot: &Snapshot) -> Result<(), ChartError> {
    let mut counts = stats::condition_counts(snapshot);
    counts.truncate(TOP_CONDITIONS);
    let n = counts.len();

    let mut chart = ChartBuilder::on(area)
        .caption("Most frequent conditions", (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), count_axis(counts.first().map_or(0, |c| c.1)))
        .map_err(render_err)?;

    let label = |x: &f64| index_label(*x, |i| counts.get(i).map(|c| c.0.clone()));
    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&label)
        .y_desc("Districts")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, (_, count))| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0), (x + 0.4, *count as u32)], SKY_BLUE.filled())
        }))
        .map_err(render_err)?;

    Ok(())
}

fn temperature_vs_humidity(area: &Panel<'_>, snapshot: &Snapshot) -> Result<(), ChartError> {
    let temps = stats::values(snapshot, Metric::Temperature);
    let humidity = stats::values(snapshot, Metric::Humidity);
    let (x_lo, x_hi) = padded(&temps, 1.0);
    let (y_lo, y_hi) = padded(&humidity, 5.0);

    let mut chart = ChartBuilder::on(area)
        .caption("Temperature vs humidity", (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("Temperature (°C)")
        .y_desc("Humidity (%)")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(
            temps.iter().zip(&humidity).map(|(t, h)| Circle::new((*t, *h), 6, RED.mix(0.7).filled())),
        )
        .map_err(render_err)?;

    Ok(())
}

fn wind_box(area: &Panel<'_>, snapshot: &Snapshot) -> Result<(), ChartError> {
    let wind = stats::values(snapshot, Metric::WindSpeed);
    let Some(s) = Summary::of(&wind) else {
        return Ok(());
    };
    let (y_lo, y_hi) = padded(&wind, 1.0);

    let mut chart = ChartBuilder::on(area)
        .caption("Wind speed spread", (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(0.0..2.0, y_lo..y_hi)
        .map_err(render_err)?;

    chart.configure_mesh().disable_x_mesh().y_desc("Wind speed (km/h)").draw().map_err(render_err)?;

    chart
        .draw_series([
            Rectangle::new([(0.6, s.q1), (1.4, s.q3)], LIGHT_GREEN.mix(0.7).filled()),
            Rectangle::new([(0.6, s.q1), (1.4, s.q3)], BLACK.stroke_width(1)),
        ])
        .map_err(render_err)?;

    chart
        .draw_series([
            PathElement::new(vec![(0.6, s.median), (1.4, s.median)], BLACK.stroke_width(2)),
            PathElement::new(vec![(1.0, s.min), (1.0, s.q1)], BLACK.stroke_width(1)),
            PathElement::new(vec![(1.0, s.q3), (1.0, s.max)], BLACK.stroke_width(1)),
            PathElement::new(vec![(0.8, s.min), (1.2, s.min)], BLACK.stroke_width(1)),
            PathElement::new(vec![(0.8, s.max), (1.2, s.max)], BLACK.stroke_width(1)),
        ])
        .map_err(render_err)?;

    Ok(())
}

fn pressure_bars(area: &Panel<'_>, snapshot: &Snapshot) -> Result<(), ChartError> {
    let top = stats::top_pressure(snapshot, TOP_PRESSURE);
    let n = top.len();
    let pressures: Vec<f64> = top.iter().map(|r| r.pressure_mb).collect();
    let (x_lo, x_hi) = padded(&pressures, 2.0);

    let mut chart = ChartBuilder::on(area)
        .caption("Top 10 air pressure", (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(110)
        .build_cartesian_2d(x_lo..x_hi, -0.5..(n as f64 - 0.5))
        .map_err(render_err)?;

    // Highest pressure on the top row.
    let row = |rank: usize| (n - 1 - rank) as f64;
    let label = |y: &f64| {
        index_label(*y, |i| (i < n).then(|| top[n - 1 - i].district.clone()))
    };
    chart
        .configure_mesh()
        .y_labels(n)
        .y_label_formatter(&label)
        .x_desc("Pressure (mb)")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(top.iter().enumerate().map(|(rank, r)| {
            let y = row(rank);
            Rectangle::new([(x_lo, y - 0.4), (r.pressure_mb, y + 0.4)], PURPLE.mix(0.7).filled())
        }))
        .map_err(render_err)?;

    Ok(())
}

fn uv_bars(area: &Panel<'_>, snapshot: &Snapshot) -> Result<(), ChartError> {
    let distribution = stats::uv_distribution(snapshot);
    let max = distribution.iter().map(|(_, c)| *c).max().unwrap_or(0);

    let mut chart = ChartBuilder::on(area)
        .caption("UV index distribution", (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(-0.5..(UvBand::ALL.len() as f64 - 0.5), count_axis(max))
        .map_err(render_err)?;

    let label = |x: &f64| index_label(*x, |i| UvBand::ALL.get(i).map(|b| b.label().to_string()));
    chart
        .configure_mesh()
        .x_labels(UvBand::ALL.len())
        .x_label_formatter(&label)
        .y_desc("Districts")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(distribution.iter().enumerate().map(|(i, (_, count))| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0), (x + 0.4, *count as u32)], UV_COLORS[i].filled())
        }))
        .map_err(render_err)?;

    Ok(())
}

// Category label for an axis position that falls on a whole index.
fn index_label(pos: f64, lookup: impl Fn(usize) -> Option<String>) -> String {
    let rounded = pos.round();
    if rounded < 0.0 || (pos - rounded).abs() > 0.01 {
        return String::new();
    }
    lookup(rounded as usize).unwrap_or_default()
}
