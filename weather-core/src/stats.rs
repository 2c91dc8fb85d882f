//! Descriptive statistics and filters over a snapshot.

use std::{collections::HashMap, fmt};

use crate::{model::WeatherRecord, store::Snapshot};

/// Numeric columns summarized by [`describe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    FeelsLike,
    Humidity,
    WindSpeed,
    Visibility,
    Pressure,
    UvIndex,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Temperature,
        Metric::FeelsLike,
        Metric::Humidity,
        Metric::WindSpeed,
        Metric::Visibility,
        Metric::Pressure,
        Metric::UvIndex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::FeelsLike => "feels_like",
            Metric::Humidity => "humidity",
            Metric::WindSpeed => "wind_speed",
            Metric::Visibility => "visibility",
            Metric::Pressure => "pressure",
            Metric::UvIndex => "uv_index",
        }
    }

    pub fn value(&self, record: &WeatherRecord) -> f64 {
        match self {
            Metric::Temperature => record.temperature_c,
            Metric::FeelsLike => record.feels_like_c,
            Metric::Humidity => f64::from(record.humidity_pct),
            Metric::WindSpeed => record.wind_speed_kph,
            Metric::Visibility => record.visibility_km,
            Metric::Pressure => record.pressure_mb,
            Metric::UvIndex => record.uv_index,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Summary {
    /// `None` for an empty sample. `std` is the sample deviation (0 for one value).
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            q1: percentile(&sorted, 0.25),
            median: percentile(&sorted, 0.5),
            q3: percentile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

pub fn values(snapshot: &Snapshot, metric: Metric) -> Vec<f64> {
    snapshot.values().map(|r| metric.value(r)).collect()
}

/// Summary per metric; empty when the snapshot is empty.
pub fn describe(snapshot: &Snapshot) -> Vec<(Metric, Summary)> {
    Metric::ALL
        .iter()
        .filter_map(|m| Summary::of(&values(snapshot, *m)).map(|s| (*m, s)))
        .collect()
}

/// Condition texts by frequency, most common first, ties by name.
pub fn condition_counts(snapshot: &Snapshot) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in snapshot.values() {
        *counts.entry(record.condition_text.as_str()).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> =
        counts.into_iter().map(|(c, n)| (c.to_string(), n)).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Records whose condition contains `needle`, ignoring case.
pub fn filter_by_condition<'a>(snapshot: &'a Snapshot, needle: &str) -> Vec<&'a WeatherRecord> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    snapshot.values().filter(|r| r.condition_text.to_lowercase().contains(&needle)).collect()
}

/// District names containing `term`, ignoring case.
pub fn search_districts<'a>(districts: &'a [String], term: &str) -> Vec<&'a str> {
    let term = term.to_lowercase();
    districts.iter().filter(|d| d.to_lowercase().contains(&term)).map(String::as_str).collect()
}

/// The `n` records with the highest pressure, highest first.
pub fn top_pressure(snapshot: &Snapshot, n: usize) -> Vec<&WeatherRecord> {
    let mut records: Vec<&WeatherRecord> = snapshot.values().collect();
    records.sort_by(|a, b| b.pressure_mb.total_cmp(&a.pressure_mb));
    records.truncate(n);
    records
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UvBand {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvBand {
    pub const ALL: [UvBand; 5] =
        [UvBand::Low, UvBand::Moderate, UvBand::High, UvBand::VeryHigh, UvBand::Extreme];

    /// Right-inclusive bands: (..3], (3, 6], (6, 8], (8, 11], (11, ..).
    pub fn of(uv: f64) -> Self {
        match uv {
            v if v <= 3.0 => UvBand::Low,
            v if v <= 6.0 => UvBand::Moderate,
            v if v <= 8.0 => UvBand::High,
            v if v <= 11.0 => UvBand::VeryHigh,
            _ => UvBand::Extreme,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UvBand::Low => "Low (0-3)",
            UvBand::Moderate => "Moderate (3-6)",
            UvBand::High => "High (6-8)",
            UvBand::VeryHigh => "Very high (8-11)",
            UvBand::Extreme => "Extreme (>11)",
        }
    }
}

/// Count of districts per UV band, in band order, including empty bands.
pub fn uv_distribution(snapshot: &Snapshot) -> Vec<(UvBand, usize)> {
    UvBand::ALL
        .iter()
        .map(|band| (*band, snapshot.values().filter(|r| UvBand::of(r.uv_index) == *band).count()))
        .collect()
}
