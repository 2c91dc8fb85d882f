use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{model::WeatherRecord, model::timestamp, store::Snapshot};

pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[cfg(unix)]
const DEFAULT_FILE_MODE: u32 = 0o644;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export file '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize CSV row")]
    Csv(#[from] csv::Error),
}

/// `<prefix>_<YYYYMMDD_HHMMSS>.<extension>`
pub fn timestamped_file_name(prefix: &str, extension: &str, at: NaiveDateTime) -> PathBuf {
    PathBuf::from(format!("{prefix}_{}.{extension}", at.format(FILE_TIMESTAMP_FORMAT)))
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    district: &'a str,
    location: &'a str,
    temperature: f64,
    feels_like: f64,
    humidity: u8,
    wind_speed: f64,
    wind_direction: &'a str,
    condition: &'a str,
    visibility: f64,
    pressure: f64,
    uv_index: f64,
    last_updated: String,
}

impl<'a> From<&'a WeatherRecord> for CsvRow<'a> {
    fn from(r: &'a WeatherRecord) -> Self {
        Self {
            district: &r.district,
            location: &r.location_name,
            temperature: r.temperature_c,
            feels_like: r.feels_like_c,
            humidity: r.humidity_pct,
            wind_speed: r.wind_speed_kph,
            wind_direction: &r.wind_direction,
            condition: &r.condition_text,
            visibility: r.visibility_km,
            pressure: r.pressure_mb,
            uv_index: r.uv_index,
            last_updated: r.last_updated.format(timestamp::EXPORT_FORMAT).to_string(),
        }
    }
}

/// Write one UTF-8 CSV row per district.
///
/// The file is written next to `path` under a temporary name and renamed into
/// place, so a failed export never leaves a truncated file behind.
pub fn write_csv(snapshot: &Snapshot, path: &Path) -> Result<(), ExportError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source| ExportError::Io { path: path.to_path_buf(), source };

    let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    let mut writer = csv::Writer::from_writer(tmp);
    for record in snapshot.values() {
        writer.serialize(CsvRow::from(record))?;
    }

    let tmp = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    publish_permissions(&tmp, path).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

// Temp files are created owner-only; give the export the mode a plain write
// would, or keep the mode of the file being replaced.
#[cfg(unix)]
fn publish_permissions(tmp: &NamedTempFile, target: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = match std::fs::metadata(target) {
        Ok(existing) => existing.permissions(),
        Err(_) => std::fs::Permissions::from_mode(DEFAULT_FILE_MODE),
    };
    tmp.as_file().set_permissions(permissions)
}

#[cfg(not(unix))]
fn publish_permissions(_tmp: &NamedTempFile, _target: &Path) -> std::io::Result<()> {
    Ok(())
}
