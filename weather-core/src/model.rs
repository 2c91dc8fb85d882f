use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One successfully fetched observation for a district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub location_name: String,
    pub district: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_kph: f64,
    pub wind_direction: String,
    pub condition_text: String,
    pub visibility_km: f64,
    pub pressure_mb: f64,
    pub uv_index: f64,
    pub last_updated: NaiveDateTime,
}

/// Timestamp formats used by the weather API and the CSV export.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, de::Error};

    pub const API_FORMAT: &str = "%Y-%m-%d %H:%M";
    pub const EXPORT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(raw: &str) -> chrono::ParseResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(raw, API_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, EXPORT_FORMAT))
    }

    /// Deserialize `2024-06-01 14:30` as sent in `current.last_updated`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| D::Error::custom(format!("invalid timestamp '{raw}': {e}")))
    }
}

#[cfg(test)]
pub(crate) fn sample_record(district: &str, temperature_c: f64, humidity_pct: u8) -> WeatherRecord {
    WeatherRecord {
        location_name: district.to_string(),
        district: district.to_string(),
        temperature_c,
        feels_like_c: temperature_c + 2.0,
        humidity_pct,
        wind_speed_kph: 10.0,
        wind_direction: "SE".to_string(),
        condition_text: "Partly cloudy".to_string(),
        visibility_km: 10.0,
        pressure_mb: 1010.0,
        uv_index: 5.0,
        last_updated: timestamp::parse("2024-06-01 14:30").expect("valid timestamp"),
    }
}
