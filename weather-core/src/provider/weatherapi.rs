use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{config::ApiConfig, model::WeatherRecord, model::timestamp, registry::DistrictQuery};

use super::{FetchError, WeatherFetcher};

/// Client for the WeatherAPI.com `current.json` endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiClient {
    pub fn new(api_key: String, settings: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build HTTP client for WeatherAPI.com")?;

        Ok(Self { api_key, base_url: settings.base_url.clone(), http })
    }

    async fn fetch_current(&self, district: &DistrictQuery) -> Result<WeatherRecord, FetchError> {
        let query = district.query();
        debug!(district = %district.name, %query, "requesting current conditions");

        let res = self
            .http
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("q", query.as_str()), ("aqi", "no")])
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::from_transport)?;

        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), body: truncate_body(&body) });
        }

        parse_current(&district.name, &body)
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: f64,
    wind_kph: f64,
    wind_dir: String,
    condition: WaCondition,
    vis_km: f64,
    pressure_mb: f64,
    uv: f64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    last_updated: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

/// Map a `current.json` body onto a record for `district`.
pub fn parse_current(district: &str, body: &str) -> Result<WeatherRecord, FetchError> {
    let parsed: WaResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let current = parsed.current;

    Ok(WeatherRecord {
        location_name: parsed.location.name,
        district: district.to_string(),
        temperature_c: current.temp_c,
        feels_like_c: current.feelslike_c,
        humidity_pct: current.humidity.round() as u8,
        wind_speed_kph: current.wind_kph,
        wind_direction: current.wind_dir,
        condition_text: current.condition.text,
        visibility_km: current.vis_km,
        pressure_mb: current.pressure_mb,
        uv_index: current.uv,
        last_updated: current.last_updated,
    })
}

#[async_trait]
impl WeatherFetcher for WeatherApiClient {
    async fn fetch(&self, district: &DistrictQuery) -> Result<WeatherRecord, FetchError> {
        let result = self.fetch_current(district).await;

        match &result {
            Err(e) if e.is_parse() => {
                warn!(district = %district.name, error = %e, "Error parsing weather data")
            }
            Err(e) => warn!(district = %district.name, error = %e, "Error fetching weather data"),
            Ok(_) => {}
        }

        result
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn sample_body() -> serde_json::Value {
        json!({
            "location": { "name": "Surabaya", "region": "East Java", "country": "Indonesia" },
            "current": {
                "last_updated": "2024-06-01 14:30",
                "temp_c": 30.5,
                "feelslike_c": 34.1,
                "humidity": 70,
                "wind_kph": 13.0,
                "wind_dir": "ESE",
                "condition": { "text": "Partly cloudy", "code": 1003 },
                "vis_km": 10.0,
                "pressure_mb": 1009.0,
                "uv": 7.0
            }
        })
    }

    fn client_for(server: &MockServer, timeout_secs: u64) -> WeatherApiClient {
        let settings = ApiConfig {
            base_url: server.url("/v1/current.json"),
            timeout_secs,
            ..ApiConfig::default()
        };
        WeatherApiClient::new("KEY".to_string(), &settings).expect("client builds")
    }

    fn surabaya() -> DistrictQuery {
        DistrictQuery::new("Surabaya", ["Surabaya", "East Java", "Indonesia"])
    }

    #[tokio::test]
    async fn fetch_sends_key_query_and_aqi_flag() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/current.json")
                    .query_param("key", "KEY")
                    .query_param("q", "Surabaya, East Java, Indonesia")
                    .query_param("aqi", "no");
                then.status(200).header("content-type", "application/json").json_body(sample_body());
            })
            .await;

        let record = client_for(&server, 10).fetch(&surabaya()).await.expect("record");

        mock.assert_async().await;
        assert_eq!(record.district, "Surabaya");
        assert_eq!(record.location_name, "Surabaya");
        assert_eq!(record.temperature_c, 30.5);
        assert_eq!(record.humidity_pct, 70);
        assert_eq!(record.wind_direction, "ESE");
        assert_eq!(record.condition_text, "Partly cloudy");
        assert_eq!(record.uv_index, 7.0);
        assert_eq!(record.last_updated, timestamp::parse("2024-06-01 14:30").unwrap());
    }

    #[tokio::test]
    async fn non_success_status_is_a_status_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/current.json");
                then.status(401).body(r#"{"error":{"code":2006,"message":"API key is invalid."}}"#);
            })
            .await;

        let err = client_for(&server, 10).fetch(&surabaya()).await.unwrap_err();

        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("API key is invalid"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_fields_are_a_parse_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/current.json");
                then.status(200).json_body(json!({ "location": { "name": "Surabaya" } }));
            })
            .await;

        let err = client_for(&server, 10).fetch(&surabaya()).await.unwrap_err();
        assert!(err.is_parse(), "expected parse error, got {err:?}");
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/current.json");
                then.status(200).json_body(sample_body()).delay(Duration::from_secs(3));
            })
            .await;

        let err = client_for(&server, 1).fetch(&surabaya()).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)), "expected timeout, got {err:?}");
    }

    #[test]
    fn fractional_humidity_is_rounded() {
        let mut body = sample_body();
        body["current"]["humidity"] = json!(64.6);

        let record = parse_current("Surabaya", &body.to_string()).expect("parses");
        assert_eq!(record.humidity_pct, 65);
    }

    #[test]
    fn bad_timestamp_is_a_parse_error() {
        let mut body = sample_body();
        body["current"]["last_updated"] = json!("soon");

        let err = parse_current("Surabaya", &body.to_string()).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn truncate_body_limits_length() {
        let long = "x".repeat(500);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_body("short"), "short");
    }
}
