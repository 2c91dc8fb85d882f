use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::Local;
use jatim_weather_core::{
    Config, FileConfig, Registry, Round, SnapshotStore, WeatherFetcher,
    chart::{self, ChartError},
    export, fetch_round, fetcher_from_config,
};
use tracing::debug;

use crate::view;

/// Everything one interactive or one-shot run works with.
pub struct Session {
    fetcher: Arc<dyn WeatherFetcher>,
    registry: Registry,
    workers: usize,
    files: FileConfig,
    store: SnapshotStore,
}

impl Session {
    pub fn new(
        fetcher: Arc<dyn WeatherFetcher>,
        registry: Registry,
        workers: usize,
        files: FileConfig,
    ) -> Self {
        Self { fetcher, registry, workers, files, store: SnapshotStore::new() }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = fetcher_from_config(config)?;
        Ok(Self::new(fetcher, config.registry(), config.api.max_workers, config.files.clone()))
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run one aggregation round and swap its records into the store.
    pub async fn refresh(&self) -> Round {
        view::print_loading(self.registry.len());
        debug!(districts = self.registry.len(), workers = self.workers, "refresh started");

        let round =
            fetch_round(Arc::clone(&self.fetcher), &self.registry, self.workers, view::print_progress)
                .await;
        self.store.replace(round.records.iter().cloned());

        view::print_round_done(&round, self.registry.len());
        round
    }

    /// Export the snapshot as CSV; `None` picks a timestamped file name.
    pub fn export_csv(&self, path: Option<PathBuf>) -> Result<Option<PathBuf>> {
        let path = path.unwrap_or_else(|| self.default_name(&self.files.csv_prefix, "csv"));
        let written = self.store.export(&path)?;
        debug!(path = %path.display(), written = written.is_some(), "csv export");
        Ok(written)
    }

    /// Render the chart PNG; `None` picks a timestamped file name.
    ///
    /// Returns `Ok(None)` without touching the file system when there is no data.
    pub fn export_chart(&self, path: Option<PathBuf>) -> Result<Option<PathBuf>> {
        let path = path.unwrap_or_else(|| self.default_name(&self.files.plot_prefix, "png"));
        match chart::render(&self.store.get_all(), &path) {
            Ok(()) => {
                debug!(path = %path.display(), "chart export");
                Ok(Some(path))
            }
            Err(ChartError::Empty) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn default_name(&self, prefix: &str, extension: &str) -> PathBuf {
        export::timestamped_file_name(prefix, extension, Local::now().naive_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jatim_weather_core::{DistrictQuery, FetchError, WeatherRecord, model::timestamp};

    /// Succeeds for every district except `Tuban`.
    #[derive(Debug)]
    struct FixedFetcher;

    #[async_trait]
    impl WeatherFetcher for FixedFetcher {
        async fn fetch(&self, district: &DistrictQuery) -> Result<WeatherRecord, FetchError> {
            if district.name == "Tuban" {
                return Err(FetchError::Network("connection refused".into()));
            }
            Ok(WeatherRecord {
                location_name: district.name.clone(),
                district: district.name.clone(),
                temperature_c: 29.5,
                feels_like_c: 33.0,
                humidity_pct: 74,
                wind_speed_kph: 11.2,
                wind_direction: "E".into(),
                condition_text: "Sunny".into(),
                visibility_km: 10.0,
                pressure_mb: 1008.0,
                uv_index: 8.0,
                last_updated: timestamp::parse("2024-06-01 14:30").expect("valid timestamp"),
            })
        }
    }

    fn session() -> Session {
        let registry = Registry::new(vec![
            DistrictQuery::new("Surabaya", ["Surabaya", "East Java", "Indonesia"]),
            DistrictQuery::new("Tuban", ["Tuban", "East Java", "Indonesia"]),
            DistrictQuery::new("Malang", ["Malang", "East Java", "Indonesia"]),
        ]);
        Session::new(Arc::new(FixedFetcher), registry, 2, FileConfig::default())
    }

    #[tokio::test]
    async fn refresh_fills_store_with_successes() {
        let session = session();
        assert!(session.store().is_empty());

        let round = session.refresh().await;

        assert_eq!(round.records.len(), 2);
        assert_eq!(session.store().districts(), vec!["Malang".to_string(), "Surabaya".to_string()]);
        assert!(session.store().get("Tuban").is_none());
    }

    #[tokio::test]
    async fn export_before_refresh_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");

        let session = session();
        assert!(session.export_csv(Some(path.clone())).unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn chart_without_data_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");

        let session = session();
        assert!(session.export_chart(Some(path.clone())).unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn exports_after_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("data.csv");
        let png = dir.path().join("chart.png");

        let session = session();
        session.refresh().await;

        assert_eq!(session.export_csv(Some(csv.clone())).unwrap(), Some(csv.clone()));
        assert_eq!(session.export_chart(Some(png.clone())).unwrap(), Some(png.clone()));
        assert!(csv.exists());
        assert!(png.exists());
    }
}
