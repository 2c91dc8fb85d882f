//! Core library for the `jatim-weather` CLI.
//!
//! This crate defines:
//! - The district registry and the weatherapi.com fetch client
//! - The bounded concurrent aggregation round
//! - The snapshot store with CSV export
//! - Statistics and chart rendering over a snapshot
//! - Configuration & credentials handling
//!
//! It is used by `jatim-weather-cli`, but can also be reused by other binaries or services.

pub mod aggregator;
pub mod chart;
pub mod config;
pub mod export;
pub mod model;
pub mod provider;
pub mod registry;
pub mod stats;
pub mod store;

pub use aggregator::{DistrictStatus, Progress, Round, fetch_all, fetch_round};
pub use config::{ApiConfig, Config, FileConfig};
pub use model::WeatherRecord;
pub use provider::{FetchError, WeatherFetcher, fetcher_from_config};
pub use registry::{DistrictQuery, Registry};
pub use store::{Snapshot, SnapshotStore};
