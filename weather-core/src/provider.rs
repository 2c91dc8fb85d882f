use crate::{
    Config, WeatherRecord, provider::weatherapi::WeatherApiClient, registry::DistrictQuery,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

pub mod weatherapi;

/// Why a single district could not be fetched.
///
/// None of these abort an aggregation round; the district is simply absent
/// from the resulting snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, FetchError::Parse(_))
    }
}

#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    /// Fetch current conditions for one district.
    async fn fetch(&self, district: &DistrictQuery) -> Result<WeatherRecord, FetchError>;
}

/// Construct the weatherapi.com fetcher from config.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherFetcher>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for WeatherAPI.com.\n\
                 Hint: run `jatim-weather configure` or pass --api-key."
        )
    })?;

    let client = WeatherApiClient::new(api_key.to_owned(), &config.api)?;
    Ok(Arc::new(client))
}
