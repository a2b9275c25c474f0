use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, instrument};

use crate::{
    config::ProviderConfig,
    model::{Coordinates, RawPayload},
};

use super::{FetchError, ForecastFetcher};

pub const DEFAULT_BASE_URL: &str = "https://opendata-download-metfcst.smhi.se/api";
pub const DEFAULT_PRODUCT: &str = "snow1g";

/// Point-forecast client for the SMHI Open Data meteorological API.
#[derive(Debug, Clone)]
pub struct SmhiFetcher {
    http: Client,
    base_url: String,
    product: String,
}

impl SmhiFetcher {
    /// The client's own timeout and TLS settings apply to every request.
    pub fn new(http: Client, base_url: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            product: product.into(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client for SMHI")?;

        Ok(Self::new(http, config.base_url.clone(), config.product.clone()))
    }

    pub fn forecast_url(&self, coordinates: Coordinates) -> String {
        forecast_url(&self.base_url, &self.product, coordinates)
    }
}

/// `<base>/category/<product>/version/1/geotype/point/lon/<lon>/lat/<lat>/data.json`
/// with both coordinates printed to 6 decimals.
pub fn forecast_url(base_url: &str, product: &str, coordinates: Coordinates) -> String {
    format!(
        "{}/category/{}/version/1/geotype/point/lon/{:.6}/lat/{:.6}/data.json",
        base_url.trim_end_matches('/'),
        product,
        coordinates.longitude,
        coordinates.latitude,
    )
}

#[async_trait]
impl ForecastFetcher for SmhiFetcher {
    #[instrument(skip(self), fields(lat = %coordinates.latitude, lon = %coordinates.longitude))]
    async fn fetch(&self, coordinates: Coordinates) -> Result<RawPayload, FetchError> {
        let url = self.forecast_url(coordinates);
        debug!(url = %url, "Fetching SMHI point forecast");

        let res = self.http.get(&url).send().await.map_err(|e| {
            error!(error = %e, "SMHI connection error");
            FetchError::Connect(e)
        })?;

        let status = res.status();
        debug!(%status, "SMHI responded");

        let body = res.text().await.map_err(FetchError::Connect)?;

        if !status.is_success() {
            error!(%status, "SMHI API error");
            return Err(FetchError::Upstream {
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "SMHI response is not a forecast document");
            FetchError::Decode(e)
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
