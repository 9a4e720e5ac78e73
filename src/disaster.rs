use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, instrument, warn};

use crate::config::QWeatherConfig;
use crate::models::DisasterWarning;
use crate::weather::{CODE_OK, build_client, configured_key, location_param};
use crate::{Result, TripSkyError};

/// Returned when the subscription does not include the warning API
const CODE_FORBIDDEN: &str = "403";

#[derive(Debug, Deserialize)]
struct WarningResponse {
    code: String,
    #[serde(default)]
    warning: Vec<WarningEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WarningEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    type_name: String,
    #[serde(default)]
    text: String,
}

impl From<WarningEntry> for DisasterWarning {
    fn from(entry: WarningEntry) -> Self {
        Self {
            title: entry.title,
            level: entry.severity,
            kind: entry.type_name,
            detail: entry.text,
        }
    }
}

/// Client for QWeather's active disaster warnings (`/v7/warning/now`)
#[derive(Debug, Clone)]
pub struct DisasterClient {
    client: Client,
    api_key: Option<String>,
    warning_host: String,
}

impl DisasterClient {
    pub fn new(config: &QWeatherConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            api_key: configured_key(config),
            warning_host: config.warning_host.trim_end_matches('/').to_string(),
        })
    }

    /// Active warnings around the coordinates.
    ///
    /// The body is read whatever the HTTP status; QWeather reports a missing
    /// subscription as code 403, which yields no warnings.
    #[instrument(skip(self))]
    pub async fn warnings(&self, lon: f64, lat: f64) -> Result<Vec<DisasterWarning>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| TripSkyError::config("QWeather API key is not configured"))?;
        let location = location_param(lon, lat);

        debug!(%location, "Requesting disaster warnings");
        let body: WarningResponse = self
            .client
            .get(format!("{}/v7/warning/now", self.warning_host))
            .query(&[("location", location.as_str()), ("key", key)])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| TripSkyError::parse(format!("Failed to parse warning response: {e}")))?;

        if body.code == CODE_FORBIDDEN {
            warn!("Disaster warning API not permitted; check that the QWeather plan includes warnings");
            return Ok(Vec::new());
        }
        if body.code != CODE_OK {
            debug!(code = %body.code, "No disaster warnings");
            return Ok(Vec::new());
        }

        Ok(body.warning.into_iter().map(DisasterWarning::from).collect())
    }

    /// Like [`Self::warnings`], but failures are logged and yield no warnings.
    pub async fn fetch_disaster_warning(&self, lon: f64, lat: f64) -> Vec<DisasterWarning> {
        if self.api_key.is_none() {
            error!("QWeather API key is not configured");
            return Vec::new();
        }
        self.warnings(lon, lat).await.unwrap_or_else(|e| {
            error!(lon, lat, error = %e, "Disaster warning fetch failed");
            Vec::new()
        })
    }
}
