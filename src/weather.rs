//! QWeather client
//!
//! Every weather query first resolves the coordinates to a QWeather location
//! id through the geo lookup. The `fetch_*` methods degrade to empty results
//! and log the cause; the other methods propagate errors.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};

use crate::config::QWeatherConfig;
use crate::models::{CityLocation, QWeatherDailyForecast, QWeatherHourlyForecast, QWeatherInfo, QWeatherNow};
use crate::{Result, TripSkyError};

const USER_AGENT: &str = concat!("TripSky/", env!("CARGO_PKG_VERSION"));

/// QWeather success code
pub(crate) const CODE_OK: &str = "200";

/// `"{lon:.2},{lat:.2}"`, the coordinate form QWeather accepts
#[must_use]
pub fn location_param(lon: f64, lat: f64) -> String {
    format!("{lon:.2},{lat:.2}")
}

/// Build the HTTP client shared by the QWeather-backed clients
pub(crate) fn build_client(config: &QWeatherConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(USER_AGENT)
        .build()?)
}

pub(crate) fn configured_key(config: &QWeatherConfig) -> Option<String> {
    config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    code: String,
    #[serde(default)]
    location: Vec<CityLocation>,
}

#[derive(Debug, Deserialize)]
struct NowResponse {
    code: String,
    now: Option<QWeatherNow>,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    code: String,
    daily: Option<Vec<QWeatherDailyForecast>>,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    code: String,
    hourly: Option<Vec<QWeatherHourlyForecast>>,
}

/// QWeather API client
#[derive(Debug, Clone)]
pub struct QWeatherClient {
    client: Client,
    api_key: Option<String>,
    api_host: String,
}

impl QWeatherClient {
    pub fn new(config: &QWeatherConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            api_key: configured_key(config),
            api_host: config.api_host.trim_end_matches('/').to_string(),
        })
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| TripSkyError::config("QWeather API key is not configured"))
    }

    async fn send(&self, endpoint: &str, location: &str) -> Result<Response> {
        debug!(endpoint, location, "Calling QWeather");
        Ok(self
            .client
            .get(format!("{}{}", self.api_host, endpoint))
            .query(&[("location", location), ("key", self.key()?)])
            .send()
            .await?)
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| TripSkyError::parse(format!("Failed to parse QWeather {endpoint} response: {e}")))
    }

    /// Nearest QWeather city for the coordinates, `None` when QWeather has
    /// no match.
    #[instrument(skip(self))]
    pub async fn city_lookup(&self, lon: f64, lat: f64) -> Result<Option<CityLocation>> {
        const ENDPOINT: &str = "/geo/v2/city/lookup";

        let response = self.send(ENDPOINT, &location_param(lon, lat)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TripSkyError::api(format!(
                "Geo API request failed with status {status}"
            )));
        }

        let body: LookupResponse = Self::decode(ENDPOINT, response).await?;
        if body.code != CODE_OK || body.location.is_empty() {
            warn!(code = %body.code, "QWeather geo lookup returned no location");
            return Ok(None);
        }

        let city = body.location.into_iter().next();
        if let Some(city) = &city {
            debug!(id = %city.id, province = %city.adm1, city = %city.name, "Resolved QWeather location");
        }
        Ok(city)
    }

    /// Current conditions plus the 3-day forecast; the two are fetched
    /// concurrently once the location id is known.
    #[instrument(skip(self))]
    pub async fn weather_by_location(&self, lon: f64, lat: f64) -> Result<Option<QWeatherInfo>> {
        let Some(city) = self.city_lookup(lon, lat).await? else {
            return Ok(None);
        };

        let (now_res, daily_res) = tokio::join!(
            self.send("/v7/weather/now", &city.id),
            self.send("/v7/weather/3d", &city.id),
        );
        let (now_res, daily_res) = (now_res?, daily_res?);

        if !now_res.status().is_success() || !daily_res.status().is_success() {
            error!(
                now_status = %now_res.status(),
                daily_status = %daily_res.status(),
                "QWeather weather request failed"
            );
            return Ok(None);
        }

        let now_body: NowResponse = Self::decode("/v7/weather/now", now_res).await?;
        let daily_body: DailyResponse = Self::decode("/v7/weather/3d", daily_res).await?;

        let (Some(mut now), Some(daily)) = (now_body.now, daily_body.daily) else {
            warn!(now_code = %now_body.code, daily_code = %daily_body.code, "QWeather returned no weather data");
            return Ok(None);
        };
        if now_body.code != CODE_OK || daily_body.code != CODE_OK {
            warn!(now_code = %now_body.code, daily_code = %daily_body.code, "QWeather returned an error code");
            return Ok(None);
        }

        now.province = Some(city.adm1);
        now.city = Some(city.name);

        info!(days = daily.len(), "Fetched current weather and forecast");
        Ok(Some(QWeatherInfo { now, daily }))
    }

    /// Hourly forecast for the next 24 hours.
    #[instrument(skip(self))]
    pub async fn hourly_24h(&self, lon: f64, lat: f64) -> Result<Vec<QWeatherHourlyForecast>> {
        const ENDPOINT: &str = "/v7/weather/24h";

        let Some(city) = self.city_lookup(lon, lat).await? else {
            return Ok(Vec::new());
        };

        let response = self.send(ENDPOINT, &city.id).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TripSkyError::api(format!(
                "Hourly weather API request failed with status {status}"
            )));
        }

        let body: HourlyResponse = Self::decode(ENDPOINT, response).await?;
        match body.hourly {
            Some(hourly) if body.code == CODE_OK => Ok(hourly),
            _ => Ok(Vec::new()),
        }
    }

    /// Like [`Self::weather_by_location`], but any failure is logged and
    /// yields `None`.
    pub async fn fetch_weather_by_location(&self, lon: f64, lat: f64) -> Option<QWeatherInfo> {
        if self.api_key.is_none() {
            error!("QWeather API key is not configured");
            return None;
        }
        match self.weather_by_location(lon, lat).await {
            Ok(info) => info,
            Err(e) => {
                error!(lon, lat, error = %e, "Weather fetch failed");
                None
            }
        }
    }

    /// Like [`Self::hourly_24h`], but any failure yields an empty list.
    pub async fn fetch_hourly_24h(&self, lon: f64, lat: f64) -> Vec<QWeatherHourlyForecast> {
        if self.api_key.is_none() {
            return Vec::new();
        }
        self.hourly_24h(lon, lat).await.unwrap_or_else(|e| {
            error!(lon, lat, error = %e, "Hourly weather fetch failed");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_param_rounds_to_two_decimals() {
        assert_eq!(location_param(116.4074, 39.9042), "116.41,39.90");
        assert_eq!(location_param(-0.001, 51.5), "-0.00,51.50");
    }

    #[test]
    fn test_blank_key_is_unconfigured() {
        let config = QWeatherConfig {
            api_key: Some("  ".to_string()),
            ..QWeatherConfig::default()
        };
        let client = QWeatherClient::new(&config).unwrap();
        assert!(client.api_key.is_none());
        assert!(matches!(client.key(), Err(TripSkyError::Config { .. })));
    }

    #[tokio::test]
    async fn test_degrading_calls_without_key() {
        let client = QWeatherClient::new(&QWeatherConfig::default()).unwrap();
        assert!(client.fetch_weather_by_location(116.4, 39.9).await.is_none());
        assert!(client.fetch_hourly_24h(116.4, 39.9).await.is_empty());
    }
}
