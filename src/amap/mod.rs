//! AMap (Gaode) integration
//!
//! [`AmapSdk`] is the bootstrapped handle every AMap call goes through. It owns
//! the HTTP client and lazily creates the geocoder and driving handles, each
//! at most once. [`load_amap`] memoizes a process-wide instance.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::AmapConfig;
use crate::models::{LngLat, PlanResult};
use crate::{Result, TripSkyError};

pub mod district;
pub mod driving;
pub mod geocoder;

pub use district::{AlongRouteOptions, AmapDistrictSearch, DistrictSource, preload_all, provinces_along_route};
pub use driving::Driving;
pub use geocoder::Geocoder;

/// Plugins requested when the JS loader URL is handed to a browser front end
pub const JS_PLUGINS: [&str; 8] = [
    "AMap.Geocoder",
    "AMap.GeoJSON",
    "AMap.Driving",
    "AMap.AutoComplete",
    "AMap.DistrictSearch",
    "AMap.GeometryUtil",
    "AMap.DistrictLayer",
    "AMap.MarkerClusterer",
];

const USER_AGENT: &str = concat!("TripSky/", env!("CARGO_PKG_VERSION"));

static AMAP_INSTANCE: OnceCell<Arc<AmapSdk>> = OnceCell::const_new();

/// Bootstrap the shared AMap handle, or return the one already loaded.
///
/// Only the first successful call reads `config`. A failed bootstrap is not
/// cached.
pub async fn load_amap(config: &AmapConfig) -> Result<Arc<AmapSdk>> {
    AMAP_INSTANCE
        .get_or_try_init(|| async {
            let sdk = AmapSdk::new(config)?;
            info!("AMap SDK loaded");
            Ok::<_, TripSkyError>(Arc::new(sdk))
        })
        .await
        .map(Arc::clone)
}

/// `window._AMapSecurityConfig` equivalent for the JS loader
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    pub security_js_code: String,
}

/// Shared request plumbing for the AMap REST web service
#[derive(Debug, Clone)]
pub(crate) struct AmapTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AmapTransport {
    /// GET `endpoint` with `params` plus the API key and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(endpoint, ?params, "Calling AMap web service");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TripSkyError::api(format!(
                "AMap {endpoint} returned HTTP {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            TripSkyError::parse(format!("Failed to parse AMap {endpoint} response: {e}"))
        })
    }
}

/// Bootstrapped AMap handle
#[derive(Debug)]
pub struct AmapSdk {
    transport: AmapTransport,
    js_api_url: String,
    version: String,
    security_code: Option<String>,
    geocoder: OnceLock<Geocoder>,
    driving: OnceLock<Driving>,
}

impl AmapSdk {
    /// Create a handle from configuration. Fails without a usable API key.
    pub fn new(config: &AmapConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TripSkyError::config("AMap API key is not configured"))?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()?;

        let security_code = config
            .security_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Self {
            transport: AmapTransport {
                client,
                base_url: config.rest_base_url.trim_end_matches('/').to_string(),
                api_key,
            },
            js_api_url: config.js_api_url.clone(),
            version: config.version.clone(),
            security_code,
            geocoder: OnceLock::new(),
            driving: OnceLock::new(),
        })
    }

    /// JS loader URL with the plugin set the map front end needs
    #[must_use]
    pub fn script_url(&self) -> String {
        format!(
            "{}?v={}&key={}&plugin={}",
            self.js_api_url,
            self.version,
            self.transport.api_key,
            JS_PLUGINS.join(",")
        )
    }

    #[must_use]
    pub fn security_config(&self) -> Option<SecurityConfig> {
        self.security_code.as_ref().map(|code| SecurityConfig {
            security_js_code: code.clone(),
        })
    }

    /// Geocoder handle, created on first use
    pub fn geocoder(&self) -> &Geocoder {
        self.geocoder
            .get_or_init(|| Geocoder::new(self.transport.clone()))
    }

    /// Driving handle, created on first use
    pub fn driving(&self) -> &Driving {
        self.driving
            .get_or_init(|| Driving::new(self.transport.clone()))
    }

    /// A fresh district search
    #[must_use]
    pub fn district_search(&self) -> AmapDistrictSearch {
        AmapDistrictSearch::new(self.transport.clone())
    }

    /// Address or `"lng,lat"` text to coordinates
    pub async fn geocode(&self, address_or_coord: &str) -> Result<LngLat> {
        self.geocoder().geocode(address_or_coord).await
    }

    pub async fn plan_driving(&self, origin: LngLat, dest: LngLat) -> Result<PlanResult> {
        self.driving().search(origin, dest).await
    }
}

/// Status envelope every AMap web service response carries
#[derive(Debug, Deserialize)]
pub(crate) struct AmapStatus {
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub info: Option<String>,
}

impl AmapStatus {
    pub(crate) fn is_ok(&self) -> bool {
        self.status == "1"
    }
}

/// AMap encodes numbers as strings and empty values as `[]`.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or_default(),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}
