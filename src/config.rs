//! Configuration management for `TripSky`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TripSkyError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TripSkyConfig {
    /// AMap web service configuration
    pub amap: AmapConfig,
    /// QWeather configuration
    pub qweather: QWeatherConfig,
    /// Route sampling and province detection settings
    pub route: RouteConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// AMap (Gaode) configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmapConfig {
    /// Web service / JS API key
    pub api_key: Option<String>,
    /// Security code handed to the JS loader
    pub security_code: Option<String>,
    /// Base URL of the REST web service
    pub rest_base_url: String,
    /// JS API loader URL
    pub js_api_url: String,
    /// JS API version
    pub version: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// QWeather configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QWeatherConfig {
    /// QWeather API key
    pub api_key: Option<String>,
    /// Host serving the geo lookup and weather endpoints
    pub api_host: String,
    /// Host serving the warning endpoint
    pub warning_host: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// Route processing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Arc-length distance between route samples, in meters
    pub sample_step_meters: f64,
    /// Upper bound on samples tested during district detection
    pub max_route_samples: usize,
    /// Concurrent boundary downloads during preload
    pub preload_concurrency: usize,
    /// Feature property holding the province name
    pub province_name_property: String,
    /// Path or URL of the province GeoJSON asset
    pub provinces_geojson: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_amap_rest_base_url() -> String {
    "https://restapi.amap.com".to_string()
}

fn default_amap_js_api_url() -> String {
    "https://webapi.amap.com/maps".to_string()
}

fn default_amap_version() -> String {
    "2.0".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_qweather_api_host() -> String {
    "https://devapi.qweather.com".to_string()
}

fn default_qweather_warning_host() -> String {
    "https://devapi.qweather.com".to_string()
}

fn default_sample_step() -> f64 {
    50_000.0
}

fn default_max_route_samples() -> usize {
    200
}

fn default_preload_concurrency() -> usize {
    6
}

fn default_province_name_property() -> String {
    "name".to_string()
}

fn default_provinces_geojson() -> String {
    "provinces.geojson".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for AmapConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            security_code: None,
            rest_base_url: default_amap_rest_base_url(),
            js_api_url: default_amap_js_api_url(),
            version: default_amap_version(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for QWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_host: default_qweather_api_host(),
            warning_host: default_qweather_warning_host(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            sample_step_meters: default_sample_step(),
            max_route_samples: default_max_route_samples(),
            preload_concurrency: default_preload_concurrency(),
            province_name_property: default_province_name_property(),
            provinces_geojson: default_provinces_geojson(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl TripSkyConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TRIPSKY_AMAP__API_KEY -> amap.api_key
        builder = builder.add_source(
            Environment::with_prefix("TRIPSKY")
                .prefix_separator("_")
                .separator("__"),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TripSkyConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tripsky").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.amap.rest_base_url.is_empty() {
            self.amap.rest_base_url = default_amap_rest_base_url();
        }
        if self.amap.js_api_url.is_empty() {
            self.amap.js_api_url = default_amap_js_api_url();
        }
        if self.amap.version.is_empty() {
            self.amap.version = default_amap_version();
        }
        if self.amap.timeout_seconds == 0 {
            self.amap.timeout_seconds = default_timeout();
        }
        if self.qweather.api_host.is_empty() {
            self.qweather.api_host = default_qweather_api_host();
        }
        if self.qweather.warning_host.is_empty() {
            self.qweather.warning_host = default_qweather_warning_host();
        }
        if self.qweather.timeout_seconds == 0 {
            self.qweather.timeout_seconds = default_timeout();
        }
        if self.route.max_route_samples == 0 {
            self.route.max_route_samples = default_max_route_samples();
        }
        if self.route.preload_concurrency == 0 {
            self.route.preload_concurrency = default_preload_concurrency();
        }
        if self.route.province_name_property.is_empty() {
            self.route.province_name_property = default_province_name_property();
        }
        if self.route.provinces_geojson.is_empty() {
            self.route.provinces_geojson = default_provinces_geojson();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        validate_key("AMap", self.amap.api_key.as_deref())?;
        validate_key("QWeather", self.qweather.api_key.as_deref())?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.amap.timeout_seconds > 300 || self.qweather.timeout_seconds > 300 {
            return Err(TripSkyError::config("API timeout cannot exceed 300 seconds").into());
        }

        if !self.route.sample_step_meters.is_finite() || self.route.sample_step_meters < 100.0 {
            return Err(TripSkyError::config("Route sample step must be at least 100 meters").into());
        }

        if self.route.max_route_samples > 10_000 {
            return Err(TripSkyError::config("Route sample limit cannot exceed 10000").into());
        }

        if self.route.preload_concurrency > 64 {
            return Err(TripSkyError::config("Preload concurrency cannot exceed 64").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TripSkyError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TripSkyError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("AMap REST base URL", &self.amap.rest_base_url),
            ("AMap JS API URL", &self.amap.js_api_url),
            ("QWeather API host", &self.qweather.api_host),
            ("QWeather warning host", &self.qweather.warning_host),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TripSkyError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn validate_key(service: &str, key: Option<&str>) -> Result<()> {
    let Some(key) = key else {
        return Ok(());
    };

    if key.trim().is_empty() {
        return Err(TripSkyError::config(format!(
            "{service} API key cannot be empty if provided. Either remove it or provide a valid key."
        ))
        .into());
    }

    if key.len() < 8 {
        return Err(TripSkyError::config(format!(
            "{service} API key appears to be invalid (too short). Please check your API key."
        ))
        .into());
    }

    if key.len() > 100 {
        return Err(TripSkyError::config(format!(
            "{service} API key appears to be invalid (too long). Please check your API key."
        ))
        .into());
    }

    Ok(())
}
