//! QWeather payload shapes
//!
//! QWeather reports every measurement as a string; the records are passed
//! through unchanged apart from the province/city names attached to `now`.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Current conditions (`/v7/weather/now`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QWeatherNow {
    /// Temperature in Celsius
    pub temp: String,
    /// Condition text, e.g. "晴"
    pub text: String,
    pub wind_dir: String,
    pub wind_scale: String,
    /// Relative humidity in percent
    pub humidity: String,
    /// Precipitation of the last hour in mm
    pub precip: String,
    pub obs_time: String,
    /// Province (adm1) of the looked-up city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    /// Name of the looked-up city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl QWeatherNow {
    /// Temperature as a number, if QWeather sent a numeric string
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        self.temp.trim().parse().ok()
    }
}

/// One day of the 3-day forecast (`/v7/weather/3d`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QWeatherDailyForecast {
    pub fx_date: String,
    pub temp_max: String,
    pub temp_min: String,
    pub text_day: String,
    pub text_night: String,
    pub wind_dir_day: String,
    pub wind_scale_day: String,
}

impl QWeatherDailyForecast {
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.fx_date, "%Y-%m-%d").ok()
    }
}

/// One hour of the 24-hour forecast (`/v7/weather/24h`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QWeatherHourlyForecast {
    /// Forecast time, e.g. `2024-06-01T13:00+08:00`
    pub fx_time: String,
    pub temp: String,
    pub text: String,
    pub wind_scale: String,
    pub precip: String,
}

impl QWeatherHourlyForecast {
    /// Parsed forecast time. QWeather omits seconds, so RFC 3339 parsing
    /// alone is not enough.
    #[must_use]
    pub fn forecast_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_str(&self.fx_time, "%Y-%m-%dT%H:%M%:z")
            .or_else(|_| DateTime::parse_from_rfc3339(&self.fx_time))
            .ok()
    }
}

/// Current conditions plus the 3-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QWeatherInfo {
    pub now: QWeatherNow,
    pub daily: Vec<QWeatherDailyForecast>,
}

/// City returned by the geo lookup (`/geo/v2/city/lookup`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityLocation {
    /// QWeather location id
    pub id: String,
    pub name: String,
    /// First-level administrative division (province)
    #[serde(default)]
    pub adm1: String,
    #[serde(default)]
    pub adm2: String,
}

/// Active disaster warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterWarning {
    pub title: String,
    pub level: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub detail: String,
}
