//! Data models for `TripSky`
//!
//! - Location: coordinate pairs and great-circle helpers
//! - Route: driving plans
//! - District: provinces and route segments
//! - Weather: QWeather records and disaster warnings

pub mod district;
pub mod location;
pub mod route;
pub mod weather;

pub use district::{ProvinceInfo, ProvinceSegment, Ring};
pub use location::LngLat;
pub use route::{DrivingRoute, DrivingStep, PlanResult};
pub use weather::{
    CityLocation, DisasterWarning, QWeatherDailyForecast, QWeatherHourlyForecast, QWeatherInfo,
    QWeatherNow,
};
