//! `TripSky` - weather and province bucketing along driving routes
//!
//! This library wraps the AMap web service (geocoding, driving routes,
//! district boundaries) and the QWeather API (forecasts, disaster warnings),
//! and adds the geometry needed to split a route by province and shade
//! provinces with a color scale.

pub mod amap;
pub mod choropleth;
pub mod config;
pub mod disaster;
pub mod error;
pub mod location_resolver;
pub mod logging;
pub mod models;
pub mod segmentation;
pub mod weather;

// Re-export core types for public API
pub use amap::{AmapSdk, DistrictSource, load_amap};
pub use choropleth::{LinearScale, make_linear_scale};
pub use config::TripSkyConfig;
pub use disaster::DisasterClient;
pub use error::TripSkyError;
pub use location_resolver::{LocationInput, LocationResolver};
pub use models::{LngLat, PlanResult, ProvinceInfo, ProvinceSegment, QWeatherInfo};
pub use segmentation::{ProvinceCollection, group_by_province, load_provinces, sample_polyline};
pub use weather::QWeatherClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TripSkyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
