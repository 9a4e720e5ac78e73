//! Location Resolution Module
//!
//! Turns user-supplied text (a `"lng,lat"` pair or a free-form address) into
//! coordinates, geocoding only when needed.

use crate::amap::AmapSdk;
use crate::models::LngLat;
use crate::Result;
use tracing::debug;

/// Raw location text, classified
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Already a coordinate pair
    Coordinates(LngLat),
    /// Needs geocoding
    Address(String),
}

impl LocationInput {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match LngLat::parse_pair(text) {
            Some(point) => Self::Coordinates(point),
            None => Self::Address(text.to_string()),
        }
    }
}

/// Service for resolving location inputs
pub struct LocationResolver;

impl LocationResolver {
    /// Resolve a location input into coordinates. Coordinate pairs are
    /// returned as-is; addresses go through the SDK's geocoder.
    pub async fn resolve(sdk: &AmapSdk, input: &str) -> Result<LngLat> {
        debug!("Resolving location input: {:?}", input);
        let point = match LocationInput::parse(input) {
            LocationInput::Coordinates(point) => point,
            LocationInput::Address(address) => sdk.geocoder().lookup(&address).await?,
        };
        debug!("Resolved {} to ({:.6}, {:.6})", input, point.lng, point.lat);
        Ok(point)
    }

    /// Resolve route endpoints concurrently
    pub async fn resolve_endpoints(
        sdk: &AmapSdk,
        origin: &str,
        destination: &str,
    ) -> Result<(LngLat, LngLat)> {
        futures::try_join!(Self::resolve(sdk, origin), Self::resolve(sdk, destination))
    }
}
