use serde::Deserialize;
use tracing::{debug, instrument};

use super::{AmapStatus, AmapTransport};
use crate::location_resolver::LocationInput;
use crate::models::LngLat;
use crate::{Result, TripSkyError};

/// Geocoding handle (`/v3/geocode/geo`)
#[derive(Debug)]
pub struct Geocoder {
    transport: AmapTransport,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(flatten)]
    status: AmapStatus,
    #[serde(default)]
    geocodes: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    #[serde(default, deserialize_with = "super::lenient_string")]
    location: Option<String>,
}

impl Geocoder {
    pub(crate) fn new(transport: AmapTransport) -> Self {
        Self { transport }
    }

    /// Resolve an address, or pass a `"lng,lat"` string straight through.
    #[instrument(skip(self))]
    pub async fn geocode(&self, address_or_coord: &str) -> Result<LngLat> {
        match LocationInput::parse(address_or_coord) {
            LocationInput::Coordinates(point) => Ok(point),
            LocationInput::Address(address) => self.lookup(&address).await,
        }
    }

    /// Geocode `address` through the web service, without the coordinate
    /// passthrough.
    pub async fn lookup(&self, address: &str) -> Result<LngLat> {
        let failed = || TripSkyError::api(format!("Geocoding failed for address: {address}"));

        let response: GeocodeResponse = self
            .transport
            .get("/v3/geocode/geo", &[("address", address)])
            .await?;

        if !response.status.is_ok() {
            debug!(info = ?response.status.info, "Geocoder rejected the address");
            return Err(failed());
        }

        let point = response
            .geocodes
            .first()
            .and_then(|g| g.location.as_deref())
            .and_then(LngLat::parse_pair)
            .ok_or_else(failed)?;

        debug!(%point, "Geocoded address");
        Ok(point)
    }
}
