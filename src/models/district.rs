//! Administrative region shapes used by district detection and segmentation

use serde::{Deserialize, Serialize};

use super::LngLat;

/// Closed boundary ring; a province may own several (islands, exclaves).
pub type Ring = Vec<LngLat>;

/// Province as listed by the district search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceInfo {
    pub name: String,
    /// Administrative division code, e.g. "110000"
    pub adcode: String,
    pub center: Option<LngLat>,
    /// Boundary rings, populated once the province was matched against a route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rings: Option<Vec<Ring>>,
}

/// Contiguous stretch of a route inside one province
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceSegment {
    pub province: String,
    /// Route samples inside the province, in travel order
    pub path: Vec<LngLat>,
    /// Middle sample, used as the label anchor
    pub mid: LngLat,
}
