//! Driving route results

use serde::{Deserialize, Serialize};

use super::LngLat;

/// One maneuver of a driving route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivingStep {
    pub instruction: String,
    /// Step length in meters
    pub distance: f64,
    pub path: Vec<LngLat>,
}

/// A complete driving route alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivingRoute {
    /// Length in meters
    pub distance: f64,
    /// Travel time in seconds
    pub duration: f64,
    pub steps: Vec<DrivingStep>,
}

impl DrivingRoute {
    /// Every step's points concatenated in travel order
    #[must_use]
    pub fn path(&self) -> Vec<LngLat> {
        self.steps
            .iter()
            .flat_map(|step| step.path.iter().copied())
            .collect()
    }
}

/// Result of a driving plan: the first route flattened, plus all alternatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub path: Vec<LngLat>,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    pub routes: Vec<DrivingRoute>,
}

impl PlanResult {
    /// Build the result from the routes AMap returned; `None` when empty.
    #[must_use]
    pub fn from_routes(routes: Vec<DrivingRoute>) -> Option<Self> {
        let first = routes.first()?;
        Some(Self {
            path: first.path(),
            distance: first.distance,
            duration: first.duration,
            routes,
        })
    }
}
