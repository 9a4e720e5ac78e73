use serde::Deserialize;
use tracing::{info, instrument};

use super::{AmapStatus, AmapTransport, lenient_number, lenient_string};
use crate::models::{DrivingRoute, DrivingStep, LngLat, PlanResult};
use crate::{Result, TripSkyError};

/// Driving route planner (`/v3/direction/driving`)
#[derive(Debug)]
pub struct Driving {
    transport: AmapTransport,
}

#[derive(Debug, Deserialize)]
struct DrivingResponse {
    #[serde(flatten)]
    status: AmapStatus,
    route: Option<RouteBody>,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    #[serde(default)]
    paths: Vec<PathBody>,
}

#[derive(Debug, Deserialize)]
struct PathBody {
    #[serde(default, deserialize_with = "lenient_number")]
    distance: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    duration: f64,
    #[serde(default)]
    steps: Vec<StepBody>,
}

#[derive(Debug, Deserialize)]
struct StepBody {
    #[serde(default, deserialize_with = "lenient_string")]
    instruction: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    distance: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    polyline: Option<String>,
}

impl TryFrom<PathBody> for DrivingRoute {
    type Error = TripSkyError;

    fn try_from(body: PathBody) -> Result<Self> {
        let steps = body
            .steps
            .into_iter()
            .map(|step| {
                Ok(DrivingStep {
                    instruction: step.instruction.unwrap_or_default(),
                    distance: step.distance,
                    path: LngLat::parse_polyline(step.polyline.as_deref().unwrap_or_default())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            distance: body.distance,
            duration: body.duration,
            steps,
        })
    }
}

impl Driving {
    pub(crate) fn new(transport: AmapTransport) -> Self {
        Self { transport }
    }

    /// Plan a drive from `origin` to `dest`.
    #[instrument(skip(self, origin, dest), fields(origin = %origin, dest = %dest))]
    pub async fn search(&self, origin: LngLat, dest: LngLat) -> Result<PlanResult> {
        let origin_param = origin.to_query();
        let dest_param = dest.to_query();

        let response: DrivingResponse = self
            .transport
            .get(
                "/v3/direction/driving",
                &[
                    ("origin", origin_param.as_str()),
                    ("destination", dest_param.as_str()),
                    ("extensions", "base"),
                ],
            )
            .await?;

        let failure = |info: Option<String>| {
            TripSkyError::api(info.unwrap_or_else(|| "Driving plan query failed".to_string()))
        };

        if !response.status.is_ok() {
            return Err(failure(response.status.info));
        }

        let routes = response
            .route
            .map(|r| r.paths)
            .unwrap_or_default()
            .into_iter()
            .map(DrivingRoute::try_from)
            .collect::<Result<Vec<_>>>()?;

        let plan = PlanResult::from_routes(routes).ok_or_else(|| failure(response.status.info))?;

        info!(
            points = plan.path.len(),
            distance_m = plan.distance,
            duration_s = plan.duration,
            "Driving route planned"
        );
        Ok(plan)
    }
}
