//! Province list and boundary lookup, and route-to-province detection
//!
//! Boundaries are fetched once per province through a bounded worker pool,
//! then route samples are tested against them.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{AmapStatus, AmapTransport, lenient_string};
use crate::config::RouteConfig;
use crate::models::{LngLat, ProvinceInfo, Ring};
use crate::segmentation::point_in_rings;
use crate::{Result, TripSkyError};

/// Source of province metadata and boundaries
#[async_trait]
pub trait DistrictSource: Send + Sync {
    /// All first-level divisions of the country
    async fn province_list(&self) -> Result<Vec<ProvinceInfo>>;

    /// Boundary rings of one province
    async fn province_boundary(&self, adcode: &str) -> Result<Vec<Ring>>;
}

/// District search over the AMap web service (`/v3/config/district`)
#[derive(Debug, Clone)]
pub struct AmapDistrictSearch {
    transport: AmapTransport,
}

#[derive(Debug, Deserialize)]
struct DistrictResponse {
    #[serde(flatten)]
    status: AmapStatus,
    #[serde(default)]
    districts: Vec<DistrictBody>,
}

#[derive(Debug, Deserialize)]
struct DistrictBody {
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    adcode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    center: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    polyline: Option<String>,
    #[serde(default)]
    districts: Vec<DistrictBody>,
}

impl AmapDistrictSearch {
    pub(crate) fn new(transport: AmapTransport) -> Self {
        Self { transport }
    }

    async fn search(&self, keywords: &str, subdistrict: &str, extensions: &str) -> Result<Vec<DistrictBody>> {
        let response: DistrictResponse = self
            .transport
            .get(
                "/v3/config/district",
                &[
                    ("keywords", keywords),
                    ("subdistrict", subdistrict),
                    ("extensions", extensions),
                ],
            )
            .await?;

        if !response.status.is_ok() {
            return Err(TripSkyError::api(
                response
                    .status
                    .info
                    .unwrap_or_else(|| format!("District search failed for {keywords}")),
            ));
        }
        Ok(response.districts)
    }
}

#[async_trait]
impl DistrictSource for AmapDistrictSearch {
    #[instrument(skip(self))]
    async fn province_list(&self) -> Result<Vec<ProvinceInfo>> {
        let districts = self.search("中国", "1", "base").await?;

        let provinces: Vec<ProvinceInfo> = districts
            .into_iter()
            .next()
            .map(|country| country.districts)
            .unwrap_or_default()
            .into_iter()
            .map(|p| ProvinceInfo {
                name: p.name,
                adcode: p.adcode.unwrap_or_default(),
                center: p.center.as_deref().and_then(LngLat::parse_pair),
                rings: None,
            })
            .collect();

        info!(count = provinces.len(), "Fetched province list");
        Ok(provinces)
    }

    #[instrument(skip(self))]
    async fn province_boundary(&self, adcode: &str) -> Result<Vec<Ring>> {
        let districts = self.search(adcode, "0", "all").await?;
        let polyline = districts.into_iter().next().and_then(|d| d.polyline);

        let rings = match polyline {
            Some(polyline) => parse_boundary(&polyline)?,
            None => Vec::new(),
        };
        debug!(rings = rings.len(), "Fetched province boundary");
        Ok(rings)
    }
}

/// Split an AMap boundary string: rings separated by `|`, points by `;`.
fn parse_boundary(polyline: &str) -> Result<Vec<Ring>> {
    polyline
        .split('|')
        .filter(|ring| !ring.trim().is_empty())
        .map(LngLat::parse_polyline)
        .collect()
}

/// Fetch every province's boundary with at most `limit` requests in flight.
///
/// Either every boundary arrives or the first failure is returned.
pub async fn preload_all<S>(
    source: &S,
    provinces: &[ProvinceInfo],
    limit: usize,
) -> Result<HashMap<String, Vec<Ring>>>
where
    S: DistrictSource + ?Sized,
{
    let workers = limit.max(1).min(provinces.len().max(1));
    debug!(provinces = provinces.len(), workers, "Preloading province boundaries");

    stream::iter(provinces)
        .map(|province| async move {
            let rings = source.province_boundary(&province.adcode).await?;
            Ok::<_, TripSkyError>((province.adcode.clone(), rings))
        })
        .buffer_unordered(workers)
        .try_collect()
        .await
}

/// Sampling and concurrency knobs for [`provinces_along_route`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlongRouteOptions {
    /// Approximate upper bound on tested route points
    pub max_samples: usize,
    /// Concurrent boundary downloads
    pub concurrency: usize,
}

impl Default for AlongRouteOptions {
    fn default() -> Self {
        Self {
            max_samples: 200,
            concurrency: 6,
        }
    }
}

impl From<&RouteConfig> for AlongRouteOptions {
    fn from(config: &RouteConfig) -> Self {
        Self {
            max_samples: config.max_route_samples,
            concurrency: config.preload_concurrency,
        }
    }
}

/// Provinces a route passes through, in the order the route first enters them.
///
/// The returned entries carry their boundary rings.
#[instrument(skip_all, fields(points = path.len(), provinces = all_provinces.len()))]
pub async fn provinces_along_route<S>(
    source: &S,
    path: &[LngLat],
    all_provinces: &[ProvinceInfo],
    options: AlongRouteOptions,
) -> Result<Vec<ProvinceInfo>>
where
    S: DistrictSource + ?Sized,
{
    let stride = (path.len() / options.max_samples.max(1)).max(1);
    let samples: Vec<LngLat> = path.iter().step_by(stride).copied().collect();

    let rings_by_adcode = preload_all(source, all_provinces, options.concurrency).await?;

    let mut hit: Vec<ProvinceInfo> = Vec::new();
    for point in &samples {
        for province in all_provinces {
            if hit.iter().any(|h| h.adcode == province.adcode) {
                continue;
            }
            let Some(rings) = rings_by_adcode.get(&province.adcode) else {
                continue;
            };
            if point_in_rings(*point, rings) {
                hit.push(ProvinceInfo {
                    rings: Some(rings.clone()),
                    ..province.clone()
                });
            }
        }
    }

    info!(
        samples = samples.len(),
        hit = hit.len(),
        "Matched route against province boundaries"
    );
    Ok(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn square(min_lng: f64, min_lat: f64, size: f64) -> Ring {
        vec![
            LngLat::new(min_lng, min_lat),
            LngLat::new(min_lng + size, min_lat),
            LngLat::new(min_lng + size, min_lat + size),
            LngLat::new(min_lng, min_lat + size),
            LngLat::new(min_lng, min_lat),
        ]
    }

    fn province(name: &str, adcode: &str) -> ProvinceInfo {
        ProvinceInfo {
            name: name.to_string(),
            adcode: adcode.to_string(),
            center: None,
            rings: None,
        }
    }

    /// In-memory source tracking how many boundary requests overlap
    struct FakeSource {
        boundaries: HashMap<String, Vec<Ring>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        fail_on: Option<String>,
    }

    impl FakeSource {
        fn new(boundaries: Vec<(&str, Vec<Ring>)>) -> Self {
            Self {
                boundaries: boundaries
                    .into_iter()
                    .map(|(code, rings)| (code.to_string(), rings))
                    .collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl DistrictSource for FakeSource {
        async fn province_list(&self) -> Result<Vec<ProvinceInfo>> {
            Ok(Vec::new())
        }

        async fn province_boundary(&self, adcode: &str) -> Result<Vec<Ring>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.as_deref() == Some(adcode) {
                return Err(TripSkyError::api("INVALID_PARAMS"));
            }
            Ok(self.boundaries.get(adcode).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_parse_boundary_rings() {
        let rings = parse_boundary("1,1;2,1;2,2;1,1|5,5;6,5;6,6;5,5").unwrap();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[1][0], LngLat::new(5.0, 5.0));
    }

    #[tokio::test]
    async fn test_preload_respects_limit() {
        let provinces: Vec<ProvinceInfo> = (0..20)
            .map(|i| province(&format!("P{i}"), &format!("{i}0000")))
            .collect();
        let source = FakeSource::new(vec![("00000", vec![square(0.0, 0.0, 1.0)])]);

        let rings = preload_all(&source, &provinces, 3).await.unwrap();

        assert_eq!(rings.len(), 20);
        assert_eq!(rings["00000"].len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 20);
        assert!(source.peak.load(Ordering::SeqCst) <= 3);
        assert!(source.peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_preload_zero_limit_still_runs() {
        let provinces = vec![province("A", "1"), province("B", "2")];
        let source = FakeSource::new(Vec::new());
        let rings = preload_all(&source, &provinces, 0).await.unwrap();
        assert_eq!(rings.len(), 2);
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_preload_empty() {
        let source = FakeSource::new(Vec::new());
        let rings = preload_all(&source, &[], 6).await.unwrap();
        assert!(rings.is_empty());
    }

    #[tokio::test]
    async fn test_preload_rejects_when_one_fails() {
        let provinces = vec![province("A", "1"), province("B", "2"), province("C", "3")];
        let mut source = FakeSource::new(Vec::new());
        source.fail_on = Some("2".to_string());
        let err = preload_all(&source, &provinces, 2).await.unwrap_err();
        assert!(matches!(err, TripSkyError::Api { .. }));
    }

    #[tokio::test]
    async fn test_provinces_along_route_first_hit_order() {
        // west (A) -> east (C); B lies off the route
        let provinces = vec![province("B", "2"), province("C", "3"), province("A", "1")];
        let source = FakeSource::new(vec![
            ("1", vec![square(0.0, 0.0, 1.0)]),
            ("2", vec![square(0.0, 5.0, 1.0)]),
            ("3", vec![square(1.0, 0.0, 1.0)]),
        ]);
        let path: Vec<LngLat> = (0..=18).map(|i| LngLat::new(0.05 + f64::from(i) * 0.1, 0.5)).collect();

        let hit = provinces_along_route(&source, &path, &provinces, AlongRouteOptions::default())
            .await
            .unwrap();

        let names: Vec<&str> = hit.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert!(hit.iter().all(|p| p.rings.as_ref().is_some_and(|r| !r.is_empty())));
    }

    #[tokio::test]
    async fn test_provinces_along_route_strides_long_paths() {
        let provinces = vec![province("A", "1")];
        let source = FakeSource::new(vec![("1", vec![square(0.0, 0.0, 1.0)])]);
        // 1000 points, only index 995 inside A; stride 5 samples it
        let mut path: Vec<LngLat> = (0..1000).map(|_| LngLat::new(10.0, 10.0)).collect();
        path[995] = LngLat::new(0.5, 0.5);

        let hit = provinces_along_route(&source, &path, &provinces, AlongRouteOptions::default())
            .await
            .unwrap();
        assert_eq!(hit.len(), 1);

        path[995] = LngLat::new(10.0, 10.0);
        path[996] = LngLat::new(0.5, 0.5);
        let hit = provinces_along_route(&source, &path, &provinces, AlongRouteOptions::default())
            .await
            .unwrap();
        assert!(hit.is_empty(), "index 996 is skipped by the stride");
    }
}
