//! Route sampling and province segmentation
//!
//! A route is sampled at fixed arc-length intervals, every sample is
//! classified against the province polygons of a GeoJSON asset, and runs of
//! samples in the same province are collapsed into [`ProvinceSegment`]s.

use std::path::Path;

use geo::{Distance, Haversine, InterpolatePoint, Intersects, LineString, MultiPolygon, Point, Polygon};
use geojson::{GeoJson, JsonObject, JsonValue};
use tracing::{debug, info, warn};

use crate::models::{LngLat, ProvinceSegment, Ring};
use crate::{Result, TripSkyError};

/// Default distance between route samples, in meters
pub const DEFAULT_STEP_METERS: f64 = 50_000.0;

/// Upper bound on samples taken from a single route
pub const MAX_SAMPLES: usize = 100_000;

/// One province polygon with its GeoJSON properties
#[derive(Debug, Clone)]
pub struct ProvinceFeature {
    pub properties: JsonObject,
    pub shape: MultiPolygon<f64>,
}

impl ProvinceFeature {
    /// Name under `name_prop`, falling back to `name` and `NAME`.
    #[must_use]
    pub fn name(&self, name_prop: &str) -> Option<String> {
        let value = [name_prop, "name", "NAME"]
            .iter()
            .find_map(|key| self.properties.get(*key).filter(|v| !v.is_null()))?;

        let name = match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        (!name.is_empty()).then_some(name)
    }

    /// Boundary-inclusive containment
    #[must_use]
    pub fn contains(&self, point: LngLat) -> bool {
        self.shape.intersects(&Point::from(point))
    }
}

/// Province polygons loaded from a GeoJSON feature collection
#[derive(Debug, Clone, Default)]
pub struct ProvinceCollection {
    pub features: Vec<ProvinceFeature>,
}

impl ProvinceCollection {
    /// Parse a GeoJSON `FeatureCollection`. Features without a polygonal
    /// geometry are skipped.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e| TripSkyError::parse(format!("Invalid province GeoJSON: {e}")))?;

        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(TripSkyError::parse(
                "Province GeoJSON must be a FeatureCollection",
            ));
        };

        let mut features = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.into_iter().enumerate() {
            let Some(geometry) = feature.geometry else {
                warn!(index, "Province feature without geometry skipped");
                continue;
            };
            let shape = match geo::Geometry::<f64>::try_from(geometry) {
                Ok(geo::Geometry::Polygon(polygon)) => MultiPolygon::new(vec![polygon]),
                Ok(geo::Geometry::MultiPolygon(multi)) => multi,
                Ok(_) => {
                    warn!(index, "Non-polygonal province feature skipped");
                    continue;
                }
                Err(e) => {
                    warn!(index, error = %e, "Unreadable province geometry skipped");
                    continue;
                }
            };
            features.push(ProvinceFeature {
                properties: feature.properties.unwrap_or_default(),
                shape,
            });
        }

        debug!(count = features.len(), "Parsed province polygons");
        Ok(Self { features })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Load province polygons from a local file or an `http(s)` URL.
pub async fn load_provinces(source: &str) -> Result<ProvinceCollection> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TripSkyError::api(format!(
                "Province asset {source} returned HTTP {status}"
            )));
        }
        response.text().await?
    } else {
        tokio::fs::read_to_string(Path::new(source)).await?
    };

    let collection = ProvinceCollection::from_geojson_str(&text)?;
    info!(source, provinces = collection.len(), "Loaded province polygons");
    Ok(collection)
}

/// Point `distance` meters along `path`, interpolated on the great circle of
/// the segment that contains it. Past the end, the final point.
fn point_along(path: &[LngLat], distance: f64) -> LngLat {
    let mut travelled = 0.0;

    for pair in path.windows(2) {
        if distance <= travelled {
            return pair[0];
        }
        let (from, to) = (Point::from(pair[0]), Point::from(pair[1]));
        let length = Haversine.distance(from, to);
        if distance < travelled + length {
            return Haversine
                .point_at_distance_between(from, to, distance - travelled)
                .into();
        }
        travelled += length;
    }
    path[path.len() - 1]
}

/// Sample `path` every `step_meters` of arc length, always ending on the
/// path's final point.
///
/// Fails when the step is not a positive distance or would produce more than
/// [`MAX_SAMPLES`] samples.
pub fn sample_polyline(path: &[LngLat], step_meters: f64) -> Result<Vec<LngLat>> {
    if !step_meters.is_finite() || step_meters <= 0.0 {
        return Err(TripSkyError::validation(format!(
            "Sample step must be a positive distance, got {step_meters}"
        )));
    }
    if path.len() < 2 {
        return Ok(path.to_vec());
    }

    let length: f64 = path.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
    if length / step_meters >= MAX_SAMPLES as f64 {
        return Err(TripSkyError::validation(format!(
            "Sample step of {step_meters} m is too small for a {length:.0} m route"
        )));
    }

    let mut samples = Vec::new();
    let mut k = 0_usize;
    loop {
        let d = k as f64 * step_meters;
        if d > length {
            break;
        }
        samples.push(point_along(path, d));
        k += 1;
    }

    let end = path[path.len() - 1];
    if samples.last() != Some(&end) {
        samples.push(end);
    }
    Ok(samples)
}

/// Name of the first province containing `p`.
#[must_use]
pub fn find_province_of_point(
    provinces: &ProvinceCollection,
    p: LngLat,
    name_prop: &str,
) -> Option<String> {
    provinces
        .features
        .iter()
        .find(|f| f.contains(p))
        .and_then(|f| f.name(name_prop))
}

/// Split `path` into contiguous per-province segments.
///
/// Runs of a single sample and samples outside every province are dropped.
pub fn group_by_province(
    provinces: &ProvinceCollection,
    path: &[LngLat],
    step_meters: f64,
    name_prop: &str,
) -> Result<Vec<ProvinceSegment>> {
    let samples = sample_polyline(path, step_meters)?;

    let mut segments = Vec::new();
    let mut current: Option<(Option<String>, Vec<LngLat>)> = None;

    for p in samples {
        let province = find_province_of_point(provinces, p, name_prop);
        match current.as_mut() {
            Some((name, points)) if *name == province => points.push(p),
            _ => {
                if let Some(run) = current.take() {
                    push_segment(&mut segments, run);
                }
                current = Some((province, vec![p]));
            }
        }
    }
    if let Some(run) = current {
        push_segment(&mut segments, run);
    }

    debug!(segments = segments.len(), "Grouped route by province");
    Ok(segments)
}

fn push_segment(segments: &mut Vec<ProvinceSegment>, (province, path): (Option<String>, Vec<LngLat>)) {
    let Some(province) = province else {
        return;
    };
    if path.len() < 2 {
        return;
    }
    let mid = path[path.len() / 2];
    segments.push(ProvinceSegment { province, path, mid });
}

/// Boundary-inclusive test of `point` against independent rings.
#[must_use]
pub fn point_in_rings(point: LngLat, rings: &[Ring]) -> bool {
    let point = Point::from(point);
    rings.iter().filter(|ring| ring.len() >= 3).any(|ring| {
        let exterior: LineString<f64> = ring.iter().map(|p| (p.lng, p.lat)).collect();
        Polygon::new(exterior, Vec::new()).intersects(&point)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Two unit-degree provinces side by side along the equator-ish band,
    /// plus one feature that only carries an upper-case name.
    fn provinces() -> ProvinceCollection {
        ProvinceCollection::from_geojson_str(
            r#"{
              "type": "FeatureCollection",
              "features": [
                {"type": "Feature", "properties": {"name": "West"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
                {"type": "Feature", "properties": {"name": "East"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [[[[1,0],[2,0],[2,1],[1,1],[1,0]]]]}},
                {"type": "Feature", "properties": {"NAME": "North", "short": "N"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,2],[2,2],[2,3],[0,3],[0,2]]]}},
                {"type": "Feature", "properties": {"name": "Marker"},
                 "geometry": {"type": "Point", "coordinates": [5,5]}}
              ]
            }"#,
        )
        .unwrap()
    }

    fn line(points: &[(f64, f64)]) -> Vec<LngLat> {
        points.iter().map(|&(lng, lat)| LngLat::new(lng, lat)).collect()
    }

    #[test]
    fn test_non_polygon_features_skipped() {
        assert_eq!(provinces().len(), 3);
    }

    #[test]
    fn test_rejects_non_collection() {
        let err = ProvinceCollection::from_geojson_str(
            r#"{"type": "Point", "coordinates": [1, 2]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TripSkyError::Parse { .. }));
    }

    #[rstest]
    #[case((0.5, 0.5), Some("West"))]
    #[case((1.5, 0.5), Some("East"))]
    #[case((1.0, 0.5), Some("West"))] // shared edge: first feature wins
    #[case((1.0, 2.5), Some("North"))] // NAME fallback
    #[case((5.0, 5.0), None)]
    fn test_find_province_of_point(#[case] p: (f64, f64), #[case] expected: Option<&str>) {
        let found = find_province_of_point(&provinces(), LngLat::new(p.0, p.1), "name");
        assert_eq!(found.as_deref(), expected);
    }

    #[test]
    fn test_find_province_custom_property() {
        let found = find_province_of_point(&provinces(), LngLat::new(1.0, 2.5), "short");
        assert_eq!(found.as_deref(), Some("N"));
    }

    #[test]
    fn test_empty_name_is_none() {
        let collection = ProvinceCollection::from_geojson_str(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"name": ""},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(find_province_of_point(&collection, LngLat::new(0.5, 0.5), "name"), None);
    }

    #[test]
    fn test_sample_short_paths_unchanged() {
        assert!(sample_polyline(&[], 1000.0).unwrap().is_empty());
        let single = line(&[(1.0, 1.0)]);
        assert_eq!(sample_polyline(&single, 1000.0).unwrap(), single);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-5.0)]
    #[case(f64::NAN)]
    fn test_sample_rejects_bad_step(#[case] step: f64) {
        let path = line(&[(0.0, 0.0), (1.0, 0.0)]);
        assert!(sample_polyline(&path, step).is_err());
    }

    #[test]
    fn test_sample_spacing_and_endpoint() {
        // ~111 km along the equator, sampled every 25 km
        let path = line(&[(0.0, 0.0), (0.5, 0.0), (1.0, 0.0)]);
        let samples = sample_polyline(&path, 25_000.0).unwrap();

        assert_eq!(samples.len(), 6); // 0, 25, 50, 75, 100 km + end
        assert_eq!(samples[0], path[0]);
        assert_eq!(*samples.last().unwrap(), path[2]);
        for pair in samples[..5].windows(2) {
            let gap = pair[0].distance_to(&pair[1]);
            assert!((gap - 25_000.0).abs() < 1.0, "gap {gap}");
        }
        assert!(samples.iter().all(|p| p.lat.abs() < 1e-9));
    }

    #[test]
    fn test_sample_rejects_step_too_small_for_route() {
        // ~960 km; a 1 cm step would need ~10^8 samples
        let path = line(&[(110.0, 30.0), (120.0, 30.0)]);
        let err = sample_polyline(&path, 0.01).unwrap_err();
        assert!(matches!(err, TripSkyError::Validation { .. }));

        assert!(sample_polyline(&path, 100.0).is_ok());
    }

    #[test]
    fn test_sample_repeated_joint_points() {
        // driving paths repeat the joint point between consecutive steps
        let path = line(&[(0.0, 0.0), (0.3, 0.0), (0.3, 0.0), (0.7, 0.0), (0.7, 0.0), (1.0, 0.0)]);
        let samples = sample_polyline(&path, 25_000.0).unwrap();

        assert_eq!(samples.len(), 6);
        assert_eq!(*samples.last().unwrap(), path[5]);
        for pair in samples[..5].windows(2) {
            let gap = pair[0].distance_to(&pair[1]);
            assert!((gap - 25_000.0).abs() < 1.0, "gap {gap}");
        }
    }

    #[test]
    fn test_point_along_stays_on_great_circle() {
        let (start, end) = (LngLat::new(113.26, 23.13), LngLat::new(121.47, 31.23));
        let total = start.distance_to(&end);

        let p = point_along(&[start, end], 300_000.0);
        assert!((start.distance_to(&p) - 300_000.0).abs() < 1.0);
        assert!((start.distance_to(&p) + p.distance_to(&end) - total).abs() < 1.0);

        assert_eq!(point_along(&[start, end], 0.0), start);
        assert_eq!(point_along(&[start, end], total * 2.0), end);
    }

    #[test]
    fn test_sample_step_longer_than_path() {
        let path = line(&[(0.0, 0.0), (0.1, 0.0)]);
        let samples = sample_polyline(&path, DEFAULT_STEP_METERS).unwrap();
        assert_eq!(samples, path);
    }

    #[test]
    fn test_group_merges_contiguous_samples() {
        let path = line(&[(0.05, 0.5), (1.95, 0.5)]);
        let segments = group_by_province(&provinces(), &path, 10_000.0, "name").unwrap();

        let names: Vec<&str> = segments.iter().map(|s| s.province.as_str()).collect();
        assert_eq!(names, vec!["West", "East"]);

        let collection = provinces();
        for segment in &segments {
            assert!(segment.path.len() > 1);
            assert_eq!(segment.mid, segment.path[segment.path.len() / 2]);
            for p in &segment.path {
                assert_eq!(
                    find_province_of_point(&collection, *p, "name").as_deref(),
                    Some(segment.province.as_str())
                );
            }
        }
    }

    #[test]
    fn test_group_drops_gaps_and_reentry_splits() {
        // West -> outside -> West again
        let path = line(&[(0.1, 0.5), (0.9, 0.5), (0.9, 1.6), (0.1, 1.6), (0.1, 0.6), (0.5, 0.6)]);
        let segments = group_by_province(&provinces(), &path, 10_000.0, "name").unwrap();

        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.province == "West"));
    }

    #[test]
    fn test_group_drops_single_sample_runs() {
        // only the final point lies in West
        let path = line(&[(3.0, 0.5), (3.0, 0.9), (0.5, 0.5)]);
        let segments = group_by_province(&provinces(), &path, 1_000_000.0, "name").unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_point_in_rings() {
        let rings = vec![
            line(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            line(&[(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 6.0), (5.0, 5.0)]),
        ];
        assert!(point_in_rings(LngLat::new(5.5, 5.5), &rings));
        assert!(point_in_rings(LngLat::new(1.0, 0.5), &rings)); // on the edge
        assert!(!point_in_rings(LngLat::new(3.0, 3.0), &rings));
        assert!(!point_in_rings(LngLat::new(0.5, 0.5), &[line(&[(0.0, 0.0), (1.0, 1.0)])]));
    }

    #[tokio::test]
    async fn test_load_provinces_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("provinces.geojson");
        std::fs::write(
            &file,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"name": "Solo"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
            ]}"#,
        )
        .unwrap();

        let collection = load_provinces(file.to_str().unwrap()).await.unwrap();
        assert_eq!(collection.len(), 1);

        let missing = load_provinces(dir.path().join("nope.geojson").to_str().unwrap()).await;
        assert!(matches!(missing, Err(TripSkyError::Io { .. })));
    }
}
