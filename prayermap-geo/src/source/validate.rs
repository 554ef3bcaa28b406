//! Per-provider payload validation.
//!
//! Each provider gets exactly one function that turns response bytes into
//! [`RawFeature`]s or fails with [`FetchError::InvalidPayload`]. Shape problems
//! at the collection level fail the whole payload; problems inside a single
//! feature only drop that feature.

use serde_json::{Map, Value};
use tracing::debug;

use super::error::FetchError;
use super::query::QueryScope;
use crate::boundary::{position_from_value, RawFeature, RawGeometry};
use crate::geo::{BoundingBox, LonLat};

/// Property keys holding an ISO 3166-1 alpha-2 country code.
const COUNTRY_KEYS: &[&str] = &["ISO_A2", "iso_a2", "ISO3166-1", "ISO3166-1:alpha2", "adm0_a2"];

/// Property keys holding an ISO 3166-2 subdivision code.
const REGION_KEYS: &[&str] = &["iso_3166_2", "ISO3166-2"];

/// Endpoint comparison tolerance in degrees when stitching ways.
const STITCH_EPSILON: f64 = 1e-9;

/// Validates a GeoJSON `FeatureCollection` from a static dataset.
pub fn validate_geojson(bytes: &[u8]) -> Result<Vec<RawFeature>, FetchError> {
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| FetchError::InvalidPayload(format!("dataset is not JSON: {}", e)))?;

    let obj = root
        .as_object()
        .ok_or_else(|| FetchError::InvalidPayload("dataset root is not an object".into()))?;

    match obj.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {}
        other => {
            return Err(FetchError::InvalidPayload(format!(
                "expected FeatureCollection, got {:?}",
                other
            )))
        }
    }

    let features = obj
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::InvalidPayload("FeatureCollection without features".into()))?;

    let mut parsed = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        match serde_json::from_value::<RawFeature>(feature.clone()) {
            Ok(f) => parsed.push(f),
            Err(e) => debug!(index, error = %e, "Skipping unparseable dataset feature"),
        }
    }
    Ok(parsed)
}

/// Validates an Overpass `out geom` / `out body` JSON response.
///
/// Relations are assembled from their outer member ways, nodes become point
/// features, closed ways become polygons.
pub fn validate_overpass(bytes: &[u8]) -> Result<Vec<RawFeature>, FetchError> {
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| FetchError::InvalidPayload(format!("Overpass response is not JSON: {}", e)))?;

    let elements = root
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::InvalidPayload("Overpass response without elements".into()))?;

    // Overpass reports query timeouts as HTTP 200 with a remark and no data
    if let Some(remark) = root.get("remark").and_then(Value::as_str) {
        if elements.is_empty() && remark.to_lowercase().contains("error") {
            return Err(FetchError::InvalidPayload(format!(
                "Overpass runtime error: {}",
                remark
            )));
        }
    }

    let mut features = Vec::with_capacity(elements.len());
    for element in elements {
        let kind = element.get("type").and_then(Value::as_str);
        let properties = overpass_properties(element);
        let geometry = match kind {
            Some("relation") => relation_geometry(element),
            Some("way") => element
                .get("geometry")
                .and_then(Value::as_array)
                .map(|g| RawGeometry::Polygon {
                    coordinates: vec![g.iter().map(overpass_point).collect()],
                }),
            Some("node") => Some(RawGeometry::Point {
                coordinates: overpass_point(element),
            }),
            _ => None,
        };

        match geometry {
            Some(geometry) => features.push(RawFeature::new(geometry, properties)),
            None => debug!(kind = ?kind, "Skipping Overpass element without usable geometry"),
        }
    }
    Ok(features)
}

/// Keeps only features matching the scope.
///
/// Used for datasets, which cannot be scoped server-side.
pub fn apply_scope(features: Vec<RawFeature>, scope: &QueryScope) -> Vec<RawFeature> {
    if scope.is_unscoped() {
        return features;
    }
    features
        .into_iter()
        .filter(|f| matches_scope(f, scope))
        .collect()
}

fn matches_scope(feature: &RawFeature, scope: &QueryScope) -> bool {
    let props = feature.properties.as_ref();
    let code_matches = |keys: &[&str], wanted: &str| {
        props.is_some_and(|p| {
            keys.iter().any(|k| {
                p.get(*k)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.eq_ignore_ascii_case(wanted))
            })
        })
    };

    if let Some(region) = &scope.region {
        if !code_matches(REGION_KEYS, region) {
            return false;
        }
    } else if let Some(country) = &scope.country {
        if !code_matches(COUNTRY_KEYS, country) {
            return false;
        }
    }

    match (scope.bbox, feature.geometry.as_ref().and_then(geometry_bbox)) {
        (Some(wanted), Some(actual)) => wanted.intersects(&actual),
        (Some(_), None) => false,
        (None, _) => true,
    }
}

fn geometry_bbox(geometry: &RawGeometry) -> Option<BoundingBox> {
    let points: Vec<LonLat> = match geometry {
        RawGeometry::Polygon { coordinates } => coordinates
            .iter()
            .flatten()
            .filter_map(position_from_value)
            .filter(LonLat::is_valid)
            .collect(),
        RawGeometry::MultiPolygon { coordinates } => coordinates
            .iter()
            .flatten()
            .flatten()
            .filter_map(position_from_value)
            .filter(LonLat::is_valid)
            .collect(),
        RawGeometry::Point { coordinates } => position_from_value(coordinates)
            .filter(LonLat::is_valid)
            .into_iter()
            .collect(),
        RawGeometry::Unsupported => Vec::new(),
    };
    BoundingBox::enclosing(points)
}

fn overpass_properties(element: &Value) -> Map<String, Value> {
    let mut props = element
        .get("tags")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    if let Some(id) = element.get("id") {
        props.insert("osm_id".to_string(), id.clone());
    }
    if let Some(kind) = element.get("type") {
        props.insert("osm_type".to_string(), kind.clone());
    }
    props
}

/// Converts an Overpass `{lat, lon}` object into a GeoJSON position.
///
/// Missing or non-numeric members become `null` so they count as invalid.
fn overpass_point(value: &Value) -> Value {
    let lon = value.get("lon").and_then(Value::as_f64);
    let lat = value.get("lat").and_then(Value::as_f64);
    match (lon, lat) {
        (Some(lon), Some(lat)) => Value::Array(vec![lon.into(), lat.into()]),
        _ => Value::Null,
    }
}

fn relation_geometry(element: &Value) -> Option<RawGeometry> {
    let members = element.get("members").and_then(Value::as_array)?;

    let segments: Vec<Vec<Value>> = members
        .iter()
        .filter(|m| m.get("type").and_then(Value::as_str) == Some("way"))
        .filter(|m| {
            matches!(
                m.get("role").and_then(Value::as_str),
                Some("outer") | Some("") | None
            )
        })
        .filter_map(|m| m.get("geometry").and_then(Value::as_array))
        .map(|g| g.iter().map(overpass_point).collect::<Vec<_>>())
        .filter(|seg| !seg.is_empty())
        .collect();

    if segments.is_empty() {
        return None;
    }

    let rings = stitch_rings(segments);
    if rings.len() == 1 {
        Some(RawGeometry::Polygon {
            coordinates: rings,
        })
    } else {
        Some(RawGeometry::MultiPolygon {
            coordinates: rings.into_iter().map(|r| vec![r]).collect(),
        })
    }
}

/// Joins way segments end-to-end into rings.
///
/// Segments are attached when an endpoint matches the growing ring's last
/// point, reversing them when needed. A ring stops growing once it closes or
/// no segment connects; open rings are left for the geometry processor.
pub fn stitch_rings(mut segments: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    let mut rings = Vec::new();

    while !segments.is_empty() {
        let mut ring = segments.remove(0);

        loop {
            if is_closed(&ring) {
                break;
            }
            let Some(tail) = ring.last().and_then(position_from_value) else {
                break;
            };

            let next = segments.iter().position(|seg| {
                endpoint_matches(seg.first(), tail) || endpoint_matches(seg.last(), tail)
            });
            let Some(index) = next else {
                break;
            };

            let mut seg = segments.remove(index);
            if !endpoint_matches(seg.first(), tail) {
                seg.reverse();
            }
            ring.extend(seg.into_iter().skip(1));
        }

        rings.push(ring);
    }
    rings
}

fn is_closed(ring: &[Value]) -> bool {
    if ring.len() < 2 {
        return false;
    }
    match ring.first().and_then(position_from_value) {
        Some(first) => endpoint_matches(ring.last(), first),
        None => false,
    }
}

fn endpoint_matches(value: Option<&Value>, target: LonLat) -> bool {
    value
        .and_then(position_from_value)
        .is_some_and(|p| {
            (p.lon - target.lon).abs() < STITCH_EPSILON && (p.lat - target.lat).abs() < STITCH_EPSILON
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pos(lon: f64, lat: f64) -> Value {
        json!([lon, lat])
    }

    #[test]
    fn test_geojson_requires_feature_collection() {
        let err = validate_geojson(br#"{"type": "Feature"}"#).unwrap_err();
        assert!(err.is_invalid_payload());

        let err = validate_geojson(b"not json").unwrap_err();
        assert!(err.is_invalid_payload());

        let err = validate_geojson(br#"{"type": "FeatureCollection"}"#).unwrap_err();
        assert!(err.to_string().contains("without features"));
    }

    #[test]
    fn test_geojson_skips_unparseable_features() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "A"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
                {"type": "Feature", "geometry": {"type": "Polygon", "coordinates": 7}}
            ]
        });
        let features = validate_geojson(body.to_string().as_bytes()).unwrap();
        assert_eq!(features.len(), 1);
    }

    #[test]
    fn test_overpass_requires_elements() {
        let err = validate_overpass(br#"{"version": 0.6}"#).unwrap_err();
        assert!(err.is_invalid_payload());
    }

    #[test]
    fn test_overpass_runtime_error_remark() {
        let body = json!({
            "elements": [],
            "remark": "runtime error: Query timed out in \"query\" at line 3 after 26 seconds."
        });
        let err = validate_overpass(body.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("runtime error"));
    }

    #[test]
    fn test_overpass_relation_stitched_from_ways() {
        let body = json!({
            "elements": [{
                "type": "relation",
                "id": 62422,
                "tags": {"name": "Berlin", "admin_level": "4"},
                "members": [
                    {"type": "way", "role": "outer", "geometry": [
                        {"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 1.0}
                    ]},
                    // reversed direction on purpose
                    {"type": "way", "role": "outer", "geometry": [
                        {"lat": 1.0, "lon": 0.0}, {"lat": 1.0, "lon": 1.0}, {"lat": 0.0, "lon": 1.0}
                    ]},
                    {"type": "way", "role": "outer", "geometry": [
                        {"lat": 1.0, "lon": 0.0}, {"lat": 0.0, "lon": 0.0}
                    ]},
                    {"type": "way", "role": "inner", "geometry": [
                        {"lat": 0.5, "lon": 0.5}, {"lat": 0.6, "lon": 0.6}
                    ]},
                    {"type": "node", "role": "admin_centre", "lat": 0.5, "lon": 0.5}
                ]
            }]
        });

        let features = validate_overpass(body.to_string().as_bytes()).unwrap();
        assert_eq!(features.len(), 1);
        let props = features[0].properties();
        assert_eq!(props["name"], "Berlin");
        assert_eq!(props["osm_id"], 62422);

        match &features[0].geometry {
            Some(RawGeometry::Polygon { coordinates }) => {
                assert_eq!(coordinates.len(), 1);
                let ring = &coordinates[0];
                assert_eq!(ring.len(), 5);
                assert_eq!(ring.first(), ring.last());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_overpass_nodes_become_points() {
        let body = json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 6.45, "lon": 3.39,
                 "tags": {"name": "Lagos", "place": "city", "population": "8048430"}},
                {"type": "area", "id": 2}
            ]
        });
        let features = validate_overpass(body.to_string().as_bytes()).unwrap();
        assert_eq!(features.len(), 1);
        assert!(matches!(
            features[0].geometry,
            Some(RawGeometry::Point { .. })
        ));
    }

    #[test]
    fn test_stitch_disconnected_segments_yield_multiple_rings() {
        let rings = stitch_rings(vec![
            vec![pos(0.0, 0.0), pos(1.0, 0.0), pos(1.0, 1.0), pos(0.0, 0.0)],
            vec![pos(5.0, 5.0), pos(6.0, 5.0)],
            vec![pos(6.0, 5.0), pos(6.0, 6.0), pos(5.0, 5.0)],
        ]);
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[1].len(), 4);
        assert!(is_closed(&rings[1]));
    }

    #[test]
    fn test_stitch_leaves_gaps_open() {
        let rings = stitch_rings(vec![
            vec![pos(0.0, 0.0), pos(1.0, 0.0)],
            vec![pos(2.0, 2.0), pos(3.0, 3.0)],
        ]);
        assert_eq!(rings.len(), 2);
        assert!(!is_closed(&rings[0]));
    }

    fn feature_with(props: Value, ring: Value) -> RawFeature {
        serde_json::from_value(json!({
            "properties": props,
            "geometry": {"type": "Polygon", "coordinates": [ring]}
        }))
        .unwrap()
    }

    #[test]
    fn test_apply_scope_country_and_bbox() {
        let de = feature_with(
            json!({"name": "Germany", "ISO_A2": "DE"}),
            json!([[6, 47], [15, 47], [15, 55], [6, 47]]),
        );
        let fr = feature_with(
            json!({"name": "France", "ISO_A2": "FR"}),
            json!([[-5, 42], [8, 42], [8, 51], [-5, 42]]),
        );

        let scope = QueryScope {
            country: Some("de".into()),
            ..Default::default()
        };
        let kept = apply_scope(vec![de.clone(), fr.clone()], &scope);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].properties()["name"], "Germany");

        let scope = QueryScope {
            bbox: Some(BoundingBox::new(43.0, -2.0, 44.0, -1.0)),
            ..Default::default()
        };
        let kept = apply_scope(vec![de.clone(), fr.clone()], &scope);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].properties()["name"], "France");

        let kept = apply_scope(vec![de, fr], &QueryScope::default());
        assert_eq!(kept.len(), 2);
    }
}
