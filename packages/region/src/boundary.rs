//! Planning area boundary parsing.
//!
//! The planning-area API returns each area with its polygon as a `GeoJSON`
//! string, and exported CSVs carry the ring as a JSON array of
//! `[lng, lat]` positions. Both are converted into [`RegionRecord`]s whose
//! boundary is in `(lat, lng)` order.

use fitness_map_region_models::{GeoPoint, RegionRecord};
use geojson::GeoJson;

use crate::RegionError;

/// Converts one row of the planning-area API response.
///
/// Uses the first ring of the polygon; for a `MultiPolygon` only the first
/// polygon's outer ring is kept. The centroid is derived from that ring.
///
/// # Errors
///
/// Returns [`RegionError`] if the name or geometry is missing, the
/// `GeoJSON` does not parse, or the ring is degenerate.
pub fn region_from_onemap_row(row: &serde_json::Value) -> Result<RegionRecord, RegionError> {
    let name = row
        .get("pln_area_n")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RegionError::MissingField {
            field: "pln_area_n",
        })?;

    let geojson_str = row
        .get("geojson")
        .and_then(serde_json::Value::as_str)
        .ok_or(RegionError::MissingField { field: "geojson" })?;

    let ring = outer_ring_from_geojson(geojson_str)?;
    Ok(RegionRecord::new(name, None, ring)?)
}

/// Extracts the outer ring of a `Polygon` or the first `MultiPolygon`
/// member from a `GeoJSON` geometry string.
///
/// # Errors
///
/// Returns [`RegionError`] if the string is not a polygonal `GeoJSON`
/// geometry.
pub fn outer_ring_from_geojson(geojson_str: &str) -> Result<Vec<GeoPoint>, RegionError> {
    let geojson: GeoJson = geojson_str.parse()?;
    let GeoJson::Geometry(geometry) = geojson else {
        return Err(RegionError::Conversion {
            message: "expected a bare GeoJSON geometry".to_string(),
        });
    };

    let positions = match geometry.value {
        geojson::Value::Polygon(rings) => rings.into_iter().next(),
        geojson::Value::MultiPolygon(polygons) => polygons
            .into_iter()
            .next()
            .and_then(|rings| rings.into_iter().next()),
        _ => {
            return Err(RegionError::Conversion {
                message: "expected a Polygon or MultiPolygon geometry".to_string(),
            });
        }
    }
    .unwrap_or_default();

    positions_to_ring(&positions)
}

/// Parses a JSON array of `[lng, lat]` positions, as written to the
/// `polygon_coordinates` column of the planning areas CSV.
///
/// # Errors
///
/// Returns [`RegionError`] if the text is not an array of numeric pairs.
pub fn parse_polygon_coordinates(json: &str) -> Result<Vec<GeoPoint>, RegionError> {
    let positions: Vec<Vec<f64>> = serde_json::from_str(json)?;
    positions_to_ring(&positions)
}

fn positions_to_ring(positions: &[Vec<f64>]) -> Result<Vec<GeoPoint>, RegionError> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [lng, lat, ..] => Ok(GeoPoint::new(*lat, *lng)),
            _ => Err(RegionError::Conversion {
                message: format!("position {position:?} has fewer than 2 coordinates"),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use fitness_map_region_models::BoundaryError;

    use super::*;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[103.0,1.0],[103.2,1.0],[103.2,1.2],[103.0,1.2],[103.0,1.0]]]}"#;

    #[test]
    fn parses_polygon_row_in_lat_lng_order() {
        let row = serde_json::json!({ "pln_area_n": "BEDOK", "geojson": SQUARE });
        let region = region_from_onemap_row(&row).unwrap();
        assert_eq!(region.name(), "BEDOK");
        assert_eq!(region.boundary()[1], GeoPoint::new(1.0, 103.2));
        // mean of the five stored points
        assert!((region.centroid().lat - 1.08).abs() < 1e-9);
        assert!((region.centroid().lng - 103.08).abs() < 1e-9);
    }

    #[test]
    fn takes_first_polygon_of_multipolygon() {
        let multi = r#"{"type":"MultiPolygon","coordinates":[
            [[[103.0,1.0],[103.2,1.0],[103.2,1.2],[103.0,1.0]]],
            [[[104.0,2.0],[104.2,2.0],[104.2,2.2],[104.0,2.0]]]
        ]}"#;
        let ring = outer_ring_from_geojson(multi).unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], GeoPoint::new(1.0, 103.0));
    }

    #[test]
    fn rejects_point_geometry() {
        let point = r#"{"type":"Point","coordinates":[103.0,1.0]}"#;
        assert!(matches!(
            outer_ring_from_geojson(point),
            Err(RegionError::Conversion { .. })
        ));
    }

    #[test]
    fn missing_name_is_an_error() {
        let row = serde_json::json!({ "geojson": SQUARE });
        assert!(matches!(
            region_from_onemap_row(&row),
            Err(RegionError::MissingField {
                field: "pln_area_n"
            })
        ));
    }

    #[test]
    fn degenerate_ring_is_an_error() {
        let row = serde_json::json!({
            "pln_area_n": "SLIVER",
            "geojson": r#"{"type":"Polygon","coordinates":[[[103.0,1.0],[103.1,1.0],[103.0,1.0]]]}"#,
        });
        assert!(matches!(
            region_from_onemap_row(&row),
            Err(RegionError::Boundary(BoundaryError::Degenerate { .. }))
        ));
    }

    #[test]
    fn parses_csv_coordinate_column() {
        let ring = parse_polygon_coordinates("[[103.8, 1.35], [103.9, 1.35], [103.9, 1.4]]").unwrap();
        assert_eq!(ring[2], GeoPoint::new(1.4, 103.9));
        assert!(parse_polygon_coordinates("[[103.8]]").is_err());
        assert!(parse_polygon_coordinates("not json").is_err());
    }
}
