use crate::error::{LensError, Result};
use serde_json::Value;
use tracing::warn;

/// Arithmetic mean `[lon, lat]` of every point in a GeoJSON `coordinates`
/// value, at any nesting depth (Point, LineString, Polygon, Multi*).
///
/// An array whose first element is a number is treated as a point. Points
/// that are not at least two numbers are skipped with a warning.
pub fn average_coordinates(coordinates: &Value) -> Result<[f64; 2]> {
    let mut points = Vec::new();
    flatten(coordinates, &mut points);

    let mut sum_lon = 0.0;
    let mut sum_lat = 0.0;
    let mut count = 0usize;
    for point in points {
        match as_lon_lat(point) {
            Ok([lon, lat]) => {
                sum_lon += lon;
                sum_lat += lat;
                count += 1;
            }
            Err(e) => warn!("Skipping coordinate point: {}", e),
        }
    }

    if count == 0 {
        return Err(LensError::EmptyCoordinateInput(format!(
            "no usable point in {coordinates}"
        )));
    }
    Ok([sum_lon / count as f64, sum_lat / count as f64])
}

fn flatten<'a>(value: &'a Value, points: &mut Vec<&'a [Value]>) {
    let Value::Array(items) = value else {
        return;
    };
    match items.first() {
        Some(Value::Number(_)) => points.push(items),
        Some(_) => items.iter().for_each(|item| flatten(item, points)),
        None => {}
    }
}

fn as_lon_lat(point: &[Value]) -> Result<[f64; 2]> {
    match point {
        [lon, lat, ..] => match (lon.as_f64(), lat.as_f64()) {
            (Some(lon), Some(lat)) => Ok([lon, lat]),
            _ => Err(LensError::MalformedCoordinate(format!("{point:?}"))),
        },
        _ => Err(LensError::MalformedCoordinate(format!(
            "{point:?} has fewer than two values"
        ))),
    }
}
