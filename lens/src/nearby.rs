//! Stations around a point, from the station tile that contains it.

use crate::error::{LensError, Result};
use crate::geo::{LonLat, average_coordinates, haversine_km, lon_lat_to_tile};
use crate::mlit::MlitClient;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

pub const SEARCH_ZOOM: u32 = 11;
pub const DEFAULT_RADIUS_KM: f64 = 2.0;
pub const MIN_RADIUS_KM: f64 = 0.1;
pub const MAX_RADIUS_KM: f64 = 10.0;

const MISSING: &str = "不明";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyStation {
    pub name: String,
    pub line_name: String,
    pub company: String,
    pub station_code: String,
    pub coordinates: LonLat,
    /// Rounded to two decimals.
    pub distance_km: f64,
}

/// Validates a search request the way the HTTP layer exposes it.
pub fn validate_query(lon: f64, lat: f64, radius_km: f64) -> Result<()> {
    if !(-180.0..=180.0).contains(&lon) {
        return Err(LensError::BadRequest(format!("lon {lon} is outside [-180, 180]")));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(LensError::BadRequest(format!("lat {lat} is outside [-90, 90]")));
    }
    if !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&radius_km) {
        return Err(LensError::BadRequest(format!(
            "radius {radius_km} is outside [{MIN_RADIUS_KM}, {MAX_RADIUS_KM}]"
        )));
    }
    Ok(())
}

fn property(properties: Option<&Value>, key: &str) -> String {
    match properties.and_then(|p| p.get(key)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => MISSING.to_string(),
        Some(other) => other.to_string(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Keeps the features of a station FeatureCollection lying within
/// `radius_km` of `(lon, lat)`, nearest first. Features whose geometry
/// cannot be averaged are skipped.
pub fn stations_within(geojson: &Value, lon: f64, lat: f64, radius_km: f64) -> Vec<NearbyStation> {
    let Some(features) = geojson.get("features").and_then(Value::as_array) else {
        warn!("No features found in station data");
        return Vec::new();
    };

    let mut stations: Vec<NearbyStation> = features
        .iter()
        .filter_map(|feature| {
            let coordinates = feature
                .get("geometry")
                .and_then(|g| g.get("coordinates"))
                .unwrap_or(&Value::Null);
            let [station_lon, station_lat] = match average_coordinates(coordinates) {
                Ok(point) => point,
                Err(e) => {
                    error!("Error processing station feature: {}", e);
                    return None;
                }
            };

            let distance = haversine_km(lon, lat, station_lon, station_lat);
            if distance > radius_km {
                return None;
            }

            let properties = feature.get("properties");
            Some(NearbyStation {
                name: property(properties, "S12_001_ja"),
                line_name: property(properties, "S12_003_ja"),
                company: property(properties, "S12_002_ja"),
                station_code: property(properties, "S12_001c"),
                coordinates: LonLat {
                    lon: station_lon,
                    lat: station_lat,
                },
                distance_km: round2(distance),
            })
        })
        .collect();

    stations.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    stations
}

/// Fetches the zoom-11 station tile containing `(lon, lat)` and filters it.
pub async fn find_nearby_stations(
    client: &MlitClient,
    lon: f64,
    lat: f64,
    radius_km: f64,
) -> Result<Vec<NearbyStation>> {
    validate_query(lon, lat, radius_km)?;
    let tile = lon_lat_to_tile(lon, lat, SEARCH_ZOOM);
    let geojson = client.fetch_stations(tile).await?;
    Ok(stations_within(&geojson, lon, lat, radius_km))
}
