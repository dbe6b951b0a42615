use crate::error::ApiError;
use axum::{Json, extract::Query};
use lens::geo::{self, BBox, LonLat, TileAddress};
use serde::Deserialize;

/// Deepest zoom the conversion endpoints accept.
const MAX_ZOOM: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct LonLatQuery {
    lon: f64,
    lat: f64,
    z: u32,
}

#[derive(Debug, Deserialize)]
pub struct TileQuery {
    x: i64,
    y: i64,
    z: u32,
}

fn check_zoom(z: u32) -> Result<(), ApiError> {
    if z > MAX_ZOOM {
        return Err(ApiError::BadRequest(format!(
            "zoom {z} is outside [0, {MAX_ZOOM}]"
        )));
    }
    Ok(())
}

pub async fn lon_lat_to_xyz(
    Query(q): Query<LonLatQuery>,
) -> Result<Json<TileAddress>, ApiError> {
    check_zoom(q.z)?;
    Ok(Json(geo::lon_lat_to_tile(q.lon, q.lat, q.z)))
}

pub async fn tile_center(Query(q): Query<TileQuery>) -> Result<Json<LonLat>, ApiError> {
    check_zoom(q.z)?;
    Ok(Json(geo::tile_center(q.z, q.x, q.y)))
}

pub async fn tile_bbox(Query(q): Query<TileQuery>) -> Result<Json<BBox>, ApiError> {
    check_zoom(q.z)?;
    Ok(Json(geo::tile_bbox(q.z, q.x, q.y)))
}
