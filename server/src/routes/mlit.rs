use crate::{AppState, error::ApiError};
use axum::{
    Json,
    extract::{Query, State},
};
use lens::geo::TileAddress;
use lens::mlit::{GEOJSON_FORMAT, TilePayload};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

const DID_MIN_ZOOM: u32 = 9;
const DID_MAX_ZOOM: u32 = 15;

fn default_format() -> String {
    GEOJSON_FORMAT.to_string()
}

#[derive(Debug, Deserialize)]
pub struct DidQuery {
    z: i64,
    x: i64,
    y: i64,
    #[serde(default = "default_format")]
    response_format: String,
    #[serde(rename = "administrativeAreaCode")]
    administrative_area_code: Option<String>,
}

/// Out-of-range tiles are pulled into the supported zoom band rather than
/// rejected.
fn requested_tile(q: &DidQuery) -> TileAddress {
    let z = q
        .z
        .clamp(i64::from(DID_MIN_ZOOM), i64::from(DID_MAX_ZOOM));
    let z = u32::try_from(z).unwrap_or(DID_MIN_ZOOM);
    let (tile, adjusted) = TileAddress::new(z, q.x, q.y).clamp_to(DID_MIN_ZOOM, DID_MAX_ZOOM);
    if adjusted || i64::from(tile.z) != q.z {
        info!(
            "Adjusted DID tile from {}/{}/{} to {}/{}/{}",
            q.z, q.x, q.y, tile.z, tile.x, tile.y
        );
    }
    tile
}

/// Proxies the densely-inhabited-district layer. Non-GeoJSON bodies are
/// returned hex-encoded under `data`.
pub async fn get_did(
    State(state): State<AppState>,
    Query(q): Query<DidQuery>,
) -> Result<Json<Value>, ApiError> {
    let tile = requested_tile(&q);
    let payload = state
        .mlit
        .fetch_did(tile, &q.response_format, q.administrative_area_code.as_deref())
        .await?;

    Ok(Json(match payload {
        TilePayload::GeoJson(value) => value,
        TilePayload::Binary(bytes) => json!({ "data": hex::encode(bytes) }),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(z: i64, x: i64, y: i64) -> DidQuery {
        DidQuery {
            z,
            x,
            y,
            response_format: default_format(),
            administrative_area_code: None,
        }
    }

    #[test]
    fn test_in_range_tile_is_untouched() {
        assert_eq!(requested_tile(&query(12, 3638, 1612)), TileAddress::new(12, 3638, 1612));
    }

    #[test]
    fn test_zoom_and_indices_are_clamped() {
        assert_eq!(requested_tile(&query(18, 5, 5)), TileAddress::new(15, 5, 5));
        assert_eq!(requested_tile(&query(3, 900, -4)), TileAddress::new(9, 511, 0));
        assert_eq!(requested_tile(&query(-2, 0, 0)), TileAddress::new(9, 0, 0));
    }
}
