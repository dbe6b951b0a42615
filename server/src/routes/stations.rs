use crate::{AppState, error::ApiError};
use axum::{
    Json,
    extract::{Query, State},
};
use lens::catalog::{CatalogStation, StationCatalog, StationPoint};
use lens::nearby::{DEFAULT_RADIUS_KM, NearbyStation, find_nearby_stations};
use serde::{Deserialize, Serialize};
use tracing::info;

const fn default_radius() -> f64 {
    DEFAULT_RADIUS_KM
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    lon: f64,
    lat: f64,
    #[serde(default = "default_radius")]
    radius: f64,
}

#[derive(Debug, Deserialize)]
pub struct LineQuery {
    line_name: String,
    company: String,
}

#[derive(Debug, Deserialize)]
pub struct StationIdQuery {
    station_id: String,
}

#[derive(Debug, Serialize)]
pub struct LineStations {
    stations: Vec<CatalogStation>,
    total: usize,
}

#[derive(Debug, Serialize)]
pub struct StationCoordinates {
    station_id: String,
    coordinates: StationPoint,
}

/// Stations within `radius` km of the point, nearest first.
pub async fn get_near_by_coordinates(
    State(state): State<AppState>,
    Query(q): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyStation>>, ApiError> {
    let stations = find_nearby_stations(&state.mlit, q.lon, q.lat, q.radius).await?;
    info!(
        "Found {} stations within {} km of ({}, {})",
        stations.len(),
        q.radius,
        q.lon,
        q.lat
    );
    Ok(Json(stations))
}

async fn load_catalog(state: &AppState) -> Result<StationCatalog, ApiError> {
    let path = state.paths.passenger_geojson.clone();
    tokio::task::spawn_blocking(move || StationCatalog::load(&path))
        .await
        .map_err(|e| ApiError::Internal(format!("catalog loader stopped: {e}")))?
        .map_err(ApiError::from)
}

pub async fn get_stations_by_line_and_company(
    State(state): State<AppState>,
    Query(q): Query<LineQuery>,
) -> Result<Json<LineStations>, ApiError> {
    let catalog = load_catalog(&state).await?;
    let stations = catalog.stations_on_line(&q.line_name, &q.company);
    if stations.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No stations for line '{}' run by '{}'",
            q.line_name, q.company
        )));
    }
    Ok(Json(LineStations {
        total: stations.len(),
        stations,
    }))
}

pub async fn get_coordinates_by_stationid(
    State(state): State<AppState>,
    Query(q): Query<StationIdQuery>,
) -> Result<Json<StationCoordinates>, ApiError> {
    let catalog = load_catalog(&state).await?;
    let coordinates = catalog
        .coordinates_of(&q.station_id)
        .ok_or_else(|| ApiError::NotFound(format!("Station '{}' not found", q.station_id)))?;
    Ok(Json(StationCoordinates {
        station_id: q.station_id,
        coordinates,
    }))
}
