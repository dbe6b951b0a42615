mod jobs;
mod mlit;
mod stations;
mod xyz;

use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/xyz/lon-lat-to-xyz", get(xyz::lon_lat_to_xyz))
        .route("/api/xyz/tile-center", get(xyz::tile_center))
        .route("/api/xyz/tile-bbox", get(xyz::tile_bbox))
        .route(
            "/api/stations/get_near_by_coordinates",
            get(stations::get_near_by_coordinates),
        )
        .route(
            "/api/stations/get_stations_by_line_and_company",
            get(stations::get_stations_by_line_and_company),
        )
        .route(
            "/api/stations/get_coordinates_by_stationid",
            get(stations::get_coordinates_by_stationid),
        )
        .route("/api/mlit/did", get(mlit::get_did))
        .route("/run-scraping", post(jobs::run_scraping))
        .route("/run-data-trimming/{name}", post(jobs::run_data_trimming))
        .route("/run-data-combination", post(jobs::run_data_combination))
        .route(
            "/normalization_helper/{level}",
            post(jobs::run_normalization_helper),
        )
}
