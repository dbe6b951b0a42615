//! HTTP surface for the lens toolkit.
//!
//! The binary and the integration tests both build their router through
//! [`build_router`].

pub mod error;
pub mod routes;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use lens::{Config, DataPaths, MappingTables, mlit::MlitClient};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub paths: Arc<DataPaths>,
    pub tables: Arc<MappingTables>,
    pub mlit: Arc<MlitClient>,
}

impl AppState {
    pub fn new(config: Config, tables: MappingTables) -> lens::Result<Self> {
        let mlit = MlitClient::new(config.mlit_base_url.clone(), config.mlit_api_key.clone())?;
        Ok(Self {
            paths: Arc::new(config.paths()),
            config: Arc::new(config),
            tables: Arc::new(tables),
            mlit: Arc::new(mlit),
        })
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(e) => {
            warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            layer
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
