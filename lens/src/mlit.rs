//! Client for the land-information tile API (stations and densely inhabited
//! districts).

use crate::error::{LensError, Result};
use crate::geo::TileAddress;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

const STATIONS_ENDPOINT: &str = "XKT015";
const DID_ENDPOINT: &str = "XKT031";
const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const GEOJSON_FORMAT: &str = "geojson";

/// Body of a tile response: parsed GeoJSON, or the raw bytes of any other
/// format (vector tiles).
#[derive(Debug, Clone, PartialEq)]
pub enum TilePayload {
    GeoJson(Value),
    Binary(Vec<u8>),
}

pub struct MlitClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MlitClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(LensError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Railway stations on one tile as GeoJSON. Fails with
    /// [`LensError::Unauthorized`] before sending anything when no key is
    /// configured.
    pub async fn fetch_stations(&self, tile: TileAddress) -> Result<Value> {
        if self.api_key.is_none() {
            return Err(LensError::Unauthorized);
        }
        match self.get_tile(STATIONS_ENDPOINT, tile, GEOJSON_FORMAT, None).await? {
            TilePayload::GeoJson(value) => Ok(value),
            TilePayload::Binary(_) => Err(LensError::InvalidResponse(
                "expected GeoJSON station data".to_string(),
            )),
        }
    }

    /// Densely inhabited district polygons on one tile. The key header is
    /// sent only when configured.
    pub async fn fetch_did(
        &self,
        tile: TileAddress,
        response_format: &str,
        area_codes: Option<&str>,
    ) -> Result<TilePayload> {
        self.get_tile(DID_ENDPOINT, tile, response_format, area_codes)
            .await
    }

    async fn get_tile(
        &self,
        endpoint: &str,
        tile: TileAddress,
        response_format: &str,
        area_codes: Option<&str>,
    ) -> Result<TilePayload> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut params = vec![
            ("response_format", response_format.to_string()),
            ("z", tile.z.to_string()),
            ("x", tile.x.to_string()),
            ("y", tile.y.to_string()),
        ];
        if let Some(codes) = area_codes.filter(|c| !c.is_empty()) {
            params.push(("administrativeAreaCode", codes.to_string()));
        }

        let mut request = self.client.get(&url).query(&params);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        info!("Requesting {} for tile {}/{}/{}", endpoint, tile.z, tile.x, tile.y);
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                error!("Timeout requesting {}", url);
                LensError::Timeout
            } else {
                error!("Transport error requesting {}: {}", url, e);
                LensError::UpstreamServer
            }
        })?;

        let status = response.status();
        debug!("{} responded with {}", endpoint, status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{} error response {}: {}", endpoint, status, body);
            return Err(status_error(status, body));
        }

        if response_format == GEOJSON_FORMAT {
            let value = response
                .json::<Value>()
                .await
                .map_err(|e| LensError::InvalidResponse(format!("{endpoint}: {e}")))?;
            Ok(TilePayload::GeoJson(value))
        } else {
            let bytes = response.bytes().await.map_err(|_| LensError::UpstreamServer)?;
            Ok(TilePayload::Binary(bytes.to_vec()))
        }
    }
}

fn status_error(status: StatusCode, body: String) -> LensError {
    match status {
        StatusCode::UNAUTHORIZED => LensError::Unauthorized,
        StatusCode::BAD_REQUEST => LensError::BadRequest(body),
        StatusCode::NOT_FOUND => LensError::NotFound,
        s if s.is_server_error() => LensError::UpstreamServer,
        s => LensError::InvalidResponse(format!("unexpected status {s}")),
    }
}
