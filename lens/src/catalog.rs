//! Lookups over the local station catalog (passenger-count GeoJSON).

use crate::error::{LensError, Result};
use crate::geo::average_coordinates;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

const NAME: &str = "S12_001";
const CODE: &str = "S12_001c";
const COMPANY: &str = "S12_002";
const LINE: &str = "S12_003";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StationPoint {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStation {
    pub station_code: String,
    pub name: String,
    pub line_name: String,
    pub company: String,
    pub coordinates: StationPoint,
}

/// The catalog's features, loaded once per lookup.
#[derive(Debug, Clone)]
pub struct StationCatalog {
    features: Vec<Value>,
}

fn text(properties: &Value, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn centroid(feature: &Value) -> Option<StationPoint> {
    let coordinates = feature.get("geometry")?.get("coordinates")?;
    match average_coordinates(coordinates) {
        Ok([lng, lat]) => Some(StationPoint { lng, lat }),
        Err(e) => {
            warn!("Skipping catalog feature without usable geometry: {}", e);
            None
        }
    }
}

impl StationCatalog {
    pub fn from_geojson(geojson: Value) -> Result<Self> {
        match geojson {
            Value::Object(mut root) => match root.remove("features") {
                Some(Value::Array(features)) => Ok(Self { features }),
                _ => Err(LensError::DataFormat(
                    "station catalog has no features array".to_string(),
                )),
            },
            _ => Err(LensError::DataFormat(
                "station catalog is not a GeoJSON object".to_string(),
            )),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_geojson(serde_json::from_str(&raw)?)?;
        info!("Loaded {} catalog features from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Every station on `line_name` run by `company`, exact match on both.
    pub fn stations_on_line(&self, line_name: &str, company: &str) -> Vec<CatalogStation> {
        self.features
            .iter()
            .filter_map(|feature| {
                let properties = feature.get("properties")?;
                if text(properties, LINE).as_deref() != Some(line_name)
                    || text(properties, COMPANY).as_deref() != Some(company)
                {
                    return None;
                }
                Some(CatalogStation {
                    station_code: text(properties, CODE).unwrap_or_default(),
                    name: text(properties, NAME).unwrap_or_default(),
                    line_name: line_name.to_string(),
                    company: company.to_string(),
                    coordinates: centroid(feature)?,
                })
            })
            .collect()
    }

    /// Centroid of the first feature carrying `station_id`.
    pub fn coordinates_of(&self, station_id: &str) -> Option<StationPoint> {
        self.features
            .iter()
            .find(|feature| {
                feature
                    .get("properties")
                    .and_then(|p| text(p, CODE))
                    .is_some_and(|code| code == station_id)
            })
            .and_then(centroid)
    }
}
