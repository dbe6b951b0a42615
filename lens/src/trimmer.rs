//! Reduces the raw survey files to the small JSON datasets the rest of the
//! pipeline reads.

use crate::config::DataPaths;
use crate::dataset::Record;
use crate::error::{LensError, Result};
use crate::geo::average_coordinates;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// `(GeoJSON property, output field)` pairs kept from the station survey.
const STATION_PROPERTIES: &[(&str, &str)] = &[
    ("N02_004", "company"),
    ("N02_003", "line"),
    ("N02_005", "station"),
    ("N02_005c", "stationcode"),
];
const STATION_GEOMETRY: &str = "LineString";
const COORDINATES_FIELD: &str = "coordinates";

/// `(CSV column, output field)` pairs kept from the area code list.
const AREACODE_COLUMNS: &[(usize, &str)] = &[
    (0, "code"),
    (1, "prefecture"),
    (2, "government_ordinance_city_county_etc"),
    (4, "city_town_village"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimJob {
    AreaCode,
    StationCode,
}

impl TrimJob {
    pub const ALL: [TrimJob; 2] = [Self::AreaCode, Self::StationCode];

    pub const fn name(self) -> &'static str {
        match self {
            Self::AreaCode => "areacode",
            Self::StationCode => "stationcode",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|job| job.name() == name)
            .ok_or_else(|| {
                let available: Vec<&str> = Self::ALL.iter().map(|job| job.name()).collect();
                LensError::Config(format!(
                    "Trimming job '{name}' not found. Available jobs: {available:?}"
                ))
            })
    }

    pub fn input(self, paths: &DataPaths) -> &Path {
        match self {
            Self::AreaCode => &paths.areacode_csv,
            Self::StationCode => &paths.station_geojson,
        }
    }

    pub fn output(self, paths: &DataPaths) -> &Path {
        match self {
            Self::AreaCode => &paths.areacode_output,
            Self::StationCode => &paths.station_data,
        }
    }
}

/// Extracts one record per `LineString` station feature, with the averaged
/// position under `coordinates`. Features whose geometry yields no point are
/// dropped.
pub fn trim_station_features(geojson: &Value) -> Result<Vec<Record>> {
    let features = match geojson.get("features") {
        None => return Ok(Vec::new()),
        Some(Value::Array(features)) => features,
        Some(_) => {
            return Err(LensError::DataFormat(
                "'features' is not an array".to_string(),
            ));
        }
    };

    let mut records = Vec::new();
    for feature in features {
        let Value::Object(feature) = feature else {
            warn!("Skipping non-object feature: {}", feature);
            continue;
        };
        let (Some(Value::Object(properties)), Some(Value::Object(geometry))) =
            (feature.get("properties"), feature.get("geometry"))
        else {
            let id = feature.get("id").cloned().unwrap_or(Value::Null);
            warn!("Skipping feature without object properties/geometry: {}", id);
            continue;
        };

        if geometry.get("type").and_then(Value::as_str) != Some(STATION_GEOMETRY) {
            continue;
        }

        let mut record: Record = STATION_PROPERTIES
            .iter()
            .filter_map(|(property, field)| {
                properties
                    .get(*property)
                    .map(|value| ((*field).to_string(), value.clone()))
            })
            .collect();

        let coordinates = geometry.get("coordinates").unwrap_or(&Value::Null);
        match average_coordinates(coordinates) {
            Ok([lon, lat]) => {
                record.insert(COORDINATES_FIELD.to_string(), serde_json::json!([lon, lat]));
            }
            Err(e) => {
                let id = properties.get(STATION_PROPERTIES[0].0).unwrap_or(&Value::Null);
                warn!("Dropping station feature {}: {}", id, e);
                continue;
            }
        }

        records.push(record);
    }
    Ok(records)
}

/// Extracts the configured columns from an area code CSV with a header row.
/// Short rows keep the columns they have.
pub fn trim_areacode_rows<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line, row) in csv_reader.records().enumerate() {
        let row = row?;
        let mut record = Record::new();
        for (index, field) in AREACODE_COLUMNS {
            match row.get(*index) {
                Some(value) => {
                    record.insert((*field).to_string(), Value::String(value.to_string()));
                }
                None => warn!(
                    "Row {} has fewer than {} columns, skipping '{}'",
                    line + 2,
                    index + 1,
                    field
                ),
            }
        }
        if !record.is_empty() {
            records.push(record);
        }
    }
    Ok(records)
}

/// Runs one job from its input file to its output file and returns the
/// number of records written.
pub fn run_job(job: TrimJob, input: &Path, output: &Path) -> Result<usize> {
    info!("Running trimming job {} on {}", job.name(), input.display());
    let records = match job {
        TrimJob::AreaCode => trim_areacode_rows(std::fs::File::open(input)?)?,
        TrimJob::StationCode => {
            let text = std::fs::read_to_string(input)?;
            let geojson: Value = serde_json::from_str(&text)?;
            trim_station_features(&geojson)?
        }
    };

    crate::io::write_json_pretty(output, &records)?;
    info!(
        "Trimming job {} wrote {} records to {}",
        job.name(),
        records.len(),
        output.display()
    );
    Ok(records.len())
}

/// Runs every job. A failing job is logged and the rest still run; the
/// output paths of the jobs that succeeded are returned, or the first error.
pub fn run_all(paths: &DataPaths) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut first_error = None;
    for job in TrimJob::ALL {
        match run_job(job, job.input(paths), job.output(paths)) {
            Ok(_) => written.push(job.output(paths).to_path_buf()),
            Err(e) => {
                error!("Trimming job {} failed: {}", job.name(), e);
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(written), Err)
}
