use crate::error::{LensError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MLIT_BASE_URL: &str = "https://www.reinfolib.mlit.go.jp/ex-api/external";
const DEFAULT_RENT_BASE_URL: &str = "https://suumo.jp/chintai/soba/";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub cors_origin: String,
    pub mlit_base_url: String,
    pub mlit_api_key: Option<String>,
    pub mapping_tables_path: Option<PathBuf>,
    pub scraper: ScraperSettings,
}

#[derive(Debug, Clone)]
pub struct ScraperSettings {
    pub base_url: String,
    pub max_workers: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RENT_BASE_URL.to_string(),
            max_workers: 10,
            max_retries: 3,
            retry_delay: Duration::from_millis(5000),
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
            timeout: Duration::from_secs(15),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let data_dir = PathBuf::from(dotenvy::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));

        let bind_addr = dotenvy::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());

        let cors_origin =
            dotenvy::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mlit_base_url =
            dotenvy::var("MLIT_BASE_URL").unwrap_or_else(|_| DEFAULT_MLIT_BASE_URL.to_string());

        let mlit_api_key = dotenvy::var("MLIT_API_KEY").ok().filter(|s| !s.is_empty());

        let mapping_tables_path = dotenvy::var("MAPPING_TABLES_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let max_workers = parse_env::<usize>("SCRAPER_MAX_WORKERS", 10)?;
        if max_workers == 0 {
            return Err(LensError::Config(
                "SCRAPER_MAX_WORKERS must be at least 1".to_string(),
            ));
        }

        let min_delay = Duration::from_millis(parse_env::<u64>("SCRAPER_MIN_DELAY_MS", 1000)?);
        let max_delay = Duration::from_millis(parse_env::<u64>("SCRAPER_MAX_DELAY_MS", 3000)?);
        if min_delay > max_delay {
            return Err(LensError::Config(
                "SCRAPER_MIN_DELAY_MS must not exceed SCRAPER_MAX_DELAY_MS".to_string(),
            ));
        }

        let scraper = ScraperSettings {
            base_url: dotenvy::var("RENT_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_RENT_BASE_URL.to_string()),
            max_workers,
            max_retries: parse_env::<u32>("SCRAPER_MAX_RETRIES", 3)?,
            retry_delay: Duration::from_millis(parse_env::<u64>("SCRAPER_RETRY_DELAY_MS", 5000)?),
            min_delay,
            max_delay,
            timeout: Duration::from_secs(parse_env::<u64>("SCRAPER_TIMEOUT_SECS", 15)?),
        };

        Ok(Config {
            data_dir,
            bind_addr,
            cors_origin,
            mlit_base_url,
            mlit_api_key,
            mapping_tables_path,
            scraper,
        })
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::new(&self.data_dir)
    }
}

/// File locations of every dataset and artifact, rooted at `DATA_DIR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub station_data: PathBuf,
    pub rent_data: PathBuf,
    pub combined_output: PathBuf,
    pub comparison_dir: PathBuf,
    pub areacode_output: PathBuf,
    pub station_geojson: PathBuf,
    /// Local station catalog with passenger counts, served by the lookup routes.
    pub passenger_geojson: PathBuf,
    pub areacode_csv: PathBuf,
    pub prefecture_codes: PathBuf,
}

impl DataPaths {
    pub fn new(root: &Path) -> Self {
        let processed = root.join("processed");
        Self {
            station_data: processed.join("stationcode.json"),
            rent_data: processed.join("rent_marketprice.json"),
            combined_output: processed.join("combined_station_data.json"),
            comparison_dir: processed.join("normalization_comparison"),
            areacode_output: processed.join("areacode.json"),
            station_geojson: root.join("raw").join("geojson").join("N02-22_Station.geojson"),
            passenger_geojson: root
                .join("raw")
                .join("geojson")
                .join("S12-22_NumberOfPassengers.geojson"),
            areacode_csv: root.join("raw").join("csv").join("areacode.csv"),
            prefecture_codes: root.join("const").join("prefecture_codes.json"),
        }
    }
}

/// Reads `key` as `T`. Values that do not fit `T` are rejected, not truncated.
fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match dotenvy::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| LensError::Config(format!("Invalid {key}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_layout() {
        let paths = DataPaths::new(Path::new("/srv/data"));
        assert_eq!(
            paths.station_data,
            PathBuf::from("/srv/data/processed/stationcode.json")
        );
        assert_eq!(
            paths.comparison_dir,
            PathBuf::from("/srv/data/processed/normalization_comparison")
        );
        assert_eq!(
            paths.station_geojson,
            PathBuf::from("/srv/data/raw/geojson/N02-22_Station.geojson")
        );
        assert_eq!(
            paths.passenger_geojson,
            PathBuf::from("/srv/data/raw/geojson/S12-22_NumberOfPassengers.geojson")
        );
    }

    #[test]
    fn test_default_scraper_settings() {
        let settings = ScraperSettings::default();
        assert_eq!(settings.max_workers, 10);
        assert_eq!(settings.max_retries, 3);
        assert!(settings.min_delay <= settings.max_delay);
    }
}
