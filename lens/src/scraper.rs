use crate::config::ScraperSettings;
use crate::error::{LensError, Result};
use crate::html_parser::{self, CompanyLines, Prefecture, StationRent};
use futures::{StreamExt, stream};
use rand::Rng;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0",
];
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "ja,en-US;q=0.9,en;q=0.8";

/// One station's market rent, in units of 10,000 yen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentRecord {
    pub prefecture: String,
    pub company: String,
    pub line: String,
    pub station: String,
    pub rent: f64,
    #[serde(default)]
    pub lastupdate: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeStats {
    pub prefecture_total: usize,
    pub prefectures_with_lines: usize,
    pub station_records: usize,
}

pub struct RentScraper {
    client: Client,
    settings: ScraperSettings,
    base_url: Url,
}

impl RentScraper {
    pub fn new(settings: ScraperSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| LensError::Config(format!("Invalid RENT_BASE_URL: {e}")))?;

        let client = Client::builder()
            .cookie_store(true)
            .timeout(settings.timeout)
            .build()
            .map_err(LensError::Http)?;

        Ok(Self {
            client,
            settings,
            base_url,
        })
    }

    fn request_delay(&self) -> Duration {
        let min = self.settings.min_delay.as_millis() as u64;
        let max = self.settings.max_delay.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    fn user_agent() -> &'static str {
        USER_AGENTS[rand::rng().random_range(0..USER_AGENTS.len())]
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", Self::user_agent())
            .header("Accept", ACCEPT)
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(LensError::ServiceUnavailable);
        }
        if !status.is_success() {
            return Err(LensError::InvalidResponse(format!(
                "HTTP {} for url={}",
                status, url
            )));
        }

        let html = response.text().await?;
        debug!("Fetched {} ({} bytes)", url, html.len());
        Ok(html)
    }

    /// GET with a random pre-request delay and fixed-delay retries. `None`
    /// once every attempt has failed.
    async fn fetch_with_retry(&self, url: &str, context: &str) -> Option<String> {
        let attempts = self.settings.max_retries.max(1);

        for attempt in 1..=attempts {
            tokio::time::sleep(self.request_delay()).await;

            match self.fetch_page(url).await {
                Ok(html) => return Some(html),
                Err(e) => {
                    warn!(
                        "Request failed ({}, attempt {}/{}): {} ({})",
                        context, attempt, attempts, e, url
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }

        error!("Giving up on {} after {} attempts: {}", context, attempts, url);
        None
    }

    pub async fn fetch_prefectures(&self) -> Result<Vec<Prefecture>> {
        let url = self.base_url.as_str();
        match self.fetch_with_retry(url, "prefecture list").await {
            Some(html) => html_parser::parse_prefectures(&html, &self.base_url),
            None => Ok(Vec::new()),
        }
    }

    pub async fn fetch_lines(&self, prefecture: &Prefecture) -> Result<Vec<CompanyLines>> {
        let page_url = Url::parse(&prefecture.url)
            .map_err(|e| LensError::Parse(format!("Invalid prefecture URL: {e}")))?;
        match self.fetch_with_retry(&prefecture.url, "line list").await {
            Some(html) => html_parser::parse_lines(&html, &page_url),
            None => Ok(Vec::new()),
        }
    }

    pub async fn fetch_station_rents(&self, line_url: &str) -> Result<Vec<StationRent>> {
        match self.fetch_with_retry(line_url, "station rents").await {
            Some(html) => html_parser::parse_station_rents(&html),
            None => Ok(Vec::new()),
        }
    }

    /// Walks every prefecture, then every line page, with at most
    /// `max_workers` requests in flight per stage.
    pub async fn scrape(&self) -> (Vec<RentRecord>, ScrapeStats) {
        let prefectures = match self.fetch_prefectures().await {
            Ok(prefectures) => prefectures,
            Err(e) => {
                error!("Failed to parse prefecture list: {}", e);
                Vec::new()
            }
        };

        let mut stats = ScrapeStats {
            prefecture_total: prefectures.len(),
            ..ScrapeStats::default()
        };
        if prefectures.is_empty() {
            error!("No prefectures found, nothing to scrape");
            return (Vec::new(), stats);
        }

        let workers = self.settings.max_workers.max(1);

        let line_results: Vec<(Prefecture, Result<Vec<CompanyLines>>)> =
            stream::iter(prefectures)
                .map(move |prefecture| async move {
                    let result = self.fetch_lines(&prefecture).await;
                    (prefecture, result)
                })
                .buffer_unordered(workers)
                .collect()
                .await;

        let mut line_jobs = Vec::new();
        for (prefecture, result) in line_results {
            match result {
                Ok(companies) if !companies.is_empty() => {
                    stats.prefectures_with_lines += 1;
                    for company in companies {
                        for line in company.lines {
                            line_jobs.push((prefecture.name.clone(), company.company.clone(), line));
                        }
                    }
                }
                Ok(_) => info!("No lines listed for {} ({})", prefecture.name, prefecture.url),
                Err(e) => error!(
                    "Failed to read line list of {} ({}): {}",
                    prefecture.name, prefecture.url, e
                ),
            }
        }
        info!("Fetching rents for {} lines", line_jobs.len());

        let records: Vec<Vec<RentRecord>> = stream::iter(line_jobs)
            .map(move |(prefecture, company, line)| async move {
                match self.fetch_station_rents(&line.url).await {
                    Ok(rows) => to_records(&prefecture, &company, &line.name, rows),
                    Err(e) => {
                        error!("Failed to read rents of {} / {}: {}", prefecture, line.name, e);
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let records: Vec<RentRecord> = records.into_iter().flatten().collect();
        stats.station_records = records.len();
        (records, stats)
    }
}

fn to_records(prefecture: &str, company: &str, line: &str, rows: Vec<StationRent>) -> Vec<RentRecord> {
    if rows.is_empty() {
        info!("No station rows for {} / {}", prefecture, line);
    }
    rows.into_iter()
        .filter_map(|row| {
            if row.station.is_empty() {
                return None;
            }
            let Some(rent) = html_parser::parse_rent(&row.rent) else {
                if row.rent != html_parser::UNKNOWN && row.rent != "---" {
                    warn!(
                        "Unreadable rent '{}' skipped ({}, {}, {})",
                        row.rent, prefecture, line, row.station
                    );
                }
                return None;
            };
            Some(RentRecord {
                prefecture: prefecture.to_string(),
                company: company.to_string(),
                line: line.to_string(),
                station: row.station,
                rent,
                lastupdate: None,
            })
        })
        .collect()
}

/// Reads a `{"北海道": "01", ...}` map. Codes may be strings or numbers;
/// entries that are neither are left out. A missing or broken file yields
/// an empty map.
pub fn load_prefecture_codes(path: &Path) -> HashMap<String, i64> {
    let parsed = std::fs::read_to_string(path)
        .map_err(LensError::from)
        .and_then(|text| serde_json::from_str::<HashMap<String, Value>>(&text).map_err(LensError::from));

    match parsed {
        Ok(map) => map
            .into_iter()
            .filter_map(|(name, code)| {
                let code = match code {
                    Value::String(s) => s.trim().parse().ok(),
                    Value::Number(n) => n.as_i64(),
                    _ => None,
                }?;
                Some((name, code))
            })
            .collect(),
        Err(e) => {
            error!("Cannot read prefecture codes from {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}

/// Stable sort by prefecture code; prefectures without a code go last.
/// An empty map leaves the order untouched.
pub fn sort_by_prefecture_code(records: &mut [RentRecord], codes: &HashMap<String, i64>) {
    if codes.is_empty() {
        warn!("Prefecture code map is empty, skipping sort");
        return;
    }
    records.sort_by_key(|r| codes.get(&r.prefecture).copied().unwrap_or(i64::MAX));

    let mut unknown: Vec<&str> = records
        .iter()
        .filter(|r| !codes.contains_key(&r.prefecture))
        .map(|r| r.prefecture.as_str())
        .collect();
    unknown.sort_unstable();
    unknown.dedup();
    if !unknown.is_empty() {
        info!("Prefectures without a code, order not guaranteed: {:?}", unknown);
    }
}

/// Stamps every record with the same `lastupdate` and writes the file.
pub fn save_rent_data(records: &mut [RentRecord], path: &Path) -> Result<()> {
    let now = chrono::Local::now().to_rfc3339();
    for record in records.iter_mut() {
        record.lastupdate = Some(now.clone());
    }
    crate::io::write_json_pretty(path, records)?;
    info!("Saved {} rent records to {}", records.len(), path.display());
    Ok(())
}

/// Full scraping job: scrape, sort by prefecture code, save.
pub async fn run_rent_scraping(
    settings: ScraperSettings,
    output: &Path,
    prefecture_codes: &Path,
) -> Result<ScrapeStats> {
    info!("Starting rent scraping from {}", settings.base_url);
    let started = std::time::Instant::now();

    let scraper = RentScraper::new(settings)?;
    let (mut records, stats) = scraper.scrape().await;

    let codes = load_prefecture_codes(prefecture_codes);
    sort_by_prefecture_code(&mut records, &codes);
    save_rent_data(&mut records, output)?;

    info!(
        "Rent scraping finished in {:.2}s: {} prefectures, {} with lines, {} stations",
        started.elapsed().as_secs_f64(),
        stats.prefecture_total,
        stats.prefectures_with_lines,
        stats.station_records
    );
    Ok(stats)
}
