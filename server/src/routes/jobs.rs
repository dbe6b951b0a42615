//! Data-preparation jobs. Each handler starts its job in the background and
//! answers immediately; outcomes only show up in the logs.

use crate::{AppState, error::ApiError};
use axum::{
    Json,
    extract::{Path, State},
};
use lens::compare::{Granularity, generate_all_comparison_files, generate_comparison_file};
use lens::merge::combine_data;
use lens::scraper::run_rent_scraping;
use lens::trimmer::{self, TrimJob};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Serialize)]
pub struct JobStarted {
    message: String,
}

impl JobStarted {
    fn reply(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

fn spawn_file_job<F>(label: String, job: F)
where
    F: FnOnce() -> lens::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(move || match job() {
        Ok(()) => info!("{} finished", label),
        Err(e) => error!("{} failed: {}", label, e),
    });
}

pub async fn run_scraping(State(state): State<AppState>) -> Json<JobStarted> {
    let settings = state.config.scraper.clone();
    let paths = state.paths.clone();
    tokio::spawn(async move {
        if let Err(e) =
            run_rent_scraping(settings, &paths.rent_data, &paths.prefecture_codes).await
        {
            error!("Rent scraping failed: {}", e);
        }
    });
    JobStarted::reply("Rent scraping task has been started.")
}

pub async fn run_data_trimming(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<JobStarted>, ApiError> {
    let paths = state.paths.clone();
    if name == "all" {
        spawn_file_job("Data trimming for all jobs".to_string(), move || {
            trimmer::run_all(&paths).map(|_| ())
        });
    } else {
        let job = TrimJob::from_name(&name).map_err(|e| ApiError::NotFound(e.to_string()))?;
        spawn_file_job(format!("Data trimming '{name}'"), move || {
            trimmer::run_job(job, job.input(&paths), job.output(&paths)).map(|_| ())
        });
    }
    Ok(JobStarted::reply(format!(
        "Data trimming for '{name}' has been started."
    )))
}

pub async fn run_data_combination(State(state): State<AppState>) -> Json<JobStarted> {
    let paths = state.paths.clone();
    let tables = state.tables.clone();
    spawn_file_job("Data combination".to_string(), move || {
        combine_data(
            &paths.station_data,
            &paths.rent_data,
            &paths.combined_output,
            &tables,
        )
        .map(|_| ())
    });
    JobStarted::reply("Data combination task has been started.")
}

/// `all` writes every comparison level; otherwise one of `company`, `line`
/// or `station`.
pub async fn run_normalization_helper(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> Result<Json<JobStarted>, ApiError> {
    let paths = state.paths.clone();
    let tables = state.tables.clone();

    if level == "all" {
        spawn_file_job("All comparison files".to_string(), move || {
            generate_all_comparison_files(
                &paths.station_data,
                &paths.rent_data,
                &paths.comparison_dir,
                &tables,
            )
        });
        return Ok(JobStarted::reply(
            "All normalization comparison file generation has been started.",
        ));
    }

    let granularity = Granularity::parse(&level).ok_or_else(|| {
        ApiError::NotFound(format!(
            "Unknown comparison level '{level}'. Use all, company, line or station."
        ))
    })?;
    spawn_file_job(format!("{} comparison", granularity.prefix()), move || {
        generate_comparison_file(
            granularity,
            &paths.station_data,
            &paths.rent_data,
            &paths.comparison_dir,
            &tables,
        )
        .map(|_| ())
    });
    Ok(JobStarted::reply(format!(
        "{} comparison file generation has been started.",
        granularity.prefix()
    )))
}
