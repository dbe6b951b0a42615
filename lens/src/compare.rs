//! Naming-mismatch reports between the station dataset and the rent dataset.
//!
//! Each level narrows the comparison to what the previous level already
//! agrees on, so an operator can fix company names first, then lines, then
//! stations, by adding entries to the mapping tables.

use crate::dataset::{COMPANY, LINE, MappingOptions, NormalizedDataset, STATION, load_station_dataset};
use crate::error::Result;
use crate::mapping::MappingTables;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

const TUPLE_SEPARATOR: &str = " / ";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Company,
    Line,
    Station,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Self::Company, Self::Line, Self::Station];

    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Company => "company_normalized",
            Self::Line => "line_in_common_company",
            Self::Station => "station_in_common_line",
        }
    }

    /// Line mapping only matters once companies line up.
    pub const fn mapping(self) -> MappingOptions {
        match self {
            Self::Company | Self::Line => MappingOptions::COMPANY,
            Self::Station => MappingOptions::ALL,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "company" => Some(Self::Company),
            "line" => Some(Self::Line),
            "station" => Some(Self::Station),
            _ => None,
        }
    }
}

/// Keys found on only one side, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySetDiff {
    pub main_only: Vec<String>,
    pub lookup_only: Vec<String>,
}

impl KeySetDiff {
    pub fn between(main: &BTreeSet<String>, lookup: &BTreeSet<String>) -> Self {
        Self {
            main_only: main.difference(lookup).cloned().collect(),
            lookup_only: lookup.difference(main).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.main_only.is_empty() && self.lookup_only.is_empty()
    }
}

/// Renders a key tuple in fixed field order. Normalized values never
/// contain spaces, so the separator cannot be ambiguous.
pub fn render_key(parts: &[&str]) -> String {
    parts.join(TUPLE_SEPARATOR)
}

fn key_set<'a>(rows: impl IntoIterator<Item = Vec<&'a str>>) -> BTreeSet<String> {
    rows.into_iter().map(|parts| render_key(&parts)).collect()
}

/// Companies present on one side only. Both datasets should be normalized
/// with company mapping.
pub fn compare_companies(main: &NormalizedDataset, lookup: &NormalizedDataset) -> KeySetDiff {
    KeySetDiff::between(&main.distinct(COMPANY), &lookup.distinct(COMPANY))
}

/// `(company, line)` pairs present on one side only, among companies that
/// both datasets know.
pub fn compare_lines(main: &NormalizedDataset, lookup: &NormalizedDataset) -> KeySetDiff {
    let main_companies = main.distinct(COMPANY);
    let lookup_companies = lookup.distinct(COMPANY);
    let common: BTreeSet<String> = main_companies
        .intersection(&lookup_companies)
        .cloned()
        .collect();

    let pairs = |dataset: &NormalizedDataset| {
        key_set(
            dataset
                .project(&[COMPANY, LINE])
                .into_iter()
                .filter(|p| common.contains(p[0])),
        )
    };

    KeySetDiff::between(&pairs(main), &pairs(lookup))
}

/// `(company, line, station)` triples present on one side only, among
/// `(company, line)` pairs that both datasets know. Both datasets should be
/// normalized with company and line mapping.
pub fn compare_stations(main: &NormalizedDataset, lookup: &NormalizedDataset) -> KeySetDiff {
    let main_lines = key_set(main.project(&[COMPANY, LINE]));
    let lookup_lines = key_set(lookup.project(&[COMPANY, LINE]));
    let common: BTreeSet<String> = main_lines.intersection(&lookup_lines).cloned().collect();

    let triples = |dataset: &NormalizedDataset| {
        key_set(
            dataset
                .project(&[COMPANY, LINE, STATION])
                .into_iter()
                .filter(|t| common.contains(render_key(&t[..2]).as_str())),
        )
    };

    KeySetDiff::between(&triples(main), &triples(lookup))
}

pub fn compare(
    granularity: Granularity,
    main: &NormalizedDataset,
    lookup: &NormalizedDataset,
) -> KeySetDiff {
    match granularity {
        Granularity::Company => compare_companies(main, lookup),
        Granularity::Line => compare_lines(main, lookup),
        Granularity::Station => compare_stations(main, lookup),
    }
}

/// Writes `<prefix>_comparison.csv` with one column per side. The shorter
/// column is padded with empty cells.
pub fn write_comparison_csv(
    output_dir: &Path,
    granularity: Granularity,
    diff: &KeySetDiff,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let prefix = granularity.prefix();
    let path = output_dir.join(format!("{prefix}_comparison.csv"));

    let mut file = File::create(&path)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record([format!("{prefix}_main_only"), format!("{prefix}_lookup_only")])?;

    let rows = diff.main_only.len().max(diff.lookup_only.len());
    for i in 0..rows {
        writer.write_record([
            diff.main_only.get(i).map_or("", String::as_str),
            diff.lookup_only.get(i).map_or("", String::as_str),
        ])?;
    }
    writer.flush()?;

    info!("Saved {} comparison CSV to {}", prefix, path.display());
    Ok(path)
}

/// Loads both datasets, compares them at `granularity` and writes the CSV.
pub fn generate_comparison_file(
    granularity: Granularity,
    main_path: &Path,
    lookup_path: &Path,
    output_dir: &Path,
    tables: &MappingTables,
) -> Result<KeySetDiff> {
    info!("Generating {} comparison", granularity.prefix());
    let options = granularity.mapping();
    let main = load_station_dataset(main_path, tables, options)?;
    let lookup = load_station_dataset(lookup_path, tables, options)?;

    let diff = compare(granularity, &main, &lookup);
    write_comparison_csv(output_dir, granularity, &diff)?;
    info!(
        "{}: {} main-only, {} lookup-only",
        granularity.prefix(),
        diff.main_only.len(),
        diff.lookup_only.len()
    );
    Ok(diff)
}

/// Runs every level in order. A failing level is logged and does not stop
/// the others; the first error is returned at the end.
pub fn generate_all_comparison_files(
    main_path: &Path,
    lookup_path: &Path,
    output_dir: &Path,
    tables: &MappingTables,
) -> Result<()> {
    let mut first_error = None;
    for granularity in Granularity::ALL {
        if let Err(e) =
            generate_comparison_file(granularity, main_path, lookup_path, output_dir, tables)
        {
            error!("{} comparison aborted: {}", granularity.prefix(), e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
