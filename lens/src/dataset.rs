//! Tabular station datasets and their normalized join keys.

use crate::error::{LensError, Result};
use crate::mapping::MappingTables;
use crate::text::normalize_value;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// One row of a dataset, field order preserved.
pub type Record = Map<String, Value>;

pub const COMPANY: &str = "company";
pub const LINE: &str = "line";
pub const STATION: &str = "station";

/// The composite key shared by both station datasets.
pub const STATION_KEYS: [&str; 3] = [COMPANY, LINE, STATION];

/// Which mapping tables to apply after text normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingOptions {
    pub company: bool,
    pub line: bool,
}

impl MappingOptions {
    pub const NONE: Self = Self {
        company: false,
        line: false,
    };
    pub const COMPANY: Self = Self {
        company: true,
        line: false,
    };
    pub const ALL: Self = Self {
        company: true,
        line: true,
    };
}

/// Name of the column holding the normalized value of `field`.
pub fn norm_field(field: &str) -> String {
    format!("norm_{field}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub record: Record,
    /// Normalized values, parallel to the dataset's key fields.
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDataset {
    key_fields: Vec<String>,
    rows: Vec<NormalizedRow>,
}

impl NormalizedDataset {
    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.key_fields.iter().position(|f| f == field)
    }

    /// Projects every row onto the given key fields, in the order given.
    /// Unknown fields project to nothing.
    pub fn project(&self, fields: &[&str]) -> Vec<Vec<&str>> {
        let Some(indices) = fields
            .iter()
            .map(|f| self.field_index(f))
            .collect::<Option<Vec<_>>>()
        else {
            return Vec::new();
        };

        self.rows
            .iter()
            .map(|row| indices.iter().map(|&i| row.keys[i].as_str()).collect())
            .collect()
    }

    /// Distinct normalized values of one key field.
    pub fn distinct(&self, field: &str) -> BTreeSet<String> {
        self.project(&[field])
            .into_iter()
            .filter_map(|mut v| v.pop().map(str::to_string))
            .collect()
    }

    /// Rows with the `norm_*` columns appended after the original fields.
    pub fn into_records(self) -> Vec<Record> {
        let key_fields = self.key_fields;
        self.rows
            .into_iter()
            .map(|row| {
                let mut record = row.record;
                for (field, value) in key_fields.iter().zip(row.keys) {
                    record.insert(norm_field(field), Value::String(value));
                }
                record
            })
            .collect()
    }
}

/// Interprets a JSON document as a table: an array of objects.
pub fn parse_records(value: Value) -> Result<Vec<Record>> {
    let Value::Array(items) = value else {
        return Err(LensError::DataFormat(
            "dataset must be a JSON array of objects".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(LensError::DataFormat(format!(
                "row {index} is not an object: {other}"
            ))),
        })
        .collect()
}

pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text).map_err(|e| {
        LensError::DataFormat(format!("{} is not well-formed JSON: {e}", path.display()))
    })?;
    let records = parse_records(value)?;
    info!("Loaded {} -> {} records", path.display(), records.len());
    Ok(records)
}

/// Drops rows whose raw key tuple was already seen, keeping the first.
/// Missing and `null` cells compare equal to each other.
pub fn dedup_records(records: Vec<Record>, key_fields: &[&str]) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let key: Vec<Option<String>> = key_fields
                .iter()
                .map(|field| match record.get(*field) {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(value.to_string()),
                })
                .collect();
            seen.insert(key)
        })
        .collect()
}

/// Deduplicates `records`, computes a normalized value per key field and
/// applies the requested mapping tables (company first, then line).
///
/// Fails with [`LensError::DataFormat`] when a key field appears in no row
/// of a non-empty dataset.
pub fn normalize_dataset(
    records: Vec<Record>,
    key_fields: &[&str],
    tables: &MappingTables,
    options: MappingOptions,
) -> Result<NormalizedDataset> {
    let missing: Vec<&str> = key_fields
        .iter()
        .copied()
        .filter(|field| !records.iter().any(|r| r.contains_key(*field)))
        .collect();
    if !records.is_empty() && !missing.is_empty() {
        return Err(LensError::DataFormat(format!(
            "required key fields {missing:?} are missing from the dataset"
        )));
    }

    let total = records.len();
    let unique = dedup_records(records, key_fields);
    debug!("Deduplicated {} -> {} records", total, unique.len());

    let company_index = key_fields.iter().position(|f| *f == COMPANY);
    let line_index = key_fields.iter().position(|f| *f == LINE);

    let rows = unique
        .into_iter()
        .map(|record| {
            let mut keys: Vec<String> = key_fields
                .iter()
                .map(|field| normalize_value(record.get(*field)))
                .collect();

            if options.company
                && let Some(i) = company_index
            {
                keys[i] = tables.company.apply(&keys[i]).to_string();
            }
            if options.line
                && let Some(i) = line_index
            {
                keys[i] = tables.line.apply(&keys[i]).to_string();
            }

            NormalizedRow { record, keys }
        })
        .collect();

    Ok(NormalizedDataset {
        key_fields: key_fields.iter().map(|f| (*f).to_string()).collect(),
        rows,
    })
}

/// Loads and normalizes a station dataset on the `company/line/station` key.
pub fn load_station_dataset(
    path: &Path,
    tables: &MappingTables,
    options: MappingOptions,
) -> Result<NormalizedDataset> {
    let records = load_records(path)?;
    normalize_dataset(records, &STATION_KEYS, tables, options)
}
