//! Left join of the station dataset with the rent dataset on normalized keys.

use crate::dataset::{
    MappingOptions, NormalizedDataset, Record, load_station_dataset, norm_field,
};
use crate::error::Result;
use crate::mapping::MappingTables;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use tracing::{debug, error, info};

pub const MAIN_SUFFIX: &str = "_main";
pub const LOOKUP_SUFFIX: &str = "_lookup";

/// One output row: every primary field, the `norm_*` join columns once, and
/// the lookup fields (`null` when nothing matched).
pub type MergedRecord = Record;

/// Joins `lookup` onto `primary`. Both must share the same key fields.
///
/// Every primary row yields exactly one output row. When several lookup rows
/// share a normalized key, the first one wins.
pub fn merge(primary: &NormalizedDataset, lookup: &NormalizedDataset) -> Vec<MergedRecord> {
    let key_fields = primary.key_fields();
    let norm_columns: Vec<String> = key_fields.iter().map(|f| norm_field(f)).collect();

    let mut index: HashMap<&[String], &Record> = HashMap::new();
    for row in lookup.rows() {
        match index.entry(row.keys.as_slice()) {
            Entry::Vacant(slot) => {
                slot.insert(&row.record);
            }
            Entry::Occupied(_) => {
                debug!("Ignoring lookup row with repeated key {:?}", row.keys);
            }
        }
    }

    let primary_columns = columns(primary.rows().iter().map(|r| &r.record), &norm_columns);
    let lookup_columns = columns(lookup.rows().iter().map(|r| &r.record), &norm_columns);

    let output_name = |column: &str, suffix: &str, other: &[String]| {
        if other.iter().any(|c| c == column) {
            format!("{column}{suffix}")
        } else {
            column.to_string()
        }
    };
    let primary_names: Vec<(String, String)> = primary_columns
        .iter()
        .map(|c| (c.clone(), output_name(c, MAIN_SUFFIX, &lookup_columns)))
        .collect();
    let lookup_names: Vec<(String, String)> = lookup_columns
        .iter()
        .map(|c| (c.clone(), output_name(c, LOOKUP_SUFFIX, &primary_columns)))
        .collect();

    let mut matched = 0usize;
    let merged: Vec<MergedRecord> = primary
        .rows()
        .iter()
        .map(|row| {
            let mut out = Record::new();
            for (column, name) in &primary_names {
                out.insert(
                    name.clone(),
                    row.record.get(column).cloned().unwrap_or(Value::Null),
                );
            }
            for (column, value) in norm_columns.iter().zip(&row.keys) {
                out.insert(column.clone(), Value::String(value.clone()));
            }

            let hit = index.get(row.keys.as_slice());
            if hit.is_some() {
                matched += 1;
            }
            for (column, name) in &lookup_names {
                let value = hit
                    .and_then(|record| record.get(column))
                    .cloned()
                    .unwrap_or(Value::Null);
                out.insert(name.clone(), value);
            }
            out
        })
        .collect();

    info!(
        "Merged {} primary rows ({} matched, {} unmatched)",
        merged.len(),
        matched,
        merged.len() - matched
    );
    merged
}

/// Column names in first-seen order, minus the join columns in `excluded`
/// which the merge emits once.
fn columns<'a>(records: impl Iterator<Item = &'a Record>, excluded: &[String]) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    for record in records {
        for key in record.keys() {
            if !excluded.contains(key) && !seen.contains(key) {
                seen.push(key.clone());
            }
        }
    }
    seen
}

/// Normalizes both datasets with company and line mapping and merges them.
/// Fails without merging when either dataset cannot be normalized.
pub fn merge_files(
    main_path: &Path,
    lookup_path: &Path,
    tables: &MappingTables,
) -> Result<Vec<MergedRecord>> {
    let main = load_station_dataset(main_path, tables, MappingOptions::ALL).inspect_err(|e| {
        error!("Normalization of {} failed: {}", main_path.display(), e);
    })?;
    let lookup = load_station_dataset(lookup_path, tables, MappingOptions::ALL).inspect_err(|e| {
        error!("Normalization of {} failed: {}", lookup_path.display(), e);
    })?;
    Ok(merge(&main, &lookup))
}

/// Runs [`merge_files`] and writes the result as a pretty JSON array.
pub fn combine_data(
    main_path: &Path,
    lookup_path: &Path,
    output_path: &Path,
    tables: &MappingTables,
) -> Result<usize> {
    info!("Starting data combination with mapping tables {}", tables.version);
    let merged = merge_files(main_path, lookup_path, tables)?;

    crate::io::write_json_pretty(output_path, &merged)?;
    info!("Saved combined data to {}", output_path.display());
    Ok(merged.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dataset::{STATION_KEYS, normalize_dataset, parse_records};
    use serde_json::json;

    fn dataset(value: Value) -> NormalizedDataset {
        normalize_dataset(
            parse_records(value).unwrap(),
            &STATION_KEYS,
            MappingTables::builtin(),
            MappingOptions::ALL,
        )
        .unwrap()
    }

    #[test]
    fn test_jr_scenario_merges() {
        let primary = dataset(json!([
            {"company": "東日本旅客鉄道", "line": "JR山手線", "station": "東京", "coordinates": [139.76, 35.68]}
        ]));
        let lookup = dataset(json!([
            {"company": "jr", "line": "山手線", "station": "東京", "rent": 12.3, "lastupdate": "2025-06-01T00:00:00"}
        ]));

        let merged = merge(&primary, &lookup);
        assert_eq!(merged.len(), 1);
        let row = &merged[0];
        assert_eq!(row["company_main"], json!("東日本旅客鉄道"));
        assert_eq!(row["company_lookup"], json!("jr"));
        assert_eq!(row["norm_company"], json!("jr"));
        assert_eq!(row["norm_line"], json!("山手線"));
        assert_eq!(row["rent"], json!(12.3));
        assert_eq!(row["coordinates"], json!([139.76, 35.68]));
    }

    #[test]
    fn test_unmatched_rows_have_null_lookup_fields() {
        let primary = dataset(json!([
            {"company": "小田急電鉄", "line": "小田原線", "station": "新宿"}
        ]));
        let lookup = dataset(json!([
            {"company": "jr", "line": "山手線", "station": "東京", "rent": 12.3}
        ]));

        let merged = merge(&primary, &lookup);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0]["company_main"], json!("小田急電鉄"));
        assert_eq!(merged[0]["company_lookup"], Value::Null);
        assert_eq!(merged[0]["rent"], Value::Null);
    }

    #[test]
    fn test_cardinality_matches_deduplicated_primary() {
        let primary = dataset(json!([
            {"company": "jr", "line": "山手線", "station": "東京"},
            {"company": "jr", "line": "山手線", "station": "東京"},
            {"company": "jr", "line": "山手線", "station": "神田"},
            {"company": "jr", "line": "中央線", "station": "四ツ谷"}
        ]));
        // two raw spellings that normalize to the same key
        let lookup = dataset(json!([
            {"company": "jr", "line": "山手線", "station": "東京", "rent": 1.0},
            {"company": "ＪＲ", "line": "山手線", "station": "東京", "rent": 2.0},
            {"company": "jr", "line": "京浜東北線", "station": "蒲田", "rent": 3.0}
        ]));

        let merged = merge(&primary, &lookup);
        assert_eq!(merged.len(), primary.len());
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0]["rent"], json!(1.0));
        assert_eq!(merged[1]["rent"], Value::Null);

        for (out, row) in merged.iter().zip(primary.rows()) {
            assert_eq!(out["station_main"], row.record["station"]);
        }
    }

    #[test]
    fn test_non_colliding_columns_keep_their_names() {
        let primary = dataset(json!([
            {"company": "jr", "line": "山手線", "station": "東京", "stationcode": "003700"}
        ]));
        let lookup = dataset(json!([
            {"company": "jr", "line": "山手線", "station": "東京", "prefecture": "東京都"}
        ]));
        let merged = merge(&primary, &lookup);
        let keys: Vec<&str> = merged[0].keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "company_main",
                "line_main",
                "station_main",
                "stationcode",
                "norm_company",
                "norm_line",
                "norm_station",
                "company_lookup",
                "line_lookup",
                "station_lookup",
                "prefecture"
            ]
        );
    }

    #[test]
    fn test_empty_lookup_keeps_all_primary_rows() {
        let primary = dataset(json!([
            {"company": "jr", "line": "山手線", "station": "東京"},
            {"company": "jr", "line": "山手線", "station": "神田"}
        ]));
        // an empty lookup has no columns, so nothing is suffixed
        let lookup = dataset(json!([]));
        let merged = merge(&primary, &lookup);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["company"], json!("jr"));
    }

    #[test]
    fn test_source_columns_with_norm_prefix_survive() {
        let primary = dataset(json!([
            {"company": "jr", "line": "山手線", "station": "東京", "norm_rank": 3}
        ]));
        let lookup = dataset(json!([
            {"company": "jr", "line": "山手線", "station": "東京", "rent": 12.3}
        ]));
        let merged = merge(&primary, &lookup);
        assert_eq!(merged[0]["norm_rank"], json!(3));
        assert_eq!(merged[0]["norm_station"], json!("東京"));
        assert_eq!(merged[0]["rent"], json!(12.3));
    }
}
