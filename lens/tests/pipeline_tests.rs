//! File-to-file jobs: trimming, comparison reports and the final merge.
#![allow(clippy::unwrap_used, clippy::panic)]

use lens::compare::{Granularity, generate_all_comparison_files, generate_comparison_file};
use lens::config::DataPaths;
use lens::error::LensError;
use lens::mapping::MappingTables;
use lens::merge::combine_data;
use lens::trimmer::{self, TrimJob};
use serde_json::{Value, json};
use std::path::Path;

fn write_json(path: &Path, value: &Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn station_rows() -> Value {
    json!([
        {"company": "東日本旅客鉄道", "line": "JR山手線", "station": "東京", "stationcode": "003700", "coordinates": [139.767, 35.681]},
        {"company": "東日本旅客鉄道", "line": "JR山手線", "station": "東京", "stationcode": "003700", "coordinates": [139.767, 35.681]},
        {"company": "東京地下鉄", "line": "銀座線", "station": "渋谷", "stationcode": "004000", "coordinates": [139.701, 35.659]},
        {"company": "小田急電鉄", "line": "小田原線", "station": "新宿", "stationcode": "005000", "coordinates": [139.700, 35.690]}
    ])
}

fn rent_rows() -> Value {
    json!([
        {"prefecture": "東京都", "company": "ＪＲ", "line": "山手線", "station": "東京", "rent": 12.5, "lastupdate": "2025-06-01T00:00:00+09:00"},
        {"prefecture": "東京都", "company": "東京メトロ", "line": "銀座線", "station": "渋谷", "rent": 11.0, "lastupdate": "2025-06-01T00:00:00+09:00"},
        {"prefecture": "東京都", "company": "京王電鉄", "line": "京王線", "station": "調布", "rent": 7.2, "lastupdate": "2025-06-01T00:00:00+09:00"}
    ])
}

#[test]
fn test_combine_data_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    write_json(&paths.station_data, &station_rows());
    write_json(&paths.rent_data, &rent_rows());

    let count = combine_data(
        &paths.station_data,
        &paths.rent_data,
        &paths.combined_output,
        MappingTables::builtin(),
    )
    .unwrap();
    assert_eq!(count, 3);

    let combined = read_json(&paths.combined_output);
    let rows = combined.as_array().unwrap();
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0]["station_main"], json!("東京"));
    assert_eq!(rows[0]["rent"], json!(12.5));
    assert_eq!(rows[0]["prefecture"], json!("東京都"));
    assert_eq!(rows[1]["norm_company"], json!("東京メトロ"));
    assert_eq!(rows[1]["rent"], json!(11.0));
    assert_eq!(rows[2]["company_main"], json!("小田急電鉄"));
    assert_eq!(rows[2]["rent"], Value::Null);
}

#[test]
fn test_combine_aborts_when_a_dataset_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    write_json(&paths.station_data, &station_rows());
    write_json(&paths.rent_data, &json!([{"company": "jr", "line": "山手線"}]));

    let result = combine_data(
        &paths.station_data,
        &paths.rent_data,
        &paths.combined_output,
        MappingTables::builtin(),
    );
    assert!(matches!(result, Err(LensError::DataFormat(_))));
    assert!(!paths.combined_output.exists());
}

#[test]
fn test_combine_rejects_non_json_input() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    write_json(&paths.station_data, &station_rows());
    std::fs::write(&paths.rent_data, "not json").unwrap();

    let result = combine_data(
        &paths.station_data,
        &paths.rent_data,
        &paths.combined_output,
        MappingTables::builtin(),
    );
    assert!(matches!(result, Err(LensError::DataFormat(_))));
}

#[test]
fn test_all_comparison_files_written() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    write_json(&paths.station_data, &station_rows());
    write_json(&paths.rent_data, &rent_rows());

    generate_all_comparison_files(
        &paths.station_data,
        &paths.rent_data,
        &paths.comparison_dir,
        MappingTables::builtin(),
    )
    .unwrap();

    for granularity in Granularity::ALL {
        let file = paths
            .comparison_dir
            .join(format!("{}_comparison.csv", granularity.prefix()));
        assert!(file.exists(), "missing {}", file.display());
    }

    let company = std::fs::read_to_string(
        paths
            .comparison_dir
            .join("company_normalized_comparison.csv"),
    )
    .unwrap();
    assert!(company.contains("小田急電鉄,京王電鉄"));
}

#[test]
fn test_single_comparison_reports_diff() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    write_json(&paths.station_data, &station_rows());
    write_json(&paths.rent_data, &rent_rows());

    let diff = generate_comparison_file(
        Granularity::Station,
        &paths.station_data,
        &paths.rent_data,
        &paths.comparison_dir,
        MappingTables::builtin(),
    )
    .unwrap();
    assert!(diff.is_empty());
}

#[test]
fn test_external_mapping_tables_change_the_join() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    write_json(&paths.station_data, &station_rows());
    write_json(&paths.rent_data, &rent_rows());

    let mapping = dir.path().join("mapping.json");
    std::fs::write(
        &mapping,
        r#"{"version": "test", "company": [{"from": "小田急電鉄", "to": "京王電鉄"}], "line": []}"#,
    )
    .unwrap();
    let tables = MappingTables::load_or_builtin(Some(&mapping)).unwrap();
    assert_eq!(tables.version, "test");

    combine_data(
        &paths.station_data,
        &paths.rent_data,
        &paths.combined_output,
        &tables,
    )
    .unwrap();

    // a loaded document replaces the built-in entries instead of extending them
    let combined = read_json(&paths.combined_output);
    assert!(combined.as_array().unwrap().iter().all(|r| r["rent"].is_null()));
}

#[test]
fn test_trimming_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());

    write_json(
        &paths.station_geojson,
        &json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"N02_003": "山手線", "N02_004": "東日本旅客鉄道", "N02_005": "東京", "N02_005c": "003700"},
                "geometry": {"type": "LineString", "coordinates": [[139.766, 35.680], [139.768, 35.682]]}
            }]
        }),
    );
    std::fs::create_dir_all(paths.areacode_csv.parent().unwrap()).unwrap();
    std::fs::write(
        &paths.areacode_csv,
        "団体コード,都道府県名,郡・政令市名,郡・政令市名カナ,市区町村名\n131016,東京都,,,千代田区\n",
    )
    .unwrap();

    let written = trimmer::run_all(&paths).unwrap();
    assert_eq!(written.len(), 2);

    let stations = read_json(&paths.station_data);
    assert_eq!(stations[0]["station"], json!("東京"));
    let coordinates = stations[0]["coordinates"].as_array().unwrap();
    assert!((coordinates[0].as_f64().unwrap() - 139.767).abs() < 1e-9);

    let areas = read_json(&paths.areacode_output);
    assert_eq!(areas[0]["city_town_village"], json!("千代田区"));
}

#[test]
fn test_trimming_job_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let job = TrimJob::from_name("stationcode").unwrap();
    let result = trimmer::run_job(job, job.input(&paths), job.output(&paths));
    assert!(matches!(result, Err(LensError::Io(_))));
}
