//! Rent scraper against a mocked listings site.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::uninlined_format_args
)]

use lens::config::ScraperSettings;
use lens::scraper::{RentRecord, RentScraper, run_rent_scraping};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> ScraperSettings {
    ScraperSettings {
        base_url: format!("{}/chintai/soba/", server.uri()),
        max_workers: 4,
        max_retries: 2,
        retry_delay: Duration::ZERO,
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        timeout: Duration::from_secs(5),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><body>{body}</body></html>"))
}

const TOP_PAGE: &str = r#"
    <a class="areamenu_detail-btn" href="/chintai/soba/tokyo/">東京都</a>
    <a class="areamenu_detail-btn" href="/chintai/soba/hokkaido/">北海道</a>
    <a class="areamenu_detail-btn" href="/chintai/soba/empty/">空県</a>
"#;

const TOKYO_LINES: &str = r#"
    <table class="searchtable">
      <tr>
        <th class="searchtable-title">ＪＲ</th>
        <td><a href="ek_yamanote/">山手線</a></td>
      </tr>
    </table>
"#;

const HOKKAIDO_LINES: &str = r#"
    <table class="searchtable">
      <tr>
        <th class="searchtable-title">札幌市営地下鉄</th>
        <td><a href="ek_namboku/">南北線</a></td>
      </tr>
    </table>
"#;

const YAMANOTE_RENTS: &str = r#"
    <table>
      <tr class="js-graph-data"><td>東京</td><td><span class="graphpanel_matrix-td_graphinfo-strong">12.5</span></td></tr>
      <tr class="js-graph-data"><td>神田</td><td><span class="graphpanel_matrix-td_graphinfo-strong">---</span></td></tr>
    </table>
"#;

const NAMBOKU_RENTS: &str = r#"
    <table>
      <tr class="js-graph-data"><td>さっぽろ</td><td><span class="graphpanel_matrix-td_graphinfo-strong">6.1</span></td></tr>
    </table>
"#;

async fn mount_site(server: &MockServer) {
    let pages = [
        ("/chintai/soba/", TOP_PAGE),
        ("/chintai/soba/tokyo/ensen/", TOKYO_LINES),
        ("/chintai/soba/hokkaido/ensen/", HOKKAIDO_LINES),
        ("/chintai/soba/empty/ensen/", "<p>準備中</p>"),
        ("/chintai/soba/tokyo/ensen/ek_yamanote/", YAMANOTE_RENTS),
        ("/chintai/soba/hokkaido/ensen/ek_namboku/", NAMBOKU_RENTS),
    ];
    for (page, body) in pages {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html(body))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_scrape_walks_prefectures_lines_and_stations() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let scraper = RentScraper::new(settings(&server)).unwrap();
    let (mut records, stats) = scraper.scrape().await;

    assert_eq!(stats.prefecture_total, 3);
    assert_eq!(stats.prefectures_with_lines, 2);
    assert_eq!(stats.station_records, 2);

    records.sort_by(|a, b| a.station.cmp(&b.station));
    assert_eq!(records[0].station, "さっぽろ");
    assert_eq!(records[0].prefecture, "北海道");
    assert_eq!(records[0].company, "札幌市営地下鉄");
    assert_eq!(records[1].station, "東京");
    assert_eq!(records[1].line, "山手線");
    assert!((records[1].rent - 12.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_requests_carry_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chintai/soba/"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .respond_with(html(TOP_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = RentScraper::new(settings(&server)).unwrap();
    let prefectures = scraper.fetch_prefectures().await.unwrap();
    assert_eq!(prefectures.len(), 3);
    assert!(prefectures[0].url.ends_with("/chintai/soba/tokyo/ensen/"));
}

#[tokio::test]
async fn test_failed_page_is_retried_then_given_up() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    Mock::given(method("GET"))
        .and(path("/chintai/soba/"))
        .respond_with(move |_req: &wiremock::Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(500)
        })
        .mount(&server)
        .await;

    let scraper = RentScraper::new(settings(&server)).unwrap();
    let prefectures = scraper.fetch_prefectures().await.unwrap();

    assert!(prefectures.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    Mock::given(method("GET"))
        .and(path("/chintai/soba/"))
        .respond_with(move |_req: &wiremock::Request| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(503)
            } else {
                html(TOP_PAGE)
            }
        })
        .mount(&server)
        .await;

    let scraper = RentScraper::new(settings(&server)).unwrap();
    let prefectures = scraper.fetch_prefectures().await.unwrap();

    assert_eq!(prefectures.len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_run_rent_scraping_sorts_and_saves() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("processed").join("rent_marketprice.json");
    let codes = dir.path().join("prefecture_codes.json");
    std::fs::write(&codes, r#"{"北海道": "01", "東京都": "13"}"#).unwrap();

    let stats = run_rent_scraping(settings(&server), &output, &codes)
        .await
        .unwrap();
    assert_eq!(stats.station_records, 2);

    let saved: Vec<RentRecord> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let prefectures: Vec<&str> = saved.iter().map(|r| r.prefecture.as_str()).collect();
    assert_eq!(prefectures, vec!["北海道", "東京都"]);
    assert!(saved.iter().all(|r| r.lastupdate.is_some()));
}

#[tokio::test]
async fn test_invalid_base_url_is_config_error() {
    let settings = ScraperSettings {
        base_url: "not a url".to_string(),
        ..ScraperSettings::default()
    };
    let err = RentScraper::new(settings).err().unwrap();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[tokio::test]
async fn test_scraping_job_runs_on_a_spawned_task() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("rent_marketprice.json");
    let codes = dir.path().join("prefecture_codes.json");
    std::fs::write(&codes, r#"{"北海道": "01", "東京都": "13"}"#).unwrap();

    let job = {
        let settings = settings(&server);
        let output = output.clone();
        tokio::spawn(async move { run_rent_scraping(settings, &output, &codes).await })
    };
    let stats = job.await.unwrap().unwrap();

    assert_eq!(stats.prefectures_with_lines, 2);
    assert!(output.exists());
}
