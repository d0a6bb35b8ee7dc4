//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a paginated transaction table and run
//! the full crawl cycle end-to-end.

use pagesweep::config::Config;
use pagesweep::crawler::{run_crawl, Record};
use pagesweep::output::write_records;
use pagesweep::{SweepError, TerminationReason};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records on a full page in these tests
const STEP: u64 = 5;

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, pool_size: usize) -> Config {
    let mut config = Config::default();
    config.target.url_template = format!("{}/index.html?start={{start}}", base_url);
    config.pagination.start_min = 0;
    config.pagination.step = STEP;
    config.pagination.start_max = 1_000;
    config.page.retry_budget = 2;
    config.page.load_timeout_ms = 2_000;
    config.page.interaction_timeout_ms = 1_000;
    config.pool.size = Some(pool_size);
    config.user_agent.crawler_name = "TestSweeper".to_string();
    config
}

/// Table rows for the page at `start`
fn rows(start: u64, count: u64) -> String {
    (start..start + count)
        .map(|n| {
            format!(
                "<tr><td>Checking</td><td>Transaction {}</td><td>{}€</td></tr>",
                n,
                n * 10
            )
        })
        .collect()
}

fn page(body: &str) -> String {
    format!(
        r#"<html><head><title>Transactions</title></head><body>
        <button id="btnGenerate">Reload</button>
        <table><tr><th>Account</th><th>Transaction</th><th>Amount</th></tr>{}</table>
        </body></html>"#,
        body
    )
}

async fn mount_page(server: &MockServer, start: u64, html: String) {
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .and(query_param("start", start.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Any page not mounted explicitly is past the end of the data
async fn mount_empty_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page(""))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn sorted(mut records: Vec<Record>) -> Vec<Record> {
    records.sort();
    records
}

#[tokio::test]
async fn test_full_crawl_until_short_page() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, 0, page(&rows(0, 5))).await;
    mount_page(&mock_server, 5, page(&rows(5, 5))).await;
    mount_page(&mock_server, 10, page(&rows(10, 2))).await;
    mount_empty_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), 2);
    let report = run_crawl(&config).await.expect("Crawl should succeed");

    assert_eq!(report.records.len(), 12);
    assert_eq!(report.exhausted_at, Some(10));
    assert!(matches!(
        report.termination,
        Some(TerminationReason::ShortPage { .. })
    ));
    assert_eq!(report.stats.full_pages, 2);
    assert_eq!(report.stats.fatal_pages, 0);

    let last = report
        .records
        .iter()
        .find(|r| r.transaction == "Transaction 11")
        .expect("Record from the short page");
    assert_eq!(last.account, "Checking");
    assert_eq!(last.amount, "110");
    assert_eq!(last.currency, "€");
}

#[tokio::test]
async fn test_pool_sizes_agree() {
    let mock_server = MockServer::start().await;

    for start in (0..30).step_by(STEP as usize) {
        mount_page(&mock_server, start, page(&rows(start, STEP))).await;
    }
    mount_page(&mock_server, 30, page(&rows(30, 3))).await;
    mount_empty_fallback(&mock_server).await;

    let serial = run_crawl(&create_test_config(&mock_server.uri(), 1))
        .await
        .expect("Serial crawl should succeed");
    let pooled = run_crawl(&create_test_config(&mock_server.uri(), 8))
        .await
        .expect("Pooled crawl should succeed");

    assert_eq!(serial.records.len(), 33);
    assert_eq!(sorted(serial.records), sorted(pooled.records));
    assert_eq!(serial.exhausted_at, Some(30));
    assert_eq!(pooled.exhausted_at, Some(30));
}

#[tokio::test]
async fn test_records_inside_frame() {
    let mock_server = MockServer::start().await;

    let frame_page =
        r#"<html><body><iframe src="/frame.html?start=0"></iframe></body></html>"#.to_string();
    mount_page(&mock_server, 0, frame_page).await;

    Mock::given(method("GET"))
        .and(path("/frame.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&rows(0, 3))))
        .mount(&mock_server)
        .await;
    mount_empty_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), 1);
    let report = run_crawl(&config).await.expect("Crawl should succeed");

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.exhausted_at, Some(0));
}

#[tokio::test]
async fn test_unreachable_page_fails_crawl() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, 0, page(&rows(0, 5))).await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .and(query_param("start", "5"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_empty_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), 1);
    let result = run_crawl(&config).await;

    match result {
        Err(SweepError::FetchExhausted {
            offset,
            attempts,
            url,
        }) => {
            assert_eq!(offset, 5);
            assert_eq!(attempts, 2);
            assert!(url.ends_with("/index.html?start=5"));
        }
        other => panic!("expected FetchExhausted, got {:?}", other.map(|r| r.records.len())),
    }
}

#[tokio::test]
async fn test_malformed_row_is_skipped() {
    let mock_server = MockServer::start().await;

    let body = format!(
        "{}<tr><td>Savings</td><td>Broken</td><td>n/a</td></tr>",
        rows(0, 2)
    );
    mount_page(&mock_server, 0, page(&body)).await;
    mount_empty_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), 1);
    let report = run_crawl(&config).await.expect("Crawl should succeed");

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.stats.rejected_rows, 1);
    assert!(report.records.iter().all(|r| r.account == "Checking"));
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, 0, page(&rows(0, 1))).await;
    mount_empty_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), 1);
    let report = run_crawl(&config).await.expect("Crawl should succeed");

    let mut buffer = Vec::new();
    write_records(&mut buffer, &report.records, false).unwrap();
    let text = String::from_utf8(buffer).unwrap();

    assert_eq!(
        text,
        "[{\"Account\":\"Checking\",\"Transaction\":\"Transaction 0\",\"Amount\":\"0\",\"Currency\":\"€\"}]\n"
    );
}
