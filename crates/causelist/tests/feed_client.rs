use std::time::Duration;

use causelist::feed::{FeedClient, FeedError};
use causelist::{AcquisitionMode, CauseListScraper, ScrapeRequest, ScraperConfig, ScraperError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_PATH: &str = "/judis/clists/clists-madras/api/result.php";

fn config_for(server: &MockServer) -> ScraperConfig {
    ScraperConfig::default()
        .with_mode(AcquisitionMode::Feed)
        .with_feed_url(format!("{}{}", server.uri(), FEED_PATH))
        .with_backoff_base(Duration::from_millis(5))
}

#[tokio::test]
async fn test_fetch_parses_published_feed() {
    let mock_server = MockServer::start().await;

    let body = std::fs::read_to_string("fixtures/cause_16102025.json")
        .expect("Failed to read fixture");

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(query_param("file", "cause_16102025.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = FeedClient::new(&config_for(&mock_server)).unwrap();
    let entries = client
        .fetch(&ScrapeRequest::new("2025-10-16", "COURT NO. 01"))
        .await
        .unwrap();

    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].case_number, "WP 12345/2023");
}

#[tokio::test]
async fn test_missing_feed_is_an_empty_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = FeedClient::new(&config_for(&mock_server)).unwrap();
    let entries = client
        .fetch(&ScrapeRequest::new("2025-12-25", "COURT NO. 01"))
        .await
        .unwrap();

    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_server_error_is_retryable_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = FeedClient::new(&config_for(&mock_server)).unwrap();
    let err = client
        .fetch(&ScrapeRequest::new("2025-10-16", "COURT NO. 01"))
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::Status(s) if s.as_u16() == 500));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_scraper_retries_feed_then_gives_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let scraper = CauseListScraper::new(config_for(&mock_server)).unwrap();
    let err = scraper
        .scrape_daily_cause_list("2025-10-16", "COURT NO. 01")
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::ScrapeFailed { attempts: 3, .. }));
    assert_eq!(scraper.consecutive_failures(), 1);

    scraper.reset_circuit_breaker();
    assert_eq!(scraper.consecutive_failures(), 0);
}

#[tokio::test]
async fn test_scraper_rejects_malformed_date_without_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let scraper = CauseListScraper::new(config_for(&mock_server)).unwrap();
    let err = scraper
        .scrape_daily_cause_list("16/10/2025", "COURT NO. 01")
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::InvalidDate(_)));
    assert_eq!(scraper.consecutive_failures(), 0);
}
