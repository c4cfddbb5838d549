use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;

use crate::browser::{BrowserError, PageDriver};
use crate::config::ScraperConfig;
use crate::parser::{self, ParseError};
use crate::types::{CauseListEntry, ScrapeRequest};

static RE_COURT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("invalid regex: court number"));

#[derive(Debug, thiserror::Error)]
enum StrategyError {
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("PDF extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Ways of reading entries off the submitted daily list page, tried in
/// [`Strategy::PRIORITY`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Cause list rendered as HTML tables.
    Table,
    /// Per-court PDF linked from the page.
    Document,
}

impl Strategy {
    pub const PRIORITY: [Strategy; 2] = [Strategy::Table, Strategy::Document];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Table => "HTML",
            Strategy::Document => "PDF",
        }
    }

    /// Probe failures count as "cannot handle".
    pub async fn can_handle(&self, page: &dyn PageDriver) -> bool {
        let probe = match self {
            Strategy::Table => page.count("table").await,
            Strategy::Document => page.count_links_containing("Court").await,
        };
        probe
            .inspect_err(|e| log::warn!("[{} Strategy] Probe failed: {}", self.name(), e))
            .is_ok_and(|n| n > 0)
    }

    /// Never fails: errors are logged and yield no entries so the caller can
    /// fall through to the next strategy.
    pub async fn run(
        &self,
        page: &dyn PageDriver,
        request: &ScrapeRequest,
        config: &ScraperConfig,
    ) -> Vec<CauseListEntry> {
        let result = match self {
            Strategy::Table => run_table(page, request, config).await,
            Strategy::Document => run_document(page, request, config).await,
        };
        result.unwrap_or_else(|e| {
            log::error!("[{} Strategy] Parsing failed: {}", self.name(), e);
            Vec::new()
        })
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

async fn run_table(
    page: &dyn PageDriver,
    request: &ScrapeRequest,
    config: &ScraperConfig,
) -> Result<Vec<CauseListEntry>, StrategyError> {
    log::info!("[HTML Strategy] Starting HTML parsing...");
    page.wait_for("table", config.selector_timeout).await?;
    let html = page.content().await?;

    let entries = parser::parse_tables(&html, &request.date);
    if entries.is_empty() {
        log::warn!("[HTML Strategy] No entries found in HTML tables");
    }
    Ok(entries)
}

/// Link texts to look for, most specific first: "COURT NO. 01" gives
/// "Court 1", "Court No. 1", "Court-1" and finally any "Court" link.
pub fn court_link_labels(court: &str) -> Vec<String> {
    let number = RE_COURT_NUMBER
        .find_iter(court)
        .last()
        .and_then(|m| m.as_str().parse::<u32>().ok());

    let mut labels = match number {
        Some(n) => vec![
            format!("Court {}", n),
            format!("Court No. {}", n),
            format!("Court-{}", n),
        ],
        None => Vec::new(),
    };
    labels.push("Court".to_string());
    labels
}

async fn download_court_pdf(
    page: &dyn PageDriver,
    court: &str,
    config: &ScraperConfig,
) -> Result<Option<Vec<u8>>, StrategyError> {
    for label in court_link_labels(court) {
        if page.count_links_containing(&label).await? == 0 {
            continue;
        }
        log::info!("[PDF Strategy] Trying court PDF link: {}", label);
        match page.download_link(&label, config.download_timeout).await {
            Ok(bytes) => return Ok(Some(bytes)),
            Err(e) => log::warn!("[PDF Strategy] Link '{}' failed: {}", label, e),
        }
    }
    Ok(None)
}

async fn run_document(
    page: &dyn PageDriver,
    request: &ScrapeRequest,
    config: &ScraperConfig,
) -> Result<Vec<CauseListEntry>, StrategyError> {
    log::info!("[PDF Strategy] Looking for court-specific PDFs...");

    let Some(bytes) = download_court_pdf(page, &request.court, config).await? else {
        log::warn!("[PDF Strategy] Could not download court PDF");
        return Ok(Vec::new());
    };

    let date = request.date.clone();
    let entries = tokio::task::spawn_blocking(move || parser::parse_pdf(&bytes, &date)).await??;

    log::info!(
        "[PDF Strategy] Successfully parsed {} entries from court PDF",
        entries.len()
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeLauncher, FakeSite, SiteScript};
    use crate::browser::{BrowserLauncher, BrowsingContext};

    async fn page_for(site: &FakeSite) -> Box<dyn PageDriver> {
        let launcher = FakeLauncher::new(site.clone());
        let browser = launcher.launch().await.unwrap();
        let context: Box<dyn BrowsingContext> = browser.new_context().await.unwrap();
        context.new_page().await.unwrap()
    }

    #[test]
    fn test_court_link_labels() {
        assert_eq!(
            court_link_labels("COURT NO. 01"),
            vec!["Court 1", "Court No. 1", "Court-1", "Court"]
        );
        assert_eq!(court_link_labels("VC HALL"), vec!["Court"]);
    }

    #[tokio::test]
    async fn test_table_strategy_reads_results_page() {
        let site = FakeSite::new(SiteScript {
            results_html: std::fs::read_to_string("fixtures/daily_list.html")
                .expect("Failed to read fixture"),
            ..Default::default()
        });
        let page = page_for(&site).await;
        let request = ScrapeRequest::new("2025-10-16", "COURT NO. 01");

        assert!(Strategy::Table.can_handle(page.as_ref()).await);
        let entries = Strategy::Table
            .run(page.as_ref(), &request, &ScraperConfig::default())
            .await;
        assert_eq!(entries.len(), 4);
    }

    #[tokio::test]
    async fn test_document_strategy_prefers_specific_link() {
        let site = FakeSite::new(SiteScript {
            court_links: vec!["Court 1".to_string(), "Court 2".to_string()],
            ..Default::default()
        });
        let page = page_for(&site).await;
        let request = ScrapeRequest::new("2025-10-16", "COURT NO. 01");

        assert!(Strategy::Document.can_handle(page.as_ref()).await);
        let entries = Strategy::Document
            .run(page.as_ref(), &request, &ScraperConfig::default())
            .await;

        // every matching label is tried once when no file arrives
        assert!(entries.is_empty());
        assert_eq!(site.stats().downloads, vec!["Court 1", "Court"]);
    }

    #[tokio::test]
    async fn test_unparseable_pdf_yields_no_entries() {
        let site = FakeSite::new(SiteScript {
            court_links: vec!["Court-1".to_string()],
            pdf: Some(b"not a pdf".to_vec()),
            ..Default::default()
        });
        let page = page_for(&site).await;
        let request = ScrapeRequest::new("2025-10-16", "COURT NO. 01");

        let entries = Strategy::Document
            .run(page.as_ref(), &request, &ScraperConfig::default())
            .await;

        assert!(entries.is_empty());
        assert_eq!(site.stats().downloads, vec!["Court-1"]);
    }

    #[tokio::test]
    async fn test_no_tables_means_table_cannot_handle() {
        let site = FakeSite::new(SiteScript::default());
        let page = page_for(&site).await;
        assert!(!Strategy::Table.can_handle(page.as_ref()).await);
        assert!(!Strategy::Document.can_handle(page.as_ref()).await);
    }
}
