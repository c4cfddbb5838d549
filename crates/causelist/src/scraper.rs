use chrono::NaiveDate;

use crate::browser::{BrowserError, BrowserLauncher, ChromeLauncher, SessionManager};
use crate::config::{AcquisitionMode, ScraperConfig};
use crate::feed::{FeedClient, FeedError};
use crate::orchestrator::Orchestrator;
use crate::types::{CauseListEntry, ScrapeRequest};

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Service temporarily unavailable: circuit open after {failures} consecutive failures")]
    CircuitOpen { failures: u32 },
    #[error("Date {0} not found in the cause list dropdown")]
    DateNotAvailable(String),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Scrape failed after {attempts} attempts: {source}")]
    ScrapeFailed {
        attempts: u32,
        source: Box<ScraperError>,
    },
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

impl ScraperError {
    /// Transient upstream faults worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScraperError::Browser(_) => true,
            ScraperError::Feed(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Caller-side conditions say nothing about upstream health.
    pub fn counts_toward_breaker(&self) -> bool {
        !matches!(
            self,
            ScraperError::DateNotAvailable(_)
                | ScraperError::InvalidDate(_)
                | ScraperError::CircuitOpen { .. }
        )
    }
}

/// Engine entry point: owns the browser session, the orchestrator with its
/// circuit breaker, and the feed client.
pub struct CauseListScraper {
    config: ScraperConfig,
    sessions: SessionManager,
    orchestrator: Orchestrator,
    feed: FeedClient,
}

impl CauseListScraper {
    pub fn new(config: ScraperConfig) -> Result<Self, ScraperError> {
        let launcher = ChromeLauncher::new(&config);
        Self::with_launcher(config, launcher)
    }

    pub fn with_launcher(
        config: ScraperConfig,
        launcher: impl BrowserLauncher + 'static,
    ) -> Result<Self, ScraperError> {
        let feed = FeedClient::new(&config)?;
        Ok(Self {
            sessions: SessionManager::new(launcher, config.launch_timeout),
            orchestrator: Orchestrator::new(config.clone()),
            feed,
            config,
        })
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.config.mode
    }

    /// Cause list for `date` (`YYYY-MM-DD`) in `court`; a blank court means
    /// the configured default. An empty list is a valid result.
    pub async fn scrape_daily_cause_list(
        &self,
        date: &str,
        court: &str,
    ) -> Result<Vec<CauseListEntry>, ScraperError> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| ScraperError::InvalidDate(date.to_string()))?;

        let court = match court.trim() {
            "" => self.config.default_court.as_str(),
            court => court,
        };
        let request = ScrapeRequest::new(date, court);

        log::info!(
            "Starting {} scrape for {} ({})",
            self.config.mode,
            request.date,
            request.court
        );

        let entries = match self.config.mode {
            AcquisitionMode::Feed => self.scrape_feed(&request).await,
            AcquisitionMode::Browser => self.scrape_browser(&request).await,
        }
        .inspect_err(|e| log::error!("Scraping failed: {}", e))?;

        log::info!("Completed scrape with {} entries", entries.len());
        Ok(entries)
    }

    async fn scrape_feed(&self, request: &ScrapeRequest) -> Result<Vec<CauseListEntry>, ScraperError> {
        self.orchestrator
            .guarded(|_| async { Ok(self.feed.fetch(request).await?) })
            .await
    }

    async fn scrape_browser(
        &self,
        request: &ScrapeRequest,
    ) -> Result<Vec<CauseListEntry>, ScraperError> {
        self.orchestrator.check_circuit()?;

        let context = self.sessions.new_context().await?;
        let result = self.orchestrator.scrape(context.as_ref(), request).await;

        if let Err(e) = context.close().await {
            log::warn!("Failed to close browser context: {}", e);
        }
        result
    }

    pub fn reset_circuit_breaker(&self) {
        self.orchestrator.reset_circuit_breaker();
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.orchestrator.circuit_breaker().failures()
    }

    /// Releases the shared browser process, if any.
    pub async fn shutdown(&self) -> Result<(), ScraperError> {
        self.sessions.shutdown().await?;
        Ok(())
    }
}
