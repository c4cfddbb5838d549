use std::future::Future;

use crate::browser::{BrowsingContext, PageDriver};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::ScraperConfig;
use crate::scraper::ScraperError;
use crate::strategy::Strategy;
use crate::types::{CauseListEntry, ScrapeRequest};

const DAILY_LIST_RADIO: &str = r#"input[type="radio"][value="1"]"#;
const DATE_SELECT: &str = "#ct_date";
const DATE_OPTIONS: &str = "#ct_date option";
const SUBMIT_BUTTON: &str = r#"input[name="btn_dailylist"]"#;

/// Drives one browser acquisition: navigation, date selection and the
/// strategy fallback chain, wrapped in retry and the circuit breaker.
pub struct Orchestrator {
    config: ScraperConfig,
    breaker: CircuitBreaker,
}

impl Orchestrator {
    pub fn new(config: ScraperConfig) -> Self {
        let breaker = CircuitBreaker::new(config.failure_threshold);
        Self { config, breaker }
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn reset_circuit_breaker(&self) {
        self.breaker.reset();
    }

    pub fn check_circuit(&self) -> Result<(), ScraperError> {
        if self.breaker.is_open() {
            log::error!("Circuit breaker open, too many consecutive failures");
            return Err(ScraperError::CircuitOpen {
                failures: self.breaker.failures(),
            });
        }
        Ok(())
    }

    /// Runs `op` under the circuit breaker with exponential backoff between
    /// retryable failures. `op` receives the 1-based attempt number.
    pub async fn guarded<T, F, Fut>(&self, mut op: F) -> Result<T, ScraperError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        self.check_circuit()?;

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match op(attempt).await {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) => err,
            };

            if err.is_retryable() && attempt < max_attempts {
                let delay = self.config.backoff_delay(attempt);
                log::warn!(
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if err.counts_toward_breaker() {
                let failures = self.breaker.record_failure();
                log::error!("Scraping failed. Failure count: {}", failures);
            }

            return Err(if err.is_retryable() {
                ScraperError::ScrapeFailed {
                    attempts: attempt,
                    source: Box::new(err),
                }
            } else {
                err
            });
        }
    }

    pub async fn scrape(
        &self,
        context: &dyn BrowsingContext,
        request: &ScrapeRequest,
    ) -> Result<Vec<CauseListEntry>, ScraperError> {
        self.guarded(|attempt| async move {
            log::info!("Scrape attempt {} for {}", attempt, request.date);
            self.execute(context, request).await
        })
        .await
    }

    async fn execute(
        &self,
        context: &dyn BrowsingContext,
        request: &ScrapeRequest,
    ) -> Result<Vec<CauseListEntry>, ScraperError> {
        let page = context.new_page().await?;
        let result = self.navigate_and_extract(page.as_ref(), request).await;

        if let Err(e) = page.close().await {
            log::warn!("Failed to close page: {}", e);
        }
        result
    }

    async fn navigate_and_extract(
        &self,
        page: &dyn PageDriver,
        request: &ScrapeRequest,
    ) -> Result<Vec<CauseListEntry>, ScraperError> {
        let timeout = self.config.navigation_timeout;
        page.goto(&self.config.landing_url, timeout).await?;
        page.goto(&self.config.listing_url, timeout).await?;

        self.select_date(page, &request.date).await?;

        Ok(self.run_strategies(page, request).await)
    }

    async fn select_date(&self, page: &dyn PageDriver, date: &str) -> Result<(), ScraperError> {
        let wait = self.config.selector_timeout;

        log::info!("Selecting Daily List...");
        page.wait_for(DAILY_LIST_RADIO, wait).await?;
        page.click(DAILY_LIST_RADIO).await?;

        log::info!("Waiting for date dropdown...");
        page.wait_for(DATE_OPTIONS, wait).await?;
        let values = page.option_values(DATE_SELECT).await?;
        log::info!("Available dates: {} options", values.len());

        if !values.iter().any(|v| v == date) {
            log::warn!(
                "Date {} not available. First available: {}",
                date,
                values.first().map(String::as_str).unwrap_or("none")
            );
            return Err(ScraperError::DateNotAvailable(date.to_string()));
        }

        page.select_option(DATE_SELECT, date).await?;
        log::info!("Selected date: {}", date);

        page.submit(SUBMIT_BUTTON, self.config.navigation_timeout)
            .await?;
        log::info!("Navigated to results page");
        Ok(())
    }

    async fn run_strategies(
        &self,
        page: &dyn PageDriver,
        request: &ScrapeRequest,
    ) -> Vec<CauseListEntry> {
        for strategy in Strategy::PRIORITY {
            log::info!("Attempting strategy: {}", strategy);

            if !strategy.can_handle(page).await {
                log::info!("Strategy {} cannot handle current page state", strategy);
                continue;
            }

            let entries = strategy.run(page, request, &self.config).await;
            if !entries.is_empty() {
                log::info!(
                    "Strategy {} succeeded with {} entries",
                    strategy,
                    entries.len()
                );
                return entries;
            }
            log::warn!("Strategy {} returned no entries, trying next...", strategy);
        }

        log::warn!("All strategies exhausted with no results");
        Vec::new()
    }
}
