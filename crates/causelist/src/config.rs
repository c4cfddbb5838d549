use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

pub const DEFAULT_LANDING_URL: &str = "https://www.mhc.tn.gov.in/judis/clists/";
pub const DEFAULT_LISTING_URL: &str =
    "https://www.mhc.tn.gov.in/judis/clists/clists-madras/index.php";
pub const DEFAULT_FEED_URL: &str =
    "https://www.mhc.tn.gov.in/judis/clists/clists-madras/api/result.php";
pub const DEFAULT_COURT: &str = "COURT NO. 01";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, thiserror::Error)]
#[error("Invalid acquisition mode '{0}'. Accepted values: 'feed', 'browser'")]
pub struct AcquisitionModeParseError(String);

/// Which upstream path `CauseListScraper` reads from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// Direct JSON feed, one bounded HTTP request.
    #[default]
    Feed,
    /// Headless browser driving the public cause list pages.
    Browser,
}

impl FromStr for AcquisitionMode {
    type Err = AcquisitionModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "feed" => Ok(AcquisitionMode::Feed),
            "browser" => Ok(AcquisitionMode::Browser),
            _ => Err(AcquisitionModeParseError(s.to_string())),
        }
    }
}

impl Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionMode::Feed => write!(f, "feed"),
            AcquisitionMode::Browser => write!(f, "browser"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub landing_url: String,
    pub listing_url: String,
    pub feed_url: String,
    pub default_court: String,
    pub mode: AcquisitionMode,

    /// Browser executable; `None` lets chromiumoxide locate one.
    pub chrome_path: Option<PathBuf>,
    pub user_agent: String,

    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub download_timeout: Duration,
    pub launch_timeout: Duration,
    pub request_timeout: Duration,

    pub max_attempts: u32,
    /// Sleep before retry `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    pub failure_threshold: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            landing_url: DEFAULT_LANDING_URL.to_string(),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            default_court: DEFAULT_COURT.to_string(),
            mode: AcquisitionMode::default(),
            chrome_path: None,
            user_agent: BROWSER_USER_AGENT.to_string(),
            navigation_timeout: Duration::from_secs(60),
            selector_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(20),
            launch_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            failure_threshold: 10,
        }
    }
}

fn env_or_default(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

impl ScraperConfig {
    /// Defaults with upstream URLs and the browser binary taken from the
    /// environment when set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            landing_url: env_or_default("MHC_CAUSE_LIST_URL", defaults.landing_url),
            listing_url: env_or_default("MHC_LISTING_URL", defaults.listing_url),
            feed_url: env_or_default("MHC_FEED_URL", defaults.feed_url),
            chrome_path: env::var_os("CHROME_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            ..defaults
        }
    }

    pub fn with_mode(mut self, mode: AcquisitionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}
