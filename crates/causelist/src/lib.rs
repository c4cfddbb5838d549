pub mod browser;
pub mod circuit_breaker;
pub mod config;
pub mod feed;
pub mod orchestrator;
pub mod parser;
pub mod scraper;
pub mod strategy;
pub mod types;
pub mod utils;

pub use config::{AcquisitionMode, ScraperConfig};
pub use scraper::{CauseListScraper, ScraperError};
pub use types::{Advocates, BenchType, CauseListEntry, ScrapeRequest, SourceType};
