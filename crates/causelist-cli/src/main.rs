use std::path::PathBuf;
use std::process;

use causelist::feed::parse_feed;
use causelist::parser::{self, case_number};
use causelist::utils::{CauseListStats, EntryFilter};
use causelist::{AcquisitionMode, CauseListEntry, CauseListScraper, ScrapeRequest, ScraperConfig};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use futures::stream::{FuturesUnordered, StreamExt};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "causelist")]
#[command(about = "A Madras High Court daily cause list scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
enum Mode {
    Feed,
    Browser,
}

impl From<Mode> for AcquisitionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Feed => AcquisitionMode::Feed,
            Mode::Browser => AcquisitionMode::Browser,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the daily cause list for one or more courts
    Fetch {
        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            help = "Cause list date",
            value_parser = parse_date,
        )]
        date: String,

        #[arg(
            long,
            help = "Court id such as \"COURT NO. 01\"; repeat for several courts"
        )]
        court: Vec<String>,

        #[arg(long, value_enum, default_value = "feed", help = "Acquisition path")]
        mode: Mode,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,

        #[arg(long, help = "Keep only entries of this case type")]
        case_type: Option<String>,

        #[arg(
            long,
            help = "Maximum number of results to return",
            value_parser = clap::value_parser!(u16).range(1..)
        )]
        limit: Option<u16>,

        #[arg(long, help = "Number of results to skip from the beginning")]
        offset: Option<usize>,
    },
    /// Extract entries from a saved cause list HTML page
    ParseHtml {
        file: PathBuf,

        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
        date: String,

        #[arg(short = 'o', long = "output", value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Extract entries from a downloaded court PDF
    ParsePdf {
        file: PathBuf,

        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
        date: String,

        #[arg(short = 'o', long = "output", value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Expand a saved JSON feed payload into entries
    ParseFeed {
        file: PathBuf,

        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
        date: String,

        #[arg(long, help = "Court id to keep; all courts when omitted")]
        court: Option<String>,

        #[arg(short = 'o', long = "output", value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the canonical case number found in a line of text
    CaseNumber { text: String },
}

fn parse_date(s: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|e| e.to_string())
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn print_entries(entries: &[CauseListEntry], format: OutputFormat) {
    match format {
        OutputFormat::Json => serialize_json(&entries),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No entries to display.");
            } else {
                for (i, entry) in entries.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, entry);
                }
                print!("{}", CauseListStats::from_entries(entries));
            }
        }
    }
}

fn read_file(path: &PathBuf) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| {
        log::error!("Error reading {}: {}", path.display(), e);
        process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::Fetch {
            date,
            court,
            mode,
            format,
            case_type,
            limit,
            offset,
        } => {
            let filter = EntryFilter {
                case_type,
                limit: limit.map(usize::from),
                offset,
            };
            let filter = filter.validate().unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let config = ScraperConfig::from_env().with_mode(mode.into());
            let courts = if court.is_empty() {
                vec![config.default_court.clone()]
            } else {
                court
            };

            let scraper = CauseListScraper::new(config).unwrap_or_else(|e| {
                log::error!("Error creating scraper: {}", e);
                process::exit(1);
            });

            let mut fetches: FuturesUnordered<_> = courts
                .iter()
                .map(|court| {
                    let scraper = &scraper;
                    let date = &date;
                    async move { (court, scraper.scrape_daily_cause_list(date, court).await) }
                })
                .collect();

            let mut entries = Vec::new();
            let mut failed = false;
            while let Some((court, result)) = fetches.next().await {
                match result {
                    Ok(found) => {
                        log::info!("{}: {} entries", court, found.len());
                        entries.extend(found);
                    }
                    Err(e) => {
                        log::error!("Error fetching cause list for {}: {}", court, e);
                        failed = true;
                    }
                }
            }
            drop(fetches);

            if let Err(e) = scraper.shutdown().await {
                log::warn!("Error shutting down browser: {}", e);
            }
            if failed {
                process::exit(1);
            }

            print_entries(&filter.apply(entries), format);
        }

        Commands::ParseHtml { file, date, format } => {
            let bytes = read_file(&file);
            let html = String::from_utf8_lossy(&bytes);
            print_entries(&parser::parse_tables(&html, &date), format);
        }

        Commands::ParsePdf { file, date, format } => {
            let bytes = read_file(&file);
            let entries = parser::parse_pdf(&bytes, &date).unwrap_or_else(|e| {
                log::error!("Error parsing {}: {}", file.display(), e);
                process::exit(1);
            });
            print_entries(&entries, format);
        }

        Commands::ParseFeed {
            file,
            date,
            court,
            format,
        } => {
            let bytes = read_file(&file);
            let request = ScrapeRequest::new(date, court.unwrap_or_default());
            let entries = parse_feed(&bytes, &request).unwrap_or_else(|e| {
                log::error!("Error parsing {}: {}", file.display(), e);
                process::exit(1);
            });
            print_entries(&entries, format);
        }

        Commands::CaseNumber { text } => match case_number::extract(&text) {
            Some(canonical) => {
                println!("{}", canonical);
                println!("  Type: {}", case_number::case_type_of(&canonical));
            }
            None => {
                log::error!("No case number found in '{}'", text);
                process::exit(1);
            }
        },
    }
}
