use std::collections::BTreeSet;
use std::fmt::Display;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::config::ScraperConfig;
use crate::types::{Advocates, BenchType, CauseListEntry, ScrapeRequest, SourceType, UNKNOWN};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Feed responded with HTTP {0}")]
    Status(StatusCode),
    #[error("Feed payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl FeedError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Http(_) => true,
            FeedError::Status(status) => status.is_server_error(),
            FeedError::Json(_) | FeedError::InvalidDate(_) => false,
        }
    }
}

/// The feed encodes the same field as a string in one row and a number in
/// the next. Empty XML elements come through as `{}` or `[]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    Other(Value),
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{}", s.trim()),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Other(_) => Ok(()),
        }
    }
}

fn text(field: &Option<Scalar>) -> String {
    field.as_ref().map(|s| s.to_string()).unwrap_or_default()
}

fn or_unknown(value: String) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value
    }
}

/// `None` unless type, number and year are all present.
fn join_case_number(case_type: &str, number: &str, year: &str) -> Option<String> {
    if case_type.is_empty() || number.is_empty() || year.is_empty() {
        return None;
    }
    Some(format!("{} {}/{}", case_type, number, year))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeedRow {
    courtno: Option<Scalar>,
    stagename: Option<Scalar>,
    serial_no: Option<Scalar>,
    mcasetype: Option<Scalar>,
    mcaseno: Option<Scalar>,
    mcaseyr: Option<Scalar>,
    pname: Option<Scalar>,
    rname: Option<Scalar>,
    mpadv: Option<Scalar>,
    mradv: Option<Scalar>,
    judge1: Option<Scalar>,
    judge2: Option<Scalar>,
    judge3: Option<Scalar>,
    judge4: Option<Scalar>,
    judge5: Option<Scalar>,
    extra: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeedExtra {
    excasetype: Option<Scalar>,
    excaseno: Option<Scalar>,
    excaseyr: Option<Scalar>,
    expname: Option<Scalar>,
    exrname: Option<Scalar>,
    expadv: Option<Scalar>,
    exradv: Option<Scalar>,
}

impl FeedRow {
    fn court(&self) -> String {
        text(&self.courtno)
    }

    fn judges(&self) -> Vec<String> {
        [
            &self.judge1,
            &self.judge2,
            &self.judge3,
            &self.judge4,
            &self.judge5,
        ]
        .into_iter()
        .map(text)
        .filter(|j| !j.is_empty())
        .collect()
    }

    fn extras(&self) -> Vec<FeedExtra> {
        let values = match &self.extra {
            Some(Value::Array(items)) => items.clone(),
            Some(obj @ Value::Object(_)) => vec![obj.clone()],
            _ => Vec::new(),
        };

        values
            .into_iter()
            .filter_map(|value| {
                serde_json::from_value::<FeedExtra>(value)
                    .inspect_err(|e| log::warn!("Skipping undecodable tagged case: {}", e))
                    .ok()
            })
            .collect()
    }
}

/// Fields a primary row shares with the tagged cases listed under it.
struct SharedContext<'a> {
    judge_name: String,
    bench_type: BenchType,
    court_hall: String,
    stage: Option<String>,
    item_number: String,
    date: &'a str,
}

impl SharedContext<'_> {
    fn entry(
        &self,
        case_number: String,
        case_type: String,
        petitioner: String,
        respondent: String,
        advocates: Advocates,
    ) -> CauseListEntry {
        let mut entry =
            CauseListEntry::new(case_number, or_unknown(case_type), self.date, SourceType::Json);
        entry.petitioner = or_unknown(petitioner);
        entry.respondent = or_unknown(respondent);
        entry.advocates = advocates;
        entry.bench_type = self.bench_type;
        entry.judge_name = self.judge_name.clone();
        entry.court_hall = self.court_hall.clone();
        entry.item_number = Some(self.item_number.clone());
        entry.stage = self.stage.clone();
        entry
    }
}

/// Prefix match, so "COURT NO. 01" also accepts its sub-courts such as
/// "COURT NO. 01 a". An empty filter accepts all.
pub fn court_matches(courtno: &str, filter: &str) -> bool {
    courtno.trim().starts_with(filter.trim())
}

fn expand_row(row: &FeedRow, request: &ScrapeRequest) -> Vec<CauseListEntry> {
    let judges = row.judges();
    let stage = text(&row.stagename);
    let bench_type = match BenchType::from_label(&stage) {
        BenchType::Unknown => BenchType::from_judge_count(judges.len()),
        bench => bench,
    };

    let court = row.court();
    let shared = SharedContext {
        judge_name: judges.join(", "),
        bench_type,
        court_hall: if court.is_empty() {
            request.court.clone()
        } else {
            court
        },
        stage: (!stage.is_empty()).then_some(stage),
        item_number: text(&row.serial_no),
        date: &request.date,
    };

    let case_type = text(&row.mcasetype);
    let Some(case_number) =
        join_case_number(&case_type, &text(&row.mcaseno), &text(&row.mcaseyr))
    else {
        log::warn!(
            "Skipping feed row without a case number (court '{}', item '{}')",
            shared.court_hall,
            shared.item_number
        );
        return Vec::new();
    };

    let mut entries = vec![shared.entry(
        case_number,
        case_type,
        text(&row.pname),
        text(&row.rname),
        Advocates {
            petitioner_counsel: text(&row.mpadv),
            respondent_counsel: text(&row.mradv),
        },
    )];

    for extra in row.extras() {
        let case_type = text(&extra.excasetype);
        let Some(case_number) =
            join_case_number(&case_type, &text(&extra.excaseno), &text(&extra.excaseyr))
        else {
            continue;
        };
        entries.push(shared.entry(
            case_number,
            case_type,
            text(&extra.expname),
            text(&extra.exrname),
            Advocates {
                petitioner_counsel: text(&extra.expadv),
                respondent_counsel: text(&extra.exradv),
            },
        ));
    }

    entries
}

/// Decodes a feed payload (object of rows or array of rows) into entries
/// for the requested court. Rows that fail to decode are skipped.
pub fn parse_feed(bytes: &[u8], request: &ScrapeRequest) -> Result<Vec<CauseListEntry>, FeedError> {
    let payload: Value = serde_json::from_slice(bytes)?;

    let rows: Vec<Value> = match payload {
        Value::Array(items) => items,
        Value::Object(map) => map.into_values().collect(),
        Value::Null => Vec::new(),
        other => {
            log::warn!("Unexpected feed payload shape: {}", other);
            Vec::new()
        }
    };

    log::info!("Feed payload carries {} rows", rows.len());

    let decoded: Vec<FeedRow> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            serde_json::from_value::<FeedRow>(row)
                .inspect_err(|e| log::warn!("Skipping feed row {}: {}", i, e))
                .ok()
        })
        .collect();

    let matching: Vec<&FeedRow> = decoded
        .iter()
        .filter(|row| court_matches(&row.court(), &request.court))
        .collect();

    if matching.is_empty() && !decoded.is_empty() {
        let available: BTreeSet<String> = decoded.iter().map(FeedRow::court).collect();
        log::debug!(
            "No rows for '{}'; courts in feed: {:?}",
            request.court,
            available
        );
    }

    log::info!("Filtered {} rows for {}", matching.len(), request.court);

    let entries: Vec<CauseListEntry> = matching
        .into_iter()
        .flat_map(|row| expand_row(row, request))
        .collect();

    log::info!("Feed produced {} entries", entries.len());
    Ok(entries)
}

/// `YYYY-MM-DD` to the `DDMMYYYY` form used in the feed resource name.
pub fn feed_resource_id(date: &str) -> Result<String, FeedError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%d%m%Y").to_string())
        .map_err(|_| FeedError::InvalidDate(date.to_string()))
}

#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    base_url: String,
}

impl FeedClient {
    pub fn new(config: &ScraperConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: config.feed_url.clone(),
        })
    }

    pub fn feed_url(&self, date: &str) -> Result<String, FeedError> {
        Ok(format!(
            "{}?file=cause_{}.xml",
            self.base_url,
            feed_resource_id(date)?
        ))
    }

    /// One bounded request. A missing resource (404) means no list was
    /// published and yields an empty result.
    pub async fn fetch(&self, request: &ScrapeRequest) -> Result<Vec<CauseListEntry>, FeedError> {
        let url = self.feed_url(&request.date)?;
        log::info!("Fetching cause list feed {} for {}", url, request.court);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            log::warn!("Feed not found (404): {}", url);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            log::error!("Feed responded with HTTP {}", status);
            return Err(FeedError::Status(status));
        }

        let body = response.bytes().await?;
        parse_feed(&body, request)
    }
}
