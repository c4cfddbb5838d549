use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, thiserror::Error)]
#[error("Invalid source '{0}'. Accepted values: 'html', 'pdf', 'json'")]
pub struct SourceTypeParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceType {
    Html,
    Pdf,
    Json,
}

impl FromStr for SourceType {
    type Err = SourceTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(SourceType::Html),
            "pdf" => Ok(SourceType::Pdf),
            "json" => Ok(SourceType::Json),
            _ => Err(SourceTypeParseError(s.to_string())),
        }
    }
}

impl Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Html => write!(f, "HTML"),
            SourceType::Pdf => write!(f, "PDF"),
            SourceType::Json => write!(f, "JSON"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BenchType {
    Single,
    Division,
    Full,
    #[default]
    Unknown,
}

impl BenchType {
    /// Reads a free-text stage/bench label such as "DIVISION BENCH - FOR ORDERS".
    pub fn from_label(label: &str) -> BenchType {
        let label = label.to_ascii_uppercase();
        if label.contains("DIVISION") {
            BenchType::Division
        } else if label.contains("FULL BENCH") {
            BenchType::Full
        } else if label.contains("SINGLE") {
            BenchType::Single
        } else {
            BenchType::Unknown
        }
    }

    pub fn from_judge_count(count: usize) -> BenchType {
        match count {
            0 => BenchType::Unknown,
            1 => BenchType::Single,
            2 => BenchType::Division,
            _ => BenchType::Full,
        }
    }
}

impl Display for BenchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchType::Single => write!(f, "Single"),
            BenchType::Division => write!(f, "Division"),
            BenchType::Full => write!(f, "Full"),
            BenchType::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advocates {
    pub petitioner_counsel: String,
    pub respondent_counsel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseListEntry {
    pub case_number: String,
    pub case_type: String,
    pub petitioner: String,
    pub respondent: String,
    pub advocates: Advocates,
    pub bench_type: BenchType,
    pub judge_name: String,
    pub court_hall: String,
    pub cause_list_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub source_type: SourceType,
}

impl CauseListEntry {
    /// A record with every optional field at its documented default.
    pub fn new(
        case_number: String,
        case_type: String,
        cause_list_date: &str,
        source_type: SourceType,
    ) -> Self {
        Self {
            case_number,
            case_type,
            petitioner: UNKNOWN.to_string(),
            respondent: UNKNOWN.to_string(),
            advocates: Advocates::default(),
            bench_type: BenchType::Unknown,
            judge_name: String::new(),
            court_hall: String::new(),
            cause_list_date: cause_list_date.to_string(),
            item_number: None,
            stage: None,
            source_type,
        }
    }
}

impl Display for CauseListEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(item) = self.item_number.as_deref().filter(|i| !i.is_empty()) {
            write!(f, "#{} ", item)?;
        }
        write!(
            f,
            "{}: {} vs {}",
            self.case_number, self.petitioner, self.respondent
        )?;
        if !self.court_hall.is_empty() {
            write!(f, " [{}]", self.court_hall)?;
        }
        if !self.judge_name.is_empty() {
            write!(f, " ({})", self.judge_name)?;
        }
        Ok(())
    }
}

/// One engine invocation: the cause list date as given by the caller and
/// the court it is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub date: String,
    pub court: String,
}

impl ScrapeRequest {
    pub fn new(date: impl Into<String>, court: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            court: court.into(),
        }
    }
}
