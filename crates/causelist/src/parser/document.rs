use std::sync::LazyLock;

use regex::Regex;

use super::{case_number, split_parties};
use crate::types::{CauseListEntry, SourceType};

static RE_JUDGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Hon'?ble\s+.*?Justice\s+[A-Z\s.]+)").expect("invalid regex: judge line")
});

static RE_HALL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Court\s+Hall\s*:?\s*\d+)|(Hall\s*\d+)").expect("invalid regex: hall line")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Init,
    Case,
    Parties,
}

/// Context threaded through the line scan. Judge and hall headings apply to
/// every case below them until the next heading.
struct DocumentState<'a> {
    date: &'a str,
    state: ParseState,
    judge: String,
    hall: String,
    open: Option<CauseListEntry>,
    entries: Vec<CauseListEntry>,
}

impl<'a> DocumentState<'a> {
    fn new(date: &'a str) -> Self {
        Self {
            date,
            state: ParseState::Init,
            judge: String::new(),
            hall: String::new(),
            open: None,
            entries: Vec::new(),
        }
    }

    fn flush(&mut self) {
        if let Some(entry) = self.open.take() {
            self.entries.push(entry);
        }
    }

    fn feed(&mut self, line: &str) {
        if let Some(caps) = RE_JUDGE_LINE.captures(line) {
            self.judge = caps[1].trim().to_string();
            return;
        }

        if let Some(m) = RE_HALL_LINE.find(line) {
            self.hall = m.as_str().trim().to_string();
            return;
        }

        if let Some(case) = case_number::parse(line) {
            self.flush();

            let mut entry = CauseListEntry::new(
                case.to_string(),
                case.case_type_or_unknown(),
                self.date,
                SourceType::Pdf,
            );
            entry.judge_name = self.judge.clone();
            entry.court_hall = self.hall.clone();
            self.open = Some(entry);
            self.state = ParseState::Case;
            return;
        }

        if self.state == ParseState::Case
            && let Some(entry) = self.open.as_mut()
            && let Some((petitioner, respondent)) = split_parties(line)
        {
            entry.petitioner = petitioner;
            entry.respondent = respondent;
            self.state = ParseState::Parties;
        }
    }

    fn finish(mut self) -> Vec<CauseListEntry> {
        self.flush();
        self.entries
    }
}

/// Extracts entries from the plain text layer of a cause list PDF.
pub fn parse_document_text(text: &str, date: &str) -> Vec<CauseListEntry> {
    let mut state = DocumentState::new(date);

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        state.feed(line);
    }

    let entries = state.finish();
    log::info!("Document parser extracted {} entries", entries.len());
    entries
}
