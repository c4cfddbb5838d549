use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{case_number, elem_text, normalize_whitespace, split_parties_loose};
use crate::types::{CauseListEntry, SourceType, UNKNOWN};

static RE_JUDGE_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)justice|hon'?ble").expect("invalid regex: judge cue"));

static RE_HALL_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)hall|court\s*\d+").expect("invalid regex: hall cue"));

fn nearest_table<'a>(row: ElementRef<'a>) -> Option<ElementRef<'a>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
}

fn row_text(row: ElementRef) -> String {
    normalize_whitespace(&row.text().collect::<Vec<_>>().join(" "))
}

fn cell_texts(row: ElementRef) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == "td")
        .map(|td| normalize_whitespace(&elem_text(td)))
        .collect()
}

fn extract_parties(cells: &[String]) -> (String, String) {
    if cells.len() < 3 {
        return (UNKNOWN.to_string(), UNKNOWN.to_string());
    }

    let (c1, c2) = (&cells[1], &cells[2]);
    let joint = format!("{} {}", c1, c2);

    if let Some(parties) = split_parties_loose(&joint) {
        return parties;
    }

    let or_unknown = |s: &String| {
        if s.is_empty() {
            UNKNOWN.to_string()
        } else {
            s.clone()
        }
    };
    (or_unknown(c1), or_unknown(c2))
}

fn first_cell_matching(cells: &[String], re: &Regex) -> String {
    cells
        .iter()
        .find(|text| re.is_match(text))
        .cloned()
        .unwrap_or_default()
}

/// Walks every `<table>` row and keeps the ones that carry a case number.
/// Rows without one (headers, spacers, section titles) are skipped
/// individually.
pub fn parse_tables(html: &str, date: &str) -> Vec<CauseListEntry> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").unwrap();
    let row_sel = Selector::parse("tr").unwrap();

    let mut entries = Vec::new();

    for table in document.select(&table_sel) {
        for row in table.select(&row_sel) {
            if nearest_table(row).map(|t| t.id()) != Some(table.id()) {
                continue;
            }

            let text = row_text(row);
            if text.is_empty() {
                continue;
            }

            let Some(case) = case_number::parse(&text) else {
                continue;
            };

            let cells = cell_texts(row);
            let (petitioner, respondent) = extract_parties(&cells);

            let mut entry = CauseListEntry::new(
                case.to_string(),
                case.case_type_or_unknown(),
                date,
                SourceType::Html,
            );
            entry.petitioner = petitioner;
            entry.respondent = respondent;
            entry.judge_name = first_cell_matching(&cells, &RE_JUDGE_CUE);
            entry.court_hall = first_cell_matching(&cells, &RE_HALL_CUE);

            log::debug!("Table row -> {}", entry);
            entries.push(entry);
        }
    }

    log::info!("Table parser extracted {} entries", entries.len());
    entries
}
