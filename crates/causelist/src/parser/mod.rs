pub mod case_number;
pub mod document;
pub mod table;

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

use crate::types::{CauseListEntry, UNKNOWN};

pub use case_number::CaseNumber;
pub use document::parse_document_text;
pub use table::parse_tables;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to extract PDF text: {0}")]
    Pdf(String),
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

static RE_VERSUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:versus|vs)\b\.?").expect("invalid regex: versus")
});

static RE_V_DOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bv\b\.?").expect("invalid regex: v."));

pub(crate) fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits "A vs B" on the first separator. A missing respondent degrades to
/// "Unknown"; a missing petitioner means the line is not a party line.
fn split_on(re: &Regex, text: &str) -> Option<(String, String)> {
    let m = re.find(text)?;
    let petitioner = normalize_whitespace(&text[..m.start()]);
    if petitioner.is_empty() {
        return None;
    }
    let respondent = normalize_whitespace(&text[m.end()..]);
    let respondent = if respondent.is_empty() {
        UNKNOWN.to_string()
    } else {
        respondent
    };
    Some((petitioner, respondent))
}

/// Party split for document lines: only the unambiguous "vs"/"versus" tokens.
pub(crate) fn split_parties(text: &str) -> Option<(String, String)> {
    split_on(&RE_VERSUS, text)
}

/// Party split for table cells, which also accept the short "v." form.
pub(crate) fn split_parties_loose(text: &str) -> Option<(String, String)> {
    split_parties(text).or_else(|| split_on(&RE_V_DOT, text))
}

/// Runs the PDF text layer extraction. CPU bound; callers on the async
/// runtime should wrap it in `spawn_blocking`.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ParseError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ParseError::Pdf(e.to_string()))
}

pub fn parse_pdf(bytes: &[u8], date: &str) -> Result<Vec<CauseListEntry>, ParseError> {
    let text = extract_pdf_text(bytes)?;
    Ok(parse_document_text(&text, date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parties() {
        assert_eq!(
            split_parties("M/s. Alpha Traders vs The State of Tamil Nadu"),
            Some((
                "M/s. Alpha Traders".to_string(),
                "The State of Tamil Nadu".to_string()
            ))
        );
        assert_eq!(
            split_parties("R. Kumar VERSUS   Union of India"),
            Some(("R. Kumar".to_string(), "Union of India".to_string()))
        );
        assert_eq!(
            split_parties("A. Selvi Vs."),
            Some(("A. Selvi".to_string(), "Unknown".to_string()))
        );
        assert_eq!(split_parties("Page 3 of 40"), None);
        assert_eq!(split_parties("vs State"), None);
    }

    #[test]
    fn test_split_parties_loose_accepts_v_dot() {
        assert_eq!(
            split_parties_loose("Ramesh v. State"),
            Some(("Ramesh".to_string(), "State".to_string()))
        );
        assert_eq!(split_parties("Ramesh v. State"), None);
    }

    #[test]
    fn test_parse_pdf_rejects_garbage() {
        let err = parse_pdf(b"definitely not a pdf", "2025-01-01").unwrap_err();
        assert!(matches!(err, ParseError::Pdf(_)));
    }
}
