use std::fmt::Display;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::normalize_whitespace;
use crate::types::UNKNOWN;

// Abbreviated case type (dots and a parenthetical qualifier allowed), an
// optional "No.", then "<number> of <year>" or "<number>/<year>".
static RE_CASE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:(?:Crl\.?)?(?:O\.?P\.?|A\.?|W\.?P\.?|S\.?A\.?|C\.?M\.?A\.?|W\.?A\.?|[A-Z]{1,5})(?:\s*\([^)]+\))?)\s*(?:No\.?)?\s*(\d+)\s*(?:of|/)\s*(\d{2,4})",
    )
    .expect("invalid regex: case number")
});

static RE_CASE_NUMBER_STRICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-Z]+)/(\d+)/(\d{2,4})").expect("invalid regex: strict case number")
});

static RE_NO_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[\s.)])No\.?$").expect("invalid regex: no suffix"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseNumber {
    pub case_type: String,
    pub number: String,
    pub year: String,
}

impl CaseNumber {
    pub fn case_type_or_unknown(&self) -> String {
        if self.case_type.is_empty() {
            UNKNOWN.to_string()
        } else {
            self.case_type.clone()
        }
    }
}

impl Display for CaseNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.case_type.is_empty() {
            write!(f, "{}/{}", self.number, self.year)
        } else {
            write!(f, "{} {}/{}", self.case_type, self.number, self.year)
        }
    }
}

fn clean_case_type(raw: &str) -> String {
    let mut case_type = raw.trim().to_string();
    if let Some(m) = RE_NO_SUFFIX.find(&case_type) {
        // keep the delimiter that preceded "No" unless it is whitespace
        let cut = match case_type[m.start()..].chars().next() {
            Some(c) if c == '.' || c == ')' => m.start() + 1,
            _ => m.start(),
        };
        case_type.truncate(cut);
    }
    let case_type = case_type.trim_end_matches(|c: char| c == '.' || c == '/' || c.is_whitespace());
    normalize_whitespace(case_type)
}

fn from_primary(caps: &Captures) -> Option<CaseNumber> {
    let full = caps.get(0)?;
    let number = caps.get(1)?;
    let year = caps.get(2)?;
    let prefix = &full.as_str()[..number.start() - full.start()];
    Some(CaseNumber {
        case_type: clean_case_type(prefix),
        number: number.as_str().to_string(),
        year: year.as_str().to_string(),
    })
}

fn from_strict(caps: &Captures) -> Option<CaseNumber> {
    Some(CaseNumber {
        case_type: normalize_whitespace(caps.get(1)?.as_str()),
        number: caps.get(2)?.as_str().to_string(),
        year: caps.get(3)?.as_str().to_string(),
    })
}

// "Page 3 of 40" has the shape of a case number.
fn is_page_footer(case: &CaseNumber) -> bool {
    case.case_type.eq_ignore_ascii_case("page")
}

pub fn parse(line: &str) -> Option<CaseNumber> {
    RE_CASE_NUMBER
        .captures_iter(line)
        .filter_map(|caps| from_primary(&caps))
        .chain(
            RE_CASE_NUMBER_STRICT
                .captures_iter(line)
                .filter_map(|caps| from_strict(&caps)),
        )
        .find(|case| !is_page_footer(case))
}

/// Finds the first case number in `line` and returns it in canonical
/// `"<type> <number>/<year>"` form.
pub fn extract(line: &str) -> Option<String> {
    parse(line).map(|c| c.to_string())
}

pub fn is_valid(line: &str) -> bool {
    parse(line).is_some()
}

pub fn extract_all(text: &str) -> Vec<String> {
    text.lines().filter_map(extract).collect()
}

/// Type token of a canonical `"<type> <number>/<year>"` string.
pub fn case_type_of(case_number: &str) -> String {
    match case_number.trim().rsplit_once(' ') {
        Some((case_type, tail)) if tail.contains('/') && !case_type.trim().is_empty() => {
            case_type.trim().to_string()
        }
        _ => UNKNOWN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_canonical_forms() {
        let cases = [
            ("W.P.No.12345 of 2023", "W.P 12345/2023"),
            ("Crl.O.P No. 123 of 2025", "Crl.O.P 123/2025"),
            ("CMA (SR) 789/2023", "CMA (SR) 789/2023"),
            ("SA 456/2024", "SA 456/2024"),
            ("WP/12345/2023", "WP 12345/2023"),
        ];

        for (input, expected) in cases {
            assert_eq!(
                extract(input).as_deref(),
                Some(expected),
                "input: {}",
                input
            );
        }
    }

    #[test]
    fn test_extract_inside_longer_line() {
        assert_eq!(
            extract("12.  Crl.A.No. 45 of 2021   R. Kumar").as_deref(),
            Some("Crl.A 45/2021")
        );
        assert_eq!(
            extract("1   W.A.  (MD)   No.  7   of  2024").as_deref(),
            Some("W.A. (MD) 7/2024")
        );
    }

    #[test]
    fn test_structured_parts() {
        let case = parse("Crl.O.P No. 123 of 2025").unwrap();
        assert_eq!(case.case_type, "Crl.O.P");
        assert_eq!(case.number, "123");
        assert_eq!(case.year, "2025");
        assert_eq!(case.case_type_or_unknown(), "Crl.O.P");
    }

    #[test]
    fn test_non_matching_text() {
        assert_eq!(extract("HON'BLE MR. JUSTICE R. SURESH KUMAR"), None);
        assert_eq!(extract("Ramesh vs State of Tamil Nadu"), None);
        assert_eq!(extract(""), None);
        assert!(!is_valid("COURT HALL"));
    }

    #[test]
    fn test_page_footers_are_not_cases() {
        assert_eq!(extract("Page 3 of 40"), None);
        assert_eq!(extract("PAGE No. 12 of 40"), None);
        assert_eq!(extract("page 3/40"), None);
        assert!(!is_valid("Page 3 of 40"));
        assert_eq!(
            extract("Page 2 of 90   SA 456/2024").as_deref(),
            Some("SA 456/2024")
        );
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("SA 456/2024"));
        assert!(is_valid("WP/12345/2023"));
    }

    #[test]
    fn test_case_type_of_canonical() {
        assert_eq!(case_type_of("W.P 12345/2023"), "W.P");
        assert_eq!(case_type_of("CMA (SR) 789/2023"), "CMA (SR)");
        assert_eq!(case_type_of("12/2023"), "Unknown");
        assert_eq!(case_type_of(""), "Unknown");
    }

    #[test]
    fn test_extract_all_scans_each_line() {
        let text = "FOR ADMISSION\n1. SA 456/2024\nnoise\n2. CMA (SR) 789/2023\n";
        assert_eq!(
            extract_all(text),
            vec!["SA 456/2024".to_string(), "CMA (SR) 789/2023".to_string()]
        );
    }
}
