use std::collections::BTreeMap;

use crate::types::{CauseListEntry, SourceType};

#[derive(Debug, Default)]
pub struct EntryFilter {
    /// Case-insensitive match on `case_type`.
    pub case_type: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl EntryFilter {
    pub fn apply(self, mut entries: Vec<CauseListEntry>) -> Vec<CauseListEntry> {
        if let Some(case_type) = &self.case_type {
            entries.retain(|e| e.case_type.eq_ignore_ascii_case(case_type));
        }
        if let Some(off) = self.offset {
            entries = entries.into_iter().skip(off).collect();
        }
        if let Some(lim) = self.limit {
            entries.truncate(lim);
        }
        entries
    }

    pub fn validate(self) -> Result<Self, String> {
        if self
            .case_type
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            return Err("Case type cannot be blank".to_string());
        }
        if self.limit.is_some_and(|l| l == 0) {
            return Err("Limit must be greater than 0".to_string());
        }
        Ok(self)
    }
}

#[derive(Debug)]
pub struct CauseListStats {
    pub html: usize,
    pub pdf: usize,
    pub json: usize,
    pub by_case_type: BTreeMap<String, usize>,
    pub total: usize,
}

impl CauseListStats {
    pub fn from_entries(entries: &[CauseListEntry]) -> CauseListStats {
        let by_source = |source: SourceType| entries.iter().filter(|e| e.source_type == source).count();

        let mut by_case_type = BTreeMap::new();
        for entry in entries {
            *by_case_type.entry(entry.case_type.clone()).or_insert(0) += 1;
        }

        CauseListStats {
            html: by_source(SourceType::Html),
            pdf: by_source(SourceType::Pdf),
            json: by_source(SourceType::Json),
            by_case_type,
            total: entries.len(),
        }
    }
}

impl std::fmt::Display for CauseListStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  From HTML tables: {}", self.html)?;
        writeln!(f, "  From PDF text:    {}", self.pdf)?;
        writeln!(f, "  From JSON feed:   {}", self.json)?;
        if !self.by_case_type.is_empty() {
            writeln!(f, "  By case type:")?;
            for (case_type, count) in &self.by_case_type {
                writeln!(f, "    {:<16}{}", case_type, count)?;
            }
        }
        writeln!(f, "  Total:            {}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(case_type: &str, source: SourceType) -> CauseListEntry {
        CauseListEntry::new(
            format!("{} 1/2024", case_type),
            case_type.to_string(),
            "2024-01-02",
            source,
        )
    }

    #[test]
    fn test_filter_case_type_then_paginate() {
        let entries = vec![
            entry("WP", SourceType::Json),
            entry("SA", SourceType::Json),
            entry("wp", SourceType::Json),
            entry("WP", SourceType::Json),
        ];
        let filter = EntryFilter {
            case_type: Some("WP".to_string()),
            offset: Some(1),
            limit: Some(1),
        };

        let filtered = filter.validate().unwrap().apply(entries);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].case_type, "wp");
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let filter = EntryFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn test_stats() {
        let entries = vec![
            entry("WP", SourceType::Html),
            entry("WP", SourceType::Pdf),
            entry("SA", SourceType::Json),
        ];
        let stats = CauseListStats::from_entries(&entries);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.html, 1);
        assert_eq!(stats.by_case_type.get("WP"), Some(&2));

        let rendered = stats.to_string();
        assert!(rendered.contains("Total:            3"));
    }
}
