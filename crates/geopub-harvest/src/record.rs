use std::collections::HashMap;

use crate::identifiers::{extract_doi, extract_issn};

/// One raw feed record: field name to list of values, in document order.
///
/// Both feed shapes land here — Dublin Core XML children keep their
/// qualified names ("dc:title"), RSS/Atom items use plain names
/// ("title"), and extraction tries the primary name then the namespaced
/// fallback.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: HashMap<String, Vec<String>>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return;
        }
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(trimmed.to_string());
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value under any of the given names, tried in order.
    pub fn get_first(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .find_map(|name| self.fields.get(*name))
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Structured fields pulled out of one raw record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub journal: Option<String>,
    pub date: Option<String>,
    pub doi: Option<String>,
    pub issn: Option<String>,
    /// Chosen landing-page URL; `None` means the record has no usable
    /// identifier and will be skipped downstream.
    pub url: Option<String>,
}

/// Pure extraction over one record: field fallbacks, URL preference, DOI
/// and ISSN heuristics.
pub fn extract_fields(record: &RawRecord) -> ExtractedRecord {
    let identifiers: Vec<&str> = record
        .values("identifier")
        .iter()
        .chain(record.values("dc:identifier"))
        .chain(record.values("relation"))
        .chain(record.values("dc:relation"))
        .map(String::as_str)
        .collect();

    // Landing pages beat other HTTP candidates.
    let url = identifiers
        .iter()
        .find(|value| value.starts_with("http") && value.contains("/view/"))
        .or_else(|| identifiers.iter().find(|value| value.starts_with("http")))
        .map(|value| value.to_string());

    let doi = extract_doi(identifiers.iter().copied());

    let issn_candidates: Vec<&str> = identifiers
        .iter()
        .copied()
        .chain(record.values("source").iter().map(String::as_str))
        .chain(record.values("dc:source").iter().map(String::as_str))
        .collect();
    let issn = extract_issn(issn_candidates);

    ExtractedRecord {
        title: record.get_first(&["title", "dc:title"]).map(str::to_string),
        abstract_text: record
            .get_first(&["description", "dc:description"])
            .map(str::to_string),
        journal: record
            .get_first(&["publisher", "dc:publisher"])
            .map(str::to_string),
        date: record.get_first(&["date", "dc:date"]).map(str::to_string),
        doi,
        issn,
        url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc_record() -> RawRecord {
        let mut record = RawRecord::new();
        record.push("dc:title", "Mapping the Rhine");
        record.push("dc:description", "A study of river cartography.");
        record.push("dc:publisher", "Journal of Examples");
        record.push("dc:date", "2021-05-01");
        record.push("dc:identifier", "http://journal.example.org/article/view/42");
        record.push("dc:identifier", "https://doi.org/10.1234/rhine-42");
        record
    }

    #[test]
    fn test_namespaced_fallback() {
        let extracted = extract_fields(&dc_record());
        assert_eq!(extracted.title.as_deref(), Some("Mapping the Rhine"));
        assert_eq!(extracted.journal.as_deref(), Some("Journal of Examples"));
        assert_eq!(extracted.date.as_deref(), Some("2021-05-01"));
    }

    #[test]
    fn test_primary_name_wins_over_namespaced() {
        let mut record = dc_record();
        record.push("title", "Plain Title");
        let extracted = extract_fields(&record);
        assert_eq!(extracted.title.as_deref(), Some("Plain Title"));
    }

    #[test]
    fn test_view_url_preferred() {
        let mut record = RawRecord::new();
        record.push("dc:identifier", "http://x/abstract/1");
        record.push("dc:identifier", "http://x/view/1");
        let extracted = extract_fields(&record);
        assert_eq!(extracted.url.as_deref(), Some("http://x/view/1"));
    }

    #[test]
    fn test_first_http_candidate_without_view() {
        let mut record = RawRecord::new();
        record.push("dc:identifier", "urn:nbn:de:0001-1234");
        record.push("dc:identifier", "http://x/abstract/1");
        record.push("dc:identifier", "http://x/abstract/2");
        let extracted = extract_fields(&record);
        assert_eq!(extracted.url.as_deref(), Some("http://x/abstract/1"));
    }

    #[test]
    fn test_no_http_candidate_yields_no_url() {
        let mut record = RawRecord::new();
        record.push("dc:title", "No identifiers");
        record.push("dc:identifier", "urn:nbn:de:0001-1234");
        let extracted = extract_fields(&record);
        assert_eq!(extracted.url, None);
    }

    #[test]
    fn test_doi_from_candidates() {
        let extracted = extract_fields(&dc_record());
        assert_eq!(extracted.doi.as_deref(), Some("10.1234/rhine-42"));
    }

    #[test]
    fn test_issn_from_source_field() {
        let mut record = RawRecord::new();
        record.push("dc:identifier", "http://x/view/1");
        record.push("dc:source", "12345678");
        let extracted = extract_fields(&record);
        assert_eq!(extracted.issn.as_deref(), Some("12345678"));
    }

    #[test]
    fn test_relation_fields_contribute_identifiers() {
        let mut record = RawRecord::new();
        record.push("dc:relation", "https://doi.org/10.9999/rel-1");
        record.push("dc:identifier", "http://x/view/1");
        let extracted = extract_fields(&record);
        assert_eq!(extracted.doi.as_deref(), Some("10.9999/rel-1"));
        assert_eq!(extracted.url.as_deref(), Some("http://x/view/1"));
    }

    #[test]
    fn test_blank_values_are_dropped() {
        let mut record = RawRecord::new();
        record.push("dc:title", "   ");
        assert!(record.is_empty());
    }
}
