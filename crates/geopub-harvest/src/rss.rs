use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::{HarvestError, Result};
use crate::record::RawRecord;

// ─── RSS 2.0 ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RssFeed {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    description: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date", alias = "date")]
    dc_date: Option<String>,
    #[serde(rename = "dc:identifier", alias = "identifier", default)]
    identifiers: Vec<String>,
    #[serde(rename = "dc:source", alias = "source")]
    source: Option<String>,
}

// ─── Atom ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    summary: Option<String>,
    id: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
}

/// Parse an RSS 2.0 or Atom document into the same raw-record contract
/// the OAI-PMH path uses. An empty feed is a run-level failure.
pub fn parse_feed_records(xml: &str) -> Result<Vec<RawRecord>> {
    if let Ok(feed) = from_str::<RssFeed>(xml) {
        let records: Vec<RawRecord> = feed.channel.items.into_iter().map(rss_item_to_record).collect();
        if records.is_empty() {
            return Err(HarvestError::NoRecords);
        }
        return Ok(records);
    }

    let feed: AtomFeed = from_str(xml)
        .map_err(|e| HarvestError::Parse(format!("invalid RSS/Atom XML: {e}")))?;
    let records: Vec<RawRecord> = feed.entries.into_iter().map(atom_entry_to_record).collect();
    if records.is_empty() {
        return Err(HarvestError::NoRecords);
    }
    Ok(records)
}

fn rss_item_to_record(item: RssItem) -> RawRecord {
    let mut record = RawRecord::new();
    if let Some(title) = item.title {
        record.push("title", title);
    }
    if let Some(description) = item.description {
        record.push("description", description);
    }
    if let Some(link) = item.link {
        record.push("identifier", link);
    }
    for identifier in item.identifiers {
        record.push("identifier", identifier);
    }
    if let Some(date) = item.pub_date.or(item.dc_date) {
        record.push("date", date);
    }
    if let Some(source) = item.source {
        record.push("source", source);
    }
    record
}

fn atom_entry_to_record(entry: AtomEntry) -> RawRecord {
    let mut record = RawRecord::new();
    if let Some(title) = entry.title {
        record.push("title", title);
    }
    if let Some(summary) = entry.summary {
        record.push("description", summary);
    }
    for link in entry.links {
        if let Some(href) = link.href {
            record.push("identifier", href);
        }
    }
    if let Some(id) = entry.id {
        record.push("identifier", id);
    }
    if let Some(date) = entry.published.or(entry.updated) {
        record.push("date", date);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::extract_fields;

    const RSS_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Journal of Examples</title>
    <item>
      <title>Mapping the Rhine</title>
      <description>A study of river cartography.</description>
      <link>http://journal.example.org/article/view/42</link>
      <pubDate>Sat, 01 May 2021 00:00:00 GMT</pubDate>
      <dc:identifier>https://doi.org/10.1234/rhine-42</dc:identifier>
    </item>
    <item>
      <title>Glacier retreat in the Alps</title>
      <link>http://journal.example.org/article/view/43</link>
      <dc:source>1234-5678</dc:source>
    </item>
  </channel>
</rss>"#;

    const ATOM_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Journal of Examples</title>
  <entry>
    <title>Mapping the Rhine</title>
    <summary>A study of river cartography.</summary>
    <id>urn:uuid:5c1d0b9e</id>
    <published>2021-05-01T00:00:00Z</published>
    <link href="http://journal.example.org/article/view/42"/>
  </entry>
</feed>"#;

    #[test]
    fn test_rss_items_map_to_raw_records() {
        let records = parse_feed_records(RSS_FIXTURE).unwrap();
        assert_eq!(records.len(), 2);

        let first = extract_fields(&records[0]);
        assert_eq!(first.title.as_deref(), Some("Mapping the Rhine"));
        assert_eq!(
            first.abstract_text.as_deref(),
            Some("A study of river cartography.")
        );
        assert_eq!(
            first.url.as_deref(),
            Some("http://journal.example.org/article/view/42")
        );
        assert_eq!(first.doi.as_deref(), Some("10.1234/rhine-42"));
        assert_eq!(first.date.as_deref(), Some("Sat, 01 May 2021 00:00:00 GMT"));

        let second = extract_fields(&records[1]);
        assert_eq!(second.issn.as_deref(), Some("12345678"));
    }

    #[test]
    fn test_atom_entries_map_to_raw_records() {
        let records = parse_feed_records(ATOM_FIXTURE).unwrap();
        assert_eq!(records.len(), 1);

        let extracted = extract_fields(&records[0]);
        assert_eq!(extracted.title.as_deref(), Some("Mapping the Rhine"));
        assert_eq!(
            extracted.url.as_deref(),
            Some("http://journal.example.org/article/view/42")
        );
        assert_eq!(extracted.date.as_deref(), Some("2021-05-01T00:00:00Z"));
    }

    #[test]
    fn test_empty_feed_is_an_error() {
        let xml = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        assert!(matches!(
            parse_feed_records(xml).unwrap_err(),
            HarvestError::NoRecords
        ));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(
            parse_feed_records("not xml at all").unwrap_err(),
            HarvestError::Parse(_)
        ));
    }
}
