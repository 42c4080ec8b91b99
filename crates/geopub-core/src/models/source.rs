use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a source's feed document is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    #[default]
    OaiPmh,
    Rss,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::OaiPmh => "oai-pmh",
            FeedKind::Rss => "rss",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "oai-pmh" => Some(FeedKind::OaiPmh),
            "rss" => Some(FeedKind::Rss),
            _ => None,
        }
    }
}

/// A publishing venue or harvesting endpoint.
///
/// Identity for resolver matching: ISSN-L when present, else exact name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub url: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issn_l: Option<String>,

    /// Collection/tag label used in notification mails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    #[serde(default)]
    pub feed_kind: FeedKind,

    pub harvest_interval_minutes: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_harvested_at: Option<DateTime<Utc>>,

    // OpenAlex linkage, filled by periodic metadata sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openalex_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub works_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default)]
    pub is_open_access: bool,
    #[serde(default)]
    pub is_preprint: bool,

    pub created_at: DateTime<Utc>,
}

impl Source {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            name: name.into(),
            issn_l: None,
            collection: None,
            feed_kind: FeedKind::default(),
            harvest_interval_minutes: 60 * 24,
            last_harvested_at: None,
            openalex_id: None,
            works_count: None,
            publisher: None,
            is_open_access: false,
            is_preprint: false,
            created_at: Utc::now(),
        }
    }

    /// Whether this source is due for harvesting at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_harvested_at {
            None => true,
            Some(last) => now - last >= chrono::Duration::minutes(self.harvest_interval_minutes),
        }
    }
}
