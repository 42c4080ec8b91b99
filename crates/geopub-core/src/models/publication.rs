use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enrichment::OpenAlexEnrichment;
use super::geometry::GeometryCollection;
use super::status::Status;
use super::temporal::TemporalExtent;

/// One bibliographic item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub id: Uuid,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    /// Canonical landing-page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,

    #[serde(default)]
    pub geometry: GeometryCollection,

    #[serde(default)]
    pub temporal: TemporalExtent,

    /// Append-only log of who changed what and when. Never rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,

    pub status: Status,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,

    #[serde(default)]
    pub openalex: OpenAlexEnrichment,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Publication {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            abstract_text: None,
            doi: None,
            url: None,
            publication_date: None,
            geometry: GeometryCollection::empty(),
            temporal: TemporalExtent::empty(),
            provenance: None,
            status: Status::Harvested,
            source_id: None,
            event_id: None,
            openalex: OpenAlexEnrichment::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record carries any spatial or temporal coverage.
    pub fn has_extent(&self) -> bool {
        !self.geometry.is_empty() || !self.temporal.is_empty()
    }

    /// Append a provenance entry, preserving everything already logged.
    pub fn append_provenance(&mut self, entry: &str) {
        match &mut self.provenance {
            Some(log) => {
                log.push('\n');
                log.push_str(entry);
            }
            None => self.provenance = Some(entry.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_publication_is_harvested_and_extent_free() {
        let publication = Publication::new("Mapping the Rhine");
        assert_eq!(publication.status, Status::Harvested);
        assert!(!publication.has_extent());
        assert!(publication.provenance.is_none());
    }

    #[test]
    fn test_has_extent_with_geometry_or_temporal() {
        let mut publication = Publication::new("A");
        publication.geometry =
            GeometryCollection::from_geometry(json!({"type": "Point", "coordinates": [0, 0]}));
        assert!(publication.has_extent());

        let mut publication = Publication::new("B");
        publication.temporal = TemporalExtent::pair(Some("2020".to_string()), None);
        assert!(publication.has_extent());
    }

    #[test]
    fn test_provenance_is_additive() {
        let mut publication = Publication::new("A");
        publication.append_provenance("first entry");
        publication.append_provenance("second entry");
        assert_eq!(
            publication.provenance.as_deref(),
            Some("first entry\nsecond entry")
        );
    }
}
