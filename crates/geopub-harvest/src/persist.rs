use uuid::Uuid;

use geopub_core::models::{Publication, Source, Status};
use geopub_core::storage::{Database, PublicationRepository, Repository, SourceRepository};

use crate::error::Result;
use crate::html_meta::PageMetadata;
use crate::record::ExtractedRecord;

/// Why a record was skipped instead of persisted. Expected control flow,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    DuplicateDoi(String),
    DuplicateUrl(String),
    MissingUrl,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::DuplicateDoi(doi) => write!(f, "duplicate DOI: {doi}"),
            SkipReason::DuplicateUrl(url) => write!(f, "duplicate URL: {url}"),
            SkipReason::MissingUrl => write!(f, "no usable URL in record"),
        }
    }
}

/// Find or create the publishing venue for a record.
///
/// Three-tier fallback, ISSN always winning when present: ISSN-L lookup,
/// exact name lookup, then the source under harvest itself. Venues
/// created from a bare ISSN get a synthesized label.
pub fn resolve_source(
    db: &Database,
    extracted: &ExtractedRecord,
    harvesting_source: &Source,
) -> Result<Uuid> {
    if let Some(issn) = &extracted.issn {
        if let Some(existing) = db.sources().find_by_issn(issn)? {
            return Ok(existing.id);
        }
        let name = extracted
            .journal
            .clone()
            .unwrap_or_else(|| format!("Unknown Journal (ISSN: {issn})"));
        let mut venue = Source::new(harvesting_source.url.clone(), name);
        venue.issn_l = Some(issn.clone());
        db.sources().save(&venue)?;
        tracing::info!("created source {} for ISSN {issn}", venue.name);
        return Ok(venue.id);
    }

    if let Some(journal) = &extracted.journal {
        if let Some(existing) = db.sources().find_by_name(journal)? {
            return Ok(existing.id);
        }
        let venue = Source::new(harvesting_source.url.clone(), journal.clone());
        db.sources().save(&venue)?;
        tracing::info!("created source {journal}");
        return Ok(venue.id);
    }

    Ok(harvesting_source.id)
}

/// Dedup guard. Checks run in order: DOI duplicate, URL duplicate, URL
/// missing.
pub fn check_record(db: &Database, extracted: &ExtractedRecord) -> Result<Option<SkipReason>> {
    if let Some(doi) = &extracted.doi {
        if db.publications().doi_exists(doi)? {
            return Ok(Some(SkipReason::DuplicateDoi(doi.clone())));
        }
    }
    match &extracted.url {
        Some(url) => {
            if db.publications().url_exists(url)? {
                return Ok(Some(SkipReason::DuplicateUrl(url.clone())));
            }
        }
        None => return Ok(Some(SkipReason::MissingUrl)),
    }
    Ok(None)
}

/// Create one Harvested publication inside its own transaction.
pub fn persist_record(
    db: &Database,
    extracted: ExtractedRecord,
    page: PageMetadata,
    source_id: Uuid,
    event_id: Uuid,
) -> Result<Publication> {
    let mut publication = Publication::new(extracted.title.unwrap_or_default());
    publication.abstract_text = extracted.abstract_text;
    publication.doi = extracted.doi;
    publication.url = extracted.url;
    publication.publication_date = extracted.date;
    publication.geometry = page.geometry;
    publication.temporal = page.temporal;
    publication.status = Status::Harvested;
    publication.source_id = Some(source_id);
    publication.event_id = Some(event_id);

    db.publications().insert(&publication)?;
    Ok(publication)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geopub_core::models::{GeometryCollection, HarvestingEvent, TemporalExtent};
    use serde_json::json;

    fn setup() -> (Database, Source) {
        let db = Database::open_in_memory().unwrap();
        let source = Source::new("https://journal.example.org/oai", "Harvest Endpoint");
        db.sources().save(&source).unwrap();
        (db, source)
    }

    fn extracted(url: Option<&str>) -> ExtractedRecord {
        ExtractedRecord {
            title: Some("Mapping the Rhine".to_string()),
            url: url.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolver_issn_wins_over_name() {
        let (db, harvesting) = setup();
        let mut venue = Source::new("https://other.example.org", "Known Journal");
        venue.issn_l = Some("12345678".to_string());
        db.sources().save(&venue).unwrap();

        let mut record = extracted(Some("http://x/view/1"));
        record.issn = Some("12345678".to_string());
        record.journal = Some("A Different Name".to_string());

        let resolved = resolve_source(&db, &record, &harvesting).unwrap();
        assert_eq!(resolved, venue.id);
    }

    #[test]
    fn test_resolver_creates_unknown_journal_for_new_issn() {
        let (db, harvesting) = setup();
        let mut record = extracted(Some("http://x/view/1"));
        record.issn = Some("87654321".to_string());

        let resolved = resolve_source(&db, &record, &harvesting).unwrap();
        let created = db.sources().find_by_id(&resolved).unwrap().unwrap();
        assert_eq!(created.name, "Unknown Journal (ISSN: 87654321)");
        assert_eq!(created.issn_l.as_deref(), Some("87654321"));
    }

    #[test]
    fn test_resolver_issn_with_journal_name_uses_name() {
        let (db, harvesting) = setup();
        let mut record = extracted(Some("http://x/view/1"));
        record.issn = Some("87654321".to_string());
        record.journal = Some("Journal of Examples".to_string());

        let resolved = resolve_source(&db, &record, &harvesting).unwrap();
        let created = db.sources().find_by_id(&resolved).unwrap().unwrap();
        assert_eq!(created.name, "Journal of Examples");
    }

    #[test]
    fn test_resolver_name_get_or_create() {
        let (db, harvesting) = setup();
        let mut record = extracted(Some("http://x/view/1"));
        record.journal = Some("Journal of Examples".to_string());

        let first = resolve_source(&db, &record, &harvesting).unwrap();
        let second = resolve_source(&db, &record, &harvesting).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolver_falls_back_to_harvesting_source() {
        let (db, harvesting) = setup();
        let record = extracted(Some("http://x/view/1"));
        let resolved = resolve_source(&db, &record, &harvesting).unwrap();
        assert_eq!(resolved, harvesting.id);
    }

    #[test]
    fn test_guard_checks_in_order() {
        let (db, harvesting) = setup();
        let event = HarvestingEvent::start(harvesting.id, None);
        db.events().save(&event).unwrap();

        let mut first = extracted(Some("http://x/view/1"));
        first.doi = Some("10.5555/a".to_string());
        persist_record(&db, first, PageMetadata::default(), harvesting.id, event.id).unwrap();

        // DOI duplicate reported even when the URL differs.
        let mut same_doi = extracted(Some("http://x/view/other"));
        same_doi.doi = Some("10.5555/a".to_string());
        assert_eq!(
            check_record(&db, &same_doi).unwrap(),
            Some(SkipReason::DuplicateDoi("10.5555/a".to_string()))
        );

        let same_url = extracted(Some("http://x/view/1"));
        assert_eq!(
            check_record(&db, &same_url).unwrap(),
            Some(SkipReason::DuplicateUrl("http://x/view/1".to_string()))
        );

        assert_eq!(
            check_record(&db, &extracted(None)).unwrap(),
            Some(SkipReason::MissingUrl)
        );

        assert_eq!(
            check_record(&db, &extracted(Some("http://x/view/new"))).unwrap(),
            None
        );
    }

    #[test]
    fn test_persist_attaches_event_and_extents() {
        let (db, harvesting) = setup();
        let event = HarvestingEvent::start(harvesting.id, None);
        db.events().save(&event).unwrap();

        let page = PageMetadata {
            geometry: GeometryCollection::from_geometry(
                json!({"type": "Point", "coordinates": [7.6, 51.9]}),
            ),
            temporal: TemporalExtent::pair(Some("2010".to_string()), None),
        };
        let saved = persist_record(
            &db,
            extracted(Some("http://x/view/1")),
            page,
            harvesting.id,
            event.id,
        )
        .unwrap();

        let loaded = db.publications().find_by_id(&saved.id).unwrap().unwrap();
        assert_eq!(loaded.status, Status::Harvested);
        assert_eq!(loaded.event_id, Some(event.id));
        assert_eq!(loaded.source_id, Some(harvesting.id));
        assert_eq!(loaded.geometry.kind_summary(), "Point");
        assert_eq!(loaded.temporal.first_start(), Some("2010"));
    }
}
