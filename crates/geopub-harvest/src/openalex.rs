use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use geopub_core::config::OpenAlexConfig;
use geopub_core::models::OpenAlexEnrichment;
use geopub_core::storage::{Database, PublicationRepository, Repository};

use crate::error::{HarvestError, Result};
use crate::http::RateLimitedClient;
use crate::identifiers::normalize_doi;

const TITLE_SIMILARITY_THRESHOLD: f64 = 0.9;

/// A candidate match below the confidence threshold, kept for manual
/// review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartialMatch {
    pub openalex_id: Option<String>,
    pub title: Option<String>,
    pub doi: Option<String>,
    pub match_type: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub matched: bool,
}

/// Result of one tiered match attempt.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub exact: Option<OpenAlexEnrichment>,
    pub partial_matches: Vec<PartialMatch>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BackfillSummary {
    pub matched: usize,
    pub partial: usize,
    pub unmatched: usize,
}

/// Tiered matcher against the OpenAlex works API.
///
/// Constructed once and shared; the politeness delay lives in the
/// rate-limited client, so concurrent callers are throttled centrally.
pub struct OpenAlexMatcher {
    client: RateLimitedClient,
    base_url: String,
    mailto: String,
}

impl OpenAlexMatcher {
    pub fn new(config: &OpenAlexConfig) -> Result<Self> {
        let user_agent = format!("geopub/0.1 (mailto:{})", config.mailto);
        let client = RateLimitedClient::new(
            Duration::from_millis(config.request_delay_ms),
            Duration::from_secs(10),
            &user_agent,
        )?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone(),
        })
    }

    /// Tier 1: exact match by DOI. Network failures are logged and treated
    /// as "no result" so the title tiers still run.
    pub async fn match_by_doi(&self, doi: &str) -> Option<Value> {
        let doi = normalize_doi(doi);
        if doi.is_empty() {
            return None;
        }
        let url = format!(
            "{}/works/doi:{}?mailto={}",
            self.base_url, doi, self.mailto
        );

        match self.client.get_json::<Value>(&url).await {
            Ok(data) if data.get("id").and_then(Value::as_str).is_some() => {
                tracing::info!(
                    "OpenAlex match by DOI: {doi} -> {}",
                    data.get("id").and_then(serde_json::Value::as_str).unwrap_or_default()
                );
                Some(data)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("OpenAlex DOI lookup failed for {doi}: {e}");
                None
            }
        }
    }

    /// Tiers 2 and 3: filter query on title (and author when known). The
    /// top result is promoted to exact only when an author was supplied
    /// and the titles are near-identical; everything returned becomes a
    /// partial match otherwise.
    pub async fn match_by_title_author(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> (Option<Value>, Vec<PartialMatch>) {
        if title.is_empty() {
            return (None, Vec::new());
        }

        let mut filter = format!("title.search:{title}");
        if let Some(author) = author {
            filter.push_str(&format!(",author.search:{author}"));
        }

        let url = match Url::parse(&format!("{}/works", self.base_url)) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("filter", &filter)
                    .append_pair("per-page", "5")
                    .append_pair("mailto", &self.mailto);
                url
            }
            Err(e) => {
                tracing::warn!("invalid OpenAlex base URL: {e}");
                return (None, Vec::new());
            }
        };

        let data = match self.client.get_json::<Value>(url.as_str()).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("OpenAlex title search failed: {e}");
                return (None, Vec::new());
            }
        };

        let Some(results) = data.get("results").and_then(Value::as_array) else {
            return (None, Vec::new());
        };
        if results.is_empty() {
            return (None, Vec::new());
        }

        let match_type = if author.is_some() {
            "title+author"
        } else {
            "title"
        };
        let partial_matches: Vec<PartialMatch> = results
            .iter()
            .map(|result| partial_from_result(result, match_type))
            .collect();

        if author.is_some() {
            let best = &results[0];
            let best_title = best.get("title").and_then(Value::as_str).unwrap_or("");
            if titles_similar(title, best_title) {
                tracing::info!(
                    "strong OpenAlex match by title+author: {}",
                    best.get("id").and_then(serde_json::Value::as_str).unwrap_or_default()
                );
                return (Some(best.clone()), partial_matches);
            }
        }

        tracing::info!(
            "{} partial OpenAlex matches for title: {}",
            partial_matches.len(),
            title.chars().take(50).collect::<String>()
        );
        (None, partial_matches)
    }

    /// Main entry point: DOI tier, then title tiers.
    pub async fn match_publication(
        &self,
        title: &str,
        doi: Option<&str>,
        author: Option<&str>,
    ) -> MatchOutcome {
        if let Some(doi) = doi {
            if let Some(work) = self.match_by_doi(doi).await {
                let partial_matches = vec![PartialMatch {
                    openalex_id: json_str(&work, "id"),
                    title: json_str(&work, "title"),
                    doi: json_str(&work, "doi"),
                    match_type: "doi".to_string(),
                    authors: Vec::new(),
                    matched: true,
                }];
                return MatchOutcome {
                    exact: Some(extract_fields(&work)),
                    partial_matches,
                };
            }
        }

        let (exact, partial_matches) = self.match_by_title_author(title, author).await;
        MatchOutcome {
            exact: exact.map(|work| extract_fields(&work)),
            partial_matches,
        }
    }

    /// Enrich stored publications that have no OpenAlex id yet.
    pub async fn backfill(&self, db: &Database, limit: usize) -> Result<BackfillSummary> {
        let pending = db.publications().list_unmatched(limit)?;
        let mut summary = BackfillSummary::default();

        for mut publication in pending {
            let outcome = self
                .match_publication(&publication.title, publication.doi.as_deref(), None)
                .await;

            if let Some(mut enrichment) = outcome.exact {
                enrichment.match_info = None;
                publication.openalex = enrichment;
                summary.matched += 1;
            } else if !outcome.partial_matches.is_empty() {
                publication.openalex.match_info =
                    Some(serde_json::to_value(&outcome.partial_matches).map_err(
                        |e| HarvestError::Parse(e.to_string()),
                    )?);
                summary.partial += 1;
            } else {
                summary.unmatched += 1;
                continue;
            }

            publication.updated_at = chrono::Utc::now();
            db.publications().save(&publication)?;
        }

        Ok(summary)
    }
}

fn json_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(ToOwned::to_owned)
}

fn partial_from_result(result: &Value, match_type: &str) -> PartialMatch {
    let authors = result
        .get("authorships")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .take(3)
                .filter_map(|a| {
                    a.get("author")
                        .and_then(|author| author.get("display_name"))
                        .and_then(Value::as_str)
                })
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    PartialMatch {
        openalex_id: json_str(result, "id"),
        title: json_str(result, "title"),
        doi: json_str(result, "doi"),
        match_type: match_type.to_string(),
        authors,
        matched: false,
    }
}

/// Character-overlap title similarity: lowercased, trimmed, the overlap
/// of character sets over the larger set. A weak metric, kept for parity
/// with existing match decisions.
pub fn titles_similar(title1: &str, title2: &str) -> bool {
    let t1 = title1.to_lowercase();
    let t1 = t1.trim();
    let t2 = title2.to_lowercase();
    let t2 = t2.trim();

    if t1.is_empty() || t2.is_empty() {
        return false;
    }
    if t1 == t2 {
        return true;
    }

    let set1: std::collections::HashSet<char> = t1.chars().collect();
    let set2: std::collections::HashSet<char> = t2.chars().collect();
    let overlap = set1.intersection(&set2).count();
    let total = set1.len().max(set2.len());
    if total == 0 {
        return false;
    }
    overlap as f64 / total as f64 >= TITLE_SIMILARITY_THRESHOLD
}

/// Null-safe extraction of the enrichment block from one work document.
pub fn extract_fields(work: &Value) -> OpenAlexEnrichment {
    let fulltext_origin = work
        .get("primary_location")
        .and_then(Value::as_object)
        .and_then(|location| location.get("source"))
        .and_then(Value::as_object)
        .and_then(|source| source.get("type"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);

    let authors = work
        .get("authorships")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|authorship| {
                    authorship
                        .get("author")
                        .and_then(|author| author.get("display_name"))
                        .and_then(Value::as_str)
                })
                .filter(|name| !name.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let keywords = display_names(work.get("keywords"));
    let topics = display_names(work.get("topics"));

    let open_access_status = work
        .get("open_access")
        .filter(|oa| oa.get("is_oa").and_then(Value::as_bool).unwrap_or(false))
        .and_then(|oa| oa.get("oa_status"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);

    OpenAlexEnrichment {
        openalex_id: json_str(work, "id"),
        authors,
        keywords,
        topics,
        open_access_status,
        is_retracted: work
            .get("is_retracted")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        ids: work.get("ids").cloned(),
        match_info: None,
        work_type: json_str(work, "type"),
        fulltext_origin,
    }
}

fn display_names(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|item| item.get("display_name").and_then(Value::as_str))
                .filter(|name| !name.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config(base_url: &str) -> OpenAlexConfig {
        OpenAlexConfig {
            base_url: base_url.to_string(),
            mailto: "test@example.org".to_string(),
            request_delay_ms: 0,
        }
    }

    fn work_fixture() -> Value {
        json!({
            "id": "https://openalex.org/W123",
            "doi": "https://doi.org/10.5555/a",
            "title": "Mapping the Rhine",
            "type": "article",
            "is_retracted": false,
            "ids": {"openalex": "https://openalex.org/W123", "doi": "https://doi.org/10.5555/a"},
            "primary_location": {"source": {"type": "journal"}},
            "open_access": {"is_oa": true, "oa_status": "gold"},
            "authorships": [
                {"author": {"display_name": "Carol Example"}},
                {"author": {"display_name": "Dan Example"}},
                {"author": {}}
            ],
            "keywords": [{"display_name": "rivers"}, {"display_name": "cartography"}],
            "topics": [{"display_name": "Hydrology"}]
        })
    }

    #[test]
    fn test_extract_fields() {
        let enrichment = extract_fields(&work_fixture());
        assert_eq!(
            enrichment.openalex_id.as_deref(),
            Some("https://openalex.org/W123")
        );
        assert_eq!(enrichment.authors, vec!["Carol Example", "Dan Example"]);
        assert_eq!(enrichment.keywords, vec!["rivers", "cartography"]);
        assert_eq!(enrichment.topics, vec!["Hydrology"]);
        assert_eq!(enrichment.open_access_status.as_deref(), Some("gold"));
        assert_eq!(enrichment.fulltext_origin.as_deref(), Some("journal"));
        assert_eq!(enrichment.work_type.as_deref(), Some("article"));
        assert!(!enrichment.is_retracted);
    }

    #[test]
    fn test_extract_fields_null_safe() {
        let enrichment = extract_fields(&json!({
            "id": "https://openalex.org/W9",
            "primary_location": null,
            "open_access": {"is_oa": false, "oa_status": "closed"}
        }));
        assert_eq!(enrichment.fulltext_origin, None);
        // oa_status only carries when the work actually is open access.
        assert_eq!(enrichment.open_access_status, None);
        assert!(enrichment.authors.is_empty());
    }

    #[test]
    fn test_titles_similar() {
        assert!(titles_similar("Mapping the Rhine", "mapping the rhine"));
        assert!(titles_similar("Mapping the Rhine", " Mapping the Rhine "));
        assert!(!titles_similar("Mapping the Rhine", "Quantum Chromodynamics"));
        assert!(!titles_similar("", "anything"));
    }

    #[tokio::test]
    async fn test_doi_tier_short_circuits() {
        let mut server = mockito::Server::new_async().await;
        let doi_mock = server
            .mock("GET", "/works/doi:10.5555/a")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(work_fixture().to_string())
            .create_async()
            .await;
        // Tier 2 must never run when tier 1 matches.
        let search_mock = server
            .mock("GET", "/works")
            .match_query(mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let matcher = OpenAlexMatcher::new(&test_config(&server.url())).unwrap();
        let outcome = matcher
            .match_publication("Mapping the Rhine", Some("10.5555/a"), Some("Carol Example"))
            .await;

        let enrichment = outcome.exact.unwrap();
        assert_eq!(
            enrichment.openalex_id.as_deref(),
            Some("https://openalex.org/W123")
        );
        assert_eq!(outcome.partial_matches.len(), 1);
        assert_eq!(outcome.partial_matches[0].match_type, "doi");
        assert!(outcome.partial_matches[0].matched);

        doi_mock.assert_async().await;
        search_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_doi_failure_falls_through_to_title_tier() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works/doi:10.5555/missing")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/works")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({"results": [work_fixture()]}).to_string())
            .create_async()
            .await;

        let matcher = OpenAlexMatcher::new(&test_config(&server.url())).unwrap();
        let outcome = matcher
            .match_publication(
                "Mapping the Rhine",
                Some("10.5555/missing"),
                Some("Carol Example"),
            )
            .await;

        // Titles are identical, so the top result promotes to exact.
        assert!(outcome.exact.is_some());
        assert_eq!(outcome.partial_matches[0].match_type, "title+author");
    }

    #[tokio::test]
    async fn test_ambiguous_title_yields_partial_matches_only() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                json!({"results": [
                    {"id": "https://openalex.org/W1", "title": "Entirely Different Subject",
                     "authorships": [{"author": {"display_name": "A"}}]},
                    {"id": "https://openalex.org/W2", "title": "Another Unrelated Thing"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let matcher = OpenAlexMatcher::new(&test_config(&server.url())).unwrap();
        let outcome = matcher
            .match_publication("Mapping the Rhine", None, Some("Carol Example"))
            .await;

        assert!(outcome.exact.is_none());
        assert_eq!(outcome.partial_matches.len(), 2);
        assert_eq!(
            outcome.partial_matches[0].openalex_id.as_deref(),
            Some("https://openalex.org/W1")
        );
    }

    #[tokio::test]
    async fn test_no_author_never_promotes_to_exact() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({"results": [work_fixture()]}).to_string())
            .create_async()
            .await;

        let matcher = OpenAlexMatcher::new(&test_config(&server.url())).unwrap();
        let outcome = matcher
            .match_publication("Mapping the Rhine", None, None)
            .await;

        assert!(outcome.exact.is_none());
        assert_eq!(outcome.partial_matches.len(), 1);
        assert_eq!(outcome.partial_matches[0].match_type, "title");
    }

    #[tokio::test]
    async fn test_backfill_writes_enrichment_and_match_info() {
        use geopub_core::models::Publication;

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works/doi:10.5555/a")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(work_fixture().to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/works")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                json!({"results": [{"id": "https://openalex.org/W7", "title": "Unrelated"}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let db = Database::open_in_memory().unwrap();
        let mut with_doi = Publication::new("Mapping the Rhine");
        with_doi.doi = Some("10.5555/a".to_string());
        db.publications().insert(&with_doi).unwrap();
        let without_doi = Publication::new("Glacier retreat in the Alps");
        db.publications().insert(&without_doi).unwrap();

        let matcher = OpenAlexMatcher::new(&test_config(&server.url())).unwrap();
        let summary = matcher.backfill(&db, 10).await.unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.partial, 1);
        assert_eq!(summary.unmatched, 0);

        let enriched = db.publications().find_by_id(&with_doi.id).unwrap().unwrap();
        assert!(enriched.openalex.is_matched());
        assert_eq!(enriched.openalex.authors, vec!["Carol Example", "Dan Example"]);

        let partial = db
            .publications()
            .find_by_id(&without_doi.id)
            .unwrap()
            .unwrap();
        assert!(!partial.openalex.is_matched());
        assert!(partial.openalex.match_info.is_some());
    }
}
