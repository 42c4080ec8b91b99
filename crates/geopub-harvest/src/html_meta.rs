use std::time::Duration;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use geopub_core::models::{GeometryCollection, TemporalExtent};

use crate::error::Result;

static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta").expect("meta selector is valid"));

/// Spatial and temporal coverage scraped from one landing page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub geometry: GeometryCollection,
    pub temporal: TemporalExtent,
}

/// Scan `<meta>` tags for `DC.SpatialCoverage` and
/// `DC.temporal`/`DC.PeriodOfTime`.
///
/// The FIRST spatial tag and the LAST temporal tag win; existing harvested
/// data depends on that asymmetry, so it stays. A malformed spatial tag
/// yields an empty geometry rather than falling through to later tags.
pub fn extract_page_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let mut geometry = GeometryCollection::empty();
    let mut spatial_seen = false;
    let mut temporal = TemporalExtent::empty();

    for element in document.select(&META_SELECTOR) {
        let Some(name) = element.value().attr("name") else {
            continue;
        };
        let content = element.value().attr("content").unwrap_or("");

        match name {
            "DC.SpatialCoverage" if !spatial_seen => {
                spatial_seen = true;
                match serde_json::from_str::<serde_json::Value>(content) {
                    Ok(doc) => {
                        if let Some(collection) = GeometryCollection::from_feature_collection(&doc)
                        {
                            geometry = collection;
                        } else {
                            tracing::warn!("DC.SpatialCoverage has no usable feature geometry");
                        }
                    }
                    Err(e) => {
                        tracing::warn!("invalid JSON in DC.SpatialCoverage: {e}");
                    }
                }
            }
            "DC.temporal" | "DC.PeriodOfTime" => {
                temporal = parse_temporal(content);
            }
            _ => {}
        }
    }

    PageMetadata { geometry, temporal }
}

fn parse_temporal(content: &str) -> TemporalExtent {
    let mut parts = content.splitn(2, '/');
    let start = parts.next().map(str::trim).filter(|s| !s.is_empty());
    let end = parts.next().map(str::trim).filter(|s| !s.is_empty());
    TemporalExtent::pair(start.map(str::to_string), end.map(str::to_string))
}

/// Fetches landing pages. Every failure degrades to empty metadata; the
/// harvest loop never stops for a bad page.
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> PageMetadata {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("error fetching landing page {url}: {e}");
                return PageMetadata::default();
            }
        };
        if !response.status().is_success() {
            tracing::warn!("landing page {url} returned HTTP {}", response.status());
            return PageMetadata::default();
        }
        match response.text().await {
            Ok(html) => extract_page_metadata(&html),
            Err(e) => {
                tracing::warn!("error reading landing page {url}: {e}");
                PageMetadata::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(head: &str) -> String {
        format!("<html><head>{head}</head><body>article</body></html>")
    }

    const POINT_COVERAGE: &str = r#"<meta name="DC.SpatialCoverage" content='{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[7.6,51.9]},"properties":{}}]}'>"#;

    #[test]
    fn test_geometry_from_first_spatial_tag() {
        let polygon = r#"<meta name="DC.SpatialCoverage" content='{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]},"properties":{}}]}'>"#;
        let html = page(&format!("{POINT_COVERAGE}{polygon}"));

        let metadata = extract_page_metadata(&html);
        assert_eq!(metadata.geometry.kind_summary(), "Point");
    }

    #[test]
    fn test_temporal_from_last_tag() {
        let html = page(
            r#"<meta name="DC.temporal" content="2000/2001">
               <meta name="DC.PeriodOfTime" content="2010-01-01/2012-12-31">"#,
        );
        let metadata = extract_page_metadata(&html);
        assert_eq!(metadata.temporal.first_start(), Some("2010-01-01"));
        assert_eq!(metadata.temporal.first_end(), Some("2012-12-31"));
    }

    #[test]
    fn test_one_sided_temporal() {
        let metadata = extract_page_metadata(&page(r#"<meta name="DC.temporal" content="2010/">"#));
        assert_eq!(metadata.temporal.first_start(), Some("2010"));
        assert_eq!(metadata.temporal.first_end(), None);

        let metadata =
            extract_page_metadata(&page(r#"<meta name="DC.temporal" content="/2012">"#));
        assert_eq!(metadata.temporal.first_start(), None);
        assert_eq!(metadata.temporal.first_end(), Some("2012"));
    }

    #[test]
    fn test_missing_tags_yield_empty_metadata() {
        let metadata = extract_page_metadata(&page(r#"<meta name="author" content="Carol">"#));
        assert!(metadata.geometry.is_empty());
        assert!(metadata.temporal.is_empty());
    }

    #[test]
    fn test_invalid_spatial_json_degrades_and_blocks_later_tags() {
        let broken = r#"<meta name="DC.SpatialCoverage" content="not json">"#;
        let html = page(&format!("{broken}{POINT_COVERAGE}"));
        let metadata = extract_page_metadata(&html);
        assert!(metadata.geometry.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_extracts_metadata() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/article/view/42")
            .with_status(200)
            .with_body(page(&format!(
                "{POINT_COVERAGE}<meta name=\"DC.temporal\" content=\"2010/2012\">"
            )))
            .create_async()
            .await;

        let fetcher =
            PageFetcher::new(Duration::from_secs(5), "geopub-test/0.1").unwrap();
        let metadata = fetcher
            .fetch(&format!("{}/article/view/42", server.url()))
            .await;
        assert_eq!(metadata.geometry.kind_summary(), "Point");
        assert_eq!(metadata.temporal.first_start(), Some("2010"));
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let fetcher =
            PageFetcher::new(Duration::from_secs(5), "geopub-test/0.1").unwrap();
        let metadata = fetcher.fetch(&format!("{}/gone", server.url())).await;
        assert_eq!(metadata, PageMetadata::default());
    }
}
