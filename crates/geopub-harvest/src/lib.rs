//! Feed harvesting, metadata extraction and OpenAlex enrichment.
//!
//! The pipeline runs per source: fetch the feed document, parse it into
//! raw records, extract structured fields, dedup against the store,
//! scrape the landing page for spatial and temporal coverage, and
//! persist the result as a harvested publication.

pub mod error;
pub mod html_meta;
pub mod http;
pub mod identifiers;
pub mod notify;
pub mod oai;
pub mod openalex;
pub mod persist;
pub mod pipeline;
pub mod record;
pub mod rss;

pub use error::{HarvestError, Result};
pub use html_meta::{extract_page_metadata, PageFetcher, PageMetadata};
pub use http::RateLimitedClient;
pub use notify::{notifier_from_config, NoopNotifier, Notifier, SmtpNotifier};
pub use oai::parse_oai_records;
pub use openalex::{BackfillSummary, MatchOutcome, OpenAlexMatcher, PartialMatch};
pub use persist::{check_record, persist_record, resolve_source, SkipReason};
pub use pipeline::{Harvester, HarvestSummary};
pub use record::{extract_fields, ExtractedRecord, RawRecord};
pub use rss::parse_feed_records;
