use std::time::Duration;

use chrono::Utc;

use geopub_core::config::AppConfig;
use geopub_core::models::{EmailLog, FeedKind, HarvestingEvent, Source};
use geopub_core::storage::{Database, EmailLogRepository, Repository, SourceRepository};

use crate::error::Result;
use crate::html_meta::PageFetcher;
use crate::http::RateLimitedClient;
use crate::notify::Notifier;
use crate::oai::parse_oai_records;
use crate::persist::{check_record, persist_record, resolve_source};
use crate::record::extract_fields;
use crate::rss::parse_feed_records;

/// Counters for one harvesting run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub added: usize,
    /// How many of the added publications carry a geometry.
    pub spatial: usize,
    /// How many carry a temporal extent.
    pub temporal: usize,
}

impl HarvestSummary {
    pub fn describe(&self) -> String {
        format!(
            "{} publications added ({} with spatial extent, {} with temporal extent)",
            self.added, self.spatial, self.temporal
        )
    }
}

/// Drives one harvesting run per source: fetch the feed, parse it, and
/// walk the records through extraction, dedup, landing-page scraping and
/// storage. Record-level problems are logged and skipped; only feed-level
/// problems fail the run.
pub struct Harvester {
    feed_client: RateLimitedClient,
    page_fetcher: PageFetcher,
    notifier: Box<dyn Notifier>,
}

impl Harvester {
    pub fn new(config: &AppConfig, notifier: Box<dyn Notifier>) -> Result<Self> {
        let user_agent = format!("geopub/0.1 (mailto:{})", config.openalex.mailto);
        Ok(Self {
            feed_client: RateLimitedClient::new(
                Duration::from_millis(config.openalex.request_delay_ms),
                Duration::from_secs(config.harvest.feed_timeout_secs),
                &user_agent,
            )?,
            page_fetcher: PageFetcher::new(
                Duration::from_secs(config.harvest.page_timeout_secs),
                &user_agent,
            )?,
            notifier,
        })
    }

    /// Harvest one source under a fresh event. A failed run leaves a
    /// failed event and an all-zero summary; the error never propagates
    /// so a batch keeps going.
    pub async fn harvest_source(
        &self,
        db: &Database,
        source: &Source,
        max_records: Option<usize>,
        user_email: Option<&str>,
    ) -> Result<HarvestSummary> {
        let mut event = HarvestingEvent::start(source.id, user_email.map(str::to_string));
        db.events().save(&event)?;
        tracing::info!("harvesting {} ({})", source.name, source.url);

        match self.run(db, source, &event, max_records).await {
            Ok(summary) => {
                event.log = Some(summary.describe());
                event.complete();
                db.events().save(&event)?;
                db.sources().touch_last_harvested(&source.id, Utc::now())?;
                tracing::info!("{}: {}", source.name, summary.describe());
                self.notify(
                    db,
                    user_email,
                    &format!("Harvesting completed for {}", source.name),
                    &format!(
                        "Harvesting of {} finished.\n{}\n{}.",
                        source_line(source),
                        event_line(&event),
                        summary.describe()
                    ),
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("harvest of {} failed: {e}", source.name);
                event.fail(&e.to_string());
                db.events().save(&event)?;
                self.notify(
                    db,
                    user_email,
                    &format!("Harvesting failed for {}", source.name),
                    &format!(
                        "Harvesting of {} failed.\n{}\nError: {e}",
                        source_line(source),
                        event_line(&event)
                    ),
                );
                Ok(HarvestSummary::default())
            }
        }
    }

    pub async fn harvest_all(
        &self,
        db: &Database,
        max_records: Option<usize>,
        user_email: Option<&str>,
    ) -> Result<Vec<(Source, HarvestSummary)>> {
        let sources = db.sources().list()?;
        self.harvest_batch(db, sources, max_records, user_email).await
    }

    pub async fn harvest_due(
        &self,
        db: &Database,
        max_records: Option<usize>,
        user_email: Option<&str>,
    ) -> Result<Vec<(Source, HarvestSummary)>> {
        let sources = db.sources().list_due(Utc::now())?;
        self.harvest_batch(db, sources, max_records, user_email).await
    }

    async fn harvest_batch(
        &self,
        db: &Database,
        sources: Vec<Source>,
        max_records: Option<usize>,
        user_email: Option<&str>,
    ) -> Result<Vec<(Source, HarvestSummary)>> {
        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            let summary = self
                .harvest_source(db, &source, max_records, user_email)
                .await?;
            results.push((source, summary));
        }
        Ok(results)
    }

    async fn run(
        &self,
        db: &Database,
        source: &Source,
        event: &HarvestingEvent,
        max_records: Option<usize>,
    ) -> Result<HarvestSummary> {
        let body = self.feed_client.get(&source.url).await?;
        let mut records = match source.feed_kind {
            FeedKind::OaiPmh => parse_oai_records(&body)?,
            FeedKind::Rss => parse_feed_records(&body)?,
        };
        if let Some(cap) = max_records {
            records.truncate(cap);
        }

        let mut summary = HarvestSummary::default();
        for record in &records {
            let extracted = extract_fields(record);

            // Resolve the venue before the dedup guard so a journal named
            // only by an already-known record still gets registered.
            let source_id = match resolve_source(db, &extracted, source) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("source resolution failed: {e}");
                    continue;
                }
            };

            match check_record(db, &extracted) {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    tracing::debug!("skipping record: {reason}");
                    continue;
                }
                Err(e) => {
                    tracing::warn!("record check failed: {e}");
                    continue;
                }
            }

            // The guard already rejected records without a URL.
            let Some(url) = extracted.url.clone() else {
                continue;
            };
            let page = self.page_fetcher.fetch(&url).await;

            match persist_record(db, extracted, page, source_id, event.id) {
                Ok(publication) => {
                    summary.added += 1;
                    if !publication.geometry.is_empty() {
                        summary.spatial += 1;
                    }
                    if !publication.temporal.is_empty() {
                        summary.temporal += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("failed to store record from {url}: {e}");
                }
            }
        }

        Ok(summary)
    }

    /// Delivery is best effort; every attempt lands in the e-mail log.
    fn notify(&self, db: &Database, recipient: Option<&str>, subject: &str, body: &str) {
        let Some(to) = recipient else {
            return;
        };
        let entry = match self.notifier.send(to, subject, body) {
            Ok(()) => EmailLog::sent(to, subject, body),
            Err(e) => {
                tracing::warn!("e-mail to {to} failed: {e}");
                EmailLog::failed(to, subject, body, &e.to_string())
            }
        };
        if let Err(e) = db.email_log().record(&entry) {
            tracing::warn!("failed to record e-mail attempt: {e}");
        }
    }
}

fn source_line(source: &Source) -> String {
    match &source.collection {
        Some(collection) => format!("{} [{}] ({})", source.name, collection, source.url),
        None => format!("{} ({})", source.name, source.url),
    }
}

fn event_line(event: &HarvestingEvent) -> String {
    let completed = event
        .completed_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Started {}, finished {}",
        event.started_at.to_rfc3339(),
        completed
    )
}
