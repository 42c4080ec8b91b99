use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::MutexGuard;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{FeedKind, Source};

use super::{conversion_error, parse_datetime, parse_datetime_opt, Repository};

pub trait SourceRepository: Repository<Entity = Source, Id = Uuid> {
    fn find_by_issn(&self, issn_l: &str) -> Result<Option<Source>>;
    fn find_by_name(&self, name: &str) -> Result<Option<Source>>;
    fn list(&self) -> Result<Vec<Source>>;
    /// Sources whose harvest interval has elapsed at `now`.
    fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Source>>;
    fn touch_last_harvested(&self, id: &Uuid, at: DateTime<Utc>) -> Result<()>;
}

pub struct SqliteSourceRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteSourceRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }
}

const SELECT_COLUMNS: &str = "id, url, name, issn_l, collection, feed_kind, \
     harvest_interval_minutes, last_harvested_at, openalex_id, works_count, publisher, \
     is_open_access, is_preprint, created_at";

fn row_to_source(row: &Row<'_>) -> rusqlite::Result<Source> {
    let id: String = row.get(0)?;
    let feed_kind: String = row.get(5)?;
    let last_harvested_at: Option<String> = row.get(7)?;
    let created_at: String = row.get(13)?;

    Ok(Source {
        id: Uuid::parse_str(&id).map_err(conversion_error)?,
        url: row.get(1)?,
        name: row.get(2)?,
        issn_l: row.get(3)?,
        collection: row.get(4)?,
        feed_kind: FeedKind::parse(&feed_kind).unwrap_or_default(),
        harvest_interval_minutes: row.get(6)?,
        last_harvested_at: parse_datetime_opt(last_harvested_at)?,
        openalex_id: row.get(8)?,
        works_count: row.get(9)?,
        publisher: row.get(10)?,
        is_open_access: row.get(11)?,
        is_preprint: row.get(12)?,
        created_at: parse_datetime(&created_at)?,
    })
}

impl SqliteSourceRepository<'_> {
    fn find_where(&self, clause: &str, value: &str) -> Result<Option<Source>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM sources WHERE {clause} LIMIT 1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![value], row_to_source)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn collect(&self, sql: &str) -> Result<Vec<Source>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], row_to_source)?;
        let mut sources = Vec::new();
        for row in rows {
            sources.push(row?);
        }
        Ok(sources)
    }
}

impl Repository for SqliteSourceRepository<'_> {
    type Entity = Source;
    type Id = Uuid;

    fn find_by_id(&self, id: &Uuid) -> Result<Option<Source>> {
        self.find_where("id = ?1", &id.to_string())
    }

    fn save(&self, source: &Source) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sources \
             (id, url, name, issn_l, collection, feed_kind, harvest_interval_minutes, \
              last_harvested_at, openalex_id, works_count, publisher, is_open_access, \
              is_preprint, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                source.id.to_string(),
                source.url,
                source.name,
                source.issn_l,
                source.collection,
                source.feed_kind.as_str(),
                source.harvest_interval_minutes,
                source.last_harvested_at.map(|at| at.to_rfc3339()),
                source.openalex_id,
                source.works_count,
                source.publisher,
                source.is_open_access,
                source.is_preprint,
                source.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: &Uuid) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sources WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}

impl SourceRepository for SqliteSourceRepository<'_> {
    fn find_by_issn(&self, issn_l: &str) -> Result<Option<Source>> {
        self.find_where("issn_l = ?1", issn_l)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Source>> {
        self.find_where("name = ?1", name)
    }

    fn list(&self) -> Result<Vec<Source>> {
        self.collect(&format!(
            "SELECT {SELECT_COLUMNS} FROM sources ORDER BY name"
        ))
    }

    fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Source>> {
        // Interval arithmetic happens in Rust; the table stays small.
        let all = self.list()?;
        Ok(all.into_iter().filter(|s| s.is_due(now)).collect())
    }

    fn touch_last_harvested(&self, id: &Uuid, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE sources SET last_harvested_at = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }
}
