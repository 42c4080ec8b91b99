use rusqlite::{params, Connection, Row};
use std::sync::MutexGuard;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{EventStatus, HarvestingEvent};

use super::{conversion_error, parse_datetime, parse_datetime_opt, Repository};

pub trait EventRepository: Repository<Entity = HarvestingEvent, Id = Uuid> {
    fn list_for_source(&self, source_id: &Uuid) -> Result<Vec<HarvestingEvent>>;
}

pub struct SqliteEventRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteEventRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }
}

const SELECT_COLUMNS: &str =
    "id, source_id, triggered_by, status, log, started_at, completed_at";

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<HarvestingEvent> {
    let id: String = row.get(0)?;
    let source_id: String = row.get(1)?;
    let status: String = row.get(3)?;
    let started_at: String = row.get(5)?;
    let completed_at: Option<String> = row.get(6)?;

    Ok(HarvestingEvent {
        id: Uuid::parse_str(&id).map_err(conversion_error)?,
        source_id: Uuid::parse_str(&source_id).map_err(conversion_error)?,
        triggered_by: row.get(2)?,
        status: EventStatus::parse(&status).unwrap_or(EventStatus::Failed),
        log: row.get(4)?,
        started_at: parse_datetime(&started_at)?,
        completed_at: parse_datetime_opt(completed_at)?,
    })
}

impl Repository for SqliteEventRepository<'_> {
    type Entity = HarvestingEvent;
    type Id = Uuid;

    fn find_by_id(&self, id: &Uuid) -> Result<Option<HarvestingEvent>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM harvesting_events WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id.to_string()], row_to_event)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn save(&self, event: &HarvestingEvent) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO harvesting_events \
             (id, source_id, triggered_by, status, log, started_at, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id.to_string(),
                event.source_id.to_string(),
                event.triggered_by,
                event.status.as_str(),
                event.log,
                event.started_at.to_rfc3339(),
                event.completed_at.map(|at| at.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: &Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM harvesting_events WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn list_for_source(&self, source_id: &Uuid) -> Result<Vec<HarvestingEvent>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM harvesting_events \
             WHERE source_id = ?1 ORDER BY started_at DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![source_id.to_string()], row_to_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}
