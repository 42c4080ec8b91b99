use rusqlite::{params, Connection, Row};
use std::sync::MutexGuard;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{EmailLog, EmailStatus};

use super::{conversion_error, parse_datetime};

pub trait EmailLogRepository {
    fn record(&self, entry: &EmailLog) -> Result<()>;
    fn list_recent(&self, limit: usize) -> Result<Vec<EmailLog>>;
}

pub struct SqliteEmailLogRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteEmailLogRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<EmailLog> {
    let id: String = row.get(0)?;
    let status: String = row.get(4)?;
    let sent_at: String = row.get(6)?;

    Ok(EmailLog {
        id: Uuid::parse_str(&id).map_err(conversion_error)?,
        recipient: row.get(1)?,
        subject: row.get(2)?,
        body: row.get(3)?,
        status: EmailStatus::parse(&status).unwrap_or(EmailStatus::Failed),
        error: row.get(5)?,
        sent_at: parse_datetime(&sent_at)?,
    })
}

impl EmailLogRepository for SqliteEmailLogRepository<'_> {
    fn record(&self, entry: &EmailLog) -> Result<()> {
        self.conn.execute(
            "INSERT INTO email_log (id, recipient, subject, body, status, error, sent_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.to_string(),
                entry.recipient,
                entry.subject,
                entry.body,
                entry.status.as_str(),
                entry.error,
                entry.sent_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<EmailLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recipient, subject, body, status, error, sent_at \
             FROM email_log ORDER BY sent_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
