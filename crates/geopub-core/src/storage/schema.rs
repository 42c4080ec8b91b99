use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 1;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sources (
            id                       TEXT PRIMARY KEY,
            url                      TEXT NOT NULL,
            name                     TEXT NOT NULL,
            issn_l                   TEXT,
            collection               TEXT,
            feed_kind                TEXT NOT NULL DEFAULT 'oai-pmh',
            harvest_interval_minutes INTEGER NOT NULL DEFAULT 1440,
            last_harvested_at        TEXT,
            openalex_id              TEXT,
            works_count              INTEGER,
            publisher                TEXT,
            is_open_access           INTEGER NOT NULL DEFAULT 0,
            is_preprint              INTEGER NOT NULL DEFAULT 0,
            created_at               TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS harvesting_events (
            id           TEXT PRIMARY KEY,
            source_id    TEXT NOT NULL REFERENCES sources(id),
            triggered_by TEXT,
            status       TEXT NOT NULL DEFAULT 'pending',
            log          TEXT,
            started_at   TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS publications (
            id               TEXT PRIMARY KEY,
            title            TEXT NOT NULL,
            abstract         TEXT,
            doi              TEXT,
            url              TEXT,
            publication_date TEXT,
            geometry         TEXT NOT NULL DEFAULT '{\"type\":\"GeometryCollection\",\"geometries\":[]}',
            temporal_start   TEXT NOT NULL DEFAULT '[]',
            temporal_end     TEXT NOT NULL DEFAULT '[]',
            provenance       TEXT,
            status           TEXT NOT NULL DEFAULT 'h',
            source_id        TEXT REFERENCES sources(id),
            event_id         TEXT REFERENCES harvesting_events(id),
            openalex         TEXT NOT NULL DEFAULT '{}',
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS email_log (
            id        TEXT PRIMARY KEY,
            recipient TEXT NOT NULL,
            subject   TEXT NOT NULL,
            body      TEXT NOT NULL,
            status    TEXT NOT NULL,
            error     TEXT,
            sent_at   TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE UNIQUE INDEX IF NOT EXISTS idx_publications_doi
            ON publications(doi) WHERE doi IS NOT NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_publications_url
            ON publications(url) WHERE url IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_publications_status ON publications(status);
        CREATE INDEX IF NOT EXISTS idx_publications_source ON publications(source_id);
        CREATE INDEX IF NOT EXISTS idx_sources_issn_l      ON sources(issn_l);
        CREATE INDEX IF NOT EXISTS idx_events_source       ON harvesting_events(source_id);
        ",
    )?;
    Ok(())
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    create_tables(conn)?;
    create_indexes(conn)?;
    Ok(())
}
