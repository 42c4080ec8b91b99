use rusqlite::{params, Connection, Row};
use std::sync::MutexGuard;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{GeometryCollection, OpenAlexEnrichment, Publication, Status, TemporalExtent};

use super::{conversion_error, parse_datetime, Repository};

pub trait PublicationRepository: Repository<Entity = Publication, Id = Uuid> {
    /// Insert one new publication inside its own transaction.
    fn insert(&self, publication: &Publication) -> Result<()>;
    fn find_by_doi(&self, doi: &str) -> Result<Option<Publication>>;
    fn find_by_url(&self, url: &str) -> Result<Option<Publication>>;
    fn doi_exists(&self, doi: &str) -> Result<bool>;
    fn url_exists(&self, url: &str) -> Result<bool>;
    fn list_by_status(&self, status: Status, limit: usize) -> Result<Vec<Publication>>;
    /// Publications with no OpenAlex id yet, oldest first.
    fn list_unmatched(&self, limit: usize) -> Result<Vec<Publication>>;
    fn count(&self) -> Result<usize>;
}

pub struct SqlitePublicationRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqlitePublicationRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }
}

const SELECT_COLUMNS: &str = "id, title, abstract, doi, url, publication_date, geometry, \
     temporal_start, temporal_end, provenance, status, source_id, event_id, openalex, \
     created_at, updated_at";

fn row_to_publication(row: &Row<'_>) -> rusqlite::Result<Publication> {
    let id: String = row.get(0)?;
    let geometry: String = row.get(6)?;
    let temporal_start: String = row.get(7)?;
    let temporal_end: String = row.get(8)?;
    let status: String = row.get(10)?;
    let source_id: Option<String> = row.get(11)?;
    let event_id: Option<String> = row.get(12)?;
    let openalex: String = row.get(13)?;
    let created_at: String = row.get(14)?;
    let updated_at: String = row.get(15)?;

    Ok(Publication {
        id: Uuid::parse_str(&id).map_err(conversion_error)?,
        title: row.get(1)?,
        abstract_text: row.get(2)?,
        doi: row.get(3)?,
        url: row.get(4)?,
        publication_date: row.get(5)?,
        geometry: serde_json::from_str::<GeometryCollection>(&geometry)
            .map_err(conversion_error)?,
        temporal: TemporalExtent {
            start: serde_json::from_str(&temporal_start).map_err(conversion_error)?,
            end: serde_json::from_str(&temporal_end).map_err(conversion_error)?,
        },
        provenance: row.get(9)?,
        status: Status::from_code(&status).map_err(conversion_error)?,
        source_id: source_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(conversion_error)?,
        event_id: event_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(conversion_error)?,
        openalex: serde_json::from_str::<OpenAlexEnrichment>(&openalex)
            .map_err(conversion_error)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl SqlitePublicationRepository<'_> {
    fn write(&self, publication: &Publication, replace: bool) -> Result<()> {
        let verb = if replace { "INSERT OR REPLACE" } else { "INSERT" };
        let sql = format!(
            "{verb} INTO publications \
             (id, title, abstract, doi, url, publication_date, geometry, temporal_start, \
              temporal_end, provenance, status, source_id, event_id, openalex, created_at, \
              updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        );
        self.conn.execute(
            &sql,
            params![
                publication.id.to_string(),
                publication.title,
                publication.abstract_text,
                publication.doi,
                publication.url,
                publication.publication_date,
                serde_json::to_string(&publication.geometry)?,
                serde_json::to_string(&publication.temporal.start)?,
                serde_json::to_string(&publication.temporal.end)?,
                publication.provenance,
                publication.status.as_code(),
                publication.source_id.map(|id| id.to_string()),
                publication.event_id.map(|id| id.to_string()),
                serde_json::to_string(&publication.openalex)?,
                publication.created_at.to_rfc3339(),
                publication.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn find_where(&self, clause: &str, value: &str) -> Result<Option<Publication>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM publications WHERE {clause} LIMIT 1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![value], row_to_publication)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}

impl Repository for SqlitePublicationRepository<'_> {
    type Entity = Publication;
    type Id = Uuid;

    fn find_by_id(&self, id: &Uuid) -> Result<Option<Publication>> {
        self.find_where("id = ?1", &id.to_string())
    }

    fn save(&self, publication: &Publication) -> Result<()> {
        self.write(publication, true)
    }

    fn delete(&self, id: &Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM publications WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

impl PublicationRepository for SqlitePublicationRepository<'_> {
    fn insert(&self, publication: &Publication) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.write(publication, false)?;
        tx.commit()?;
        Ok(())
    }

    fn find_by_doi(&self, doi: &str) -> Result<Option<Publication>> {
        self.find_where("doi = ?1", doi)
    }

    fn find_by_url(&self, url: &str) -> Result<Option<Publication>> {
        self.find_where("url = ?1", url)
    }

    fn doi_exists(&self, doi: &str) -> Result<bool> {
        let exists = self
            .conn
            .prepare("SELECT 1 FROM publications WHERE doi = ?1")?
            .exists(params![doi])?;
        Ok(exists)
    }

    fn url_exists(&self, url: &str) -> Result<bool> {
        let exists = self
            .conn
            .prepare("SELECT 1 FROM publications WHERE url = ?1")?
            .exists(params![url])?;
        Ok(exists)
    }

    fn list_by_status(&self, status: Status, limit: usize) -> Result<Vec<Publication>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM publications WHERE status = ?1 \
             ORDER BY created_at LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![status.as_code(), limit], row_to_publication)?;
        let mut publications = Vec::new();
        for row in rows {
            publications.push(row?);
        }
        Ok(publications)
    }

    fn list_unmatched(&self, limit: usize) -> Result<Vec<Publication>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM publications \
             WHERE json_extract(openalex, '$.openalex_id') IS NULL \
             ORDER BY created_at LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit], row_to_publication)?;
        let mut publications = Vec::new();
        for row in rows {
            publications.push(row?);
        }
        Ok(publications)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM publications", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
