mod connection;
pub mod repositories;
mod schema;

pub use connection::ConnectionPool;
pub use schema::{init_schema, SCHEMA_VERSION};

use std::path::Path;

use crate::error::Result;

pub use repositories::{
    EmailLogRepository, EventRepository, PublicationRepository, Repository, SourceRepository,
    SqliteEmailLogRepository, SqliteEventRepository, SqlitePublicationRepository,
    SqliteSourceRepository,
};

/// Handle to the SQLite store. Hands out repositories that hold the
/// connection lock for the duration of one operation.
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pool = ConnectionPool::open(path)?;
        {
            let conn = pool.get_connection();
            schema::init_schema(&conn)?;
        }
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> Result<Self> {
        let pool = ConnectionPool::open_in_memory()?;
        {
            let conn = pool.get_connection();
            schema::init_schema(&conn)?;
        }
        Ok(Self { pool })
    }

    /// Direct pool access for callers that need the raw connection,
    /// e.g. maintenance statements outside the repository surface.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn publications(&self) -> SqlitePublicationRepository<'_> {
        SqlitePublicationRepository::new(self.pool.get_connection())
    }

    pub fn sources(&self) -> SqliteSourceRepository<'_> {
        SqliteSourceRepository::new(self.pool.get_connection())
    }

    pub fn events(&self) -> SqliteEventRepository<'_> {
        SqliteEventRepository::new(self.pool.get_connection())
    }

    pub fn email_log(&self) -> SqliteEmailLogRepository<'_> {
        SqliteEmailLogRepository::new(self.pool.get_connection())
    }
}
