mod email_log_repository;
mod event_repository;
mod publication_repository;
mod source_repository;

pub use email_log_repository::{EmailLogRepository, SqliteEmailLogRepository};
pub use event_repository::{EventRepository, SqliteEventRepository};
pub use publication_repository::{PublicationRepository, SqlitePublicationRepository};
pub use source_repository::{SourceRepository, SqliteSourceRepository};

use chrono::{DateTime, Utc};

use crate::error::Result;

pub trait Repository {
    type Entity;
    type Id;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;
    fn save(&self, entity: &Self::Entity) -> Result<()>;
    fn delete(&self, id: &Self::Id) -> Result<bool>;
}

/// Map arbitrary conversion failures into a rusqlite error so row-mapping
/// closures can use `?` throughout.
pub(crate) fn conversion_error<E>(err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

pub(crate) fn parse_datetime(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

pub(crate) fn parse_datetime_opt(value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_datetime).transpose()
}
