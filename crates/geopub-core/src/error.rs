use thiserror::Error;

/// All errors that can occur in geopub-core.
#[derive(Debug, Error)]
pub enum GeopubError {
    #[error("Publication not found: {0}")]
    PublicationNotFound(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Harvesting event not found: {0}")]
    EventNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, GeopubError>;
