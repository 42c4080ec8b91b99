use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no records in feed response")]
    NoRecords,

    #[error("notification error: {0}")]
    Notify(String),

    #[error(transparent)]
    Core(#[from] geopub_core::GeopubError),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
