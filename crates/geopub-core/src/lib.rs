pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod workflow;

pub use config::AppConfig;
pub use error::{GeopubError, Result};
pub use models::*;
pub use storage::{
    ConnectionPool, Database, EmailLogRepository, EventRepository, PublicationRepository,
    Repository, SourceRepository,
};
pub use workflow::{Actor, Contribution, PublicationRef, WorkflowError, WorkflowService};
