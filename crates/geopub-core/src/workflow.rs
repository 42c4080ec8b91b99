//! The publication lifecycle: contribute, publish, unpublish.
//!
//! Guard failures are expected control-flow outcomes with stable messages,
//! not panics. Every accepted transition appends a provenance entry; the
//! log is never rewritten.

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::error::GeopubError;
use crate::models::{GeometryCollection, Publication, Status};
use crate::storage::{Database, PublicationRepository, Repository};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Publication not found")]
    NotFound,

    #[error("Can only contribute to harvested publications")]
    NotHarvested,

    #[error("No geometry or temporal extent provided")]
    EmptyContribution,

    #[error("Publication already has geometry")]
    GeometryExists,

    #[error("Cannot publish harvested publication without spatial or temporal extent")]
    MissingExtent,

    #[error("Can only publish contributed or harvested publications")]
    NotPublishable,

    #[error("Can only unpublish published publications")]
    NotPublished,

    #[error("Admin privileges required")]
    Forbidden,

    #[error("Invalid publication reference: {0}")]
    InvalidReference(String),

    #[error(transparent)]
    Storage(#[from] GeopubError),
}

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

/// Who is performing a transition.
#[derive(Debug, Clone)]
pub struct Actor {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            is_admin: false,
        }
    }

    pub fn admin(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            is_admin: true,
        }
    }
}

/// A publication addressed either by DOI or by internal id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationRef {
    Doi(String),
    Id(Uuid),
}

impl PublicationRef {
    /// DOI-shaped values (contain a slash or start with "10.") resolve by
    /// DOI, anything else must be a valid id.
    pub fn parse(value: &str) -> WorkflowResult<Self> {
        if value.contains('/') || value.starts_with("10.") {
            return Ok(PublicationRef::Doi(value.to_string()));
        }
        Uuid::parse_str(value)
            .map(PublicationRef::Id)
            .map_err(|_| WorkflowError::InvalidReference(value.to_string()))
    }
}

/// Geometry and/or temporal extent supplied by a contributor.
#[derive(Debug, Clone, Default)]
pub struct Contribution {
    /// A bare GeoJSON geometry; wrapped into a collection on acceptance.
    pub geometry: Option<Value>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Contribution {
    fn is_empty(&self) -> bool {
        self.geometry.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }
}

pub struct WorkflowService<'a> {
    db: &'a Database,
}

impl<'a> WorkflowService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn resolve(&self, reference: &PublicationRef) -> WorkflowResult<Publication> {
        let found = match reference {
            PublicationRef::Doi(doi) => self.db.publications().find_by_doi(doi)?,
            PublicationRef::Id(id) => self.db.publications().find_by_id(id)?,
        };
        found.ok_or(WorkflowError::NotFound)
    }

    /// Harvested → Contributed. Accepts geometry and/or a temporal pair;
    /// at least one must be present.
    pub fn contribute(
        &self,
        reference: &PublicationRef,
        contribution: Contribution,
        actor: &Actor,
    ) -> WorkflowResult<Publication> {
        let mut publication = self.resolve(reference)?;

        if publication.status != Status::Harvested {
            return Err(WorkflowError::NotHarvested);
        }
        if contribution.is_empty() {
            return Err(WorkflowError::EmptyContribution);
        }

        let mut changes = Vec::new();

        if let Some(geojson) = contribution.geometry {
            if !publication.geometry.is_empty() {
                return Err(WorkflowError::GeometryExists);
            }
            let geometry = GeometryCollection::from_geometry(geojson);
            changes.push(format!(
                "Changed geometry from empty to {}",
                geometry.kind_summary()
            ));
            publication.geometry = geometry;
        }

        if let Some(start) = contribution.start_date {
            changes.push(format!("Set start date to {start}"));
            publication.temporal.start = vec![Some(start)];
        }
        if let Some(end) = contribution.end_date {
            changes.push(format!("Set end date to {end}"));
            publication.temporal.end = vec![Some(end)];
        }

        let note = format!(
            "Contribution by user {} ({}) on {}. {}. Status changed from Harvested to Contributed.",
            actor.username,
            actor.email,
            Utc::now().to_rfc3339(),
            changes.join(". ")
        );
        publication.append_provenance(&note);
        publication.status = Status::Contributed;
        publication.updated_at = Utc::now();
        self.db.publications().save(&publication)?;

        tracing::info!(
            user = %actor.username,
            publication = %publication.id,
            "accepted contribution: {}",
            changes.join(", ")
        );
        Ok(publication)
    }

    /// Contributed → Published, or Harvested → Published when the record
    /// already carries some extent. Admin only.
    pub fn publish(
        &self,
        reference: &PublicationRef,
        actor: &Actor,
    ) -> WorkflowResult<Publication> {
        if !actor.is_admin {
            return Err(WorkflowError::Forbidden);
        }
        let mut publication = self.resolve(reference)?;

        let old_status = match publication.status {
            Status::Contributed => Status::Contributed,
            Status::Harvested => {
                if !publication.has_extent() {
                    return Err(WorkflowError::MissingExtent);
                }
                Status::Harvested
            }
            _ => return Err(WorkflowError::NotPublishable),
        };

        let note = format!(
            "Published by admin {} ({}) on {}. Status changed from {} to Published.",
            actor.username,
            actor.email,
            Utc::now().to_rfc3339(),
            old_status
        );
        publication.append_provenance(&note);
        publication.status = Status::Published;
        publication.updated_at = Utc::now();
        self.db.publications().save(&publication)?;

        tracing::info!(admin = %actor.username, publication = %publication.id, "published");
        Ok(publication)
    }

    /// Published → Draft. Admin only.
    pub fn unpublish(
        &self,
        reference: &PublicationRef,
        actor: &Actor,
    ) -> WorkflowResult<Publication> {
        if !actor.is_admin {
            return Err(WorkflowError::Forbidden);
        }
        let mut publication = self.resolve(reference)?;

        if publication.status != Status::Published {
            return Err(WorkflowError::NotPublished);
        }

        let note = format!(
            "Unpublished by admin {} ({}) on {}. Status changed from Published to Draft.",
            actor.username,
            actor.email,
            Utc::now().to_rfc3339()
        );
        publication.append_provenance(&note);
        publication.status = Status::Draft;
        publication.updated_at = Utc::now();
        self.db.publications().save(&publication)?;

        tracing::info!(admin = %actor.username, publication = %publication.id, "unpublished");
        Ok(publication)
    }
}
