use serde::{Deserialize, Serialize};

use crate::error::{GeopubError, Result};

/// Lifecycle state of a publication. Stored as a single-character code.
///
/// Only `Published` records are visible to unprivileged readers; every
/// other state requires elevated access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Draft,
    Published,
    Testing,
    Withdrawn,
    Harvested,
    Contributed,
}

impl Status {
    pub fn as_code(&self) -> &'static str {
        match self {
            Status::Draft => "d",
            Status::Published => "p",
            Status::Testing => "t",
            Status::Withdrawn => "w",
            Status::Harvested => "h",
            Status::Contributed => "c",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "d" => Ok(Status::Draft),
            "p" => Ok(Status::Published),
            "t" => Ok(Status::Testing),
            "w" => Ok(Status::Withdrawn),
            "h" => Ok(Status::Harvested),
            "c" => Ok(Status::Contributed),
            other => Err(GeopubError::ValidationError(format!(
                "unknown status code: {other}"
            ))),
        }
    }

    /// Whether unauthenticated readers may see a record in this state.
    pub fn is_public(&self) -> bool {
        matches!(self, Status::Published)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Draft => "Draft",
            Status::Published => "Published",
            Status::Testing => "Testing",
            Status::Withdrawn => "Withdrawn",
            Status::Harvested => "Harvested",
            Status::Contributed => "Contributed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for status in [
            Status::Draft,
            Status::Published,
            Status::Testing,
            Status::Withdrawn,
            Status::Harvested,
            Status::Contributed,
        ] {
            assert_eq!(Status::from_code(status.as_code()).unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!(Status::from_code("x").is_err());
        assert!(Status::from_code("").is_err());
    }

    #[test]
    fn test_only_published_is_public() {
        assert!(Status::Published.is_public());
        assert!(!Status::Draft.is_public());
        assert!(!Status::Testing.is_public());
        assert!(!Status::Withdrawn.is_public());
        assert!(!Status::Harvested.is_public());
        assert!(!Status::Contributed.is_public());
    }
}
