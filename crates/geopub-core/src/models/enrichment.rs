use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields written onto a publication by the OpenAlex matcher.
///
/// `match_info` carries the candidate list when only partial matches were
/// found; it is cleared once an exact match lands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAlexEnrichment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openalex_id: Option<String>,

    /// Canonical author display names, in authorship order.
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub topics: Vec<String>,

    /// OpenAlex `oa_status`, only set when the work is open access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_access_status: Option<String>,

    #[serde(default)]
    pub is_retracted: bool,

    /// The raw `ids` crosswalk object as returned by OpenAlex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Value>,

    /// Candidate matches kept for manual review when no exact match exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_info: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_type: Option<String>,

    /// Derived from `primary_location.source.type`, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulltext_origin: Option<String>,
}

impl OpenAlexEnrichment {
    pub fn is_matched(&self) -> bool {
        self.openalex_id.is_some()
    }
}
