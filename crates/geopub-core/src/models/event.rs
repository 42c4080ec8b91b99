use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::InProgress => "in_progress",
            EventStatus::Completed => "completed",
            EventStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(EventStatus::Pending),
            "in_progress" => Some(EventStatus::InProgress),
            "completed" => Some(EventStatus::Completed),
            "failed" => Some(EventStatus::Failed),
            _ => None,
        }
    }
}

/// One harvesting run against one source. Transitions to completed or
/// failed exactly once; a retry gets a fresh event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestingEvent {
    pub id: Uuid,
    pub source_id: Uuid,

    /// E-mail address of the user who triggered the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,

    pub status: EventStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl HarvestingEvent {
    /// A new event starts as the active run.
    pub fn start(source_id: Uuid, triggered_by: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            triggered_by,
            status: EventStatus::InProgress,
            log: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self) {
        self.status = EventStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, reason: &str) {
        self.status = EventStatus::Failed;
        self.log = Some(reason.to_string());
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_lifecycle() {
        let source_id = Uuid::new_v4();
        let mut event = HarvestingEvent::start(source_id, Some("user@example.org".to_string()));
        assert_eq!(event.status, EventStatus::InProgress);
        assert!(event.completed_at.is_none());

        event.complete();
        assert_eq!(event.status, EventStatus::Completed);
        assert!(event.completed_at.is_some());
    }

    #[test]
    fn test_failed_event_keeps_reason() {
        let mut event = HarvestingEvent::start(Uuid::new_v4(), None);
        event.fail("connection refused");
        assert_eq!(event.status, EventStatus::Failed);
        assert_eq!(event.log.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_event_status_parse() {
        assert_eq!(EventStatus::parse("in_progress"), Some(EventStatus::InProgress));
        assert_eq!(EventStatus::parse("bogus"), None);
    }
}
