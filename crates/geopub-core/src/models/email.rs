use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(EmailStatus::Sent),
            "failed" => Some(EmailStatus::Failed),
            _ => None,
        }
    }
}

/// Audit record of one outbound notification attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl EmailLog {
    pub fn sent(recipient: &str, subject: &str, body: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            status: EmailStatus::Sent,
            error: None,
            sent_at: Utc::now(),
        }
    }

    pub fn failed(recipient: &str, subject: &str, body: &str, error: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            status: EmailStatus::Failed,
            error: Some(error.to_string()),
            sent_at: Utc::now(),
        }
    }
}
