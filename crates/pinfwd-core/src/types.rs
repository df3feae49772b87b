//! Domain types shared across the crates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-recipient outcome of the most recent delivery attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DeliveryStatus::Pending),
            "success" => Some(DeliveryStatus::Success),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reminder recipient. Created by onboarding (config seed or the CLI);
/// `delivery_status` / `error_message` are owned by the fan-out engine,
/// `is_active` / `allow_sending` only change by administrative action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: i64,
    pub username: String,
    pub is_active: bool,
    pub allow_sending: bool,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub delivery_status: DeliveryStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write-once ledger record for an event that has been reminded about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentEventRecord {
    pub event_hash: String,
    pub event_date: NaiveDate,
    pub event_description: String,
    pub sent_at: DateTime<Utc>,
}

/// Append-only audit record, one per run that attempted sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub message_id: i64,
    pub kind: String,
    pub body: String,
    pub total_recipients: i64,
    pub successfully_sent: i64,
    pub sent_at: DateTime<Utc>,
}

/// The pinned announcement fetched from the group chat.
#[derive(Debug, Clone)]
pub struct PinnedMessage {
    pub message_id: i64,
    pub text: String,
}
