//! Trait seams between the forwarder core and its collaborators.
//!
//! The core only ever talks to the chat transport and the persistent
//! store through these traits, so the Telegram adapter and the SQLite
//! store are both swappable in tests and in future deployments.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{DeliveryStatus, PinnedMessage, Recipient};

/// Retrieves the pinned announcement for a chat.
#[async_trait]
pub trait PinSource: Send + Sync {
    async fn fetch_pinned(&self, chat_id: i64) -> Result<PinnedMessage>;
}

/// Sends a text message directly to one recipient.
#[async_trait]
pub trait DirectSender: Send + Sync {
    async fn send_direct(&self, user_id: i64, text: &str) -> Result<()>;
}

/// Recipient persistence. Keyed by `user_id`.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Recipients eligible for delivery: `is_active AND allow_sending`,
    /// ordered by user id.
    async fn list_active_allowed(&self) -> Result<Vec<Recipient>>;

    /// Insert or refresh a recipient. A new row starts active, allowed,
    /// and `pending`; an existing row only gets its username refreshed.
    async fn upsert_recipient(&self, user_id: i64, username: &str) -> Result<()>;

    async fn get_recipient(&self, user_id: i64) -> Result<Option<Recipient>>;

    /// Record the outcome of a delivery attempt. Owned by the fan-out
    /// engine; a success clears any previous error message.
    async fn update_delivery_status(
        &self,
        user_id: i64,
        status: DeliveryStatus,
        error: Option<&str>,
    ) -> Result<()>;

    async fn deactivate(&self, user_id: i64) -> Result<()>;

    async fn set_allow_sending(&self, user_id: i64, allow: bool) -> Result<()>;
}

/// The dedup ledger of already-reminded events, keyed by content hash.
#[async_trait]
pub trait SentLedger: Send + Sync {
    /// Point lookup. A storage failure propagates — it must never be
    /// silently treated as "not sent".
    async fn is_sent(&self, event_hash: &str) -> Result<bool>;

    /// Idempotent insert: repeating the same hash is a no-op, not an error.
    async fn mark_sent(&self, date: NaiveDate, description: &str, event_hash: &str)
    -> Result<()>;
}

/// Append-only audit trail of outbound runs.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append_log(
        &self,
        message_id: i64,
        kind: &str,
        body: &str,
        total_recipients: usize,
        successfully_sent: usize,
    ) -> Result<()>;
}
