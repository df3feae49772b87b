//! # Pinfwd Store
//!
//! SQLite persistence behind the core's store traits: the recipient
//! table, the write-once sent-event ledger, and the append-only message
//! log. One [`Store`] implements all three seams.

pub mod fingerprint;

pub use fingerprint::fingerprint;

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params};

use pinfwd_core::error::{PinfwdError, Result};
use pinfwd_core::traits::{AuditLog, RecipientStore, SentLedger};
use pinfwd_core::types::{DeliveryStatus, MessageLogEntry, Recipient, SentEventRecord};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS recipients (
        user_id         INTEGER PRIMARY KEY,
        username        TEXT NOT NULL DEFAULT '',
        is_active       INTEGER NOT NULL DEFAULT 1,
        allow_sending   INTEGER NOT NULL DEFAULT 1,
        last_sent_at    TEXT,
        delivery_status TEXT NOT NULL DEFAULT 'pending',
        error_message   TEXT,
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sent_events (
        event_hash        TEXT PRIMARY KEY,
        event_date        TEXT NOT NULL,
        event_description TEXT NOT NULL,
        sent_at           TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS message_logs (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        message_id        INTEGER NOT NULL,
        message_type      TEXT NOT NULL,
        message_text      TEXT NOT NULL,
        total_recipients  INTEGER NOT NULL,
        successfully_sent INTEGER NOT NULL,
        sent_at           TEXT NOT NULL
    );
";

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at the given path and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| PinfwdError::Store(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        tracing::debug!("Store opened: {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| PinfwdError::Store(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PinfwdError::Store(e.to_string()))
    }

    /// Every recipient regardless of flags, for the admin CLI.
    pub fn list_all_recipients(&self) -> Result<Vec<Recipient>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, username, is_active, allow_sending, last_sent_at,
                        delivery_status, error_message, created_at, updated_at
                 FROM recipients ORDER BY user_id",
            )
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], row_to_recipient)
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Ledger record lookup, for diagnostics.
    pub fn get_sent_event(&self, event_hash: &str) -> Result<Option<SentEventRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT event_hash, event_date, event_description, sent_at
                 FROM sent_events WHERE event_hash = ?1",
            )
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        let record = stmt
            .query_row(params![event_hash], |row| {
                Ok(SentEventRecord {
                    event_hash: row.get(0)?,
                    event_date: row
                        .get::<_, String>(1)?
                        .parse()
                        .unwrap_or(NaiveDate::MIN),
                    event_description: row.get(2)?,
                    sent_at: parse_timestamp(row.get(3)?),
                })
            })
            .ok();
        Ok(record)
    }

    /// Most recent audit rows, newest first.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<MessageLogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT message_id, message_type, message_text,
                        total_recipients, successfully_sent, sent_at
                 FROM message_logs ORDER BY id DESC LIMIT ?1",
            )
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(MessageLogEntry {
                    message_id: row.get(0)?,
                    kind: row.get(1)?,
                    body: row.get(2)?,
                    total_recipients: row.get(3)?,
                    successfully_sent: row.get(4)?,
                    sent_at: parse_timestamp(row.get(5)?),
                })
            })
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

fn now_string() -> String {
    Utc::now().to_rfc3339()
}

fn parse_timestamp(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}

fn row_to_recipient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recipient> {
    Ok(Recipient {
        user_id: row.get(0)?,
        username: row.get(1)?,
        is_active: row.get(2)?,
        allow_sending: row.get(3)?,
        last_sent_at: row.get::<_, Option<String>>(4)?.map(parse_timestamp),
        delivery_status: DeliveryStatus::parse(&row.get::<_, String>(5)?)
            .unwrap_or(DeliveryStatus::Pending),
        error_message: row.get(6)?,
        created_at: parse_timestamp(row.get(7)?),
        updated_at: parse_timestamp(row.get(8)?),
    })
}

#[async_trait]
impl RecipientStore for Store {
    async fn list_active_allowed(&self) -> Result<Vec<Recipient>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, username, is_active, allow_sending, last_sent_at,
                        delivery_status, error_message, created_at, updated_at
                 FROM recipients
                 WHERE is_active = 1 AND allow_sending = 1
                 ORDER BY user_id",
            )
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], row_to_recipient)
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    async fn upsert_recipient(&self, user_id: i64, username: &str) -> Result<()> {
        let conn = self.lock()?;
        let now = now_string();
        conn.execute(
            "INSERT INTO recipients (user_id, username, is_active, allow_sending,
                                     delivery_status, created_at, updated_at)
             VALUES (?1, ?2, 1, 1, 'pending', ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                 username = excluded.username,
                 updated_at = excluded.updated_at",
            params![user_id, username, now],
        )
        .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(())
    }

    async fn get_recipient(&self, user_id: i64) -> Result<Option<Recipient>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, username, is_active, allow_sending, last_sent_at,
                        delivery_status, error_message, created_at, updated_at
                 FROM recipients WHERE user_id = ?1",
            )
            .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(stmt.query_row(params![user_id], row_to_recipient).ok())
    }

    async fn update_delivery_status(
        &self,
        user_id: i64,
        status: DeliveryStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let now = now_string();
        conn.execute(
            "UPDATE recipients
             SET delivery_status = ?1,
                 error_message = ?2,
                 last_sent_at = ?3,
                 updated_at = ?3
             WHERE user_id = ?4",
            params![status.as_str(), error, now, user_id],
        )
        .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(())
    }

    async fn deactivate(&self, user_id: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE recipients SET is_active = 0, updated_at = ?1 WHERE user_id = ?2",
            params![now_string(), user_id],
        )
        .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(())
    }

    async fn set_allow_sending(&self, user_id: i64, allow: bool) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE recipients SET allow_sending = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![allow, now_string(), user_id],
        )
        .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SentLedger for Store {
    async fn is_sent(&self, event_hash: &str) -> Result<bool> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sent_events WHERE event_hash = ?1)",
            params![event_hash],
            |row| row.get(0),
        )
        .map_err(|e| PinfwdError::Store(e.to_string()))
    }

    async fn mark_sent(
        &self,
        date: NaiveDate,
        description: &str,
        event_hash: &str,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sent_events (event_hash, event_date, event_description, sent_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(event_hash) DO NOTHING",
            params![
                event_hash,
                date.format("%Y-%m-%d").to_string(),
                description,
                now_string()
            ],
        )
        .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl AuditLog for Store {
    async fn append_log(
        &self,
        message_id: i64,
        kind: &str,
        body: &str,
        total_recipients: usize,
        successfully_sent: usize,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO message_logs (message_id, message_type, message_text,
                                       total_recipients, successfully_sent, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message_id,
                kind,
                body,
                total_recipients as i64,
                successfully_sent as i64,
                now_string()
            ],
        )
        .map_err(|e| PinfwdError::Store(e.to_string()))?;
        Ok(())
    }
}
