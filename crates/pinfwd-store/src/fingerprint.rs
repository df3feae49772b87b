//! Content-hash identity for events.
//!
//! Events come from free text with no external primary key, so content
//! *is* identity: the same date and description always hash the same,
//! and any edit to either (even whitespace surviving the trim) makes a
//! new event. That keeps re-runs naturally idempotent.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// `hex(sha256("YYYY-MM-DD|description"))`.
pub fn fingerprint(date: NaiveDate, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}", date.format("%Y-%m-%d"), description));
    hex::encode(hasher.finalize())
}
