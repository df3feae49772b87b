//! # Pinfwd Core
//!
//! Shared building blocks for the pinned-announcement reminder bot:
//! the unified error type, TOML configuration, domain types
//! (recipients, sent-event records, delivery outcomes), and the trait
//! seams the transport and storage adapters plug into.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::PinfwdConfig;
pub use error::{PinfwdError, Result};
pub use types::{DeliveryStatus, PinnedMessage, Recipient, SentEventRecord};
