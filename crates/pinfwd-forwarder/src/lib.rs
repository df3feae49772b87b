//! # Pinfwd Forwarder
//!
//! The delivery side of the bot: sequential, rate-paced fan-out to
//! recipients with per-recipient status bookkeeping, and the run
//! orchestrator wiring pinned text → parser → filter → dedup ledger →
//! fan-out → audit log. Runs are single-flight: overlapping schedule
//! firings queue behind a run lock instead of racing the ledger.

pub mod fanout;
pub mod runner;
pub mod schedule;

pub use fanout::{DeliveryOutcome, FanoutEngine};
pub use runner::Forwarder;
pub use schedule::run_daily;
