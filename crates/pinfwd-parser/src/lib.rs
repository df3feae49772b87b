//! # Pinfwd Parser
//!
//! Turns the unstructured pinned announcement into dated event entries.
//!
//! Three line grammars are tried in fixed priority order, first match wins:
//!
//! ```text
//! 15 марта Встреча с командой     named-month form
//! 01.04 Дедлайн по проекту        dotted form
//! 10-12.05 Конференция            range form (start day wins)
//! ```
//!
//! Lines carry no year; each grammar infers the next occurrence with its
//! own rollover rule (see [`parse`]). The reference "today" is an explicit
//! parameter everywhere — this crate holds no clock and does no I/O.

pub mod filter;
pub mod format;
pub mod parse;

pub use filter::upcoming;
pub use format::{REMINDER_HEADER, format_event, reminder_body};
pub use parse::{EventEntry, parse_event_list};
