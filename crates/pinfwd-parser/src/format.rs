//! Fixed reminder template.

use crate::parse::EventEntry;

pub const REMINDER_HEADER: &str = "🎉 Напоминание о предстоящих событиях:";

/// One reminder line, e.g. `📅 15 March - Встреча`. Invalid entries
/// produce nothing.
pub fn format_event(entry: &EventEntry) -> Option<String> {
    let date = entry.date?;
    Some(format!(
        "📅 {} - {}",
        date.format("%d %B"),
        entry.description
    ))
}

/// Full reminder body: header, blank line, one line per event.
pub fn reminder_body(entries: &[EventEntry]) -> String {
    let lines: Vec<String> = entries.iter().filter_map(format_event).collect();
    format!("{REMINDER_HEADER}\n\n{}", lines.join("\n"))
}
