//! Lookahead-window selection over parsed entries.

use chrono::{Days, NaiveDate};

use crate::parse::EventEntry;

/// Valid entries dated inside `[today, today + days_ahead]`, boundary day
/// inclusive (the comparison uses `today + days_ahead + 1` as an exclusive
/// upper bound). Order is preserved; no dedup happens here — that is the
/// ledger's concern.
pub fn upcoming(entries: &[EventEntry], today: NaiveDate, days_ahead: u32) -> Vec<EventEntry> {
    let end_exclusive = today
        .checked_add_days(Days::new(u64::from(days_ahead) + 1))
        .unwrap_or(NaiveDate::MAX);

    entries
        .iter()
        .filter(|entry| {
            entry
                .date
                .is_some_and(|date| date >= today && date < end_exclusive)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_event_list;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_boundaries() {
        let today = date(2024, 3, 1);
        // exactly today, exactly today+5, and today+6
        let text = "01.03 Сегодня\n06.03 Граница\n07.03 За границей";
        let entries = parse_event_list(text, today);

        let hits = upcoming(&entries, today, 5);
        let descriptions: Vec<_> = hits.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Сегодня", "Граница"]);
    }

    #[test]
    fn test_invalid_entries_never_selected() {
        let today = date(2024, 3, 1);
        let entries = parse_event_list("мусор без даты\n05.03 Реальное", today);
        let hits = upcoming(&entries, today, 30);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "Реальное");
    }

    #[test]
    fn test_past_resolved_date_excluded() {
        // named-month same-month quirk leaves a past date; the filter drops it
        let today = date(2024, 3, 20);
        let entries = parse_event_list("15 марта Прошло", today);
        assert!(upcoming(&entries, today, 30).is_empty());
    }

    #[test]
    fn test_end_to_end_sixty_day_window() {
        let today = date(2024, 3, 1);
        let text = "15 марта Встреча\n01.04 Дедлайн\n10-12.05 Конференция";
        let entries = parse_event_list(text, today);

        let hits = upcoming(&entries, today, 60);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].date, Some(date(2024, 3, 15)));
        assert_eq!(hits[1].date, Some(date(2024, 4, 1)));

        // the conference on 05-10 sits 70 days out; widen the window
        let hits = upcoming(&entries, today, 75);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[2].date, Some(date(2024, 5, 10)));
    }

    #[test]
    fn test_order_preserved_no_cap() {
        let today = date(2024, 3, 1);
        let entries = parse_event_list("20.03 B\n10.03 A\n15.03 C", today);
        let hits = upcoming(&entries, today, 30);
        let descriptions: Vec<_> = hits.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["B", "A", "C"]);
    }
}
