//! Daily scheduling gate, tokio timers only.

use chrono::{Days, Local, NaiveDateTime, NaiveTime};

use crate::runner::Forwarder;

/// The next local instant a `HH:MM` daily schedule fires after `now`.
/// A wall-clock already past today's slot rolls to tomorrow.
pub fn next_occurrence(now: NaiveDateTime, hour: u32, minute: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today_slot = now.date().and_time(time);
    if today_slot > now {
        today_slot
    } else {
        now.date()
            .checked_add_days(Days::new(1))
            .unwrap_or(now.date())
            .and_time(time)
    }
}

/// Run the forwarder every day at the given local wall-clock time.
/// A failed run is logged and the loop keeps going; the forwarder's own
/// run lock keeps a long run from overlapping the next firing.
pub async fn run_daily(forwarder: &Forwarder, chat_id: i64, hour: u32, minute: u32) {
    loop {
        let now = Local::now().naive_local();
        let next = next_occurrence(now, hour, minute);
        let wait = (next - now)
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(60));
        tracing::info!("Next scheduled run at {next}");
        tokio::time::sleep(wait).await;

        match forwarder.run(chat_id).await {
            Ok(outcome) => {
                tracing::info!(
                    "Scheduled run finished: {}/{} delivered",
                    outcome.succeeded,
                    outcome.attempted
                );
            }
            Err(e) => tracing::error!("Scheduled run failed: {e}"),
        }
    }
}
