//! The run orchestrator: one scheduled trigger → one pipeline pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::Mutex;

use pinfwd_core::error::Result;
use pinfwd_core::traits::{AuditLog, DirectSender, PinSource, RecipientStore, SentLedger};
use pinfwd_parser::{EventEntry, parse_event_list, reminder_body, upcoming};
use pinfwd_store::fingerprint;

use crate::fanout::{DeliveryOutcome, FanoutEngine};

const LOG_KIND: &str = "event_reminder";

/// Wires the pinned-message source, the parser, the dedup ledger, and
/// the fan-out engine into a single sequential pipeline.
pub struct Forwarder {
    source: Arc<dyn PinSource>,
    recipients: Arc<dyn RecipientStore>,
    ledger: Arc<dyn SentLedger>,
    audit: Arc<dyn AuditLog>,
    fanout: FanoutEngine,
    days_ahead: u32,
    /// Single-flight guard: two overlapping runs could both see an event
    /// as unsent and double-deliver it.
    run_lock: Mutex<()>,
}

impl Forwarder {
    pub fn new(
        source: Arc<dyn PinSource>,
        sender: Arc<dyn DirectSender>,
        recipients: Arc<dyn RecipientStore>,
        ledger: Arc<dyn SentLedger>,
        audit: Arc<dyn AuditLog>,
        days_ahead: u32,
        pace: Duration,
    ) -> Self {
        let fanout = FanoutEngine::new(sender, recipients.clone(), pace);
        Self {
            source,
            recipients,
            ledger,
            audit,
            fanout,
            days_ahead,
            run_lock: Mutex::new(()),
        }
    }

    /// One full pass against the current local date.
    pub async fn run(&self, chat_id: i64) -> Result<DeliveryOutcome> {
        self.run_with_today(chat_id, Local::now().date_naive())
            .await
    }

    /// One full pass with an explicit "today" reference. Only a source
    /// failure aborts; every other error is recovered locally so one bad
    /// line or one unreachable recipient never blocks the rest.
    pub async fn run_with_today(&self, chat_id: i64, today: NaiveDate) -> Result<DeliveryOutcome> {
        let _guard = self.run_lock.lock().await;

        let pinned = self.source.fetch_pinned(chat_id).await?;
        tracing::info!("Pinned message {} fetched from {chat_id}", pinned.message_id);

        let entries = parse_event_list(&pinned.text, today);
        let invalid = entries.iter().filter(|e| !e.is_valid()).count();
        tracing::info!(
            "Parsed {} entries ({invalid} unrecognized), window {} days",
            entries.len(),
            self.days_ahead
        );

        let window = upcoming(&entries, today, self.days_ahead);
        if window.is_empty() {
            tracing::info!("No upcoming events inside the window");
            return Ok(DeliveryOutcome::NOTHING);
        }

        let fresh = self.filter_unsent(&window).await;
        if fresh.is_empty() {
            tracing::info!("All {} upcoming events were already sent", window.len());
            return Ok(DeliveryOutcome::NOTHING);
        }
        tracing::info!("{} new events to remind about", fresh.len());

        let body = reminder_body(&fresh);

        let recipients = self.recipients.list_active_allowed().await?;
        if recipients.is_empty() {
            tracing::info!("No active recipients with sending allowed");
            return Ok(DeliveryOutcome::NOTHING);
        }

        let outcome = self.fanout.deliver(&body, &recipients).await;

        // One successful delivery marks the whole batch sent: duplicate
        // reminder noise on retry is worse than a missed recipient, who
        // keeps a `failed` status for the operator to act on.
        if outcome.succeeded >= 1 {
            self.mark_batch_sent(&fresh).await;
        }

        if let Err(e) = self
            .audit
            .append_log(
                pinned.message_id,
                LOG_KIND,
                &body,
                outcome.attempted,
                outcome.succeeded,
            )
            .await
        {
            tracing::warn!("Audit log append failed: {e}");
        }

        tracing::info!("Run done: {}/{} delivered", outcome.succeeded, outcome.attempted);
        Ok(outcome)
    }

    /// Drop events already in the ledger. A failed lookup skips that
    /// event conservatively — an unreadable ledger must not produce a
    /// possible duplicate.
    async fn filter_unsent(&self, window: &[EventEntry]) -> Vec<EventEntry> {
        let mut fresh = Vec::new();
        for entry in window {
            let Some(date) = entry.date else { continue };
            let hash = fingerprint(date, &entry.description);
            match self.ledger.is_sent(&hash).await {
                Ok(true) => {
                    tracing::debug!("Already sent: {date} - {}", entry.description);
                }
                Ok(false) => fresh.push(entry.clone()),
                Err(e) => {
                    tracing::warn!(
                        "Ledger lookup failed for {date} - {}, skipping this run: {e}",
                        entry.description
                    );
                }
            }
        }
        fresh
    }

    async fn mark_batch_sent(&self, batch: &[EventEntry]) {
        for entry in batch {
            let Some(date) = entry.date else { continue };
            let hash = fingerprint(date, &entry.description);
            // not transactional with the sends: a write failure here is
            // logged and the already-delivered messages stand
            match self.ledger.mark_sent(date, &entry.description, &hash).await {
                Ok(()) => tracing::debug!("Marked sent: {date} - {}", entry.description),
                Err(e) => tracing::warn!(
                    "Could not mark {date} - {} as sent: {e}",
                    entry.description
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pinfwd_core::PinfwdError;
    use pinfwd_core::types::PinnedMessage;
    use pinfwd_store::Store;
    use std::sync::Mutex as StdMutex;

    struct FixedSource {
        text: Option<String>,
    }

    #[async_trait]
    impl PinSource for FixedSource {
        async fn fetch_pinned(&self, chat_id: i64) -> Result<PinnedMessage> {
            match &self.text {
                Some(text) => Ok(PinnedMessage {
                    message_id: 42,
                    text: text.clone(),
                }),
                None => Err(PinfwdError::Source(format!("no pin in {chat_id}"))),
            }
        }
    }

    struct CountingSender {
        fail_for: Vec<i64>,
        calls: StdMutex<Vec<(i64, String)>>,
    }

    impl CountingSender {
        fn new(fail_for: Vec<i64>) -> Self {
            Self {
                fail_for,
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DirectSender for CountingSender {
        async fn send_direct(&self, user_id: i64, text: &str) -> Result<()> {
            self.calls.lock().unwrap().push((user_id, text.to_string()));
            if self.fail_for.contains(&user_id) {
                Err(PinfwdError::channel("blocked"))
            } else {
                Ok(())
            }
        }
    }

    /// Ledger whose lookups always fail, for the conservative-skip path.
    struct BrokenLedger;

    #[async_trait]
    impl SentLedger for BrokenLedger {
        async fn is_sent(&self, _hash: &str) -> Result<bool> {
            Err(PinfwdError::store("ledger unreadable"))
        }
        async fn mark_sent(&self, _date: NaiveDate, _desc: &str, _hash: &str) -> Result<()> {
            Err(PinfwdError::store("ledger unwritable"))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    const PIN: &str = "15 марта Встреча\n01.04 Дедлайн\n10-12.05 Конференция";

    async fn forwarder_with(
        text: Option<&str>,
        fail_for: Vec<i64>,
        user_ids: &[i64],
    ) -> (Forwarder, Arc<CountingSender>, Arc<Store>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        for id in user_ids {
            store.upsert_recipient(*id, "").await.unwrap();
        }
        let sender = Arc::new(CountingSender::new(fail_for));
        let source = Arc::new(FixedSource {
            text: text.map(String::from),
        });
        let forwarder = Forwarder::new(
            source,
            sender.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            60,
            Duration::ZERO,
        );
        (forwarder, sender, store)
    }

    #[tokio::test]
    async fn test_full_run_sends_and_marks_ledger() {
        let (forwarder, sender, store) = forwarder_with(Some(PIN), vec![], &[1, 2]).await;

        let outcome = forwarder.run_with_today(-100, today()).await.unwrap();
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(sender.call_count(), 2);

        // both in-window events (the conference sits outside 60 days) are
        // now in the ledger
        let meeting = fingerprint(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), "Встреча");
        let deadline = fingerprint(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), "Дедлайн");
        let conference = fingerprint(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(), "Конференция");
        let ledger: &dyn SentLedger = store.as_ref();
        assert!(ledger.is_sent(&meeting).await.unwrap());
        assert!(ledger.is_sent(&deadline).await.unwrap());
        assert!(!ledger.is_sent(&conference).await.unwrap());

        // the body carries the fixed template
        let (_, body) = sender.calls.lock().unwrap()[0].clone();
        assert!(body.starts_with("🎉"));
        assert!(body.contains("📅 15 March - Встреча"));
        assert!(body.contains("📅 01 April - Дедлайн"));

        // exactly one audit row for the run
        let logs = store.recent_logs(10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message_id, 42);
        assert_eq!(logs[0].total_recipients, 2);
        assert_eq!(logs[0].successfully_sent, 2);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let (forwarder, sender, store) = forwarder_with(Some(PIN), vec![], &[1, 2]).await;

        forwarder.run_with_today(-100, today()).await.unwrap();
        let statuses_before: Vec<_> = store
            .list_all_recipients()
            .unwrap()
            .into_iter()
            .map(|r| (r.delivery_status, r.updated_at))
            .collect();

        // same batch again: everything already in the ledger
        let outcome = forwarder.run_with_today(-100, today()).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::NOTHING);
        assert_eq!(sender.call_count(), 2); // no new sends
        assert_eq!(store.recent_logs(10).unwrap().len(), 1); // no new audit row

        let statuses_after: Vec<_> = store
            .list_all_recipients()
            .unwrap()
            .into_iter()
            .map(|r| (r.delivery_status, r.updated_at))
            .collect();
        assert_eq!(statuses_before, statuses_after); // no status churn
    }

    #[tokio::test]
    async fn test_partial_failure_still_marks_batch_sent() {
        let (forwarder, _, store) = forwarder_with(Some(PIN), vec![2], &[1, 2, 3]).await;

        let outcome = forwarder.run_with_today(-100, today()).await.unwrap();
        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.succeeded, 2);

        // one success is enough to consider the batch sent
        let meeting = fingerprint(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), "Встреча");
        let ledger: &dyn SentLedger = store.as_ref();
        assert!(ledger.is_sent(&meeting).await.unwrap());

        let logs = store.recent_logs(10).unwrap();
        assert_eq!(logs[0].total_recipients, 3);
        assert_eq!(logs[0].successfully_sent, 2);
    }

    #[tokio::test]
    async fn test_source_failure_aborts_run() {
        let (forwarder, sender, _) = forwarder_with(None, vec![], &[1]).await;
        let err = forwarder.run_with_today(-100, today()).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_upcoming_events_is_quiet() {
        // everything in the pin is far outside a 60-day window
        let (forwarder, sender, _) =
            forwarder_with(Some("01.12 Далёкое событие"), vec![], &[1]).await;
        let outcome = forwarder.run_with_today(-100, today()).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::NOTHING);
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_eligible_recipients_is_quiet() {
        let (forwarder, sender, store) = forwarder_with(Some(PIN), vec![], &[1]).await;
        store.deactivate(1).await.unwrap();

        let outcome = forwarder.run_with_today(-100, today()).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::NOTHING);
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_ledger_skips_conservatively() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.upsert_recipient(1, "").await.unwrap();
        let sender = Arc::new(CountingSender::new(vec![]));
        let source = Arc::new(FixedSource {
            text: Some(PIN.into()),
        });
        let forwarder = Forwarder::new(
            source,
            sender.clone(),
            store.clone(),
            Arc::new(BrokenLedger),
            store.clone(),
            60,
            Duration::ZERO,
        );

        // every lookup fails, so every event is skipped and nothing is sent
        let outcome = forwarder.run_with_today(-100, today()).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::NOTHING);
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn test_garbage_lines_do_not_block_valid_ones() {
        let text = "garbage text with no date\n15 марта Встреча";
        let (forwarder, sender, _) = forwarder_with(Some(text), vec![], &[1]).await;

        let outcome = forwarder.run_with_today(-100, today()).await.unwrap();
        assert_eq!(outcome.succeeded, 1);
        let (_, body) = sender.calls.lock().unwrap()[0].clone();
        assert!(body.contains("Встреча"));
        assert!(!body.contains("garbage"));
    }
}
