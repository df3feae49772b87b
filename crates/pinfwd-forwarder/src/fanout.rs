//! Per-recipient delivery fan-out.

use std::sync::Arc;
use std::time::Duration;

use pinfwd_core::error::Result;
use pinfwd_core::traits::{DirectSender, RecipientStore};
use pinfwd_core::types::{DeliveryStatus, Recipient};

/// Summary of one fan-out pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub attempted: usize,
    pub succeeded: usize,
}

impl DeliveryOutcome {
    pub const NOTHING: Self = Self {
        attempted: 0,
        succeeded: 0,
    };
}

/// Sends one message body to an enumerated recipient list, recording
/// each outcome independently. One recipient's failure never aborts the
/// batch, and status-update storage failures are best-effort bookkeeping.
pub struct FanoutEngine {
    sender: Arc<dyn DirectSender>,
    recipients: Arc<dyn RecipientStore>,
    /// Fixed inter-send gate to respect outbound rate limits.
    pace: Duration,
}

impl FanoutEngine {
    pub fn new(
        sender: Arc<dyn DirectSender>,
        recipients: Arc<dyn RecipientStore>,
        pace: Duration,
    ) -> Self {
        Self {
            sender,
            recipients,
            pace,
        }
    }

    /// Deliver `body` to every recipient, in list order. An empty list is
    /// a no-op, not an error.
    pub async fn deliver(&self, body: &str, recipients: &[Recipient]) -> DeliveryOutcome {
        if recipients.is_empty() {
            return DeliveryOutcome::NOTHING;
        }

        let mut succeeded = 0;
        for (index, recipient) in recipients.iter().enumerate() {
            if index > 0 && !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }

            match self.sender.send_direct(recipient.user_id, body).await {
                Ok(()) => {
                    succeeded += 1;
                    tracing::info!("Reminder delivered to {}", recipient.user_id);
                    self.record_status(recipient.user_id, DeliveryStatus::Success, None)
                        .await;
                }
                Err(e) => {
                    tracing::warn!("Delivery to {} failed: {e}", recipient.user_id);
                    self.record_status(
                        recipient.user_id,
                        DeliveryStatus::Failed,
                        Some(e.to_string()),
                    )
                    .await;
                }
            }
        }

        DeliveryOutcome {
            attempted: recipients.len(),
            succeeded,
        }
    }

    async fn record_status(&self, user_id: i64, status: DeliveryStatus, error: Option<String>) {
        let result: Result<()> = self
            .recipients
            .update_delivery_status(user_id, status, error.as_deref())
            .await;
        if let Err(e) = result {
            tracing::warn!("Status bookkeeping for {user_id} failed: {e}");
        }
    }
}
