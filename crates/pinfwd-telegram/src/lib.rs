//! # Pinfwd Telegram
//!
//! Telegram Bot API adapter over plain REST. Implements the two core
//! seams: [`PinSource`] (pinned-message retrieval via `getChat`) and
//! [`DirectSender`] (per-recipient `sendMessage`). The core never sees
//! Telegram-specific error shapes beyond success/failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pinfwd_core::error::{PinfwdError, Result};
use pinfwd_core::traits::{DirectSender, PinSource};
use pinfwd_core::types::PinnedMessage;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API client.
pub struct TelegramChannel {
    token: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: API_BASE.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API host (test servers, proxies).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    /// POST one Bot API method and unwrap the `{ok, result, description}`
    /// envelope.
    async fn call(&self, method: &str, payload: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .map_err(|e| PinfwdError::Channel(format!("Telegram {method} failed: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| PinfwdError::Channel(format!("Invalid {method} response: {e}")))?;

        unwrap_envelope(method, body)
    }

    /// Current bot identity, logged on startup.
    pub async fn get_me(&self) -> Result<BotUser> {
        let result = self.call("getMe", serde_json::json!({})).await?;
        serde_json::from_value(result)
            .map_err(|e| PinfwdError::Channel(format!("Invalid getMe result: {e}")))
    }

    /// Raw chat info including any pinned message.
    pub async fn get_chat(&self, chat_id: i64) -> Result<Value> {
        self.call("getChat", serde_json::json!({ "chat_id": chat_id }))
            .await
    }

    /// Send a plain-text message to a user or chat.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.call(
            "sendMessage",
            serde_json::json!({ "chat_id": chat_id, "text": text }),
        )
        .await?;
        Ok(())
    }
}

/// Check the Bot API response envelope and extract `result`.
fn unwrap_envelope(method: &str, body: Value) -> Result<Value> {
    if body["ok"].as_bool().unwrap_or(false) {
        Ok(body["result"].clone())
    } else {
        let description = body["description"].as_str().unwrap_or("no description");
        Err(PinfwdError::Channel(format!(
            "Telegram {method} error: {description}"
        )))
    }
}

/// Pull the pinned message out of a `getChat` result. Missing pin or a
/// pin without text are both source failures — nothing to parse.
fn extract_pinned(chat_id: i64, chat: &Value) -> Result<PinnedMessage> {
    let pinned = &chat["pinned_message"];
    if pinned.is_null() {
        return Err(PinfwdError::Source(format!(
            "No pinned message in chat {chat_id}; make sure one is pinned and the bot can read it"
        )));
    }
    let text = pinned["text"].as_str().unwrap_or("");
    if text.is_empty() {
        return Err(PinfwdError::SourceEmpty(chat_id));
    }
    Ok(PinnedMessage {
        message_id: pinned["message_id"].as_i64().unwrap_or(0),
        text: text.to_string(),
    })
}

#[async_trait]
impl PinSource for TelegramChannel {
    async fn fetch_pinned(&self, chat_id: i64) -> Result<PinnedMessage> {
        let chat = self.get_chat(chat_id).await.map_err(|e| {
            // an unreachable chat is a source failure, not a transport one
            PinfwdError::Source(format!("getChat for {chat_id} failed: {e}"))
        })?;
        if let Some(title) = chat["title"].as_str() {
            tracing::debug!("Chat {chat_id}: {title}");
        }
        extract_pinned(chat_id, &chat)
    }
}

#[async_trait]
impl DirectSender for TelegramChannel {
    async fn send_direct(&self, user_id: i64, text: &str) -> Result<()> {
        self.send_message(user_id, text).await
    }
}

// --- Telegram API types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_envelope_ok() {
        let body = json!({ "ok": true, "result": { "id": 7 } });
        let result = unwrap_envelope("getMe", body).unwrap();
        assert_eq!(result["id"], 7);
    }

    #[test]
    fn test_unwrap_envelope_error_carries_description() {
        let body = json!({ "ok": false, "description": "Unauthorized" });
        let err = unwrap_envelope("getMe", body).unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[test]
    fn test_extract_pinned_text() {
        let chat = json!({
            "title": "Team chat",
            "pinned_message": { "message_id": 42, "text": "15 марта Встреча" }
        });
        let pinned = extract_pinned(-100, &chat).unwrap();
        assert_eq!(pinned.message_id, 42);
        assert_eq!(pinned.text, "15 марта Встреча");
    }

    #[test]
    fn test_missing_pin_is_source_error() {
        let chat = json!({ "title": "Team chat" });
        let err = extract_pinned(-100, &chat).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_textless_pin_is_source_error() {
        let chat = json!({ "pinned_message": { "message_id": 42, "photo": [] } });
        let err = extract_pinned(-100, &chat).unwrap_err();
        assert!(matches!(err, PinfwdError::SourceEmpty(-100)));
    }

    #[test]
    fn test_method_url_shape() {
        let channel = TelegramChannel::new("123:abc").with_api_base("http://localhost:1");
        assert_eq!(
            channel.method_url("getChat"),
            "http://localhost:1/bot123:abc/getChat"
        );
    }
}
