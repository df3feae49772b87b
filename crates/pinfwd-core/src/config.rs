//! TOML configuration loaded from `~/.pinfwd/config.toml`.
//!
//! No global singleton: the loaded struct is passed explicitly into the
//! components that need it. Secrets can be supplied via environment
//! variables (`PINFWD_BOT_TOKEN`, `PINFWD_GROUP_CHAT_ID`) so the config
//! file never has to hold the token.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PinfwdError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PinfwdConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    /// Bot API token. Overridable via `PINFWD_BOT_TOKEN`.
    #[serde(default)]
    pub bot_token: String,
    /// Group chat whose pinned message carries the event list.
    #[serde(default)]
    pub group_chat_id: i64,
    /// Recipients seeded into the store at startup.
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path. `~` is expanded.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Lookahead window in days, inclusive of the boundary day.
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
    /// Run the pipeline once and exit instead of scheduling.
    #[serde(default)]
    pub run_once: bool,
    /// Default tracing filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Local wall-clock time of the daily scheduled run, "HH:MM".
    #[serde(default = "default_schedule_at")]
    pub schedule_at: String,
    /// Inter-send pacing delay in milliseconds.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            days_ahead: default_days_ahead(),
            run_once: false,
            log_level: default_log_level(),
            schedule_at: default_schedule_at(),
            pace_ms: default_pace_ms(),
        }
    }
}

fn default_db_path() -> String {
    "~/.pinfwd/pinfwd.db".into()
}
fn default_days_ahead() -> u32 {
    5
}
fn default_log_level() -> String {
    "info".into()
}
fn default_schedule_at() -> String {
    "08:00".into()
}
fn default_pace_ms() -> u64 {
    500
}

impl PinfwdConfig {
    /// Directory holding config and state (`~/.pinfwd`).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pinfwd")
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from an explicit path, or from the default location.
    /// A missing file at the default location yields defaults (env
    /// overrides still apply); an explicitly given missing path is an error.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let expanded = shellexpand::tilde(p).into_owned();
                let content = std::fs::read_to_string(&expanded)
                    .map_err(|_| PinfwdError::ConfigNotFound(expanded.clone()))?;
                Self::parse(&content)?
            }
            None => {
                let default = Self::default_path();
                if default.exists() {
                    let content = std::fs::read_to_string(&default)?;
                    Self::parse(&content)?
                } else {
                    tracing::info!(
                        "No config file at {}, using defaults and environment",
                        default.display()
                    );
                    Self::default()
                }
            }
        };

        config.apply_env();
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PinfwdError::Config(format!("Invalid TOML: {e}")))
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("PINFWD_BOT_TOKEN") {
            if !token.is_empty() {
                self.telegram.bot_token = token;
            }
        }
        if let Ok(chat) = std::env::var("PINFWD_GROUP_CHAT_ID") {
            match chat.parse() {
                Ok(id) => self.telegram.group_chat_id = id,
                Err(_) => tracing::warn!("PINFWD_GROUP_CHAT_ID is not a number, ignoring"),
            }
        }
    }

    /// Write the config as TOML to the given path, creating parent dirs.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| PinfwdError::Config(format!("Serialize failed: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configs that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            return Err(PinfwdError::config(
                "telegram.bot_token is not set (config file or PINFWD_BOT_TOKEN)",
            ));
        }
        if self.telegram.group_chat_id == 0 {
            return Err(PinfwdError::config("telegram.group_chat_id is not set"));
        }
        if self.app.days_ahead < 1 {
            return Err(PinfwdError::config("app.days_ahead must be at least 1"));
        }
        Ok(())
    }

    /// Database path with `~` expanded.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).into_owned())
    }

    /// Parse `app.schedule_at` into (hour, minute).
    pub fn schedule_time(&self) -> Result<(u32, u32)> {
        parse_schedule_at(&self.app.schedule_at)
    }

    /// TOML rendering with the bot token masked, for `config show`.
    pub fn masked(&self) -> String {
        let mut shown = self.clone();
        if !shown.telegram.bot_token.is_empty() {
            let tail: String = shown
                .telegram
                .bot_token
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            shown.telegram.bot_token = format!("****{tail}");
        }
        toml::to_string_pretty(&shown).unwrap_or_else(|_| "<unprintable>".into())
    }
}

fn parse_schedule_at(s: &str) -> Result<(u32, u32)> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| PinfwdError::config(format!("app.schedule_at must be HH:MM, got {s:?}")))?;
    let hour: u32 = h
        .parse()
        .map_err(|_| PinfwdError::config(format!("Bad hour in app.schedule_at: {s:?}")))?;
    let minute: u32 = m
        .parse()
        .map_err(|_| PinfwdError::config(format!("Bad minute in app.schedule_at: {s:?}")))?;
    if hour > 23 || minute > 59 {
        return Err(PinfwdError::config(format!(
            "app.schedule_at out of range: {s:?}"
        )));
    }
    Ok((hour, minute))
}
