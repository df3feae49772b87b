//! # pinfwd CLI
//!
//! Watches the pinned announcement of one Telegram group chat, parses
//! the event list out of it, and reminds the configured recipients —
//! each event exactly once.
//!
//! Usage:
//!   pinfwd run                      # one pipeline pass, then exit
//!   pinfwd start                    # daily scheduler loop
//!   pinfwd recipients list          # delivery roster and statuses
//!   pinfwd recipients add --user-id 1234
//!   pinfwd config init              # write a starter config file
//!   pinfwd config show              # show config, token masked

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pinfwd_core::PinfwdConfig;
use pinfwd_core::traits::RecipientStore;
use pinfwd_forwarder::{Forwarder, run_daily};
use pinfwd_store::Store;
use pinfwd_telegram::TelegramChannel;

#[derive(Parser)]
#[command(
    name = "pinfwd",
    version,
    about = "📌 pinfwd — pinned-announcement event reminders for Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reminder pipeline once and exit
    Run,

    /// Start the daily scheduler
    Start,

    /// Manage reminder recipients
    Recipients {
        #[command(subcommand)]
        action: RecipientAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum RecipientAction {
    /// Show the delivery roster with statuses
    List,
    /// Add or refresh a recipient
    Add {
        #[arg(long)]
        user_id: i64,
        #[arg(long, default_value = "")]
        username: String,
    },
    /// Allow sending to a recipient
    Allow {
        #[arg(long)]
        user_id: i64,
    },
    /// Block sending to a recipient
    Deny {
        #[arg(long)]
        user_id: i64,
    },
    /// Deactivate a recipient
    Deactivate {
        #[arg(long)]
        user_id: i64,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the loaded config with the bot token masked
    Show,
    /// Write a starter config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PinfwdConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(config.app.log_level.clone())
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run => {
            let (forwarder, _store) = build_forwarder(&config).await?;
            let outcome = forwarder.run(config.telegram.group_chat_id).await?;
            println!("Done: {}/{} delivered", outcome.succeeded, outcome.attempted);
        }

        Commands::Start => {
            let (forwarder, _store) = build_forwarder(&config).await?;
            if config.app.run_once {
                let outcome = forwarder.run(config.telegram.group_chat_id).await?;
                println!("Done: {}/{} delivered", outcome.succeeded, outcome.attempted);
            } else {
                let (hour, minute) = config.schedule_time()?;
                tracing::info!("Scheduler started, daily at {hour:02}:{minute:02}");
                run_daily(&forwarder, config.telegram.group_chat_id, hour, minute).await;
            }
        }

        Commands::Recipients { action } => {
            let store = Arc::new(Store::open(&config.db_path())?);
            handle_recipients(store, action).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => println!("{}", config.masked()),
            ConfigAction::Init => {
                let path = match cli.config.as_deref() {
                    Some(p) => std::path::PathBuf::from(shellexpand::tilde(p).into_owned()),
                    None => PinfwdConfig::default_path(),
                };
                if path.exists() {
                    bail!("Config already exists at {}", path.display());
                }
                PinfwdConfig::default().save(&path)?;
                println!("Starter config written to {}", path.display());
            }
        },
    }

    Ok(())
}

/// Open the store, seed configured recipients, connect the Telegram
/// channel, and assemble the forwarder.
async fn build_forwarder(config: &PinfwdConfig) -> Result<(Forwarder, Arc<Store>)> {
    config.validate()?;

    let store = Arc::new(Store::open(&config.db_path())?);

    // seed recipients from config; individual failures only warn
    for user_id in &config.telegram.user_ids {
        if let Err(e) = store.upsert_recipient(*user_id, "").await {
            tracing::warn!("Could not seed recipient {user_id}: {e}");
        }
    }

    let channel = Arc::new(TelegramChannel::new(config.telegram.bot_token.clone()));
    match channel.get_me().await {
        Ok(me) => tracing::info!(
            "Authorized as {} (id {})",
            me.username.as_deref().unwrap_or(&me.first_name),
            me.id
        ),
        Err(e) => tracing::warn!("getMe failed, continuing anyway: {e}"),
    }

    let forwarder = Forwarder::new(
        channel.clone(),
        channel,
        store.clone(),
        store.clone(),
        store.clone(),
        config.app.days_ahead,
        Duration::from_millis(config.app.pace_ms),
    );
    Ok((forwarder, store))
}

async fn handle_recipients(store: Arc<Store>, action: RecipientAction) -> Result<()> {
    match action {
        RecipientAction::List => {
            let recipients = store.list_all_recipients()?;
            if recipients.is_empty() {
                println!("No recipients yet. Add one with: pinfwd recipients add --user-id <id>");
                return Ok(());
            }
            println!(
                "{:<12} {:<20} {:<7} {:<7} {:<8} last error",
                "user id", "username", "active", "allow", "status"
            );
            for r in recipients {
                println!(
                    "{:<12} {:<20} {:<7} {:<7} {:<8} {}",
                    r.user_id,
                    r.username,
                    r.is_active,
                    r.allow_sending,
                    r.delivery_status,
                    r.error_message.as_deref().unwrap_or("-")
                );
            }
        }
        RecipientAction::Add { user_id, username } => {
            store.upsert_recipient(user_id, &username).await?;
            println!("Recipient {user_id} added");
        }
        RecipientAction::Allow { user_id } => {
            store.set_allow_sending(user_id, true).await?;
            println!("Sending allowed for {user_id}");
        }
        RecipientAction::Deny { user_id } => {
            store.set_allow_sending(user_id, false).await?;
            println!("Sending blocked for {user_id}");
        }
        RecipientAction::Deactivate { user_id } => {
            store.deactivate(user_id).await?;
            println!("Recipient {user_id} deactivated");
        }
    }
    Ok(())
}
