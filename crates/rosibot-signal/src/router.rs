use std::{sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Local;
use tokio_util::sync::CancellationToken;

use rosibot_core::{
    bot::{BotSettings, MaintenanceBot},
    commands::CommandRegistry,
    config::Config,
    messages::MessageCatalog,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    reminder::{ReminderSchedule, WeeklyReminder},
    state::{FileStateStore, WeekStateStore},
};

use crate::{SignalClient, SignalMessenger};

/// Wait after a failed receive before polling again.
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Start the bot and poll Signal until Ctrl-C.
pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let catalog = MessageCatalog::load(&cfg.messages_file)
        .with_context(|| format!("loading {}", cfg.messages_file.display()))?;

    let store: Arc<dyn WeekStateStore> = Arc::new(FileStateStore::new(cfg.state_file.clone()));

    let client = SignalClient::new(
        cfg.service_url(),
        cfg.phone_number.clone(),
        cfg.http_timeout,
    )?;

    let about = client
        .about()
        .await
        .with_context(|| format!("signal service at {} is not reachable", cfg.service_url()))?;
    tracing::info!(
        "Signal REST API {} (mode {}) at {}",
        about.version.as_deref().unwrap_or("?"),
        about.mode.as_deref().unwrap_or("?"),
        cfg.service_url()
    );

    let group = client
        .resolve_group(&cfg.signal_group_id)
        .await
        .context("resolving SIGNAL_GROUP_ID")?;
    tracing::info!("Serving group \"{}\" as {}", group.name, cfg.phone_number);

    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(SignalMessenger::new(client.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let bot = Arc::new(MaintenanceBot::new(
        BotSettings {
            message_prefix: cfg.message_prefix.clone(),
            max_command_length: cfg.max_command_length,
        },
        group,
        catalog,
        store,
        messenger,
        CommandRegistry::with_defaults()?,
    ));

    if cfg.debug {
        bot.reset_week(Local::now().date_naive()).await?;
    }

    let cancel = CancellationToken::new();
    let reminder = WeeklyReminder::new(
        bot.clone(),
        ReminderSchedule {
            kickoff: cfg.kickoff_weekday,
            followup: cfg.followup_weekday,
            interval: cfg.reminder_interval,
        },
    );
    let reminder_handle = tokio::spawn(reminder.run(cancel.clone()));

    tracing::info!("Starting bot");
    tokio::select! {
        _ = receive_loop(&client, &bot, cfg.receive_interval, &cancel) => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!("Failed to listen for Ctrl-C: {e}");
            }
            tracing::info!("Shutting down");
        }
    }

    cancel.cancel();
    if let Err(e) = reminder_handle.await {
        tracing::error!("Reminder task ended abnormally: {e}");
    }
    Ok(())
}

async fn receive_loop(
    client: &SignalClient,
    bot: &MaintenanceBot,
    interval: Duration,
    cancel: &CancellationToken,
) {
    while !cancel.is_cancelled() {
        let wait = match client.receive().await {
            Ok(messages) => {
                for msg in messages {
                    if let Err(e) = bot.handle_message(&msg).await {
                        tracing::error!("Failed to handle message: {e}");
                    }
                }
                interval
            }
            Err(e) => {
                tracing::warn!("Receiving messages failed: {e}");
                interval.max(RECEIVE_ERROR_BACKOFF)
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
