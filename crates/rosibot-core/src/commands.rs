//! Bot commands (`!<command>` messages in the group).

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    bot::MaintenanceBot,
    errors::Error,
    state::{IsoWeek, WeekState},
    Result,
};

pub const COMMAND_PREFIX: char = '!';
pub const HELP: &str = "!hilfe";
pub const MAINTENANCE_DONE: &str = "!erledigt";

#[derive(Clone, Copy, Debug)]
pub struct CommandContext<'a> {
    pub command: &'a str,
    pub today: NaiveDate,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, bot: &MaintenanceBot, ctx: CommandContext<'_>) -> Result<()>;
}

#[derive(Default, Clone)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Registry with the built-in `!hilfe` and `!erledigt` commands.
    pub fn with_defaults() -> Result<Self> {
        let mut reg = Self::default();
        reg.register(HELP, Arc::new(HelpCommand))?;
        reg.register(MAINTENANCE_DONE, Arc::new(MaintenanceDoneCommand))?;
        Ok(reg)
    }

    pub fn register(&mut self, command: &str, handler: Arc<dyn CommandHandler>) -> Result<()> {
        if self.handlers.contains_key(command) {
            return Err(Error::Config(format!(
                "Command {command} is already registered"
            )));
        }
        self.handlers.insert(command.to_string(), handler);
        Ok(())
    }

    pub fn get(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(command).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedCommand {
    NotACommand,
    TooLong { len: usize },
    Command(String),
}

/// Classify a group message. Length is checked before trimming.
pub fn parse_command(text: &str, max_len: usize) -> ParsedCommand {
    if !text.starts_with(COMMAND_PREFIX) {
        return ParsedCommand::NotACommand;
    }
    let len = text.chars().count();
    if len > max_len {
        return ParsedCommand::TooLong { len };
    }
    ParsedCommand::Command(text.trim().to_string())
}

/// `!hilfe`: post the help text.
pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn handle(&self, bot: &MaintenanceBot, ctx: CommandContext<'_>) -> Result<()> {
        let (message, _) = bot.catalog().command(ctx.command)?;
        if !message.is_empty() {
            bot.send(message).await?;
        }
        Ok(())
    }
}

/// `!erledigt`: mark this week's maintenance as done.
pub struct MaintenanceDoneCommand;

#[async_trait]
impl CommandHandler for MaintenanceDoneCommand {
    async fn handle(&self, bot: &MaintenanceBot, ctx: CommandContext<'_>) -> Result<()> {
        let (message, fail) = bot.catalog().command(ctx.command)?;
        let week = IsoWeek::of(ctx.today);

        let reply = {
            let _guard = bot.lock_transitions().await;
            let state = bot.store().get(week).await?.unwrap_or(WeekState::Fresh);
            if state != WeekState::Done {
                tracing::debug!("Weekly maintenance for {week} done. Updating state");
                bot.store().set(week, WeekState::Done).await?;
                Some(message)
            } else {
                tracing::debug!("Weekly maintenance for {week} already done. Do nothing");
                fail
            }
        };

        if let Some(reply) = reply {
            bot.send(reply).await?;
        }
        Ok(())
    }
}
