use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    commands::{parse_command, CommandContext, CommandRegistry, ParsedCommand},
    domain::ResolvedGroup,
    messages::MessageCatalog,
    messaging::{
        port::{send_split, MessagingPort},
        types::IncomingMessage,
    },
    state::{IsoWeek, WeekStateStore},
    Result,
};

#[derive(Clone, Debug)]
pub struct BotSettings {
    pub message_prefix: String,
    pub max_command_length: usize,
}

/// What happened to an incoming message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Direct message or a different group.
    ForeignChat,
    NotACommand,
    TooLong,
    Unknown(String),
    Handled(String),
}

/// The maintenance bot: one Signal group, one message catalog, one week ledger.
pub struct MaintenanceBot {
    settings: BotSettings,
    group: ResolvedGroup,
    catalog: MessageCatalog,
    store: Arc<dyn WeekStateStore>,
    messenger: Arc<dyn MessagingPort>,
    commands: CommandRegistry,
    transitions: Mutex<()>,
}

impl MaintenanceBot {
    pub fn new(
        settings: BotSettings,
        group: ResolvedGroup,
        catalog: MessageCatalog,
        store: Arc<dyn WeekStateStore>,
        messenger: Arc<dyn MessagingPort>,
        commands: CommandRegistry,
    ) -> Self {
        for name in commands.names() {
            if catalog.command(name).is_err() {
                tracing::warn!("Command {name} has no message in the catalog");
            }
        }

        Self {
            settings,
            group,
            catalog,
            store,
            messenger,
            commands,
            transitions: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &dyn WeekStateStore {
        self.store.as_ref()
    }

    /// Serializes read-modify-write cycles on the week state.
    pub async fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transitions.lock().await
    }

    /// Send `message` to the group, prefixed with the bot marker.
    pub async fn send(&self, message: &str) -> Result<()> {
        let text = format!("{}{message}", self.settings.message_prefix);
        send_split(self.messenger.as_ref(), &self.group.id, &text).await
    }

    pub async fn handle_message(&self, msg: &IncomingMessage) -> Result<Dispatch> {
        self.handle_message_on(msg, Local::now().date_naive()).await
    }

    pub async fn handle_message_on(
        &self,
        msg: &IncomingMessage,
        today: NaiveDate,
    ) -> Result<Dispatch> {
        let in_group = msg
            .group
            .as_ref()
            .map(|g| self.group.matches(g))
            .unwrap_or(false);
        if !in_group {
            tracing::debug!("Ignoring message outside of group {}", self.group.name);
            return Ok(Dispatch::ForeignChat);
        }

        let command = match parse_command(&msg.text, self.settings.max_command_length) {
            ParsedCommand::NotACommand => {
                tracing::debug!("Received message that does not appear to be a command. Do nothing");
                return Ok(Dispatch::NotACommand);
            }
            ParsedCommand::TooLong { len } => {
                tracing::error!(
                    "Invalid bot command. Length {len} exceeds allowed length of {}",
                    self.settings.max_command_length
                );
                return Ok(Dispatch::TooLong);
            }
            ParsedCommand::Command(c) => c,
        };

        tracing::debug!("Received bot command: {command}");
        let Some(handler) = self.commands.get(&command) else {
            tracing::warn!("Received unknown bot command '{command}'. Ignore");
            return Ok(Dispatch::Unknown(command));
        };

        handler
            .handle(
                self,
                CommandContext {
                    command: &command,
                    today,
                },
            )
            .await?;
        Ok(Dispatch::Handled(command))
    }

    /// Forget the current week so every periodic message is sent again.
    pub async fn reset_week(&self, today: NaiveDate) -> Result<()> {
        let week = IsoWeek::of(today);
        tracing::warn!(
            "DEBUG MODE ENABLED. Clearing state for {week}; all periodic messages of this week will be resent"
        );
        let _guard = self.lock_transitions().await;
        self.store.clear(week).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        commands::{HELP, MAINTENANCE_DONE},
        domain::GroupId,
        messaging::types::MessagingCapabilities,
        state::{MemoryStateStore, WeekState},
    };
    use async_trait::async_trait;

    pub(crate) const CATALOG: &str = r#"{
      "periodic": {
        "WEEKLY_MONDAY": "Wartung {KW} steht an. Wer übernimmt?",
        "WEEKLY_FRIDAY": "Die Wartung ist noch offen!"
      },
      "commands": {
        "!hilfe": "Befehle: !hilfe, !erledigt",
        "!erledigt": { "SUCCESS": "Danke fürs Warten!", "FAIL": "Diese Woche schon erledigt." }
      }
    }"#;

    #[derive(Default)]
    pub(crate) struct FakeMessenger {
        sends: std::sync::Mutex<Vec<(GroupId, String)>>,
    }

    impl FakeMessenger {
        pub(crate) fn sent(&self) -> Vec<String> {
            self.sends
                .lock()
                .unwrap()
                .iter()
                .map(|(_, t)| t.clone())
                .collect()
        }

        pub(crate) fn recipients(&self) -> Vec<GroupId> {
            self.sends
                .lock()
                .unwrap()
                .iter()
                .map(|(g, _)| g.clone())
                .collect()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                max_message_len: 2000,
            }
        }

        async fn send_text(&self, group: &GroupId, text: &str) -> Result<()> {
            self.sends
                .lock()
                .unwrap()
                .push((group.clone(), text.to_string()));
            Ok(())
        }
    }

    pub(crate) fn test_group() -> ResolvedGroup {
        ResolvedGroup {
            id: GroupId("group.cm9zaQ==".to_string()),
            internal_id: GroupId("cm9zaQ==".to_string()),
            name: "Riesige Rosi".to_string(),
        }
    }

    pub(crate) fn bot_with(
        store: Arc<dyn WeekStateStore>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Arc<MaintenanceBot> {
        Arc::new(MaintenanceBot::new(
            BotSettings {
                message_prefix: "[ROSIBOT]: ".to_string(),
                max_command_length: 128,
            },
            test_group(),
            MessageCatalog::from_json(CATALOG).unwrap(),
            store,
            messenger,
            CommandRegistry::with_defaults().unwrap(),
        ))
    }

    pub(crate) fn test_bot() -> (Arc<MaintenanceBot>, Arc<FakeMessenger>, Arc<MemoryStateStore>) {
        let messenger = Arc::new(FakeMessenger::default());
        let store = Arc::new(MemoryStateStore::default());
        let bot = bot_with(store.clone(), messenger.clone());
        (bot, messenger, store)
    }

    fn group_msg(text: &str) -> IncomingMessage {
        IncomingMessage {
            source: Some("+4917000000".to_string()),
            group: Some(GroupId("cm9zaQ==".to_string())),
            text: text.to_string(),
            timestamp: 1,
        }
    }

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    #[tokio::test]
    async fn help_replies_with_prefixed_text_to_configured_group() {
        let (bot, messenger, _) = test_bot();
        let d = bot
            .handle_message_on(&group_msg("!hilfe"), wednesday())
            .await
            .unwrap();
        assert_eq!(d, Dispatch::Handled(HELP.to_string()));
        assert_eq!(
            messenger.sent(),
            vec!["[ROSIBOT]: Befehle: !hilfe, !erledigt"]
        );
        assert_eq!(messenger.recipients(), vec![test_group().id]);
    }

    #[tokio::test]
    async fn maintenance_done_succeeds_once_then_reports_failure() {
        let (bot, messenger, store) = test_bot();
        let week = IsoWeek::of(wednesday());

        bot.handle_message_on(&group_msg("!erledigt"), wednesday())
            .await
            .unwrap();
        assert_eq!(store.get(week).await.unwrap(), Some(WeekState::Done));

        let d = bot
            .handle_message_on(&group_msg(" !erledigt"), wednesday())
            .await
            .unwrap();
        assert_eq!(d, Dispatch::NotACommand);

        let d = bot
            .handle_message_on(&group_msg("!erledigt "), wednesday())
            .await
            .unwrap();
        assert_eq!(d, Dispatch::Handled(MAINTENANCE_DONE.to_string()));
        assert_eq!(
            messenger.sent(),
            vec![
                "[ROSIBOT]: Danke fürs Warten!",
                "[ROSIBOT]: Diese Woche schon erledigt."
            ]
        );
    }

    #[tokio::test]
    async fn maintenance_done_overrides_reminder_state() {
        let (bot, _, store) = test_bot();
        let week = IsoWeek::of(wednesday());
        store.set(week, WeekState::ReminderSent).await.unwrap();

        bot.handle_message_on(&group_msg("!erledigt"), wednesday())
            .await
            .unwrap();
        assert_eq!(store.get(week).await.unwrap(), Some(WeekState::Done));
    }

    #[tokio::test]
    async fn ignores_foreign_chats_unknown_and_overlong_commands() {
        let (bot, messenger, _) = test_bot();

        let mut direct = group_msg("!hilfe");
        direct.group = None;
        assert_eq!(
            bot.handle_message_on(&direct, wednesday()).await.unwrap(),
            Dispatch::ForeignChat
        );

        let mut other = group_msg("!hilfe");
        other.group = Some(GroupId("andere".to_string()));
        assert_eq!(
            bot.handle_message_on(&other, wednesday()).await.unwrap(),
            Dispatch::ForeignChat
        );

        assert_eq!(
            bot.handle_message_on(&group_msg("!tanzen"), wednesday())
                .await
                .unwrap(),
            Dispatch::Unknown("!tanzen".to_string())
        );

        let long = format!("!hilfe{}", " ".repeat(200));
        assert_eq!(
            bot.handle_message_on(&group_msg(&long), wednesday())
                .await
                .unwrap(),
            Dispatch::TooLong
        );

        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn reset_week_clears_only_current_week() {
        let (bot, _, store) = test_bot();
        let this_week = IsoWeek::of(wednesday());
        let last_week = IsoWeek {
            year: this_week.year,
            week: this_week.week - 1,
        };
        store.set(this_week, WeekState::Done).await.unwrap();
        store.set(last_week, WeekState::Done).await.unwrap();

        bot.reset_week(wednesday()).await.unwrap();
        assert_eq!(store.get(this_week).await.unwrap(), None);
        assert_eq!(store.get(last_week).await.unwrap(), Some(WeekState::Done));
    }
}
