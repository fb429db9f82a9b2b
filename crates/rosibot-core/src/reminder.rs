//! Weekly maintenance reminders.
//!
//! The reminder wakes up every few seconds and looks at today's date:
//! - kick-off day: post `WEEKLY_MONDAY` once per week
//! - follow-up day: nudge with `WEEKLY_FRIDAY` unless the maintenance was
//!   already reported done (or post the kick-off late if it was missed)
//!
//! State transitions are written before sending, so a failed send is not
//! retried within the same week.

use std::{sync::Arc, time::Duration};

use chrono::{Datelike, Local, NaiveDate, Weekday};
use tokio_util::sync::CancellationToken;

use crate::{
    bot::MaintenanceBot,
    messages::{render, WEEKLY_FOLLOWUP, WEEKLY_KICKOFF},
    state::{IsoWeek, WeekState},
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ReminderSchedule {
    pub kickoff: Weekday,
    pub followup: Weekday,
    pub interval: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not a reminder day.
    Idle,
    /// Reminder day, but this week's message was already handled.
    AlreadyHandled,
    KickoffSent,
    FollowupSent,
    /// Follow-up day without a kick-off this week; the kick-off text was sent instead.
    LateKickoffSent,
    /// The week's transition was recorded but the message could not be delivered.
    SendFailed,
}

pub struct WeeklyReminder {
    bot: Arc<MaintenanceBot>,
    schedule: ReminderSchedule,
    today: fn() -> NaiveDate,
}

impl WeeklyReminder {
    pub fn new(bot: Arc<MaintenanceBot>, schedule: ReminderSchedule) -> Self {
        Self {
            bot,
            schedule,
            today: local_today,
        }
    }

    /// Replace the date source used by [`run`](Self::run).
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Run until `cancel` fires. Errors are logged per tick.
    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.schedule.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut iteration = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    tracing::trace!("Running periodic task iteration {iteration}");
                    if let Err(e) = self.tick((self.today)()).await {
                        tracing::error!("Periodic reminder failed: {e}");
                    }
                    iteration += 1;
                }
            }
        }
        tracing::info!("Weekly reminder stopped");
    }

    pub async fn tick(&self, today: NaiveDate) -> Result<TickOutcome> {
        let weekday = today.weekday();
        if weekday == self.schedule.kickoff {
            self.kickoff(today).await
        } else if weekday == self.schedule.followup {
            self.followup(today).await
        } else {
            Ok(TickOutcome::Idle)
        }
    }

    async fn kickoff(&self, today: NaiveDate) -> Result<TickOutcome> {
        let week = IsoWeek::of(today);
        let template = self.bot.catalog().periodic(WEEKLY_KICKOFF)?;

        {
            let _guard = self.bot.lock_transitions().await;
            if self.bot.store().get(week).await?.is_some() {
                tracing::debug!("Weekly maintenance message already sent. Do nothing");
                return Ok(TickOutcome::AlreadyHandled);
            }
            tracing::info!("Kick-off maintenance reminder for {week} not sent yet. Sending");
            self.bot.store().set(week, WeekState::Fresh).await?;
        }

        if self.deliver(&render(template, week.week)).await {
            Ok(TickOutcome::KickoffSent)
        } else {
            Ok(TickOutcome::SendFailed)
        }
    }

    async fn followup(&self, today: NaiveDate) -> Result<TickOutcome> {
        let week = IsoWeek::of(today);

        let outcome = {
            let _guard = self.bot.lock_transitions().await;
            match self.bot.store().get(week).await? {
                Some(WeekState::Fresh) => {
                    tracing::info!("Follow-up maintenance reminder for {week} not sent yet. Sending");
                    self.bot.catalog().periodic(WEEKLY_FOLLOWUP)?;
                    self.bot.store().set(week, WeekState::ReminderSent).await?;
                    TickOutcome::FollowupSent
                }
                Some(WeekState::ReminderSent | WeekState::Done) => TickOutcome::AlreadyHandled,
                None => {
                    tracing::warn!(
                        "It's the follow-up day and no maintenance message was sent for {week}. \
                         This should not happen. Sending the regular maintenance message!"
                    );
                    self.bot.catalog().periodic(WEEKLY_KICKOFF)?;
                    self.bot.store().set(week, WeekState::ReminderSent).await?;
                    TickOutcome::LateKickoffSent
                }
            }
        };

        let delivered = match outcome {
            TickOutcome::FollowupSent => {
                let text = self.bot.catalog().periodic(WEEKLY_FOLLOWUP)?;
                self.deliver(text).await
            }
            TickOutcome::LateKickoffSent => {
                let template = self.bot.catalog().periodic(WEEKLY_KICKOFF)?;
                self.deliver(&render(template, week.week)).await
            }
            _ => true,
        };
        Ok(if delivered {
            outcome
        } else {
            TickOutcome::SendFailed
        })
    }

    /// Whether the message went out.
    async fn deliver(&self, text: &str) -> bool {
        match self.bot.send(text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to send reminder: {e}");
                false
            }
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
