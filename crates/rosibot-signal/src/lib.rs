//! Signal adapter (signal-cli REST API over `reqwest`).
//!
//! This crate implements the `rosibot-core` MessagingPort for Signal groups and
//! runs the receive loop that feeds incoming messages to the bot.

pub mod api;
pub mod client;
pub mod router;

pub use client::SignalClient;

use async_trait::async_trait;
use rosibot_core::{
    domain::GroupId,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

/// Longest text sent in one Signal message; longer texts are split.
pub const MAX_SIGNAL_MESSAGE_LEN: usize = 4000;

#[derive(Clone)]
pub struct SignalMessenger {
    client: SignalClient,
}

impl SignalMessenger {
    pub fn new(client: SignalClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessagingPort for SignalMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: MAX_SIGNAL_MESSAGE_LEN,
        }
    }

    async fn send_text(&self, group: &GroupId, text: &str) -> Result<()> {
        self.client.send(group, text).await
    }
}
