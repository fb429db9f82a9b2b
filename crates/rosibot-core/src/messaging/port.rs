use async_trait::async_trait;

use crate::{
    domain::GroupId,
    messaging::types::{split_text, MessagingCapabilities},
    Result,
};

/// Outbound messaging port.
///
/// The Signal REST adapter implements this; tests use in-memory fakes.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Send a plain text message to a group. `text` must fit `max_message_len`.
    async fn send_text(&self, group: &GroupId, text: &str) -> Result<()>;
}

/// Send `text`, splitting it into several messages if it exceeds the messenger limit.
pub async fn send_split(messenger: &dyn MessagingPort, group: &GroupId, text: &str) -> Result<()> {
    let limit = messenger.capabilities().max_message_len;
    for chunk in split_text(text, limit) {
        messenger.send_text(group, &chunk).await?;
    }
    Ok(())
}
