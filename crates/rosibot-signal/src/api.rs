//! Wire types for the signal-cli REST API (`bbernhard/signal-cli-rest-api`).

use serde::{Deserialize, Serialize};

use rosibot_core::{domain::GroupId, messaging::types::IncomingMessage};

#[derive(Clone, Debug, Deserialize)]
pub struct About {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GroupEntry {
    #[serde(default)]
    pub name: String,
    pub id: String,
    pub internal_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SendRequest<'a> {
    pub message: &'a str,
    pub number: &'a str,
    pub recipients: Vec<&'a str>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReceivedItem {
    #[serde(default)]
    pub envelope: Option<Envelope>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_number: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub data_message: Option<DataMessage>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMessage {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub group_info: Option<GroupInfo>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub group_id: String,
}

impl ReceivedItem {
    /// Text messages only; receipts, typing indicators and sync messages yield `None`.
    pub fn into_incoming(self) -> Option<IncomingMessage> {
        let env = self.envelope?;
        let data = env.data_message?;
        let text = data.message.filter(|t| !t.is_empty())?;
        Some(IncomingMessage {
            source: env.source_number.or(env.source),
            group: data.group_info.map(|g| GroupId(g.group_id)),
            text,
            timestamp: data.timestamp.unwrap_or(env.timestamp),
        })
    }
}
