//! Message catalog loaded from `messages.json`.
//!
//! Two kinds of messages exist:
//! - periodic messages, sent by the weekly reminder (`WEEKLY_MONDAY`, `WEEKLY_FRIDAY`)
//! - command messages, sent in response to a bot command; they always carry a
//!   success text and optionally a failure text
//!
//! ```json
//! {
//!   "periodic": { "WEEKLY_MONDAY": "Wartung {KW} steht an" },
//!   "commands": {
//!     "!hilfe": "...",
//!     "!erledigt": { "SUCCESS": "...", "FAIL": "..." }
//!   }
//! }
//! ```

use std::{collections::HashMap, path::Path};

use serde_json::Value;

use crate::{errors::Error, Result};

pub const WEEKLY_KICKOFF: &str = "WEEKLY_MONDAY";
pub const WEEKLY_FOLLOWUP: &str = "WEEKLY_FRIDAY";

/// Placeholder replaced with `KW <week>` when rendering periodic messages.
const WEEK_PLACEHOLDER: &str = "{KW}";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandMessage {
    pub success: String,
    pub fail: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct MessageCatalog {
    periodic: HashMap<String, String>,
    commands: HashMap<String, CommandMessage>,
}

impl MessageCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path).map_err(|e| {
            Error::Catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json(&txt)?;
        if catalog.is_empty() {
            tracing::warn!("No messages could be retrieved from {}", path.display());
        }
        Ok(catalog)
    }

    pub fn from_json(txt: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(txt)?;
        let Some(root) = root.as_object().filter(|o| !o.is_empty()) else {
            return Ok(Self::default());
        };

        let mut catalog = Self::default();

        if let Some(periodic) = root.get("periodic").and_then(Value::as_object) {
            for (id, message) in periodic {
                match message.as_str() {
                    Some(text) => {
                        catalog.periodic.insert(id.clone(), text.to_string());
                    }
                    None => tracing::warn!("Skipping non-string periodic message {id}"),
                }
            }
        }

        if let Some(commands) = root.get("commands").and_then(Value::as_object) {
            for (command, message) in commands {
                let parsed = parse_command_message(message).ok_or_else(|| {
                    Error::Catalog(format!("Could not parse message dict for command {command}"))
                })?;
                catalog.commands.insert(command.clone(), parsed);
            }
        }

        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.periodic.is_empty() && self.commands.is_empty()
    }

    pub fn periodic(&self, id: &str) -> Result<&str> {
        self.periodic
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| Error::Catalog(format!("No periodic message with id {id}")))
    }

    /// Success and optional failure text for `command`.
    pub fn command(&self, command: &str) -> Result<(&str, Option<&str>)> {
        self.commands
            .get(command)
            .map(|m| (m.success.as_str(), m.fail.as_deref()))
            .ok_or_else(|| Error::Catalog(format!("Could not find messages for command {command}")))
    }
}

fn parse_command_message(v: &Value) -> Option<CommandMessage> {
    if let Some(text) = v.as_str() {
        return Some(CommandMessage {
            success: text.to_string(),
            fail: None,
        });
    }

    let obj = v.as_object()?;
    if obj.len() != 2 {
        return None;
    }
    let success = obj.get("SUCCESS")?.as_str()?.to_string();
    let fail = obj.get("FAIL")?.as_str()?.to_string();
    Some(CommandMessage {
        success,
        fail: Some(fail),
    })
}

/// Fill the week placeholder of a periodic message.
///
/// `{{` and `}}` are escapes for literal braces; any other brace is kept as is.
pub fn render(template: &str, week: u32) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with(WEEK_PLACEHOLDER) {
            out.push_str(&format!("KW {week}"));
            rest = &rest[WEEK_PLACEHOLDER.len()..];
        } else if rest.starts_with("{{") || rest.starts_with("}}") {
            out.push(c);
            rest = &rest[2..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "periodic": {
        "WEEKLY_MONDAY": "Wartung {KW}: wer macht's?",
        "WEEKLY_FRIDAY": "Noch offen!",
        "BROKEN": 42
      },
      "commands": {
        "!hilfe": "Befehle: !hilfe, !erledigt",
        "!erledigt": { "SUCCESS": "Danke!", "FAIL": "Schon erledigt." }
      }
    }"#;

    #[test]
    fn parses_periodic_and_command_messages() {
        let c = MessageCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(c.periodic(WEEKLY_FOLLOWUP).unwrap(), "Noch offen!");
        assert!(c.periodic("BROKEN").is_err());

        assert_eq!(
            c.command("!hilfe").unwrap(),
            ("Befehle: !hilfe, !erledigt", None)
        );
        assert_eq!(
            c.command("!erledigt").unwrap(),
            ("Danke!", Some("Schon erledigt."))
        );
        assert!(c.command("!unbekannt").is_err());
    }

    #[test]
    fn empty_or_non_object_root_yields_empty_catalog() {
        assert!(MessageCatalog::from_json("{}").unwrap().is_empty());
        assert!(MessageCatalog::from_json("[1, 2]").unwrap().is_empty());
        assert!(MessageCatalog::from_json("not json").is_err());
    }

    #[test]
    fn malformed_command_entry_is_an_error() {
        let err = MessageCatalog::from_json(r#"{"commands": {"!x": {"SUCCESS": "a"}}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Catalog(msg) if msg.contains("!x")));

        assert!(
            MessageCatalog::from_json(r#"{"commands": {"!x": {"SUCCESS": "a", "OOPS": "b"}}}"#)
                .is_err()
        );
        assert!(MessageCatalog::from_json(r#"{"commands": {"!x": 7}}"#).is_err());
    }

    #[test]
    fn render_fills_week_placeholder() {
        assert_eq!(
            render("Wartung {KW}: wer macht's?", 42),
            "Wartung KW 42: wer macht's?"
        );
        assert_eq!(render("ohne Platzhalter", 1), "ohne Platzhalter");
    }

    #[test]
    fn render_collapses_doubled_braces() {
        assert_eq!(
            render("{{Wartung}} {KW} {{KW}} }} {x}", 7),
            "{Wartung} KW 7 {KW} } {x}"
        );
        assert_eq!(render("Größe {KW}", 3), "Größe KW 3");
    }

    #[test]
    fn load_reports_missing_file() {
        let path = std::path::PathBuf::from(format!(
            "/tmp/rosibot-missing-messages-{}.json",
            std::process::id()
        ));
        let err = MessageCatalog::load(&path).unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }
}
