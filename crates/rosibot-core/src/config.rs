use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Weekday;

use crate::{
    domain::{GroupId, PhoneNumber},
    errors::Error,
    Result,
};

/// Typed configuration for the bot.
///
/// The three Signal keys are required; everything else has a default.
#[derive(Clone, Debug)]
pub struct Config {
    // Signal
    pub phone_number: PhoneNumber,
    pub signal_service: String,
    pub signal_group_id: GroupId,

    // Files
    pub messages_file: PathBuf,
    pub state_file: PathBuf,

    // Timing
    pub reminder_interval: Duration,
    pub receive_interval: Duration,
    pub http_timeout: Duration,

    // Schedule
    pub kickoff_weekday: Weekday,
    pub followup_weekday: Weekday,

    // Commands / outgoing
    pub message_prefix: String,
    pub max_command_length: usize,

    // Behavior flags
    pub debug: bool,
}

impl Config {
    /// Load from `.env` (if present) and the process environment.
    ///
    /// Variables already set in the environment are not overridden by `.env`.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .and_then(non_empty)
                .map(|v| v.trim().to_string())
                .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
        };

        let phone_number = PhoneNumber(required("PHONE_NUMBER")?);
        let signal_service = required("SIGNAL_SERVICE")?;
        let signal_group_id = GroupId(required("SIGNAL_GROUP_ID")?);

        let messages_file = PathBuf::from(
            lookup("MESSAGES_FILE")
                .and_then(non_empty)
                .unwrap_or_else(|| "messages.json".to_string()),
        );
        let state_file = PathBuf::from(
            lookup("STATE_FILE")
                .and_then(non_empty)
                .unwrap_or_else(|| "/tmp/rosibot-state.json".to_string()),
        );

        let reminder_interval = Duration::from_secs(
            parse_u64(&lookup, "REMINDER_INTERVAL_SECS")?
                .unwrap_or(5)
                .max(1),
        );
        let receive_interval =
            Duration::from_secs(parse_u64(&lookup, "RECEIVE_INTERVAL_SECS")?.unwrap_or(1));
        let http_timeout = Duration::from_secs(
            parse_u64(&lookup, "HTTP_TIMEOUT_SECS")?
                .unwrap_or(30)
                .max(1),
        );

        let kickoff_weekday = parse_weekday(&lookup, "KICKOFF_WEEKDAY")?.unwrap_or(Weekday::Mon);
        let followup_weekday =
            parse_weekday(&lookup, "FOLLOWUP_WEEKDAY")?.unwrap_or(Weekday::Fri);
        if kickoff_weekday == followup_weekday {
            return Err(Error::Config(format!(
                "KICKOFF_WEEKDAY and FOLLOWUP_WEEKDAY must differ (both {kickoff_weekday})"
            )));
        }

        // Prefix is taken verbatim (trailing space matters).
        let message_prefix = lookup("MESSAGE_PREFIX").unwrap_or_else(|| "[ROSIBOT]: ".to_string());
        let max_command_length = parse_u64(&lookup, "MAX_COMMAND_LENGTH")?
            .map(|v| v as usize)
            .unwrap_or(128);

        let debug = lookup("DEBUG").map(|s| parse_bool(&s)).unwrap_or(false);

        Ok(Self {
            phone_number,
            signal_service,
            signal_group_id,
            messages_file,
            state_file,
            reminder_interval,
            receive_interval,
            http_timeout,
            kickoff_weekday,
            followup_weekday,
            message_prefix,
            max_command_length,
            debug,
        })
    }

    /// Base URL of the REST API; `SIGNAL_SERVICE` is usually a bare `host:port`.
    pub fn service_url(&self) -> String {
        let svc = self.signal_service.trim_end_matches('/');
        if svc.starts_with("http://") || svc.starts_with("https://") {
            svc.to_string()
        } else {
            format!("http://{svc}")
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

fn parse_weekday(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Weekday>> {
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<Weekday>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a weekday name, got {raw:?}")))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("PHONE_NUMBER", "+4915112345678"),
        ("SIGNAL_SERVICE", "localhost:8080"),
        ("SIGNAL_GROUP_ID", "group.YWJjZGVm"),
    ];

    #[test]
    fn reads_the_three_signal_keys_as_strings() {
        let cfg = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.phone_number.0, "+4915112345678");
        assert_eq!(cfg.signal_service, "localhost:8080");
        assert_eq!(cfg.signal_group_id.0, "group.YWJjZGVm");

        assert_eq!(cfg.messages_file, PathBuf::from("messages.json"));
        assert_eq!(cfg.reminder_interval, Duration::from_secs(5));
        assert_eq!(cfg.kickoff_weekday, Weekday::Mon);
        assert_eq!(cfg.followup_weekday, Weekday::Fri);
        assert_eq!(cfg.message_prefix, "[ROSIBOT]: ");
        assert_eq!(cfg.max_command_length, 128);
        assert!(!cfg.debug);
    }

    #[test]
    fn missing_or_blank_required_key_is_a_config_error() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("SIGNAL_GROUP_ID"));

        let err = Config::from_lookup(lookup(&[
            ("PHONE_NUMBER", "  "),
            ("SIGNAL_SERVICE", "localhost:8080"),
            ("SIGNAL_GROUP_ID", "g"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn service_url_adds_scheme_only_when_missing() {
        let cfg = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.service_url(), "http://localhost:8080");

        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("SIGNAL_SERVICE", "https://signal.example.org/");
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.service_url(), "https://signal.example.org");
    }

    #[test]
    fn optional_keys_override_defaults() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("KICKOFF_WEEKDAY", "tuesday"),
            ("FOLLOWUP_WEEKDAY", "Sat"),
            ("REMINDER_INTERVAL_SECS", "60"),
            ("DEBUG", "yes"),
            ("MESSAGE_PREFIX", ""),
        ]);
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.kickoff_weekday, Weekday::Tue);
        assert_eq!(cfg.followup_weekday, Weekday::Sat);
        assert_eq!(cfg.reminder_interval, Duration::from_secs(60));
        assert!(cfg.debug);
        assert_eq!(cfg.message_prefix, "");
    }

    #[test]
    fn same_kickoff_and_followup_day_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("KICKOFF_WEEKDAY", "fri")]);
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn malformed_number_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MAX_COMMAND_LENGTH", "lots"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("MAX_COMMAND_LENGTH"));
    }

    #[test]
    fn dotenv_parsing_handles_quotes_comments_and_export() {
        let parsed = parse_dotenv(
            "# comment\nPHONE_NUMBER=\"+49151\"\nexport SIGNAL_SERVICE = 'localhost:8080'\nnot a pair\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("PHONE_NUMBER".to_string(), "+49151".to_string()),
                ("SIGNAL_SERVICE".to_string(), "localhost:8080".to_string()),
            ]
        );
    }
}
