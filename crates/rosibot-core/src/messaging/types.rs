use crate::domain::GroupId;

/// A received text message, stripped of transport details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Sender phone number or UUID, if the transport reported one.
    pub source: Option<String>,
    /// Group the message was posted in; `None` for direct messages.
    pub group: Option<GroupId>,
    pub text: String,
    /// Sender timestamp in milliseconds since the epoch.
    pub timestamp: i64,
}

/// Capabilities of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}

/// Split `text` into chunks of at most `limit` chars, preferring line breaks.
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
            continue;
        }

        // A single line longer than the limit: hard split on char boundaries.
        let chars: Vec<char> = line.chars().collect();
        for piece in chars.chunks(limit) {
            let s: String = piece.iter().collect();
            if piece.len() == limit {
                chunks.push(s);
            } else {
                current_len = piece.len();
                current = s;
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
        .into_iter()
        .map(|c| c.trim_end_matches('\n').to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
