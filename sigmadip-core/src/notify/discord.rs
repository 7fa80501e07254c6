//! Discord webhook sink.

use super::{NotificationSink, NotifyError};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Discord rejects message content longer than this many characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

pub struct DiscordWebhook {
    client: reqwest::blocking::Client,
    url: String,
    mention: Option<String>,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>, mention: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            mention: mention.filter(|m| !m.trim().is_empty()),
        })
    }

    fn post(&self, content: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { content })
            .send()
            .map_err(|e| NotifyError::DeliveryFailure(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::NO_CONTENT {
            return Ok(());
        }
        let body = resp.text().unwrap_or_default();
        Err(NotifyError::DeliveryFailure(format!("HTTP {status}: {body}")))
    }
}

impl NotificationSink for DiscordWebhook {
    fn name(&self) -> &str {
        "discord"
    }

    fn send(&self, text: &str) -> Result<(), NotifyError> {
        let text = match &self.mention {
            Some(m) => format!("{m} {text}"),
            None => text.to_string(),
        };
        let chunks = split_message(&text, DISCORD_MESSAGE_LIMIT);
        debug!(chunks = chunks.len(), "posting to Discord webhook");
        for chunk in &chunks {
            self.post(chunk)?;
        }
        Ok(())
    }
}

/// Split `text` into pieces of at most `limit` characters.
///
/// Breaks on blank lines (report boundaries) first, then on single lines,
/// and only cuts inside a line when one line alone is over the limit.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 || text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    for block in text.split("\n\n") {
        if block.chars().count() <= limit {
            pieces.push((block.to_string(), "\n\n"));
            continue;
        }
        for line in block.split('\n') {
            let chars: Vec<char> = line.chars().collect();
            if chars.is_empty() {
                pieces.push((String::new(), "\n"));
            }
            for part in chars.chunks(limit) {
                pieces.push((part.iter().collect(), "\n"));
            }
        }
        if let Some(last) = pieces.last_mut() {
            last.1 = "\n\n";
        }
    }

    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut sep = "";
    for (piece, next_sep) in pieces {
        let needed = current.chars().count() + sep.chars().count() + piece.chars().count();
        if !current.is_empty() && needed > limit {
            out.push(std::mem::take(&mut current));
        } else if !current.is_empty() {
            current.push_str(sep);
        }
        current.push_str(&piece);
        sep = next_sep;
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_message() {
        assert_eq!(split_message("abc", 10), vec!["abc".to_string()]);
    }

    #[test]
    fn splits_on_report_boundaries() {
        let text = format!("{}\n\n{}\n\n{}", "a".repeat(6), "b".repeat(6), "c".repeat(6));
        let parts = split_message(&text, 14);
        assert_eq!(parts, vec![format!("{}\n\n{}", "a".repeat(6), "b".repeat(6)), "c".repeat(6)]);
    }

    #[test]
    fn long_block_splits_on_lines() {
        let text = "line-one\nline-two\nline-three";
        let parts = split_message(text, 18);
        assert!(parts.iter().all(|p| p.chars().count() <= 18));
        assert_eq!(parts.join("\n"), text);
    }

    #[test]
    fn oversized_line_is_cut() {
        let text = "x".repeat(25);
        let parts = split_message(&text, 10);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.chars().count() <= 10));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "σ".repeat(10);
        assert_eq!(split_message(&text, 10).len(), 1);
    }
}
