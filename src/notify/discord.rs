use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serenity::builder::ExecuteWebhook;
use serenity::http::Http;
use serenity::model::webhook::Webhook;

use super::{Digest, Notifier};

/// Discord caps message content at 2000 chars; leave a little room.
const CHUNK_LIMIT: usize = 1990;

/// Discord channel webhook. Long digests go out as several messages.
pub struct DiscordNotifier {
    http: Arc<Http>,
    url: String,
}

impl DiscordNotifier {
    pub fn new(url: String) -> Self {
        // Webhook URLs carry their own token; no bot token needed.
        Self {
            http: Arc::new(Http::new("")),
            url,
        }
    }
}

/// Split on the last newline (else space) before `limit` bytes, never inside
/// a UTF-8 sequence.
pub fn chunk_message(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= limit {
            chunks.push(remaining);
            break;
        }
        let mut boundary = limit;
        while !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }
        let window = &remaining[..boundary];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|i| i + 1)
            .unwrap_or(boundary);
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn deliver(&self, digest: &Digest) -> Result<()> {
        let webhook = Webhook::from_url(self.http.as_ref(), &self.url)
            .await
            .context("Failed to resolve Discord webhook")?;
        for chunk in chunk_message(&digest.body, CHUNK_LIMIT) {
            webhook
                .execute(self.http.as_ref(), false, ExecuteWebhook::new().content(chunk))
                .await
                .context("Discord webhook execution failed")?;
        }
        Ok(())
    }
}
