pub mod arxiv;
pub mod reports;
pub mod rss;
pub mod scholar;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::model::Candidate;

const USER_AGENT: &str = concat!("quant-curator/", env!("CARGO_PKG_VERSION"));

/// Parameters the engine hands to a source for one pull.
pub struct FetchRequest<'a> {
    /// How many unseen candidates the caller wants.
    pub target: usize,
    /// Hard ceiling on raw provider items a deep scan may examine.
    pub max_depth: usize,
    /// Title → already seen (ledger or earlier in this run).
    pub seen: &'a (dyn Fn(&str) -> bool + Send + Sync),
}

impl FetchRequest<'_> {
    pub fn is_seen(&self, title: &str) -> bool {
        (self.seen)(title)
    }
}

/// A provider of candidate documents.
///
/// Sources may honour `request.seen` to spend their scan budget on unseen
/// items, but the engine re-checks every candidate regardless.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<Vec<Candidate>>;
}

pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

/// Collapse runs of whitespace (titles from feeds often wrap mid-line).
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render an HTML fragment as plain text on a single line.
pub fn html_to_text(fragment: &str) -> String {
    let text = html2text::from_read(fragment.as_bytes(), 10_000)
        .unwrap_or_else(|_| fragment.to_string());
    squash_whitespace(&text)
}
