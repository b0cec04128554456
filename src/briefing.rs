//! Daily market briefing: one LLM-written summary over the last day's RSS
//! headlines, sent through the same transports as the curation digests.

use std::collections::BTreeSet;
use std::fmt::Write;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::collab;
use crate::config::BriefingConfig;
use crate::model::Candidate;
use crate::notify::format::escape_html;
use crate::notify::{Digest, Plan};
use crate::oracle::llm::{LlmClient, Message};

/// Sent in place of the briefing when the LLM call fails.
pub const FAILED_BRIEFING: &str = "Briefing generation failed, check the logs.";

const PUSH_TITLE: &str = "Global Markets Briefing";

/// Free-text completion for a single prompt.
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl Composer for LlmClient {
    async fn compose(&self, prompt: &str) -> Result<String> {
        let messages = [Message {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];
        self.chat(&messages).await
    }
}

pub fn briefing_prompt(headlines: &[Candidate]) -> String {
    let mut listing = String::new();
    for (i, item) in headlines.iter().enumerate() {
        let _ = writeln!(listing, "{}. [{}] {}", i + 1, item.origin, item.title);
    }
    format!(
        "You are a senior Wall Street macro analyst. Read these global financial \
headlines from the past 24 hours:

{listing}
Write a daily global market intelligence briefing in Chinese with these parts:
1. **Market sentiment score** (0-10, 0 panic, 10 greed) with a short rationale.
2. **Core macro events**: the three most important macro drivers (central banks, geopolitics, policy).
3. **Key sector moves**: notable moves in tech/AI, energy, financials and similar.
4. **Risk alerts**: black-swan signals traders should watch right now.

Be concise and professional, like a Bloomberg terminal morning note. Synthesize, do not list the news.",
        listing = listing
    )
}

pub struct BriefingWriter {
    composer: Arc<dyn Composer>,
    config: BriefingConfig,
}

impl BriefingWriter {
    pub fn new(composer: Arc<dyn Composer>, config: BriefingConfig) -> Self {
        Self { composer, config }
    }

    /// The push and email digests for today's headlines, or `None` when there
    /// are no headlines. An LLM failure still yields digests, carrying
    /// [`FAILED_BRIEFING`] instead of the briefing text.
    pub async fn brief(&self, headlines: &[Candidate], run_date: NaiveDate) -> Option<Plan> {
        if headlines.is_empty() {
            info!("no headlines in the window, nothing to brief");
            return None;
        }
        let considered = &headlines[..headlines.len().min(self.config.max_headlines)];
        let prompt = briefing_prompt(considered);
        debug!(headlines = considered.len(), prompt_len = prompt.len(), "requesting briefing");

        let briefing = collab::call_or(
            "briefing",
            self.composer.compose(&prompt),
            || FAILED_BRIEFING.to_string(),
        )
        .await;
        info!(headlines = considered.len(), briefing_len = briefing.len(), "briefing written");

        Some(Plan {
            push: Some(Digest {
                title: PUSH_TITLE.to_string(),
                body: render_push(&briefing, headlines, run_date),
            }),
            full: Some(Digest {
                title: format!("Global markets briefing ({})", run_date.format("%Y-%m-%d")),
                body: render_full(&briefing, headlines, self.config.email_headlines, run_date),
            }),
        })
    }
}

fn render_push(briefing: &str, headlines: &[Candidate], run_date: NaiveDate) -> String {
    let feeds: BTreeSet<&str> = headlines.iter().map(|h| h.origin.as_str()).collect();
    format!(
        "# Global markets briefing {}\n\n{}\n\n---\n> Sources: {}",
        run_date.format("%Y-%m-%d"),
        briefing.trim(),
        feeds.into_iter().collect::<Vec<_>>().join(", ")
    )
}

fn render_full(briefing: &str, headlines: &[Candidate], limit: usize, run_date: NaiveDate) -> String {
    let mut html = format!(
        "<h2>Global markets briefing {}</h2><div style='white-space:pre-wrap'>{}</div><hr><h3>Headlines</h3><ul>",
        run_date.format("%Y-%m-%d"),
        escape_html(briefing.trim())
    );
    for h in headlines.iter().take(limit) {
        let _ = write!(
            html,
            "<li>{} | <a href='{}'>{}</a> ({})</li>",
            escape_html(&h.published),
            escape_html(&h.url),
            escape_html(&h.title),
            escape_html(&h.origin)
        );
    }
    html.push_str("</ul>");
    html
}
