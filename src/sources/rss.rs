//! RSS 2.0 news feeds. Every configured feed is fetched in order; items older
//! than the age window, or without a parseable date, are dropped.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::info;

use super::{html_to_text, squash_whitespace, FetchRequest, Source};
use crate::collab;
use crate::config::{FeedConfig, RssConfig};
use crate::model::{Candidate, ContentKind};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

fn parse_items(xml: &str) -> Result<Vec<Item>> {
    let rss: Rss = quick_xml::de::from_str(xml).context("Failed to parse RSS feed")?;
    Ok(rss.channel.items)
}

/// Keep items published within `max_age` of `now`.
fn recent_candidates(
    feed_name: &str,
    items: Vec<Item>,
    now: DateTime<Utc>,
    max_age: Duration,
) -> Vec<Candidate> {
    let cutoff = now
        .checked_sub_signed(max_age)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    items
        .into_iter()
        .filter_map(|item| {
            let published = item
                .pub_date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())?
                .with_timezone(&Utc);
            if published < cutoff {
                return None;
            }
            Some(Candidate {
                title: item.title.as_deref().map(squash_whitespace).unwrap_or_default(),
                url: item.link.map(|l| l.trim().to_string()).unwrap_or_default(),
                source: feed_name.to_string(),
                published: published.format("%Y-%m-%d").to_string(),
                abstract_text: item.description.as_deref().map(html_to_text).unwrap_or_default(),
                origin: feed_name.to_string(),
                kind: ContentKind::News,
            })
        })
        .collect()
}

pub struct RssSource {
    client: reqwest::Client,
    feeds: Vec<FeedConfig>,
    max_age: Duration,
}

impl RssSource {
    /// `None` when no feeds are configured.
    pub fn new(config: &RssConfig) -> Result<Option<Self>> {
        if config.feeds.is_empty() {
            return Ok(None);
        }
        let max_age = Duration::try_hours(config.max_age_hours)
            .ok_or_else(|| anyhow!("RSS age window of {} hours is out of range", config.max_age_hours))?;
        Ok(Some(Self {
            client: super::http_client(30)?,
            feeds: config.feeds.clone(),
            max_age,
        }))
    }

    async fn fetch_feed(&self, feed: &FeedConfig) -> Result<Vec<Candidate>> {
        let body = self
            .client
            .get(&feed.url)
            .send()
            .await
            .with_context(|| format!("RSS request to {} failed", feed.name))?
            .error_for_status()?
            .text()
            .await
            .context("Failed to read RSS body")?;
        let items = parse_items(&body)?;
        Ok(recent_candidates(&feed.name, items, Utc::now(), self.max_age))
    }

    /// Recent items from every feed, in feed order. A failing feed is skipped.
    pub async fn headlines(&self) -> Vec<Candidate> {
        let mut all = Vec::new();
        for feed in &self.feeds {
            let items = collab::call_or(&feed.name, self.fetch_feed(feed), Vec::new).await;
            info!(feed = %feed.name, count = items.len(), "RSS feed fetched");
            all.extend(items);
        }
        all
    }
}

#[async_trait]
impl Source for RssSource {
    fn name(&self) -> &str {
        "rss"
    }

    async fn fetch(&self, _request: FetchRequest<'_>) -> Result<Vec<Candidate>> {
        Ok(self.headlines().await)
    }
}
