//! arXiv Atom API source.
//!
//! This is the deep-scanning source: it pages through the newest submissions
//! in the configured category, skipping anything already seen, until the
//! caller's target is met or the scan depth is spent.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{squash_whitespace, FetchRequest, Source};
use crate::config::ArxivConfig;
use crate::model::{Candidate, ContentKind};

const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
const SOURCE_LABEL: &str = "ArXiv";
const ORIGIN: &str = "Cornell Univ";
/// arXiv asks clients to wait 3 seconds between consecutive API calls.
const PAGE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term")]
    term: String,
}

impl Entry {
    fn in_category(&self, prefix: &str) -> bool {
        self.categories.iter().any(|c| c.term.starts_with(prefix))
    }

    /// PDF link first, then the abstract page, then the entry id.
    fn best_url(&self) -> String {
        let pdf = self.links.iter().find(|l| l.title.as_deref() == Some("pdf"));
        let alternate = self.links.iter().find(|l| l.rel.as_deref() == Some("alternate"));
        pdf.or(alternate)
            .map(|l| l.href.clone())
            .unwrap_or_else(|| self.id.clone())
    }

    fn into_candidate(self) -> Candidate {
        let url = self.best_url();
        Candidate {
            title: squash_whitespace(&self.title),
            url,
            source: SOURCE_LABEL.to_string(),
            published: self.published.chars().take(10).collect(),
            abstract_text: squash_whitespace(&self.summary),
            origin: ORIGIN.to_string(),
            kind: ContentKind::Paper,
        }
    }
}

fn parse_feed(xml: &str) -> Result<Vec<Entry>> {
    let feed: Feed = quick_xml::de::from_str(xml).context("Failed to parse arXiv Atom feed")?;
    Ok(feed.entries)
}

/// Progress of one deep scan across pages.
#[derive(Debug, Default)]
struct Scan {
    found: Vec<Candidate>,
    examined: usize,
}

impl Scan {
    fn done(&self, request: &FetchRequest<'_>) -> bool {
        self.found.len() >= request.target || self.examined >= request.max_depth
    }

    /// Examine raw entries in order until the scan is done. Every entry looked
    /// at counts toward depth, whether or not it passes the filters.
    fn absorb(&mut self, entries: Vec<Entry>, request: &FetchRequest<'_>, category: &str) {
        for entry in entries {
            if self.done(request) {
                break;
            }
            self.examined += 1;

            if !entry.in_category(category) {
                continue;
            }
            let candidate = entry.into_candidate();
            if request.is_seen(&candidate.title) {
                debug!(title = %candidate.title, "arXiv entry already seen");
                continue;
            }
            self.found.push(candidate);
        }
    }
}

pub struct ArxivSource {
    client: reqwest::Client,
    config: ArxivConfig,
}

impl ArxivSource {
    pub fn new(config: ArxivConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(60)?,
            config,
        })
    }

    /// `cat:q-fin.* AND ("k1" OR "k2" ...)`
    fn search_query(&self) -> String {
        let category = format!("cat:{}.*", self.config.category);
        if self.config.keywords.is_empty() {
            return category;
        }
        let keywords = self
            .config
            .keywords
            .iter()
            .map(|k| format!("\"{}\"", k))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("{} AND ({})", category, keywords)
    }

    async fn fetch_page(&self, start: usize, size: usize) -> Result<Vec<Entry>> {
        let resp = self
            .client
            .get(ARXIV_API_URL)
            .query(&[
                ("search_query", self.search_query()),
                ("start", start.to_string()),
                ("max_results", size.to_string()),
                ("sortBy", "submittedDate".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .send()
            .await
            .context("arXiv request failed")?
            .error_for_status()
            .context("arXiv returned an error status")?;
        let body = resp.text().await.context("Failed to read arXiv response")?;
        parse_feed(&body)
    }
}

/// One page of raw entries, newest first, starting at offset `start`.
#[async_trait]
trait PageFetcher: Send + Sync {
    async fn page(&self, start: usize, size: usize) -> Result<Vec<Entry>>;
}

#[async_trait]
impl PageFetcher for ArxivSource {
    async fn page(&self, start: usize, size: usize) -> Result<Vec<Entry>> {
        self.fetch_page(start, size).await
    }
}

/// Page through `pages` until the request's target or depth is reached, or
/// the provider runs out. Any page failure fails the whole scan.
async fn deep_scan<P>(
    pages: &P,
    request: &FetchRequest<'_>,
    page_size: usize,
    category: &str,
    delay: Duration,
) -> Result<Scan>
where
    P: PageFetcher + ?Sized,
{
    let mut scan = Scan::default();
    let mut fetched = 0usize;

    while !scan.done(request) {
        if fetched > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let size = page_size.min(request.max_depth - scan.examined);
        let entries = pages
            .page(scan.examined, size)
            .await
            .with_context(|| format!("arXiv page {} failed", fetched + 1))?;
        fetched += 1;

        let returned = entries.len();
        scan.absorb(entries, request, category);
        debug!(page = fetched, returned, examined = scan.examined, found = scan.found.len(), "arXiv page scanned");
        if returned < size {
            break;
        }
    }
    Ok(scan)
}

#[async_trait]
impl Source for ArxivSource {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<Vec<Candidate>> {
        info!(
            target_count = request.target,
            max_depth = request.max_depth,
            "scanning arXiv"
        );
        let scan = deep_scan(
            self,
            &request,
            self.config.page_size,
            &self.config.category,
            PAGE_DELAY,
        )
        .await?;
        info!(found = scan.found.len(), examined = scan.examined, "arXiv scan finished");
        Ok(scan.found)
    }
}
