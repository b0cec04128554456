//! Google Scholar results through SerpApi, one request per configured query.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::info;

use super::{html_to_text, squash_whitespace, FetchRequest, Source};
use crate::collab;
use crate::config::ScholarConfig;
use crate::model::{Candidate, ContentKind};

const SERPAPI_URL: &str = "https://serpapi.com/search";
const SOURCE_LABEL: &str = "Scholar";
const ORIGIN: &str = "Google";

#[derive(Debug, Deserialize)]
struct ScholarResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl OrganicResult {
    /// Scholar rarely exposes a precise date, so the run date stands in.
    fn into_candidate(self, today: NaiveDate) -> Candidate {
        Candidate {
            title: self.title.as_deref().map(squash_whitespace).unwrap_or_default(),
            url: self.link.unwrap_or_default(),
            source: SOURCE_LABEL.to_string(),
            published: today.format("%Y-%m-%d").to_string(),
            abstract_text: self
                .snippet
                .as_deref()
                .map(html_to_text)
                .unwrap_or_else(|| "No abstract available".to_string()),
            origin: ORIGIN.to_string(),
            kind: ContentKind::Paper,
        }
    }
}

fn parse_response(body: &str, today: NaiveDate) -> Result<Vec<Candidate>> {
    let response: ScholarResponse =
        serde_json::from_str(body).context("Failed to parse SerpApi response")?;
    if let Some(error) = response.error {
        bail!("SerpApi error: {}", error);
    }
    Ok(response
        .organic_results
        .into_iter()
        .map(|r| r.into_candidate(today))
        .collect())
}

pub struct ScholarSource {
    client: reqwest::Client,
    api_key: String,
    queries: Vec<String>,
    results_per_query: usize,
}

impl ScholarSource {
    /// `None` when no SerpApi key is configured.
    pub fn new(config: &ScholarConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        Ok(Some(Self {
            client: super::http_client(30)?,
            api_key,
            queries: config.queries.clone(),
            results_per_query: config.results_per_query,
        }))
    }

    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let resp = self
            .client
            .get(SERPAPI_URL)
            .query(&[
                ("engine", "google_scholar"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", &self.results_per_query.to_string()),
            ])
            .send()
            .await
            .context("SerpApi request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to read SerpApi response")?;
        if !status.is_success() {
            bail!("SerpApi returned {}: {}", status, body.chars().take(200).collect::<String>());
        }

        let mut results = parse_response(&body, chrono::Local::now().date_naive())?;
        results.truncate(self.results_per_query);
        Ok(results)
    }

    /// A failing query is logged and contributes nothing; the rest still run.
    async fn search_isolated(&self, query: &str) -> Vec<Candidate> {
        let results = collab::call_or("scholar", self.search(query), Vec::new).await;
        info!(query, count = results.len(), "Scholar query finished");
        results
    }
}

#[async_trait]
impl Source for ScholarSource {
    fn name(&self) -> &str {
        "scholar"
    }

    /// Fan out over every query in configured order. No dedup here.
    async fn fetch(&self, _request: FetchRequest<'_>) -> Result<Vec<Candidate>> {
        let batches: Vec<Vec<Candidate>> = stream::iter(&self.queries)
            .then(|query| self.search_isolated(query))
            .collect()
            .await;
        Ok(batches.into_iter().flatten().collect())
    }
}
