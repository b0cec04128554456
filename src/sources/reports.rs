//! A-share sell-side research reports from Eastmoney's public report list.
//!
//! The list covers the whole market, so rows are filtered locally: the issuing
//! broker must be on the whitelist and the title must carry a quant keyword.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

use super::{squash_whitespace, FetchRequest, Source};
use crate::config::ReportsConfig;
use crate::model::{Candidate, ContentKind};

const SOURCE_LABEL: &str = "Broker Report";
const PDF_URL_BASE: &str = "https://pdf.dfcfw.com/pdf/H3_";

#[derive(Debug, Deserialize)]
struct ReportList {
    #[serde(default)]
    data: Option<Vec<ReportRow>>,
}

#[derive(Debug, Deserialize)]
struct ReportRow {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "orgSName", default)]
    broker: Option<String>,
    #[serde(rename = "publishDate", default)]
    publish_date: Option<String>,
    #[serde(rename = "infoCode", default)]
    info_code: Option<String>,
}

impl ReportRow {
    /// Reports carry no abstract; a one-line description stands in.
    fn into_candidate(self, broker: String) -> Candidate {
        let title = self.title.as_deref().map(squash_whitespace).unwrap_or_default();
        let url = self
            .info_code
            .map(|code| format!("{}{}_1.pdf", PDF_URL_BASE, code.trim()))
            .unwrap_or_default();
        Candidate {
            abstract_text: format!("In-depth report from {}: {}", broker, title),
            title,
            url,
            source: SOURCE_LABEL.to_string(),
            published: self
                .publish_date
                .unwrap_or_default()
                .chars()
                .take(10)
                .collect(),
            origin: broker,
            kind: ContentKind::Report,
        }
    }
}

fn parse_list(body: &str) -> Result<Vec<ReportRow>> {
    let list: ReportList = serde_json::from_str(body).context("Failed to parse report list")?;
    Ok(list.data.unwrap_or_default())
}

/// Whitelisted broker, keyword in title, not yet seen; first `max` in list order.
fn select(
    rows: Vec<ReportRow>,
    brokers: &[String],
    keywords: &[String],
    max: usize,
    request: &FetchRequest<'_>,
) -> Vec<Candidate> {
    let mut selected = Vec::new();
    for row in rows {
        if selected.len() >= max {
            break;
        }
        let Some(broker) = row.broker.as_deref().map(str::trim) else {
            continue;
        };
        if !brokers.iter().any(|b| b == broker) {
            continue;
        }
        let title = row.title.as_deref().unwrap_or_default();
        if !keywords.iter().any(|k| title.contains(k.as_str())) {
            continue;
        }
        let broker = broker.to_string();
        let candidate = row.into_candidate(broker);
        if request.is_seen(&candidate.title) {
            debug!(title = %candidate.title, "report already seen");
            continue;
        }
        selected.push(candidate);
    }
    selected
}

pub struct ReportSource {
    client: reqwest::Client,
    config: ReportsConfig,
}

impl ReportSource {
    /// `None` when disabled or when the whitelist is empty.
    pub fn new(config: &ReportsConfig) -> Result<Option<Self>> {
        if !config.enabled || config.brokers.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            client: super::http_client(30)?,
            config: config.clone(),
        }))
    }

    async fn list(&self, begin: NaiveDate, end: NaiveDate) -> Result<Vec<ReportRow>> {
        let resp = self
            .client
            .get(&self.config.api_url)
            .query(&[
                ("industryCode", "*".to_string()),
                ("industry", "*".to_string()),
                ("rating", "*".to_string()),
                ("ratingChange", "*".to_string()),
                ("code", "*".to_string()),
                ("orgCode", String::new()),
                ("rcode", String::new()),
                ("fields", String::new()),
                ("qType", self.config.report_type.to_string()),
                ("beginTime", begin.format("%Y-%m-%d").to_string()),
                ("endTime", end.format("%Y-%m-%d").to_string()),
                ("pageSize", self.config.page_size.to_string()),
                ("pageNo", "1".to_string()),
                ("p", "1".to_string()),
                ("pageNum", "1".to_string()),
                ("pageNumber", "1".to_string()),
            ])
            .send()
            .await
            .context("Report list request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to read report list")?;
        if !status.is_success() {
            bail!("Report list returned {}: {}", status, body.chars().take(200).collect::<String>());
        }
        parse_list(&body)
    }
}

#[async_trait]
impl Source for ReportSource {
    fn name(&self) -> &str {
        "reports"
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<Vec<Candidate>> {
        let end = chrono::Local::now().date_naive();
        let begin = end - Duration::days(self.config.lookback_days);
        let rows = self.list(begin, end).await?;
        let listed = rows.len();
        let selected = select(
            rows,
            &self.config.brokers,
            &self.config.keywords,
            self.config.max_results,
            &request,
        );
        info!(listed, selected = selected.len(), %begin, %end, "broker reports filtered");
        Ok(selected)
    }
}
