mod briefing;
mod collab;
mod config;
mod engine;
mod identity;
mod model;
mod notify;
mod oracle;
mod sources;
mod store;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::{error, info, warn};

use briefing::BriefingWriter;
use config::{Config, NotifyConfig, RssConfig, RunMode};
use engine::CurationEngine;
use identity::Normalizer;
use notify::dingtalk::DingTalkNotifier;
use notify::discord::DiscordNotifier;
use notify::email::EmailNotifier;
use notify::{NotificationRouter, Notifier};
use oracle::llm::LlmClient;
use oracle::OracleClient;
use sources::arxiv::ArxivSource;
use sources::reports::ReportSource;
use sources::rss::RssSource;
use sources::scholar::ScholarSource;
use sources::Source;
use store::JsonStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(config::log_level_from_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    if config.notify.push_threshold < config.curation.min_score {
        warn!(
            push_threshold = config.notify.push_threshold,
            min_score = config.curation.min_score,
            "push threshold is below the acceptance threshold and has no effect"
        );
    }

    let llm = Arc::new(LlmClient::new(&config.oracle)?);
    info!(model = %config.oracle.model, mode = ?config.mode, "LLM client initialized");

    match config.mode {
        RunMode::Curate => curate(&config, llm).await,
        RunMode::Briefing => brief(&config, llm).await,
    }
}

async fn curate(config: &Config, llm: Arc<LlmClient>) -> anyhow::Result<()> {
    // Sources, highest priority first
    let mut sources: Vec<Arc<dyn Source>> = vec![Arc::new(ArxivSource::new(config.arxiv.clone())?)];
    match ScholarSource::new(&config.scholar)? {
        Some(scholar) => sources.push(Arc::new(scholar)),
        None => info!("SERPAPI_KEY not set, Scholar source disabled"),
    }
    match ReportSource::new(&config.reports)? {
        Some(reports) => sources.push(Arc::new(reports)),
        None => info!("broker report source disabled"),
    }
    match RssSource::new(&config.rss)? {
        Some(rss) => sources.push(Arc::new(rss)),
        None => info!("no RSS feeds configured"),
    }
    info!(count = sources.len(), "sources initialized");

    let oracle = OracleClient::new(llm, config.oracle.fallback_score);

    let normalizer = Normalizer::new(config.curation.strictness);
    let store = JsonStore::new(&config.store);
    let archive = store.load_archive();
    let mut ledger = store.load_ledger(&archive, &normalizer);
    info!(
        archive = archive.len(),
        ledger = ledger.len(),
        ledger_capacity = ledger.capacity(),
        "state loaded from {:?}",
        config.store.data_dir
    );
    if ledger.is_empty() {
        info!("seen-ledger is empty, every candidate counts as new");
    }

    let engine = CurationEngine::new(sources, oracle, normalizer, config.curation.clone());
    let run_date = chrono::Local::now().date_naive();
    let report = engine.run(&ledger, run_date).await;
    for (source, count) in &report.fetched {
        info!(source = %source, fetched = *count, "source pull");
    }
    info!(
        accepted = report.accepted.len(),
        analyzed = report.analyzed.len(),
        skipped_seen = report.skipped_seen,
        skipped_malformed = report.skipped_malformed,
        "curation finished"
    );

    if config.dry_run {
        for item in &report.accepted {
            info!(score = item.score, title = %item.title, "would publish");
        }
        info!("DRY_RUN set, skipping persistence and notifications");
        return Ok(());
    }

    let archive = report.apply(&mut ledger, archive, config.store.max_report_size);
    if let Err(e) = store.save_ledger(&ledger) {
        error!("Failed to save seen ledger: {:#}", e);
    }
    if !report.accepted.is_empty() {
        if let Err(e) = store.save_archive(&archive) {
            error!("Failed to save archive: {:#}", e);
        }
    }

    let router = build_router(&config.notify);
    router.dispatch(&report.accepted, run_date).await;

    Ok(())
}

async fn brief(config: &Config, llm: Arc<LlmClient>) -> anyhow::Result<()> {
    let feeds = RssConfig {
        feeds: config.briefing.feeds.clone(),
        max_age_hours: config.briefing.max_age_hours,
    };
    let Some(rss) = RssSource::new(&feeds)? else {
        warn!("BRIEFING_FEEDS is empty, nothing to brief");
        return Ok(());
    };

    let headlines = rss.headlines().await;
    info!(count = headlines.len(), "headlines collected");

    let run_date = chrono::Local::now().date_naive();
    let writer = BriefingWriter::new(llm, config.briefing.clone());
    let Some(plan) = writer.brief(&headlines, run_date).await else {
        return Ok(());
    };

    if config.dry_run {
        if let Some(push) = &plan.push {
            info!(body = %push.body, "would send briefing");
        }
        info!("DRY_RUN set, skipping notifications");
        return Ok(());
    }

    build_router(&config.notify).send(&plan).await;
    Ok(())
}

/// Transports whose credentials are present. A transport that fails to
/// build is logged and left out.
fn build_router(config: &NotifyConfig) -> NotificationRouter {
    let mut push: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(webhook) = &config.dingtalk_webhook {
        match DingTalkNotifier::new(webhook.clone()) {
            Ok(notifier) => push.push(Arc::new(notifier)),
            Err(e) => warn!("DingTalk disabled: {:#}", e),
        }
    }
    if let Some(url) = &config.discord_webhook {
        push.push(Arc::new(DiscordNotifier::new(url.clone())));
    }

    let mut full: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(email) = &config.email {
        match EmailNotifier::new(email) {
            Ok(notifier) => full.push(Arc::new(notifier)),
            Err(e) => warn!("Email disabled: {:#}", e),
        }
    }

    if push.is_empty() && full.is_empty() {
        warn!("no notification transports configured");
    }
    NotificationRouter::new(push, full, config.clone())
}
