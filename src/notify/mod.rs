pub mod dingtalk;
pub mod discord;
pub mod email;
pub mod format;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use crate::collab;
use crate::config::NotifyConfig;
use crate::model::ScoredCandidate;

const PUSH_TITLE: &str = "Quant Daily Digest";

/// A formatted message ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    /// Message title or email subject.
    pub title: String,
    /// Markdown for push transports, HTML for email.
    pub body: String,
}

/// A delivery channel. Failures are reported, never raised past the router.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, digest: &Digest) -> Result<()>;
}

/// What a run will send.
#[derive(Debug, Default)]
pub struct Plan {
    pub push: Option<Digest>,
    pub full: Option<Digest>,
}

#[derive(Debug, Default, PartialEq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Splits the accepted list into the push tier and the full digest and hands
/// each to its transports.
pub struct NotificationRouter {
    push: Vec<Arc<dyn Notifier>>,
    full: Vec<Arc<dyn Notifier>>,
    config: NotifyConfig,
}

impl NotificationRouter {
    pub fn new(
        push: Vec<Arc<dyn Notifier>>,
        full: Vec<Arc<dyn Notifier>>,
        config: NotifyConfig,
    ) -> Self {
        Self { push, full, config }
    }

    /// `accepted` must already be sorted by score, descending.
    pub fn plan(&self, accepted: &[ScoredCandidate], run_date: NaiveDate) -> Plan {
        let push_tier = format::push_tier(accepted, self.config.push_threshold, self.config.push_limit);
        let push = (!push_tier.is_empty()).then(|| Digest {
            title: PUSH_TITLE.to_string(),
            body: format::render_push(&push_tier, run_date),
        });

        let full_tier = format::full_tier(accepted, self.config.email_item_limit);
        let full = (!accepted.is_empty()).then(|| Digest {
            title: format!(
                "Quant digest ({}) - {} new",
                run_date.format("%Y-%m-%d"),
                accepted.len()
            ),
            body: format::render_full(&full_tier, run_date, self.config.highlight_score),
        });

        Plan { push, full }
    }

    pub async fn dispatch(&self, accepted: &[ScoredCandidate], run_date: NaiveDate) -> DispatchSummary {
        let plan = self.plan(accepted, run_date);
        self.send(&plan).await
    }

    /// Push digest to every push transport, full digest to every full one.
    pub async fn send(&self, plan: &Plan) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        match &plan.push {
            Some(digest) => deliver_all(&self.push, digest, &mut summary).await,
            None => info!("no push digest, skipping push tier"),
        }
        match &plan.full {
            Some(digest) => deliver_all(&self.full, digest, &mut summary).await,
            None => info!("no full digest, skipping full tier"),
        }

        info!(delivered = summary.delivered, failed = summary.failed, "notifications dispatched");
        summary
    }
}

async fn deliver_all(notifiers: &[Arc<dyn Notifier>], digest: &Digest, summary: &mut DispatchSummary) {
    for notifier in notifiers {
        let sent = collab::call_or(
            notifier.name(),
            async { notifier.deliver(digest).await.map(|_| true) },
            || false,
        )
        .await;
        if sent {
            info!(channel = notifier.name(), "digest delivered");
            summary.delivered += 1;
        } else {
            summary.failed += 1;
        }
    }
}
