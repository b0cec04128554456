use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::collab;
use crate::config::CurationConfig;
use crate::identity::Normalizer;
use crate::model::{Identity, ScoredCandidate};
use crate::oracle::OracleClient;
use crate::sources::{FetchRequest, Source};
use crate::store::archive;
use crate::store::ledger::SeenLedger;

/// Outcome of one curation pass.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Accepted candidates, score descending, ties in encounter order.
    pub accepted: Vec<ScoredCandidate>,
    /// Identities sent to the oracle this run, in order, accepted or not.
    pub analyzed: Vec<Identity>,
    /// Candidates dropped because the ledger or this run had already seen them.
    pub skipped_seen: usize,
    /// Candidates dropped for lacking a usable title.
    pub skipped_malformed: usize,
    /// Raw candidate count returned by each source consulted, in order.
    pub fetched: Vec<(String, usize)>,
}

impl RunReport {
    /// Fold this run into the persisted state: the analyzed batch is prepended
    /// to the ledger, the accepted list to the archive. Returns the new archive.
    pub fn apply(
        &self,
        ledger: &mut SeenLedger,
        existing_archive: Vec<ScoredCandidate>,
        max_report_size: usize,
    ) -> Vec<ScoredCandidate> {
        ledger.record_batch(self.analyzed.clone());
        archive::merge_and_truncate(self.accepted.clone(), existing_archive, max_report_size)
    }
}

/// Pulls from sources in priority order, scores each unseen candidate once,
/// and accepts until the quota is met.
pub struct CurationEngine {
    sources: Vec<Arc<dyn Source>>,
    oracle: OracleClient,
    normalizer: Normalizer,
    config: CurationConfig,
}

impl CurationEngine {
    pub fn new(
        sources: Vec<Arc<dyn Source>>,
        oracle: OracleClient,
        normalizer: Normalizer,
        config: CurationConfig,
    ) -> Self {
        Self {
            sources,
            oracle,
            normalizer,
            config,
        }
    }

    fn is_seen(&self, title: &str, ledger: &SeenLedger, this_run: &HashSet<Identity>) -> bool {
        self.normalizer
            .identity(title)
            .is_some_and(|id| ledger.contains(&id) || this_run.contains(&id))
    }

    pub async fn run(&self, ledger: &SeenLedger, run_date: NaiveDate) -> RunReport {
        let quota = self.config.final_save_count;
        let mut report = RunReport::default();
        let mut this_run: HashSet<Identity> = HashSet::new();

        for source in &self.sources {
            if report.accepted.len() >= quota {
                break;
            }
            let name = source.name().to_string();
            info!(source = %name, accepted = report.accepted.len(), quota, "consulting source");

            let candidates = {
                let seen = |title: &str| self.is_seen(title, ledger, &this_run);
                let request = FetchRequest {
                    target: self.config.candidate_pool_size,
                    max_depth: self.config.max_search_depth,
                    seen: &seen,
                };
                collab::call_or(&name, source.fetch(request), Vec::new).await
            };
            report.fetched.push((name.clone(), candidates.len()));
            if candidates.is_empty() {
                info!(source = %name, "source returned nothing");
                continue;
            }

            for candidate in candidates {
                if report.accepted.len() >= quota {
                    break;
                }

                let Some(identity) = self.normalizer.identity(&candidate.title) else {
                    report.skipped_malformed += 1;
                    warn!(source = %name, url = %candidate.url, "skipping candidate without a usable title");
                    continue;
                };
                if ledger.contains(&identity) || this_run.contains(&identity) {
                    report.skipped_seen += 1;
                    debug!(source = %name, identity = %identity, "already seen, skipping");
                    continue;
                }

                let judgment = self.oracle.score(&candidate).await;
                this_run.insert(identity.clone());
                report.analyzed.push(identity);

                if judgment.score >= self.config.min_score {
                    let position = report.accepted.len();
                    info!(
                        source = %name,
                        score = judgment.score,
                        title = %candidate.title,
                        "accepted"
                    );
                    report
                        .accepted
                        .push(ScoredCandidate::accept(candidate, judgment, run_date, position));
                } else {
                    debug!(source = %name, score = judgment.score, title = %candidate.title, "rejected");
                }
            }
        }

        // Stable: equal scores keep encounter order.
        report.accepted.sort_by(|a, b| b.score.total_cmp(&a.score));

        info!(
            accepted = report.accepted.len(),
            analyzed = report.analyzed.len(),
            skipped_seen = report.skipped_seen,
            skipped_malformed = report.skipped_malformed,
            "curation pass finished"
        );
        report
    }
}
