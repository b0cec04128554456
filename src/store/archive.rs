use crate::identity::Normalizer;
use crate::model::{Identity, ScoredCandidate};

/// `new_items ++ existing`, cut to `max_len`. The oldest entries fall off.
pub fn merge_and_truncate(
    new_items: Vec<ScoredCandidate>,
    existing: Vec<ScoredCandidate>,
    max_len: usize,
) -> Vec<ScoredCandidate> {
    let mut merged = new_items;
    merged.extend(existing);
    merged.truncate(max_len);
    merged
}

/// Identities of archived records in archive order, skipping blank titles.
pub fn identities(archive: &[ScoredCandidate], normalizer: &Normalizer) -> Vec<Identity> {
    archive
        .iter()
        .filter_map(|record| normalizer.identity(&record.title))
        .collect()
}
