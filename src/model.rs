use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Normalized title used as the dedup key.
pub type Identity = String;

/// What a candidate is, which decides how the oracle is prompted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    Paper,
    News,
    /// Sell-side research report.
    Report,
}

/// A document pulled from a source, not yet judged.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    /// Source label shown to readers, e.g. "ArXiv" or "Scholar".
    pub source: String,
    /// Publication date as `YYYY-MM-DD` when the provider knows it.
    pub published: String,
    pub abstract_text: String,
    /// Free-text attribution (institution, search engine, feed name).
    pub origin: String,
    pub kind: ContentKind,
}

/// Oracle verdict for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub score: f64,
    pub summary: String,
}

/// An accepted candidate as stored in the archive file.
///
/// Older archives wrote `broker` and `fetch_date`; both are still read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub date: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(alias = "broker", default)]
    pub origin: String,
    pub score: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(alias = "fetch_date", default)]
    pub fetch_date: String,
    #[serde(default)]
    pub id: String,
}

impl ScoredCandidate {
    /// Build the archive record for a candidate accepted on `run_date` as the
    /// `position`-th acceptance of the run.
    pub fn accept(
        candidate: Candidate,
        judgment: Judgment,
        run_date: NaiveDate,
        position: usize,
    ) -> Self {
        Self {
            title: candidate.title,
            url: candidate.url,
            source: candidate.source,
            date: candidate.published,
            abstract_text: candidate.abstract_text,
            origin: candidate.origin,
            score: judgment.score,
            summary: judgment.summary,
            fetch_date: run_date.format("%Y-%m-%d").to_string(),
            id: format!("{}_{}", run_date.format("%Y%m%d"), position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Candidate {
        Candidate {
            title: "Deep Factor Models".to_string(),
            url: "https://arxiv.org/pdf/2401.00001".to_string(),
            source: "ArXiv".to_string(),
            published: "2024-01-02".to_string(),
            abstract_text: "We study factors.".to_string(),
            origin: "Cornell Univ".to_string(),
            kind: ContentKind::Paper,
        }
    }

    #[test]
    fn test_accept_assigns_date_stamped_id() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let judgment = Judgment {
            score: 7.5,
            summary: "Useful".to_string(),
        };
        let scored = ScoredCandidate::accept(sample(), judgment, date, 3);
        assert_eq!(scored.id, "20240309_3");
        assert_eq!(scored.fetch_date, "2024-03-09");
        assert_eq!(scored.date, "2024-01-02");
        assert_eq!(scored.score, 7.5);
    }

    #[test]
    fn test_archive_record_field_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let judgment = Judgment {
            score: 6.0,
            summary: "ok".to_string(),
        };
        let scored = ScoredCandidate::accept(sample(), judgment, date, 0);
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["abstract"], "We study factors.");
        assert_eq!(json["origin"], "Cornell Univ");
        assert_eq!(json["fetchDate"], "2024-03-09");
        assert_eq!(json["id"], "20240309_0");
    }

    #[test]
    fn test_reads_legacy_archive_fields() {
        let legacy = r#"{
            "title": "Old report",
            "url": "http://x",
            "source": "ArXiv",
            "date": "2023-12-01",
            "abstract": "text",
            "broker": "Cornell Univ",
            "score": 8,
            "summary": "s",
            "fetch_date": "2023-12-02",
            "id": "20231202_0"
        }"#;
        let record: ScoredCandidate = serde_json::from_str(legacy).unwrap();
        assert_eq!(record.origin, "Cornell Univ");
        assert_eq!(record.fetch_date, "2023-12-02");
        assert_eq!(record.score, 8.0);
    }
}
