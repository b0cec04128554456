//! In-memory fakes for the collaborator traits (tests only).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::briefing::Composer;
use crate::model::{Candidate, ContentKind, Judgment};
use crate::notify::{Digest, Notifier};
use crate::oracle::Scorer;
use crate::sources::{FetchRequest, Source};

pub fn candidate(title: &str) -> Candidate {
    Candidate {
        title: title.to_string(),
        url: format!("https://example.com/{}", title.replace(' ', "-")),
        source: "Test".to_string(),
        published: "2024-01-01".to_string(),
        abstract_text: format!("abstract of {}", title),
        origin: "Test".to_string(),
        kind: ContentKind::Paper,
    }
}

pub fn candidates(titles: &[&str]) -> Vec<Candidate> {
    titles.iter().map(|t| candidate(t)).collect()
}

/// Returns a fixed candidate list and records each request it receives.
pub struct FakeSource {
    name: String,
    items: Vec<Candidate>,
    fail: bool,
    honor_seen: bool,
    requests: Mutex<Vec<(usize, usize)>>,
}

impl FakeSource {
    pub fn new(name: &str, items: Vec<Candidate>) -> Self {
        Self {
            name: name.to_string(),
            items,
            fail: false,
            honor_seen: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Filter through `request.seen` and stop at `request.target`, like a
    /// deep-scanning source would.
    pub fn honoring_seen(mut self) -> Self {
        self.honor_seen = true;
        self
    }

    /// `(target, max_depth)` of every fetch.
    pub fn requests(&self) -> Vec<(usize, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Source for FakeSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<Vec<Candidate>> {
        self.requests
            .lock()
            .unwrap()
            .push((request.target, request.max_depth));
        if self.fail {
            bail!("{} is down", self.name);
        }
        if !self.honor_seen {
            return Ok(self.items.clone());
        }
        Ok(self
            .items
            .iter()
            .filter(|c| !request.is_seen(&c.title))
            .take(request.target)
            .cloned()
            .collect())
    }
}

/// Scores by title lookup with a default, recording every title judged.
pub struct FakeScorer {
    default_score: f64,
    scores: HashMap<String, f64>,
    failures: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeScorer {
    pub fn new(default_score: f64) -> Self {
        Self {
            default_score,
            scores: HashMap::new(),
            failures: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_score(mut self, title: &str, score: f64) -> Self {
        self.scores.insert(title.to_string(), score);
        self
    }

    pub fn failing_on(mut self, title: &str) -> Self {
        self.failures.insert(title.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scorer for FakeScorer {
    async fn judge(&self, candidate: &Candidate) -> Result<Judgment> {
        self.calls.lock().unwrap().push(candidate.title.clone());
        if self.failures.contains(&candidate.title) {
            bail!("oracle timed out");
        }
        let score = self
            .scores
            .get(&candidate.title)
            .copied()
            .unwrap_or(self.default_score);
        Ok(Judgment {
            score,
            summary: format!("summary of {}", candidate.title),
        })
    }
}

/// Records every digest handed to it; optionally fails after recording.
pub struct RecordingNotifier {
    name: String,
    fail: bool,
    delivered: Mutex<Vec<Digest>>,
}

impl RecordingNotifier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn delivered(&self) -> Vec<Digest> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, digest: &Digest) -> Result<()> {
        self.delivered.lock().unwrap().push(digest.clone());
        if self.fail {
            bail!("{} rejected the message", self.name);
        }
        Ok(())
    }
}

/// Returns a fixed reply (or fails) and records every prompt.
pub struct FakeComposer {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeComposer {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Composer for FakeComposer {
    async fn compose(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => bail!("LLM timed out"),
        }
    }
}
