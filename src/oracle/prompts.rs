use crate::model::{Candidate, ContentKind};

/// Abstracts are cut to this many characters before prompting.
pub const ABSTRACT_CHAR_LIMIT: usize = 800;

pub const SYSTEM_PROMPT: &str = "You are a portfolio manager at a quantitative fund. \
You rate research for how much practical value it has for building and running \
systematic strategies. You always answer with a single JSON object and nothing else.";

fn kind_label(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Paper => "academic paper",
        ContentKind::News => "market news item",
        ContentKind::Report => "broker research report",
    }
}

pub fn scoring_prompt(candidate: &Candidate) -> String {
    let excerpt: String = candidate
        .abstract_text
        .chars()
        .take(ABSTRACT_CHAR_LIMIT)
        .collect();
    format!(
        r#"Evaluate the following {kind}.

Title: {title}
From: {origin}
Abstract / content: {excerpt}

Reply strictly as JSON:
{{
    "score": <number from 0 to 10; 7 means useful in practice, 9 means must-read>,
    "summary": "<one sentence on the core strategy or innovation, at most 50 words>"
}}"#,
        kind = kind_label(candidate.kind),
        title = candidate.title,
        origin = candidate.origin,
        excerpt = excerpt,
    )
}
