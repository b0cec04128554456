use std::str::FromStr;

use crate::model::Identity;

/// How aggressively titles are canonicalized before dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Surrounding whitespace only. Titles differing in case or punctuation
    /// are distinct identities.
    #[default]
    Trim,
    /// Lowercase, punctuation stripped, inner whitespace collapsed.
    Folded,
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trim" => Ok(Strictness::Trim),
            "folded" | "fold" => Ok(Strictness::Folded),
            other => Err(format!("expected `trim` or `folded`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    strictness: Strictness,
}

impl Normalizer {
    pub fn new(strictness: Strictness) -> Self {
        Self { strictness }
    }

    /// Canonical identity for a title, or `None` when nothing usable remains.
    pub fn identity(&self, title: &str) -> Option<Identity> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return None;
        }

        match self.strictness {
            Strictness::Trim => Some(trimmed.to_string()),
            Strictness::Folded => {
                let folded: String = trimmed
                    .chars()
                    .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                    .flat_map(char::to_lowercase)
                    .collect();
                let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
                (!collapsed.is_empty()).then_some(collapsed)
            }
        }
    }
}
