use std::fmt::Write;

use chrono::NaiveDate;

use crate::model::ScoredCandidate;

/// The slice of the accepted list routed to one channel.
#[derive(Debug)]
pub struct Tier<'a> {
    pub items: Vec<&'a ScoredCandidate>,
    /// Eligible items cut by the channel's size cap.
    pub omitted: usize,
}

impl Tier<'_> {
    /// Nothing to show and nothing cut.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.omitted == 0
    }
}

/// Items at or above `threshold`, capped at `limit`.
pub fn push_tier(accepted: &[ScoredCandidate], threshold: f64, limit: usize) -> Tier<'_> {
    let eligible: Vec<&ScoredCandidate> = accepted.iter().filter(|r| r.score >= threshold).collect();
    cap(eligible, limit)
}

/// Every accepted item, capped at `limit`.
pub fn full_tier(accepted: &[ScoredCandidate], limit: usize) -> Tier<'_> {
    cap(accepted.iter().collect(), limit)
}

fn cap(mut items: Vec<&ScoredCandidate>, limit: usize) -> Tier<'_> {
    let omitted = items.len().saturating_sub(limit);
    items.truncate(limit);
    Tier { items, omitted }
}

/// Compact markdown digest for chat webhooks.
pub fn render_push(tier: &Tier<'_>, run_date: NaiveDate) -> String {
    let mut md = format!("# Quant digest {}\n\n", run_date.format("%Y-%m-%d"));
    for r in &tier.items {
        let _ = writeln!(md, "### {}", r.title);
        let _ = writeln!(md, "**{} pts** | {} | {}", r.score, r.source, r.origin);
        let _ = writeln!(md, "> {}", r.summary);
        let _ = writeln!(md, "[Read]({})\n\n---", r.url);
    }
    if tier.omitted > 0 {
        let _ = writeln!(md, "\n_{} more in the full digest._", tier.omitted);
    }
    md
}

/// Detailed HTML digest for email.
pub fn render_full(tier: &Tier<'_>, run_date: NaiveDate, highlight_score: f64) -> String {
    let mut html = format!(
        "<h2>Quant digest {}</h2><hr>",
        run_date.format("%Y-%m-%d")
    );
    for r in &tier.items {
        let color = if r.score >= highlight_score { "red" } else { "black" };
        let _ = write!(
            html,
            "<div style='margin-bottom:15px; padding:10px; border-left:4px solid #1890ff; background:#f5f5f5'>\
             <h3 style='margin:0'><a href='{url}'>{title}</a> <span style='color:{color}'>({score} pts)</span></h3>\
             <p style='margin:5px 0; font-size:12px; color:#666'>{source} | {origin} | {date}</p>\
             <p style='margin:5px 0'><strong>Summary:</strong> {summary}</p>\
             </div>",
            url = escape_html(&r.url),
            title = escape_html(&r.title),
            color = color,
            score = r.score,
            source = escape_html(&r.source),
            origin = escape_html(&r.origin),
            date = escape_html(&r.fetch_date),
            summary = escape_html(&r.summary),
        );
    }
    if tier.omitted > 0 {
        let _ = write!(
            html,
            "<p><em>{} more items omitted from this email.</em></p>",
            tier.omitted
        );
    }
    html
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            title: title.to_string(),
            url: format!("https://example.com/{}", title),
            source: "ArXiv".to_string(),
            date: "2024-05-30".to_string(),
            abstract_text: String::new(),
            origin: "Cornell Univ".to_string(),
            score,
            summary: format!("why {} matters", title),
            fetch_date: "2024-06-01".to_string(),
            id: String::new(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    /// 8 items at 9.0, then 12 at 5.5; already score-descending.
    fn accepted() -> Vec<ScoredCandidate> {
        let mut items: Vec<ScoredCandidate> = (0..8).map(|i| record(&format!("hi{}", i), 9.0)).collect();
        items.extend((0..12).map(|i| record(&format!("lo{}", i), 5.5)));
        items
    }

    #[test]
    fn test_push_tier_filters_and_caps() {
        let all = accepted();
        let tier = push_tier(&all, 6.0, 5);
        assert_eq!(tier.items.len(), 5);
        assert_eq!(tier.omitted, 3);
        assert!(tier.items.iter().all(|r| r.score >= 6.0));
        assert_eq!(tier.items[0].title, "hi0");
    }

    #[test]
    fn test_push_tier_empty_when_nothing_qualifies() {
        let all = vec![record("a", 5.0)];
        assert!(push_tier(&all, 6.0, 5).is_empty());
    }

    #[test]
    fn test_full_tier_caps() {
        let all = accepted();
        let tier = full_tier(&all, 15);
        assert_eq!(tier.items.len(), 15);
        assert_eq!(tier.omitted, 5);
        let tier = full_tier(&all, 50);
        assert_eq!(tier.items.len(), 20);
        assert_eq!(tier.omitted, 0);
    }

    #[test]
    fn test_render_push_with_notice() {
        let all = accepted();
        let md = render_push(&push_tier(&all, 6.0, 5), date());
        assert!(md.starts_with("# Quant digest 2024-06-01"));
        assert_eq!(md.matches("### ").count(), 5);
        assert!(md.contains("**9 pts** | ArXiv | Cornell Univ"));
        assert!(md.contains("[Read](https://example.com/hi0)"));
        assert!(md.contains("3 more in the full digest"));
    }

    #[test]
    fn test_render_push_without_notice() {
        let all = vec![record("only", 7.0)];
        let md = render_push(&push_tier(&all, 6.0, 5), date());
        assert!(!md.contains("more in the full digest"));
    }

    #[test]
    fn test_render_full_highlights_and_escapes() {
        let all = vec![record("A<B", 8.5), record("plain", 6.0)];
        let html = render_full(&full_tier(&all, 1), date(), 8.0);
        assert!(html.contains("A&lt;B"));
        assert!(html.contains("color:red"));
        assert!(!html.contains("plain"));
        assert!(html.contains("1 more items omitted"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
