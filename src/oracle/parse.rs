use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;

use crate::model::Judgment;

/// Parse the oracle's reply into a judgment.
///
/// Accepts a bare JSON object, one wrapped in a ```json fence, or one embedded
/// in surrounding prose. `score` may be a number or a numeric string and is
/// clamped to [0, 10].
pub fn parse_judgment(reply: &str) -> Result<Judgment> {
    let object = extract_object(reply).ok_or_else(|| anyhow!("no JSON object in oracle reply"))?;
    let json: Value = serde_json::from_str(object).context("Failed to parse oracle JSON")?;

    let score = match &json["score"] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| anyhow!("oracle reply has no numeric score"))?;
    if !score.is_finite() {
        bail!("oracle score is not finite");
    }

    let summary = json["summary"].as_str().unwrap_or("").trim().to_string();

    Ok(Judgment {
        score: score.clamp(0.0, 10.0),
        summary,
    })
}

/// Outermost `{ ... }` span, after stripping a code fence if present.
fn extract_object(reply: &str) -> Option<&str> {
    let body = strip_fence(reply).unwrap_or(reply);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

fn strip_fence(reply: &str) -> Option<&str> {
    let start = reply.find("```")?;
    let after = &reply[start + 3..];
    // Skip the language tag line, e.g. ```json
    let newline = after.find('\n')?;
    let after = &after[newline + 1..];
    let end = after.find("```")?;
    Some(after[..end].trim())
}
