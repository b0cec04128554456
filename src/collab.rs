//! Calls into external collaborators (sources, the scoring oracle, transports)
//! never fail the run. Every such call goes through [`call_or`], which logs the
//! fault and substitutes a fallback value.

use std::future::Future;

use tracing::warn;

/// Await a collaborator call, replacing any error with `fallback()`.
pub async fn call_or<T, F, D>(collaborator: &str, call: F, fallback: D) -> T
where
    F: Future<Output = anyhow::Result<T>>,
    D: FnOnce() -> T,
{
    match call.await {
        Ok(value) => value,
        Err(e) => {
            warn!(collaborator, error = %format!("{:#}", e), "collaborator call failed, using fallback");
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_success() {
        let value = call_or("ok", async { Ok(7) }, || 0).await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_substitutes_fallback_on_error() {
        let value: Vec<u8> = call_or(
            "broken",
            async { Err(anyhow::anyhow!("connection reset")) },
            Vec::new,
        )
        .await;
        assert!(value.is_empty());
    }
}
