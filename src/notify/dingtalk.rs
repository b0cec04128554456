use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{Digest, Notifier};

/// DingTalk custom robot webhook.
pub struct DingTalkNotifier {
    client: reqwest::Client,
    webhook: String,
}

impl DingTalkNotifier {
    pub fn new(webhook: String) -> Result<Self> {
        Ok(Self {
            client: crate::sources::http_client(30)?,
            webhook,
        })
    }
}

fn payload(digest: &Digest) -> Value {
    serde_json::json!({
        "msgtype": "markdown",
        "markdown": {
            "title": digest.title,
            "text": digest.body,
        }
    })
}

/// DingTalk answers 200 even for rejected messages; `errcode` tells.
fn check_reply(reply: &Value) -> Result<()> {
    let code = reply["errcode"].as_i64().unwrap_or(0);
    if code != 0 {
        let message = reply["errmsg"].as_str().unwrap_or("unknown error");
        bail!("DingTalk rejected message: {} (errcode {})", message, code);
    }
    Ok(())
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    fn name(&self) -> &str {
        "dingtalk"
    }

    async fn deliver(&self, digest: &Digest) -> Result<()> {
        let reply: Value = self
            .client
            .post(&self.webhook)
            .json(&payload(digest))
            .send()
            .await
            .context("DingTalk request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse DingTalk reply")?;
        check_reply(&reply)
    }
}
