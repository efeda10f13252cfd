//! Webhook delivery: POSTs one markdown message to one robot key.

use async_trait::async_trait;
use serde::Deserialize;
use vhagar_core::config::{HttpConfig, NotifyConfig};
use vhagar_core::error::{Result, VhagarError};

use crate::message::Message;

/// Destination for a single report.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    /// Deliver `message` to the channel identified by `key`.
    async fn post(&self, key: &str, message: &Message) -> Result<()>;
}

/// WeChat-Work group robot webhook.
pub struct WecomWebhook {
    base: String,
    client: reqwest::Client,
}

/// Body returned by the robot API.
#[derive(Debug, Deserialize)]
struct WecomReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl WecomWebhook {
    pub fn new(base: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base: base.into(),
            client,
        }
    }

    /// Build from config, routing through the configured proxy if any.
    pub fn from_config(notify: &NotifyConfig, http: &HttpConfig) -> Result<Self> {
        let client = vhagar_core::http::build_client(http, notify.proxy.as_deref())?;
        Ok(Self::new(notify.webhook_base.clone(), client))
    }

    fn url(&self, key: &str) -> String {
        format!("{}{}", self.base, key)
    }
}

#[async_trait]
impl WebhookSink for WecomWebhook {
    async fn post(&self, key: &str, message: &Message) -> Result<()> {
        let resp = self
            .client
            .post(self.url(key))
            .json(message)
            .send()
            .await
            .map_err(|e| VhagarError::Notify(format!("webhook send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(VhagarError::Notify(format!("webhook error {status}")));
        }

        // The robot API answers 200 even for rejected keys; the verdict is in the body.
        let body = resp
            .text()
            .await
            .map_err(|e| VhagarError::Notify(format!("webhook reply unreadable: {e}")))?;
        if let Ok(reply) = serde_json::from_str::<WecomReply>(&body) {
            if reply.errcode != 0 {
                return Err(VhagarError::Notify(format!(
                    "webhook rejected: errcode={} errmsg={}",
                    reply.errcode, reply.errmsg
                )));
            }
        }
        tracing::debug!(status = %status, "webhook accepted");
        Ok(())
    }
}
