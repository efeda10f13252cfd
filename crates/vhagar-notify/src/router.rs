//! Recipient routing: decides which robot keys receive a task's report and
//! pushes the message to each of them independently.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use vhagar_core::config::NotifyConfig;
use vhagar_core::metrics::Metrics;

use crate::message::Message;
use crate::webhook::WebhookSink;

/// Anything a task can hand a rendered report to.
#[async_trait]
pub trait Notify: Send + Sync {
    /// Deliver `content` on behalf of `task`. Failures are logged, never returned.
    async fn send(&self, content: &str, task: &str) -> SendSummary;
}

/// Outcome of one send, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSummary {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Routes a report to per-task keys, falling back to the global keys.
pub struct Notifier {
    sink: Arc<dyn WebhookSink>,
    default_keys: Vec<String>,
    overrides: HashMap<String, Vec<String>>,
    metrics: Option<Arc<Metrics>>,
}

impl Notifier {
    pub fn new(
        sink: Arc<dyn WebhookSink>,
        default_keys: Vec<String>,
        overrides: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            sink,
            default_keys,
            overrides,
            metrics: None,
        }
    }

    pub fn from_config(sink: Arc<dyn WebhookSink>, config: &NotifyConfig) -> Self {
        Self::new(sink, config.robot_keys.clone(), config.notifiers.clone())
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Keys for `task`: its own entry when one exists, otherwise the global list.
    pub fn resolve_recipients(&self, task: &str) -> &[String] {
        self.overrides
            .get(task)
            .map(Vec::as_slice)
            .unwrap_or(&self.default_keys)
    }

    fn record(&self, delivered: bool) {
        if let Some(m) = &self.metrics {
            if delivered {
                Metrics::incr(&m.notify_delivered);
            } else {
                Metrics::incr(&m.notify_failed);
            }
        }
    }
}

#[async_trait]
impl Notify for Notifier {
    async fn send(&self, content: &str, task: &str) -> SendSummary {
        let keys = self.resolve_recipients(task);
        let mut summary = SendSummary::default();
        if keys.is_empty() {
            tracing::warn!(task, "no robot keys configured, report dropped");
            return summary;
        }

        let message = Message::markdown(content);
        for key in keys {
            summary.attempted += 1;
            match self.sink.post(key, &message).await {
                Ok(()) => {
                    summary.delivered += 1;
                    self.record(true);
                }
                Err(e) => {
                    summary.failed += 1;
                    self.record(false);
                    tracing::error!(task, key = %mask(key), error = %e, "❌ report delivery failed");
                }
            }
        }

        tracing::info!(
            task,
            delivered = summary.delivered,
            failed = summary.failed,
            "📣 report sent"
        );
        summary
    }
}

/// Robot keys are credentials; only their tail goes to the logs.
fn mask(key: &str) -> String {
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("***{tail}")
}
