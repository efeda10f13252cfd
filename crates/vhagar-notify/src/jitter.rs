//! Load-spreading delay in front of a [`Notify`].
//!
//! Many hosts fire the same cron minute; the robot API rate-limits per key.
//! The delay is drawn once when the decorator is built, not per message.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::router::{Notify, SendSummary};

pub struct Jittered<N> {
    inner: N,
    delay: Duration,
}

impl<N: Notify> Jittered<N> {
    /// Wait exactly `delay` before each send.
    pub fn fixed(inner: N, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Draw the delay uniformly from `[0, max)`.
    pub fn random(inner: N, max: Duration) -> Self {
        let millis = max.as_millis() as u64;
        let delay = if millis == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..millis))
        };
        tracing::debug!("⏳ report jitter set to {:?}", delay);
        Self { inner, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

#[async_trait]
impl<N: Notify> Notify for Jittered<N> {
    async fn send(&self, content: &str, task: &str) -> SendSummary {
        if !self.delay.is_zero() {
            tracing::info!(task, "⏳ delaying report by {}s", self.delay.as_secs());
            tokio::time::sleep(self.delay).await;
        }
        self.inner.send(content, task).await
    }
}
