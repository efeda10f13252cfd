//! Shared outbound HTTP client.
//!
//! Every collaborator call (backend probes, webhook delivery) goes through a
//! client built here so they all carry the same timeout.

use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::{Result, VhagarError};

/// Build a client with the configured timeout and an optional proxy.
pub fn build_client(http: &HttpConfig, proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .user_agent(concat!("vhagar/", env!("CARGO_PKG_VERSION")));

    if let Some(url) = proxy.filter(|p| !p.is_empty()) {
        let proxy = reqwest::Proxy::all(url)
            .map_err(|e| VhagarError::Config(format!("invalid proxy '{url}': {e}")))?;
        builder = builder.proxy(proxy);
        tracing::debug!("🌐 HTTP client routed through proxy {url}");
    }

    builder
        .build()
        .map_err(|e| VhagarError::Http(format!("failed to build client: {e}")))
}
