//! Elasticsearch cluster health.

use async_trait::async_trait;
use comfy_table::{Cell, Table};
use serde::Deserialize;
use vhagar_core::config::EsConfig;
use vhagar_core::error::{Result, VhagarError};
use vhagar_notify::message::{self, FontColor};
use vhagar_task::{TaskContext, Tasker};

/// Subset of `GET /_cluster/health`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterHealth {
    pub cluster_name: String,
    pub status: String,
    #[serde(default)]
    pub number_of_nodes: u64,
    #[serde(default)]
    pub number_of_data_nodes: u64,
    #[serde(default)]
    pub active_shards: u64,
    #[serde(default)]
    pub unassigned_shards: u64,
    #[serde(default)]
    pub active_shards_percent_as_number: f64,
}

pub struct EsTask {
    config: EsConfig,
    client: reqwest::Client,
    health: Option<ClusterHealth>,
}

impl EsTask {
    pub fn new(config: EsConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            health: None,
        }
    }

    pub fn health(&self) -> Option<&ClusterHealth> {
        self.health.as_ref()
    }
}

#[async_trait]
impl Tasker for EsTask {
    async fn init(&mut self, _ctx: &TaskContext) -> Result<()> {
        if self.config.url.trim().is_empty() {
            return Err(VhagarError::Config("es.url is not set".into()));
        }
        Ok(())
    }

    async fn gather(&mut self, _ctx: &TaskContext) -> Result<()> {
        let url = format!("{}/_cluster/health", self.config.url.trim_end_matches('/'));
        let mut req = self.client.get(&url);
        if !self.config.username.is_empty() {
            req = req.basic_auth(&self.config.username, Some(&self.config.password));
        }
        let health: ClusterHealth = req.send().await?.error_for_status()?.json().await?;
        tracing::debug!(cluster = %health.cluster_name, status = %health.status, "es health collected");
        self.health = Some(health);
        Ok(())
    }

    async fn check(&self, ctx: &TaskContext) -> Result<()> {
        if !ctx.is_report() {
            ctx.output().write_line(&render_table(self.health.as_ref()).to_string());
            return Ok(());
        }
        match &self.health {
            Some(health) => {
                ctx.report(&render_report(health, &ctx.project)).await;
            }
            None => tracing::warn!("es: nothing gathered, no report sent"),
        }
        Ok(())
    }
}

pub fn render_table(health: Option<&ClusterHealth>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Cluster", "Status", "Nodes", "Data nodes", "Active shards", "Unassigned", "Active %"]);
    match health {
        Some(h) => {
            table.add_row(vec![
                Cell::new(&h.cluster_name),
                Cell::new(&h.status),
                Cell::new(h.number_of_nodes),
                Cell::new(h.number_of_data_nodes),
                Cell::new(h.active_shards),
                Cell::new(h.unassigned_shards),
                Cell::new(format!("{:.1}", h.active_shards_percent_as_number)),
            ]);
        }
        None => {
            table.add_row(vec!["-", "unavailable", "-", "-", "-", "-", "-"]);
        }
    }
    table
}

pub fn render_report(health: &ClusterHealth, project: &str) -> String {
    let color = match health.status.as_str() {
        "green" => FontColor::Info,
        "yellow" => FontColor::Comment,
        _ => FontColor::Warning,
    };
    let mut out = message::header("Elasticsearch inspection", project);
    out.push_str(&format!("> cluster: **{}**\n", health.cluster_name));
    out.push_str(&format!("> status: {}\n", message::font(color, &health.status)));
    out.push_str(&format!(
        "> nodes: {} (data {})\n",
        health.number_of_nodes, health.number_of_data_nodes
    ));
    out.push_str(&format!(
        "> shards: {} active, {} unassigned ({:.1}%)\n",
        health.active_shards, health.unassigned_shards, health.active_shards_percent_as_number
    ));
    if health.status == "red" {
        out.push('\n');
        out.push_str(message::mention_all());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{fixture, serve};
    use axum::routing::get;
    use axum::{Json, Router};
    use vhagar_core::config::HttpConfig;
    use vhagar_task::RunMode;

    fn sample(status: &str) -> ClusterHealth {
        ClusterHealth {
            cluster_name: "logs".into(),
            status: status.into(),
            number_of_nodes: 3,
            number_of_data_nodes: 3,
            active_shards: 120,
            unassigned_shards: 0,
            active_shards_percent_as_number: 100.0,
        }
    }

    fn client() -> reqwest::Client {
        vhagar_core::http::build_client(&HttpConfig::default(), None).unwrap()
    }

    async fn mock_es() -> String {
        let app = Router::new().route(
            "/_cluster/health",
            get(|| async {
                Json(serde_json::json!({
                    "cluster_name": "logs",
                    "status": "yellow",
                    "number_of_nodes": 2,
                    "number_of_data_nodes": 2,
                    "active_shards": 40,
                    "unassigned_shards": 4,
                    "active_shards_percent_as_number": 90.9,
                    "timed_out": false
                }))
            }),
        );
        serve(app).await
    }

    #[tokio::test]
    async fn test_init_requires_url() {
        let f = fixture("es", RunMode::Table);
        let mut task = EsTask::new(EsConfig::default(), client());
        assert!(matches!(task.init(&f.ctx).await, Err(VhagarError::Config(_))));
    }

    #[tokio::test]
    async fn test_gather_then_table() {
        let base = mock_es().await;
        let f = fixture("es", RunMode::Table);
        let mut task = EsTask::new(
            EsConfig {
                url: format!("{base}/"),
                ..Default::default()
            },
            client(),
        );

        task.init(&f.ctx).await.unwrap();
        task.gather(&f.ctx).await.unwrap();
        assert_eq!(task.health().unwrap().unassigned_shards, 4);

        task.check(&f.ctx).await.unwrap();
        let out = f.console.contents();
        assert!(out.contains("yellow"));
        assert!(out.contains("90.9"));
    }

    #[tokio::test]
    async fn test_gather_failure_renders_unavailable() {
        let f = fixture("es", RunMode::Table);
        let mut task = EsTask::new(
            EsConfig {
                url: "http://127.0.0.1:9".into(),
                ..Default::default()
            },
            client(),
        );
        assert!(task.gather(&f.ctx).await.is_err());
        task.check(&f.ctx).await.unwrap();
        assert!(f.console.contents().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_report_mode_sends_markdown() {
        let base = mock_es().await;
        let f = fixture("es", RunMode::Report);
        let mut task = EsTask::new(
            EsConfig {
                url: base,
                ..Default::default()
            },
            client(),
        );
        task.gather(&f.ctx).await.unwrap();
        task.check(&f.ctx).await.unwrap();

        let sent = f.inbox.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("<font color='comment'>yellow</font>"));
        assert!(sent[0].contains("test-project"));
    }

    #[tokio::test]
    async fn test_report_mode_without_data_sends_nothing() {
        let f = fixture("es", RunMode::Report);
        let task = EsTask::new(EsConfig::default(), client());
        task.check(&f.ctx).await.unwrap();
        assert!(f.inbox.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_red_report_mentions_everyone() {
        let report = render_report(&sample("red"), "prod");
        assert!(report.contains("<font color='warning'>red</font>"));
        assert!(report.contains("<@all>"));
        assert!(!render_report(&sample("green"), "prod").contains("<@all>"));
    }
}
