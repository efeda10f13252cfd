//! Nacos service registry: healthy vs. unhealthy instances per service.

use async_trait::async_trait;
use comfy_table::Table;
use serde::Deserialize;
use vhagar_core::config::NacosConfig;
use vhagar_core::error::{Result, VhagarError};
use vhagar_notify::message::{self, FontColor};
use vhagar_task::{TaskContext, Tasker};

#[derive(Debug, Deserialize)]
struct ServiceList {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    doms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceList {
    #[serde(default)]
    hosts: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
struct Instance {
    ip: String,
    port: u16,
    #[serde(default)]
    healthy: bool,
    #[serde(default = "enabled_default")]
    enabled: bool,
}

fn enabled_default() -> bool { true }

/// Per-service tally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceHealth {
    pub name: String,
    pub healthy: usize,
    /// `ip:port` of every instance that is disabled or failing its checks.
    pub down: Vec<String>,
    /// Set when the instance list could not be fetched.
    pub error: Option<String>,
}

impl ServiceHealth {
    pub fn is_degraded(&self) -> bool {
        !self.down.is_empty() || self.error.is_some()
    }
}

pub struct NacosTask {
    config: NacosConfig,
    client: reqwest::Client,
    services: Vec<ServiceHealth>,
    gathered: bool,
}

impl NacosTask {
    pub fn new(config: NacosConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            services: Vec::new(),
            gathered: false,
        }
    }

    pub fn services(&self) -> &[ServiceHealth] {
        &self.services
    }

    fn base(&self) -> &str {
        self.config.server.trim_end_matches('/')
    }

    /// Every service name in the namespace, walking `pageNo` until `count` is reached.
    async fn list_services(&self) -> Result<Vec<String>> {
        let page_size = self.config.page_size.max(1);
        let mut names = Vec::new();
        let mut page_no: u32 = 1;
        loop {
            let page = self.list_services_page(page_no, page_size).await?;
            let fetched = page.doms.len();
            names.extend(page.doms);
            if fetched == 0 || names.len() >= page.count || fetched < page_size as usize {
                if names.len() < page.count {
                    tracing::warn!("⚠️ nacos: listed {} of {} services", names.len(), page.count);
                }
                break;
            }
            page_no += 1;
        }
        Ok(names)
    }

    async fn list_services_page(&self, page_no: u32, page_size: u32) -> Result<ServiceList> {
        let page_no = page_no.to_string();
        let page_size = page_size.to_string();
        let list = self
            .client
            .get(format!("{}/nacos/v1/ns/service/list", self.base()))
            .query(&[
                ("pageNo", page_no.as_str()),
                ("pageSize", page_size.as_str()),
                ("namespaceId", self.config.namespace.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list)
    }

    async fn list_instances(&self, service: &str) -> Result<InstanceList> {
        let list = self
            .client
            .get(format!("{}/nacos/v1/ns/instance/list", self.base()))
            .query(&[("serviceName", service), ("namespaceId", self.config.namespace.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list)
    }

    async fn service_health(&self, service: &str) -> ServiceHealth {
        let mut health = ServiceHealth {
            name: service.to_string(),
            ..Default::default()
        };
        match self.list_instances(service).await {
            Ok(list) => {
                for inst in list.hosts {
                    if inst.healthy && inst.enabled {
                        health.healthy += 1;
                    } else {
                        health.down.push(format!("{}:{}", inst.ip, inst.port));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(service, error = %e, "nacos: instance list failed");
                health.error = Some(e.to_string());
            }
        }
        health
    }
}

#[async_trait]
impl Tasker for NacosTask {
    async fn init(&mut self, _ctx: &TaskContext) -> Result<()> {
        if self.config.server.trim().is_empty() {
            return Err(VhagarError::Config("nacos.server is not set".into()));
        }
        Ok(())
    }

    async fn gather(&mut self, _ctx: &TaskContext) -> Result<()> {
        self.gathered = false;
        let names = self.list_services().await?;
        let mut services = Vec::with_capacity(names.len());
        for name in &names {
            services.push(self.service_health(name).await);
        }
        services.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!("nacos: {} services collected", services.len());
        self.services = services;
        self.gathered = true;
        Ok(())
    }

    async fn check(&self, ctx: &TaskContext) -> Result<()> {
        if !ctx.is_report() {
            ctx.output().write_line(&render_table(&self.services).to_string());
            return Ok(());
        }
        if !self.gathered {
            tracing::warn!("nacos: nothing gathered, no report sent");
            return Ok(());
        }
        match render_report(&self.services, &ctx.project) {
            Some(report) => {
                ctx.report(&report).await;
            }
            None => tracing::info!("nacos: all services healthy, no report"),
        }
        Ok(())
    }
}

pub fn render_table(services: &[ServiceHealth]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Service", "Healthy", "Unhealthy", "Down instances"]);
    if services.is_empty() {
        table.add_row(vec!["-", "-", "-", "no data"]);
    }
    for s in services {
        let detail = match &s.error {
            Some(e) => format!("error: {e}"),
            None => s.down.join(", "),
        };
        table.add_row(vec![
            s.name.clone(),
            s.healthy.to_string(),
            s.down.len().to_string(),
            detail,
        ]);
    }
    table
}

/// Markdown listing degraded services, or `None` when everything is healthy.
pub fn render_report(services: &[ServiceHealth], project: &str) -> Option<String> {
    let degraded: Vec<&ServiceHealth> = services.iter().filter(|s| s.is_degraded()).collect();
    if degraded.is_empty() {
        return None;
    }
    let mut out = message::header("Nacos inspection", project);
    out.push_str(&format!(
        "> {} of {} services degraded\n\n",
        message::font(FontColor::Warning, &degraded.len().to_string()),
        services.len()
    ));
    for s in degraded {
        match &s.error {
            Some(e) => out.push_str(&format!("- **{}**: {}\n", s.name, message::font(FontColor::Comment, e))),
            None => out.push_str(&format!(
                "- **{}**: {} healthy, down {}\n",
                s.name,
                s.healthy,
                message::font(FontColor::Warning, &s.down.join(", "))
            )),
        }
    }
    Some(out)
}
