//! Vhagar configuration system.
//!
//! A single TOML file drives everything: which jobs run on cron, where reports
//! go, and how to reach each inspected backend. Every section falls back to
//! its defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{Result, VhagarError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VhagarConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Named cron jobs, keyed by task name.
    #[serde(default)]
    pub cron: BTreeMap<String, CronJobConfig>,
    #[serde(default)]
    pub metric: MetricConfig,
    #[serde(default)]
    pub es: EsConfig,
    #[serde(default)]
    pub nacos: NacosConfig,
}

impl VhagarConfig {
    /// Default config file name, resolved against the working directory.
    pub const DEFAULT_PATH: &'static str = "vhagar.toml";

    /// Load config from `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VhagarError::Config(format!("Failed to read config: {e}")))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text and validate it.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| VhagarError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no task could run with.
    pub fn validate(&self) -> Result<()> {
        if self.notify.webhook_base.trim().is_empty() {
            return Err(VhagarError::Config("notify.webhook_base must not be empty".into()));
        }
        if self.http.timeout_secs == 0 {
            return Err(VhagarError::Config("http.timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// Settings shared by every task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Project label shown in report headers.
    #[serde(default = "default_project")]
    pub project: String,
    /// File that receives a copy of all table output.
    #[serde(default = "default_output_file")]
    pub output_file: String,
}

fn default_project() -> String { "vhagar".into() }
fn default_output_file() -> String { "vhagar_output.log".into() }

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            output_file: default_output_file(),
        }
    }
}

/// Outbound HTTP settings, applied uniformly to every collaborator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 { 10 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout() }
    }
}

/// Webhook report routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Base URL; the robot key is appended verbatim.
    #[serde(default = "default_webhook_base")]
    pub webhook_base: String,
    /// Global default robot keys.
    #[serde(default)]
    pub robot_keys: Vec<String>,
    /// Optional HTTP/SOCKS proxy for webhook delivery.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Per-task robot key overrides.
    #[serde(default)]
    pub notifiers: HashMap<String, Vec<String>>,
    /// Upper bound of the pre-send jitter, in seconds.
    #[serde(default = "default_jitter_max")]
    pub jitter_max_secs: u64,
}

fn default_webhook_base() -> String {
    "https://qyapi.weixin.qq.com/cgi-bin/webhook/send?key=".into()
}
fn default_jitter_max() -> u64 { 300 }

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_base: default_webhook_base(),
            robot_keys: Vec::new(),
            proxy: None,
            notifiers: HashMap::new(),
            jitter_max_secs: default_jitter_max(),
        }
    }
}

/// One `[cron.<name>]` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CronJobConfig {
    /// Whether the job is scheduled at all.
    #[serde(default)]
    pub crontab: bool,
    /// Cron expression (5-field, or 6/7-field with seconds).
    #[serde(default)]
    pub scheducron: String,
}

/// Metrics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metric_port")]
    pub port: u16,
}

fn default_metric_port() -> u16 { 9091 }

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metric_port(),
        }
    }
}

/// Elasticsearch cluster to inspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EsConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Nacos registry to inspect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NacosConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 { 500 }

impl Default for NacosConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            namespace: String::new(),
            page_size: default_page_size(),
        }
    }
}
