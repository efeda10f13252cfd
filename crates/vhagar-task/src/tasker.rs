//! The task contract every inspection plugs in through.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use vhagar_core::error::Result;
use vhagar_notify::{Notify, SendSummary};

use crate::output::Output;

/// How `check` should present its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Render tables to the output multiplexer.
    Table,
    /// Build a markdown report and hand it to the notifier.
    Report,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Table => write!(f, "table"),
            RunMode::Report => write!(f, "report"),
        }
    }
}

/// Everything a task may touch besides its own backend.
#[derive(Clone)]
pub struct TaskContext {
    /// Registered name of the running task; also the routing key for reports.
    pub task: String,
    pub mode: RunMode,
    /// Project label for report headers.
    pub project: String,
    output: Arc<Output>,
    notifier: Arc<dyn Notify>,
}

impl TaskContext {
    pub fn new(
        task: impl Into<String>,
        mode: RunMode,
        project: impl Into<String>,
        output: Arc<Output>,
        notifier: Arc<dyn Notify>,
    ) -> Self {
        Self {
            task: task.into(),
            mode,
            project: project.into(),
            output,
            notifier,
        }
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn is_report(&self) -> bool {
        self.mode == RunMode::Report
    }

    /// Send `content` as this task's report.
    pub async fn report(&self, content: &str) -> SendSummary {
        self.notifier.send(content, &self.task).await
    }
}

/// A pluggable inspection.
///
/// The dispatcher drives one instance through `init` → `gather` → `check`.
/// `check` runs even when `gather` failed, so implementations must render
/// whatever partial state they hold.
#[async_trait]
pub trait Tasker: Send {
    /// Pre-flight validation. An error here skips `gather` and `check`.
    async fn init(&mut self, _ctx: &TaskContext) -> Result<()> {
        Ok(())
    }

    /// Collect data from the backend into `self`.
    async fn gather(&mut self, ctx: &TaskContext) -> Result<()>;

    /// Render or report what `gather` collected.
    async fn check(&self, ctx: &TaskContext) -> Result<()>;
}
