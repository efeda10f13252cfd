//! Dispatcher: runs one task through its lifecycle.
//!
//! Failures stay inside the run: they are logged, counted and recorded in the
//! [`RunOutcome`], so a batch of N tasks always makes N attempts.

use std::fmt;
use std::sync::Arc;

use vhagar_core::error::Result;
use vhagar_core::metrics::Metrics;
use vhagar_notify::Notify;

use crate::output::Output;
use crate::registry::Registry;
use crate::tasker::{RunMode, TaskContext};

/// Result of a single lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseResult {
    Ok,
    Failed(String),
    /// Not attempted because an earlier phase aborted the run.
    Skipped,
}

impl PhaseResult {
    fn from_result(r: Result<()>) -> Self {
        match r {
            Ok(()) => PhaseResult::Ok,
            Err(e) => PhaseResult::Failed(e.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PhaseResult::Failed(_))
    }
}

impl fmt::Display for PhaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseResult::Ok => write!(f, "ok"),
            PhaseResult::Failed(e) => write!(f, "failed: {e}"),
            PhaseResult::Skipped => write!(f, "skipped"),
        }
    }
}

/// What happened during one `Dispatcher::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub name: String,
    pub init: PhaseResult,
    pub gather: PhaseResult,
    pub check: PhaseResult,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.init == PhaseResult::Ok && self.gather == PhaseResult::Ok && self.check == PhaseResult::Ok
    }
}

/// Resolves task names and drives each instance through init → gather → check.
pub struct Dispatcher {
    registry: Arc<Registry>,
    output: Arc<Output>,
    notifier: Arc<dyn Notify>,
    project: String,
    metrics: Option<Arc<Metrics>>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        output: Arc<Output>,
        notifier: Arc<dyn Notify>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            output,
            notifier,
            project: project.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn output(&self) -> &Arc<Output> {
        &self.output
    }

    /// Run `name` once. Only an unknown name is returned as an error.
    pub async fn run(&self, name: &str, mode: RunMode) -> Result<RunOutcome> {
        self.output.write_line(&format!("🔍 starting inspection of {name}"));
        let mut task = self.registry.get(name)?;
        self.count(|m| &m.runs_total);

        let ctx = TaskContext::new(
            name,
            mode,
            self.project.clone(),
            self.output.clone(),
            self.notifier.clone(),
        );

        let mut outcome = RunOutcome {
            name: name.to_string(),
            init: PhaseResult::from_result(task.init(&ctx).await),
            gather: PhaseResult::Skipped,
            check: PhaseResult::Skipped,
        };
        if let PhaseResult::Failed(e) = &outcome.init {
            tracing::error!(task = name, error = %e, "❌ init failed, skipping gather and check");
            self.count(|m| &m.init_failures);
            return Ok(outcome);
        }

        outcome.gather = PhaseResult::from_result(task.gather(&ctx).await);
        if let PhaseResult::Failed(e) = &outcome.gather {
            tracing::error!(task = name, error = %e, "❌ gather failed, checking partial state");
            self.count(|m| &m.gather_failures);
        }

        outcome.check = PhaseResult::from_result(task.check(&ctx).await);
        if let PhaseResult::Failed(e) = &outcome.check {
            tracing::error!(task = name, error = %e, "❌ check failed");
            self.count(|m| &m.check_failures);
        }

        tracing::info!(task = name, mode = %mode, success = outcome.is_success(), "✅ inspection finished");
        Ok(outcome)
    }

    /// Run every registered task in name order. One failure never stops the batch.
    pub async fn run_all(&self, mode: RunMode) -> Vec<RunOutcome> {
        let mut outcomes = Vec::with_capacity(self.registry.len());
        for name in self.registry.names() {
            match self.run(name, mode).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(task = name, error = %e, "❌ task could not start"),
            }
        }
        outcomes
    }

    fn count(&self, pick: impl Fn(&Metrics) -> &std::sync::atomic::AtomicU64) {
        if let Some(m) = &self.metrics {
            Metrics::incr(pick(m));
        }
    }
}
