//! Process-wide run and delivery counters.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters bumped by the dispatcher and the notifier.
#[derive(Debug, Default)]
pub struct Metrics {
    pub runs_total: AtomicU64,
    pub init_failures: AtomicU64,
    pub gather_failures: AtomicU64,
    pub check_failures: AtomicU64,
    pub notify_delivered: AtomicU64,
    pub notify_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_total: self.runs_total.load(Ordering::Relaxed),
            init_failures: self.init_failures.load(Ordering::Relaxed),
            gather_failures: self.gather_failures.load(Ordering::Relaxed),
            check_failures: self.check_failures.load(Ordering::Relaxed),
            notify_delivered: self.notify_delivered.load(Ordering::Relaxed),
            notify_failed: self.notify_failed.load(Ordering::Relaxed),
        }
    }

    /// Prometheus text exposition of every counter.
    pub fn render_prometheus(&self) -> String {
        let s = self.snapshot();
        let mut out = String::new();
        for (name, help, value) in [
            ("vhagar_task_runs_total", "Task runs started", s.runs_total),
            ("vhagar_task_init_failures_total", "Task init failures", s.init_failures),
            ("vhagar_task_gather_failures_total", "Task gather failures", s.gather_failures),
            ("vhagar_task_check_failures_total", "Task check failures", s.check_failures),
            ("vhagar_notify_delivered_total", "Webhook deliveries that succeeded", s.notify_delivered),
            ("vhagar_notify_failed_total", "Webhook deliveries that failed", s.notify_failed),
        ] {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name} {value}");
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub runs_total: u64,
    pub init_failures: u64,
    pub gather_failures: u64,
    pub check_failures: u64,
    pub notify_delivered: u64,
    pub notify_failed: u64,
}
