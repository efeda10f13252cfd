//! Cron driver: fires configured tasks on their cron expressions, forever.
//!
//! Ticks once per second and spawns each due job on its own tokio task.
//! A job whose previous run is still going has that firing skipped.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use vhagar_core::config::CronJobConfig;
use vhagar_core::error::{Result, VhagarError};

use crate::dispatcher::Dispatcher;
use crate::tasker::RunMode;

/// Parse a cron expression. Standard 5-field expressions get a `0` seconds
/// field prepended; 6/7-field expressions are taken as-is.
pub fn parse_schedule(expression: &str) -> std::result::Result<Schedule, String> {
    let normalized = expression.trim();
    match normalized.split_whitespace().count() {
        5 => Schedule::from_str(&format!("0 {normalized}")).map_err(|e| e.to_string()),
        6 | 7 => Schedule::from_str(normalized).map_err(|e| e.to_string()),
        n => Err(format!("expected 5 fields (MIN HOUR DOM MON DOW), got {n}")),
    }
}

struct CronEntry {
    name: String,
    expression: String,
    schedule: Schedule,
    next_run: Option<DateTime<Utc>>,
    running: Arc<AtomicBool>,
}

/// What a tick did with a due job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fired {
    Started(String),
    /// Due, but its previous run had not finished.
    Skipped(String),
}

/// Clears the in-flight flag when a run ends, panics included.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CronDriver {
    dispatcher: Arc<Dispatcher>,
    entries: Vec<CronEntry>,
    hold_when_idle: bool,
}

impl CronDriver {
    /// Build entries for every enabled job. Any malformed expression or unknown
    /// task name is a configuration error.
    pub fn new(dispatcher: Arc<Dispatcher>, jobs: &BTreeMap<String, CronJobConfig>) -> Result<Self> {
        Self::starting_at(dispatcher, jobs, Utc::now())
    }

    /// As [`CronDriver::new`], computing first fire times from `now`.
    pub fn starting_at(
        dispatcher: Arc<Dispatcher>,
        jobs: &BTreeMap<String, CronJobConfig>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut entries = Vec::new();
        for (name, job) in jobs.iter().filter(|(_, job)| job.crontab) {
            let schedule = parse_schedule(&job.scheducron).map_err(|reason| VhagarError::InvalidCron {
                job: name.clone(),
                expr: job.scheducron.clone(),
                reason,
            })?;
            if !dispatcher.registry().contains(name) {
                return Err(VhagarError::UnknownTask(name.clone()));
            }
            let next_run = schedule.after(&now).next();
            tracing::info!("📅 cron job '{}' ({}) next at {:?}", name, job.scheducron, next_run);
            entries.push(CronEntry {
                name: name.clone(),
                expression: job.scheducron.clone(),
                schedule,
                next_run,
                running: Arc::new(AtomicBool::new(false)),
            });
        }
        Ok(Self {
            dispatcher,
            entries,
            hold_when_idle: false,
        })
    }

    /// Keep `run` alive with no jobs enabled, e.g. while a metrics endpoint is serving.
    pub fn hold_when_idle(mut self, hold: bool) -> Self {
        self.hold_when_idle = hold;
        self
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn next_run(&self, name: &str) -> Option<DateTime<Utc>> {
        self.entries.iter().find(|e| e.name == name)?.next_run
    }

    /// Fire every job due at `now` and advance its next fire time.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Fired> {
        let mut fired = Vec::new();
        for entry in self.entries.iter_mut() {
            let due = entry.next_run.is_some_and(|next| next <= now);
            if !due {
                continue;
            }
            entry.next_run = entry.schedule.after(&now).next();

            if entry.running.swap(true, Ordering::AcqRel) {
                tracing::warn!(
                    "⏭️ cron job '{}' ({}) still running, skipping this firing",
                    entry.name,
                    entry.expression
                );
                fired.push(Fired::Skipped(entry.name.clone()));
                continue;
            }

            tracing::info!("🔔 cron job triggered: '{}'", entry.name);
            let guard = RunningGuard(entry.running.clone());
            let dispatcher = self.dispatcher.clone();
            let name = entry.name.clone();
            tokio::spawn(async move {
                let _guard = guard;
                if let Err(e) = dispatcher.run(&name, RunMode::Report).await {
                    tracing::error!(task = %name, error = %e, "❌ cron run failed to start");
                }
            });
            fired.push(Fired::Started(entry.name.clone()));
        }
        fired
    }

    /// Tick every second until the process stops. With no job enabled it
    /// returns at once, unless [`CronDriver::hold_when_idle`] was set.
    pub async fn run(mut self) {
        if self.entries.is_empty() {
            tracing::warn!("⚠️ no cron jobs enabled, nothing to schedule");
            if self.hold_when_idle {
                std::future::pending::<()>().await;
            }
            return;
        }
        tracing::info!("⏰ cron driver started with {} job(s)", self.entries.len());

        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::{Inbox, harness};
    use crate::output::{Output, SharedBuf};
    use crate::registry::Registry;
    use crate::tasker::{TaskContext, Tasker};
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn jobs(entries: &[(&str, bool, &str)]) -> BTreeMap<String, CronJobConfig> {
        entries
            .iter()
            .map(|(name, on, expr)| {
                (
                    name.to_string(),
                    CronJobConfig {
                        crontab: *on,
                        scheducron: expr.to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_parse_five_field() {
        let s = parse_schedule("*/15 * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 10, 2, 0).unwrap();
        let next = s.after(&after).next().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 22, 10, 15, 0).unwrap());
    }

    #[test]
    fn test_parse_with_seconds() {
        assert!(parse_schedule("30 0 8 * * *").is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_schedule("bad").is_err());
        assert!(parse_schedule("61 * * * *").is_err());
    }

    #[tokio::test]
    async fn test_malformed_expression_is_fatal() {
        let h = harness("cron-bad", false, false);
        let err = CronDriver::new(Arc::new(h.dispatcher), &jobs(&[("ping", true, "every minute")]))
            .err()
            .unwrap();
        assert!(matches!(err, VhagarError::InvalidCron { .. }));
    }

    #[tokio::test]
    async fn test_disabled_jobs_are_not_scheduled() {
        let h = harness("cron-disabled", false, false);
        let driver = CronDriver::new(
            Arc::new(h.dispatcher),
            &jobs(&[("ping", false, "*/1 * * * *"), ("never-registered", false, "nonsense")]),
        )
        .unwrap();
        assert!(driver.job_names().is_empty());
    }

    #[tokio::test]
    async fn test_idle_driver_returns_unless_held() {
        let h = harness("cron-idle", false, false);
        let dispatcher = Arc::new(h.dispatcher);
        let idle = CronDriver::new(dispatcher.clone(), &BTreeMap::new()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), idle.run())
            .await
            .expect("idle driver should return");

        let held = CronDriver::new(dispatcher, &BTreeMap::new()).unwrap().hold_when_idle(true);
        assert!(tokio::time::timeout(Duration::from_millis(200), held.run()).await.is_err());
    }

    #[tokio::test]
    async fn test_unregistered_job_is_fatal() {
        let h = harness("cron-unreg", false, false);
        let err = CronDriver::new(Arc::new(h.dispatcher), &jobs(&[("doris", true, "0 9 * * *")]))
            .err()
            .unwrap();
        assert!(matches!(err, VhagarError::UnknownTask(_)));
    }

    #[tokio::test]
    async fn test_every_minute_job_fires_within_61_seconds() {
        let h = harness("cron-fire", false, false);
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 30).unwrap();
        let mut driver =
            CronDriver::starting_at(Arc::new(h.dispatcher), &jobs(&[("ping", true, "*/1 * * * *")]), start)
                .unwrap();

        assert!(driver.tick(start).is_empty());
        let fired = driver.tick(start + chrono::Duration::seconds(61));
        assert_eq!(fired, vec![Fired::Started("ping".into())]);
        assert_eq!(
            driver.next_run("ping"),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 2, 0).unwrap())
        );

        for _ in 0..100 {
            if h.inbox.0.lock().unwrap().len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*h.inbox.0.lock().unwrap(), vec![("ping".to_string(), "OK".to_string())]);
        std::fs::remove_file(&h.path).ok();
    }

    /// Holds its gather open until released.
    struct Slow(Arc<tokio::sync::Notify>);

    #[async_trait]
    impl Tasker for Slow {
        async fn gather(&mut self, _ctx: &TaskContext) -> Result<()> {
            self.0.notified().await;
            Ok(())
        }

        async fn check(&self, _ctx: &TaskContext) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_overlapping_firing_is_skipped() {
        let release = Arc::new(tokio::sync::Notify::new());
        let r = release.clone();
        let mut registry = Registry::new();
        registry.add("slow", move || Box::new(Slow(r.clone())));

        let path = std::env::temp_dir().join(format!("vhagar-test-cron-slow-{}.log", std::process::id()));
        let output = Arc::new(Output::with_console(&path, Box::new(SharedBuf::default())));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(registry),
            output,
            Arc::new(Inbox::default()),
            "t",
        ));

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut driver =
            CronDriver::starting_at(dispatcher, &jobs(&[("slow", true, "* * * * *")]), start).unwrap();

        let first = driver.tick(start + chrono::Duration::minutes(1));
        assert_eq!(first, vec![Fired::Started("slow".into())]);
        let second = driver.tick(start + chrono::Duration::minutes(2));
        assert_eq!(second, vec![Fired::Skipped("slow".into())]);

        release.notify_one();
        let running = driver.entries[0].running.clone();
        for _ in 0..100 {
            if !running.load(Ordering::Acquire) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let third = driver.tick(start + chrono::Duration::minutes(3));
        assert_eq!(third, vec![Fired::Started("slow".into())]);
        release.notify_one();
        std::fs::remove_file(&path).ok();
    }
}
