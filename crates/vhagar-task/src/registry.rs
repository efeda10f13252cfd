//! Task registry: maps task names to constructors.

use std::collections::BTreeMap;
use std::sync::Arc;

use vhagar_core::error::{Result, VhagarError};

use crate::tasker::Tasker;

/// Zero-argument constructor producing a fresh task instance.
pub type Creator = Arc<dyn Fn() -> Box<dyn Tasker> + Send + Sync>;

/// Directory of every runnable task. Built once in the composition root,
/// then shared read-only.
#[derive(Default, Clone)]
pub struct Registry {
    creators: BTreeMap<String, Creator>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`. A later registration under the same name replaces the earlier one.
    pub fn add<F>(&mut self, name: &str, creator: F)
    where
        F: Fn() -> Box<dyn Tasker> + Send + Sync + 'static,
    {
        if self.creators.insert(name.to_string(), Arc::new(creator)).is_some() {
            tracing::warn!("⚠️ task '{name}' registered twice, keeping the latest");
        } else {
            tracing::debug!("📋 task registered: {name}");
        }
    }

    /// Build a new instance of `name`.
    pub fn get(&self, name: &str) -> Result<Box<dyn Tasker>> {
        self.creators
            .get(name)
            .map(|create| (**create)())
            .ok_or_else(|| VhagarError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.creators.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}
