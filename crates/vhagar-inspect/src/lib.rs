//! # Vhagar Inspect
//! Built-in inspection tasks. Each one implements [`vhagar_task::Tasker`] and
//! is wired into a registry by [`register_builtin`].

pub mod es;
pub mod nacos;

#[cfg(test)]
pub(crate) mod testkit;

use vhagar_core::VhagarConfig;
use vhagar_task::Registry;

pub use es::EsTask;
pub use nacos::NacosTask;

/// Register every built-in task. All of them share `client`, so they share its timeout.
pub fn register_builtin(registry: &mut Registry, config: &VhagarConfig, client: reqwest::Client) {
    let es = config.es.clone();
    let es_client = client.clone();
    registry.add("es", move || Box::new(EsTask::new(es.clone(), es_client.clone())));

    let nacos = config.nacos.clone();
    registry.add("nacos", move || Box::new(NacosTask::new(nacos.clone(), client.clone())));
}
