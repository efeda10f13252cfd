//! # Vhagar Task
//!
//! Pluggable inspection tasks and the machinery that runs them.
//!
//! ```text
//! CLI / CronDriver
//!   └── Dispatcher::run(name, mode)
//!         ├── Registry::get(name) → fresh Box<dyn Tasker>
//!         ├── init()   : error aborts the run
//!         ├── gather() : talks to backends, fills task state
//!         └── check()  : table → Output (stdout + file)
//!                        report → Notify (jitter → recipients → webhook)
//! ```

pub mod dispatcher;
pub mod output;
pub mod registry;
pub mod schedule;
pub mod server;
pub mod tasker;

pub use schedule::{CronDriver, Fired};
pub use dispatcher::{Dispatcher, PhaseResult, RunOutcome};
pub use output::Output;
pub use registry::{Creator, Registry};
pub use tasker::{RunMode, TaskContext, Tasker};
