//! # Vhagar Notify
//!
//! Report delivery for inspection tasks.
//!
//! ```text
//! Task::check() → Jittered (one delay per process)
//!                   └── Notifier::send(content, task)
//!                         ├── resolve_recipients(task): per-task keys, else global keys
//!                         └── WebhookSink::post(key, Message) for each key, best effort
//! ```

pub mod jitter;
pub mod message;
pub mod router;
pub mod webhook;

pub use jitter::Jittered;
pub use message::{FontColor, Message};
pub use router::{Notifier, Notify, SendSummary};
pub use webhook::{WebhookSink, WecomWebhook};
