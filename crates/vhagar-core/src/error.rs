//! Error type shared by every vhagar crate.

use thiserror::Error;

/// Errors raised across the task, notify and inspect layers.
#[derive(Debug, Error)]
pub enum VhagarError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(String),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("invalid cron expression '{expr}' for job '{job}': {reason}")]
    InvalidCron {
        job: String,
        expr: String,
        reason: String,
    },

    #[error("notify error: {0}")]
    Notify(String),

    #[error("task error: {0}")]
    Task(String),
}

impl From<reqwest::Error> for VhagarError {
    fn from(e: reqwest::Error) -> Self {
        VhagarError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VhagarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_task_message() {
        let err = VhagarError::UnknownTask("doris".into());
        assert_eq!(err.to_string(), "unknown task: doris");
    }

    #[test]
    fn test_invalid_cron_message() {
        let err = VhagarError::InvalidCron {
            job: "ping".into(),
            expr: "bad".into(),
            reason: "need 5 fields".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'bad'"));
        assert!(msg.contains("'ping'"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: VhagarError = io.into();
        assert!(matches!(err, VhagarError::Io(_)));
    }
}
