//! Shared fixtures for task tests: a capturing context and a mock backend.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use vhagar_notify::{Notify, SendSummary};
use vhagar_task::{Output, RunMode, TaskContext};

#[derive(Clone, Default)]
pub struct Console(pub Arc<Mutex<Vec<u8>>>);

impl Console {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct Inbox(pub Mutex<Vec<String>>);

#[async_trait]
impl Notify for Inbox {
    async fn send(&self, content: &str, _task: &str) -> SendSummary {
        self.0.lock().unwrap().push(content.to_string());
        SendSummary {
            attempted: 1,
            delivered: 1,
            failed: 0,
        }
    }
}

pub struct Fixture {
    pub ctx: TaskContext,
    pub console: Console,
    pub inbox: Arc<Inbox>,
    pub path: PathBuf,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        std::fs::remove_file(&self.path).ok();
    }
}

static SEQ: AtomicUsize = AtomicUsize::new(0);

pub fn fixture(task: &str, mode: RunMode) -> Fixture {
    let path = std::env::temp_dir().join(format!(
        "vhagar-test-inspect-{task}-{mode}-{}-{}.log",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let console = Console::default();
    let output = Arc::new(Output::with_console(&path, Box::new(console.clone())));
    let inbox = Arc::new(Inbox::default());
    let ctx = TaskContext::new(task, mode, "test-project", output, inbox.clone());
    Fixture {
        ctx,
        console,
        inbox,
        path,
    }
}

/// Serve `app` on a random local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
