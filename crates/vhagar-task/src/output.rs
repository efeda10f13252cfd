//! Output multiplexer: every table a task renders goes to the terminal and
//! to an append-only audit file, so unattended runs leave a trail.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use vhagar_core::error::Result;

static GLOBAL: OnceLock<Arc<Output>> = OnceLock::new();

enum FileState {
    /// Not opened yet, or closed/cleared; the next write opens it.
    Closed,
    Open(File),
    /// Open failed; console only until the next `clear`.
    Degraded,
}

struct Inner {
    console: Box<dyn Write + Send>,
    file: FileState,
}

/// Fan-out writer: console first, then the audit file.
pub struct Output {
    path: PathBuf,
    inner: Mutex<Inner>,
    opens: AtomicUsize,
}

impl Output {
    /// Output to stdout plus `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_console(path, Box::new(io::stdout()))
    }

    /// Output to an arbitrary console writer plus `path`.
    pub fn with_console(path: impl Into<PathBuf>, console: Box<dyn Write + Send>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(Inner {
                console,
                file: FileState::Closed,
            }),
            opens: AtomicUsize::new(0),
        }
    }

    /// Process-wide instance. The first caller's path wins.
    pub fn global(path: impl AsRef<Path>) -> Arc<Output> {
        GLOBAL
            .get_or_init(|| Arc::new(Output::new(path.as_ref())))
            .clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How many times the audit file has been opened.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }

    pub fn is_file_open(&self) -> bool {
        matches!(self.lock().file, FileState::Open(_))
    }

    /// Write a string to both sinks.
    pub fn write_str(&self, s: &str) {
        if let Err(e) = self.fan_out(s.as_bytes()) {
            tracing::warn!("console write failed: {e}");
        }
    }

    /// Write a string plus newline to both sinks.
    pub fn write_line(&self, s: &str) {
        self.write_str(&format!("{s}\n"));
    }

    /// Best-effort close of the audit file.
    pub fn close(&self) {
        let mut inner = self.lock();
        let _ = inner.console.flush();
        if let FileState::Open(file) = &mut inner.file {
            let _ = file.flush();
        }
        inner.file = FileState::Closed;
    }

    /// Drop the current handle and truncate the audit file.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.file = FileState::Closed;
        let truncated = File::create(&self.path)?;
        drop(truncated);
        tracing::debug!("🧹 cleared {}", self.path.display());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fan_out(&self, buf: &[u8]) -> io::Result<()> {
        let mut inner = self.lock();
        let console = inner.console.write_all(buf);

        if matches!(inner.file, FileState::Closed) {
            inner.file = match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(file) => {
                    self.opens.fetch_add(1, Ordering::Relaxed);
                    FileState::Open(file)
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ cannot open {}: {e}; output goes to console only",
                        self.path.display()
                    );
                    FileState::Degraded
                }
            };
        }

        if let FileState::Open(file) = &mut inner.file {
            if let Err(e) = file.write_all(buf) {
                tracing::warn!("⚠️ write to {} failed: {e}", self.path.display());
            }
        }
        console
    }
}

impl Write for &Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.fan_out(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self.lock();
        inner.console.flush()?;
        if let FileState::Open(file) = &mut inner.file {
            file.flush()?;
        }
        Ok(())
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        self.close();
    }
}

/// Console stand-in that keeps everything written to it.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
