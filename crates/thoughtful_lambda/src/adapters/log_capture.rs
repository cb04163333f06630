//! In-memory sink for the formatted tracing output of a test.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Subscriber writing every event into this buffer. Install it with
    /// `tracing::subscriber::set_default` for the current thread.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let logs = self.clone();
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || logs.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        let bytes = match self.buffer.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut guard) = self.buffer.lock() {
            guard.extend_from_slice(buf);
            return Ok(buf.len());
        }
        Err(io::Error::other("failed to lock log buffer"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
