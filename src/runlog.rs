//! Append-only run log.
//!
//! One human-readable record per stage attempt: timestamp, stage name,
//! input, output. Write-only from the pipeline's perspective — nothing
//! ever parses this back, so the format is not a compatibility surface.
//! Writes are serialized through one mutex.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub struct RunLog {
    file: Mutex<Option<File>>,
}

impl RunLog {
    /// Open (or create) the log file for appending. An unopenable path
    /// degrades to a disabled log with a warning — a broken side channel
    /// must never take the pipeline down.
    pub fn open(path: &Path) -> Self {
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Some(f),
            Err(e) => {
                log::warn!(
                    "[RUNLOG] Cannot open {} ({e}) — run logging disabled",
                    path.display()
                );
                None
            }
        };
        Self { file: Mutex::new(file) }
    }

    pub fn disabled() -> Self {
        Self { file: Mutex::new(None) }
    }

    /// Append one record. Failures are logged and swallowed.
    pub fn record(&self, stage: &str, input: &str, output: &str) {
        let mut guard = match self.file.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(file) = guard.as_mut() else { return };

        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
        let result = writeln!(
            file,
            "\n=== {timestamp} [{stage}] ===\n--- input ---\n{input}\n--- output ---\n{output}"
        );
        if let Err(e) = result {
            log::warn!("[RUNLOG] Write failed: {e}");
        }
    }
}
