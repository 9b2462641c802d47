//! Audit stores — where events are durably kept.

use aegis_core::{AuditEvent, AuditFilter, StorageError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Durable, append-only event storage.
///
/// Implementations must never modify or remove an accepted event, and
/// `append` must only return `Ok` once the event is durable for that backend.
pub trait AuditStore: Send + Sync {
    /// Backend name for logs and status output.
    fn name(&self) -> &str;

    /// Persist one event. Events arrive in id order.
    fn append(&self, event: &AuditEvent) -> Result<(), StorageError>;

    /// Matching events, most recent first, at most `limit`.
    fn query(&self, filter: &AuditFilter, limit: usize) -> Vec<AuditEvent>;

    /// Total number of stored events.
    fn count(&self) -> usize;

    /// Highest stored id, or 0 when empty.
    fn last_id(&self) -> u64;
}

fn select(events: &[AuditEvent], filter: &AuditFilter, limit: usize) -> Vec<AuditEvent> {
    events
        .iter()
        .rev()
        .filter(|e| filter.matches(e))
        .take(limit)
        .cloned()
        .collect()
}

// ── In-memory ───────────────────────────────────────────────────────────────

/// Process-local store. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn append(&self, event: &AuditEvent) -> Result<(), StorageError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn query(&self, filter: &AuditFilter, limit: usize) -> Vec<AuditEvent> {
        select(&self.events.lock().unwrap(), filter, limit)
    }

    fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    fn last_id(&self) -> u64 {
        self.events.lock().unwrap().last().map_or(0, |e| e.id)
    }
}

// ── JSON lines ──────────────────────────────────────────────────────────────

struct JsonlInner {
    file: File,
    events: Vec<AuditEvent>,
}

/// Append-only JSON-lines file. Each line is one [`AuditEvent`].
///
/// Existing events are loaded on open so reads never touch the disk. Every
/// append is flushed and synced before it is acknowledged.
pub struct JsonlStore {
    path: PathBuf,
    inner: Mutex<JsonlInner>,
}

impl JsonlStore {
    /// Open (or create) the trail at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |e: std::io::Error| StorageError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let events = Self::load_from_disk(&path).map_err(io_err)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;

        debug!(path = %path.display(), count = events.len(), "Audit trail opened");
        Ok(Self {
            path,
            inner: Mutex::new(JsonlInner { file, events }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every readable event. A torn final line (no trailing newline)
    /// is cut off the file so the next append starts on a fresh line.
    fn load_from_disk(path: &Path) -> std::io::Result<Vec<AuditEvent>> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let complete = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        if complete < bytes.len() {
            warn!(
                path = %path.display(),
                dropped_bytes = bytes.len() - complete,
                "Truncating torn audit line"
            );
            OpenOptions::new().write(true).open(path)?.set_len(complete as u64)?;
        }

        let content = String::from_utf8_lossy(&bytes[..complete]);
        let mut events: Vec<AuditEvent> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<AuditEvent>(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Skipping unreadable audit line");
                    None
                }
            })
            .collect();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }
}

impl std::fmt::Debug for JsonlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlStore")
            .field("path", &self.path)
            .field("count", &self.count())
            .finish()
    }
}

impl AuditStore for JsonlStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn append(&self, event: &AuditEvent) -> Result<(), StorageError> {
        let mut line =
            serde_json::to_string(event).map_err(|e| StorageError::Encode(e.to_string()))?;
        line.push('\n');

        let mut inner = self.inner.lock().unwrap();
        let io_err = |e: std::io::Error| StorageError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        };
        let len = inner.file.metadata().map_err(io_err)?.len();
        let written = inner
            .file
            .write_all(line.as_bytes())
            .and_then(|()| inner.file.flush())
            .and_then(|()| inner.file.sync_data());
        if let Err(e) = written {
            // Never leave a partial line for the next append to merge into.
            if let Err(trunc) = inner.file.set_len(len) {
                warn!(error = %trunc, path = %self.path.display(), "Failed to roll back partial audit line");
            }
            return Err(io_err(e));
        }
        inner.events.push(event.clone());
        Ok(())
    }

    fn query(&self, filter: &AuditFilter, limit: usize) -> Vec<AuditEvent> {
        select(&self.inner.lock().unwrap().events, filter, limit)
    }

    fn count(&self) -> usize {
        self.inner.lock().unwrap().events.len()
    }

    fn last_id(&self) -> u64 {
        self.inner.lock().unwrap().events.last().map_or(0, |e| e.id)
    }
}
