//! The audit trail — id assignment, durable append, and reads.

use crate::sink::{AuditSink, TracingSink};
use crate::store::{AuditStore, MemoryStore};
use aegis_core::{AuditEvent, AuditFilter, NewAuditEvent, StorageError};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Position of the next event in the trail.
struct Cursor {
    next_id: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Append-only, totally ordered record of guardrail activity.
///
/// Ids are assigned and events appended under one lock, so id order,
/// timestamp order and storage order agree. A failed append consumes
/// no id.
pub struct AuditTrail {
    store: Box<dyn AuditStore>,
    sinks: Vec<Box<dyn AuditSink>>,
    cursor: Mutex<Cursor>,
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("store", &self.store.name())
            .field("event_count", &self.store.count())
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl AuditTrail {
    /// Create a trail over the given store with no sinks.
    pub fn new(store: Box<dyn AuditStore>) -> Self {
        Self::with_sinks(store, Vec::new())
    }

    /// Create a trail that also forwards committed events to `sinks`.
    pub fn with_sinks(store: Box<dyn AuditStore>, sinks: Vec<Box<dyn AuditSink>>) -> Self {
        let next_id = store.last_id() + 1;
        Self {
            store,
            sinks,
            cursor: Mutex::new(Cursor {
                next_id,
                last_timestamp: None,
            }),
        }
    }

    /// Memory-backed trail, for tests and demos.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Add the standard tracing mirror.
    pub fn traced(mut self) -> Self {
        self.sinks.push(Box::new(TracingSink));
        self
    }

    /// Durably record an event and return its id.
    ///
    /// An `Err` means the event was not recorded; the caller must not
    /// expose the change the event describes.
    pub fn log_event(&self, draft: NewAuditEvent) -> Result<u64, StorageError> {
        let event = {
            let mut cursor = self.cursor.lock().unwrap();
            let id = cursor.next_id;
            if id == u64::MAX {
                return Err(StorageError::Exhausted("audit id space".into()));
            }

            let mut timestamp = Utc::now();
            if let Some(last) = cursor.last_timestamp {
                timestamp = timestamp.max(last);
            }

            let event = draft.into_event(id, timestamp);
            self.store.append(&event)?;
            cursor.next_id = id + 1;
            cursor.last_timestamp = Some(timestamp);
            event
        };

        for sink in &self.sinks {
            sink.record(&event);
        }
        Ok(event.id)
    }

    /// Most recent matching events first, at most `limit`.
    pub fn get_events(&self, limit: usize, filter: &AuditFilter) -> Vec<AuditEvent> {
        self.store.query(filter, limit)
    }

    /// Total number of recorded events.
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Name of the backing store.
    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}
