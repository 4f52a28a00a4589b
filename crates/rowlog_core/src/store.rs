//! In-memory reference host.

use crate::capture::{canonicalize, capture_log, CaptureInput};
use crate::config::CaptureConfig;
use crate::error::{CoreError, CoreResult};
use crate::history::{HistorySource, StoredRecord};
use crate::Record;
use parking_lot::{Mutex, RwLock};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Record identifier used by [`InMemoryStore`].
pub type RecordId = u64;

#[derive(Debug)]
struct Row {
    record: Record,
    log: Vec<u8>,
    version: u64,
}

impl Row {
    fn new(record: Record) -> Self {
        Self {
            record,
            log: Vec::new(),
            version: 0,
        }
    }

    fn capture(
        &mut self,
        record: Record,
        actor_id: Option<i64>,
        timestamp: i64,
        config: &CaptureConfig,
    ) -> CoreResult<u64> {
        let input = CaptureInput {
            existing_log: Some(self.log.as_slice()),
            old_record: &self.record,
            new_record: &record,
            actor_id,
            timestamp,
            expected_version: Some(self.version),
        };
        let captured = capture_log(&input, config)?;
        self.version = captured.log.current_version();
        self.log = captured.bytes;
        self.record = record;
        Ok(self.version)
    }
}

fn canonical(record: Record) -> CoreResult<Record> {
    canonicalize(Cow::Owned(record)).map(Cow::into_owned)
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Vacant,
    Live(Row),
    Deleted,
}

/// A thread-safe map of tracked records.
///
/// Each record has its own lock, held for the whole
/// read-capture-write cycle, so the record and its log always change
/// together and versions never race. Writes to different records do not
/// contend beyond a brief map lookup.
///
/// # Example
///
/// ```rust
/// use rowlog_codec::Value;
/// use rowlog_core::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// let v = store.write(1, Value::object([("n", Value::from(1))]), None, 10).unwrap();
/// assert_eq!(v, 0);
/// let v = store.write(1, Value::object([("n", Value::from(2))]), Some(3), 20).unwrap();
/// assert_eq!(v, 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    config: CaptureConfig,
    rows: RwLock<HashMap<RecordId, Arc<Mutex<Slot>>>>,
}

impl InMemoryStore {
    /// Creates an empty store with the default capture configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that captures with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPolicy`] if `config` does not validate.
    pub fn with_config(config: CaptureConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rows: RwLock::default(),
        })
    }

    /// The capture configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Adds a new record with an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RecordExists`] if `id` is taken, or
    /// [`CoreError::InvalidRecord`] if `record` has a repeated map key.
    pub fn insert(&self, id: RecordId, record: Record) -> CoreResult<()> {
        let record = canonical(record)?;
        loop {
            let slot = self.slot_or_create(id);
            let mut guard = slot.lock();
            match *guard {
                Slot::Live(_) => return Err(CoreError::RecordExists { id: id.to_string() }),
                Slot::Deleted => continue,
                Slot::Vacant => {
                    *guard = Slot::Live(Row::new(record));
                    trace!(id, "inserted record");
                    return Ok(());
                }
            }
        }
    }

    /// Replaces an existing record, capturing the change. Returns the
    /// record's version after the write.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RecordNotFound`] for an unknown `id`, or any
    /// error from [`crate::capture`].
    pub fn update(
        &self,
        id: RecordId,
        record: Record,
        actor_id: Option<i64>,
        timestamp: i64,
    ) -> CoreResult<u64> {
        let record = canonical(record)?;
        let slot = self
            .slot(id)
            .ok_or_else(|| CoreError::record_not_found(id))?;
        let mut guard = slot.lock();
        match &mut *guard {
            Slot::Live(row) => row.capture(record, actor_id, timestamp, &self.config),
            Slot::Vacant | Slot::Deleted => Err(CoreError::record_not_found(id)),
        }
    }

    /// Inserts or updates a record. Returns the record's version after the
    /// write, 0 for a fresh insert.
    ///
    /// # Errors
    ///
    /// Any error from [`crate::capture`].
    pub fn write(
        &self,
        id: RecordId,
        record: Record,
        actor_id: Option<i64>,
        timestamp: i64,
    ) -> CoreResult<u64> {
        let record = canonical(record)?;
        loop {
            let slot = self.slot_or_create(id);
            let mut guard = slot.lock();
            if let Slot::Live(row) = &mut *guard {
                return row.capture(record, actor_id, timestamp, &self.config);
            }
            if matches!(*guard, Slot::Deleted) {
                continue;
            }
            *guard = Slot::Live(Row::new(record));
            return Ok(0);
        }
    }

    /// Deletes a record together with its history. Returns whether it
    /// existed.
    pub fn delete(&self, id: RecordId) -> bool {
        let Some(slot) = self.rows.write().remove(&id) else {
            return false;
        };
        let mut guard = slot.lock();
        let existed = matches!(*guard, Slot::Live(_));
        *guard = Slot::Deleted;
        trace!(id, existed, "deleted record");
        existed
    }

    /// The live record.
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.with_row(id, |row| row.record.clone())
    }

    /// The live record with its log bytes.
    pub fn stored(&self, id: RecordId) -> Option<StoredRecord> {
        self.with_row(id, |row| StoredRecord {
            record: row.record.clone(),
            log: row.log.clone(),
        })
    }

    /// The record's current version.
    pub fn version(&self, id: RecordId) -> Option<u64> {
        self.with_row(id, |row| row.version)
    }

    /// Ids of all records, in ascending order.
    pub fn ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self.rows.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn slot(&self, id: RecordId) -> Option<Arc<Mutex<Slot>>> {
        self.rows.read().get(&id).map(Arc::clone)
    }

    fn slot_or_create(&self, id: RecordId) -> Arc<Mutex<Slot>> {
        if let Some(slot) = self.slot(id) {
            return slot;
        }
        Arc::clone(self.rows.write().entry(id).or_default())
    }

    fn with_row<T>(&self, id: RecordId, f: impl FnOnce(&Row) -> T) -> Option<T> {
        let slot = self.slot(id)?;
        let guard = slot.lock();
        match &*guard {
            Slot::Live(row) => Some(f(row)),
            Slot::Vacant | Slot::Deleted => None,
        }
    }
}

impl HistorySource for InMemoryStore {
    type Key = RecordId;

    fn load(&self, key: &RecordId) -> CoreResult<Option<StoredRecord>> {
        Ok(self.stored(*key))
    }
}
