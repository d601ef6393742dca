//! Tracking Module
//!
//! Open-tracking records kept in a [`FlatStore`].
//!
//! Each tracked id maps to one [`TrackingRecord`]. Recording an open creates
//! the record on first sight and bumps its counter on every later one.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::FlatStore;

/// Per-id open statistics, stored as the value under the id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    /// Set once the first open is recorded
    pub opened: bool,

    /// When the first open was recorded (RFC 3339 on disk)
    pub first_opened_at: DateTime<Utc>,

    /// Number of opens recorded
    pub opened_amount: u64,
}

impl TrackingRecord {
    /// A record that has not been opened yet
    pub fn new(first_seen: DateTime<Utc>) -> Self {
        Self {
            opened: false,
            first_opened_at: first_seen,
            opened_amount: 0,
        }
    }

    fn mark_opened(mut self) -> Self {
        self.opened = true;
        self.opened_amount = self.opened_amount.saturating_add(1);
        self
    }
}

/// One row of a tracking report
///
/// `id` is reported verbatim. Decoding ids into message details is left to
/// the caller that minted them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedEntry {
    pub id: String,
    pub tracking: TrackingRecord,
}

/// Records opens against a shared store
#[derive(Clone)]
pub struct Tracker {
    store: Arc<FlatStore>,
}

impl Tracker {
    pub fn new(store: Arc<FlatStore>) -> Self {
        Self { store }
    }

    /// Record an open of `id` now
    pub fn record_open(&self, id: &str) -> Result<TrackingRecord> {
        self.record_open_at(id, Utc::now())
    }

    /// Record an open of `id` at `now`
    ///
    /// `now` only matters for the first open of an id. The whole
    /// read-increment-write happens in one store critical section, so
    /// concurrent opens of the same id are all counted.
    pub fn record_open_at(&self, id: &str, now: DateTime<Utc>) -> Result<TrackingRecord> {
        let record = self.store.update(id, |current: Option<TrackingRecord>| {
            current
                .unwrap_or_else(|| TrackingRecord::new(now))
                .mark_opened()
        })?;

        tracing::debug!(id, opens = record.opened_amount, "open recorded");
        Ok(record)
    }

    /// The record for `id`, if any
    pub fn record(&self, id: &str) -> Result<Option<TrackingRecord>> {
        match self.store.get(id) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Every tracked id with its record, ordered by id
    pub fn report(&self) -> Result<Vec<TrackedEntry>> {
        let all: BTreeMap<String, TrackingRecord> = self.store.get_all()?;

        Ok(all
            .into_iter()
            .map(|(id, tracking)| TrackedEntry { id, tracking })
            .collect())
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<FlatStore> {
        &self.store
    }
}
