//! In-process fingerprint store.
//!
//! Atomicity comes from holding one mutex across check and removal. Records
//! nobody redeems are reclaimed by a sweep that runs from `put` at most once
//! per sweep interval, measured on the records' own `created_at` clock.

use super::{FingerprintRecord, FingerprintStore};
use crate::error::SessionError;
use crate::refresh::Fingerprint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_SWEEP_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Default)]
struct Records {
    by_fingerprint: HashMap<Fingerprint, FingerprintRecord>,
    next_sweep: Option<DateTime<Utc>>,
}

impl Records {
    fn purge(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.by_fingerprint.len();
        self.by_fingerprint.retain(|_, record| record.is_valid_at(now));
        before - self.by_fingerprint.len()
    }
}

/// Fingerprint store backed by a `HashMap`.
#[derive(Debug)]
pub struct MemoryFingerprintStore {
    records: Mutex<Records>,
    sweep_interval: chrono::Duration,
}

impl Default for MemoryFingerprintStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(Records::default()),
            sweep_interval: chrono::Duration::seconds(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl MemoryFingerprintStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how often `put` sweeps expired records.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: chrono::Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Drop every record expired at `now`. Returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let purged = self.records.lock().await.purge(now);
        if purged > 0 {
            debug!(purged, "Purged expired fingerprints");
        }
        purged
    }

    /// Number of stored records, expired ones included.
    pub async fn len(&self) -> usize {
        self.records.lock().await.by_fingerprint.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.by_fingerprint.is_empty()
    }
}

#[async_trait]
impl FingerprintStore for MemoryFingerprintStore {
    async fn put(
        &self,
        fingerprint: &Fingerprint,
        record: &FingerprintRecord,
    ) -> Result<(), SessionError> {
        let mut records = self.records.lock().await;

        let now = record.created_at;
        if records.next_sweep.map_or(true, |at| now >= at) {
            let purged = records.purge(now);
            if purged > 0 {
                debug!(purged, "Swept expired fingerprints");
            }
            records.next_sweep = Some(now + self.sweep_interval);
        }

        match records.by_fingerprint.entry(*fingerprint) {
            Entry::Occupied(_) => Err(SessionError::FingerprintConflict),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn take_if_valid(
        &self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<Option<FingerprintRecord>, SessionError> {
        let mut records = self.records.lock().await;
        Ok(records
            .by_fingerprint
            .remove(fingerprint)
            .filter(|record| record.is_valid_at(now)))
    }
}
