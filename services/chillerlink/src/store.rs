//! Shared telemetry store
//!
//! Holds the single most recent decoded record. Writers build a complete
//! [`TelemetrySnapshot`] and swap the shared pointer under a short write lock;
//! readers clone the `Arc` under a read lock. A reader therefore sees either
//! the previous snapshot or the next one, never a record under construction.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;

use crate::telemetry::TelemetryRecord;

/// Latest record plus its sequence number and receive time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub record: TelemetryRecord,
    /// 0 until the first record is accepted, then +1 per record
    pub sequence: u64,
    pub received_at: Option<DateTime<Utc>>,
}

/// Last-write-wins store for the newest telemetry record
#[derive(Debug)]
pub struct SharedTelemetryStore {
    current: RwLock<Arc<TelemetrySnapshot>>,
    sequence_tx: watch::Sender<u64>,
}

impl Default for SharedTelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedTelemetryStore {
    pub fn new() -> Self {
        let (sequence_tx, _) = watch::channel(0);
        Self {
            current: RwLock::new(Arc::new(TelemetrySnapshot::default())),
            sequence_tx,
        }
    }

    /// Latest complete snapshot (empty before the first record)
    pub fn get(&self) -> Arc<TelemetrySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Copy of the latest record
    pub fn record(&self) -> TelemetryRecord {
        self.get().record.clone()
    }

    /// Replace the snapshot wholesale with `record`; returns the new sequence
    pub fn set(&self, record: TelemetryRecord) -> u64 {
        let sequence = {
            let mut current = self.current.write();
            let next = Arc::new(TelemetrySnapshot {
                record,
                sequence: current.sequence + 1,
                received_at: Some(Utc::now()),
            });
            let sequence = next.sequence;
            *current = next;
            sequence
        };
        self.sequence_tx.send_replace(sequence);
        sequence
    }

    /// Receiver that observes the sequence number of each new snapshot
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sequence_tx.subscribe()
    }

    pub fn sequence(&self) -> u64 {
        self.current.read().sequence
    }

    /// Time since the last accepted record, `None` before the first
    pub fn age(&self) -> Option<Duration> {
        let received_at = self.current.read().received_at?;
        (Utc::now() - received_at).to_std().ok()
    }
}
