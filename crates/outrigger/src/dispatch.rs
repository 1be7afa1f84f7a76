//! Dispatch engine: resolves each change event to its mapping configs and
//! forwards it to the write client.
//!
//! Resolution is two-staged: the event's (destination, group, database,
//! table) identity selects a route bucket via the composite key, then the
//! bucket is filtered by consumer group: a config applies when its group
//! label is empty (all groups) or equals the event's. An event may match
//! several configs and is forwarded once per match.
//!
//! Resolution failures are per-event outcomes, logged and counted but never
//! raised: one unroutable event must not abort the batch. A write failure
//! from the sync collaborator is different; it propagates to the caller,
//! which owns retry and offset-commit policy.

use crate::event::ChangeEvent;
use crate::index::{routing_key, MappingIndex};
use crate::traits::SyncService;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

/// Resolves and forwards batches of change events
pub struct Dispatcher {
    index: Arc<MappingIndex>,
    sync: Arc<dyn SyncService>,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Create a dispatcher over an index and a write client
    pub fn new(index: Arc<MappingIndex>, sync: Arc<dyn SyncService>) -> Self {
        Self {
            index,
            sync,
            stats: DispatchStats::new(),
        }
    }

    /// Apply a batch of change events in input order.
    ///
    /// An empty batch is a no-op. Within one call events are processed
    /// strictly in sequence; no ordering holds across concurrent calls.
    pub async fn sync(&self, events: &[ChangeEvent]) -> anyhow::Result<()> {
        for event in events {
            self.dispatch(event).await?;
        }
        Ok(())
    }

    async fn dispatch(&self, event: &ChangeEvent) -> anyhow::Result<()> {
        self.stats.record_event();
        let destination = event.destination_trimmed();
        let group_id = event.group_trimmed();
        let key = routing_key(
            self.index.mode(),
            destination,
            group_id,
            &event.database,
            &event.table,
        );

        let Some(bucket) = self.index.route(&key) else {
            self.stats.record_unresolved(&key);
            error!(key = %key, "no mapping config for routing key, event dropped");
            return Ok(());
        };

        let selected: Vec<_> = bucket
            .into_iter()
            .filter(|config| {
                let group = config.group();
                group.is_empty() || group == group_id
            })
            .collect();

        if selected.is_empty() {
            self.stats.record_group_mismatch();
            error!(
                key = %key,
                group = group_id,
                "no mapping config matches the event's consumer group, event dropped"
            );
            return Ok(());
        }

        for config in &selected {
            self.sync.apply(config, event).await?;
        }
        self.stats.record_forwarded(selected.len() as u64);
        Ok(())
    }

    /// Snapshot of the dispatch counters
    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Dispatch counters
#[derive(Debug, Default)]
pub struct DispatchStats {
    events_processed: AtomicU64,
    events_forwarded: AtomicU64,
    forwards_total: AtomicU64,
    group_mismatches: AtomicU64,
    unresolved_total: AtomicU64,
    unresolved_keys: parking_lot::RwLock<HashMap<String, u64>>,
}

impl DispatchStats {
    fn new() -> Self {
        Self::default()
    }

    fn record_event(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_forwarded(&self, forwards: u64) {
        self.events_forwarded.fetch_add(1, Ordering::Relaxed);
        self.forwards_total.fetch_add(forwards, Ordering::Relaxed);
    }

    fn record_group_mismatch(&self) {
        self.group_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    fn record_unresolved(&self, key: &str) {
        self.unresolved_total.fetch_add(1, Ordering::Relaxed);
        let mut keys = self.unresolved_keys.write();
        *keys.entry(key.to_string()).or_insert(0) += 1;
    }

    fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_forwarded: self.events_forwarded.load(Ordering::Relaxed),
            forwards_total: self.forwards_total.load(Ordering::Relaxed),
            group_mismatches: self.group_mismatches.load(Ordering::Relaxed),
            unresolved_total: self.unresolved_total.load(Ordering::Relaxed),
            unresolved_keys: self.unresolved_keys.read().clone(),
        }
    }
}

/// Snapshot of [`DispatchStats`]
#[derive(Debug, Clone)]
pub struct DispatchStatsSnapshot {
    /// Events seen by the dispatcher
    pub events_processed: u64,
    /// Events forwarded to at least one config
    pub events_forwarded: u64,
    /// Config-level forwards (an event matching two configs counts twice)
    pub forwards_total: u64,
    /// Events whose bucket held no group-compatible config
    pub group_mismatches: u64,
    /// Events with no route bucket at all
    pub unresolved_total: u64,
    /// Per-key occurrences of unresolved routes
    pub unresolved_keys: HashMap<String, u64>,
}

impl DispatchStatsSnapshot {
    /// Share of processed events that reached a config
    pub fn resolution_rate(&self) -> f64 {
        if self.events_processed == 0 {
            return 100.0;
        }
        (self.events_forwarded as f64 / self.events_processed as f64) * 100.0
    }
}
