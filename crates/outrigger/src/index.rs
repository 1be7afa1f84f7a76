//! The mapping index: two concurrent views over the accepted mapping
//! documents, kept consistent under hot-reload while sync traffic flows.
//!
//! - `by_name` maps a document name to its config (admin lookups),
//! - `by_route` maps a composite routing key to the configs that apply to
//!   events carrying that identity (dispatch lookups). The inner map is
//!   keyed by document name, so several documents may target the same
//!   (destination, database, table) under different group labels.
//!
//! Both views are owned exclusively by [`MappingIndex`]; all mutation goes
//! through [`insert`](MappingIndex::insert), [`upsert`](MappingIndex::upsert)
//! and [`remove`](MappingIndex::remove). Each operation is individually
//! atomic at the container level; a reader racing a mutation may observe the
//! two views momentarily out of step, but never a partially-built config
//! (values are immutable `Arc`s, replaced whole).

use crate::config::TransportMode;
use crate::error::{AdapterError, Result};
use crate::mapping::MappingConfig;
use crate::traits::NameRegistry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Build the composite routing key for one (destination, group, database,
/// table) identity.
///
/// Tcp deployments do not carry consumer groups, so the group label is left
/// out of the key there; in every other mode it participates. All fields are
/// trimmed; absent values are the empty string.
pub fn routing_key(
    mode: TransportMode,
    destination: &str,
    group_id: &str,
    database: &str,
    table: &str,
) -> String {
    let destination = destination.trim();
    let group_id = group_id.trim();
    let database = database.trim();
    let table = table.trim();
    if mode.is_tcp() {
        format!("{destination}_{database}-{table}")
    } else {
        format!("{destination}-{group_id}_{database}-{table}")
    }
}

/// Concurrent index of the mapping documents accepted by one adapter
/// instance
pub struct MappingIndex {
    adapter_type: &'static str,
    instance_key: String,
    mode: TransportMode,
    by_name: DashMap<String, Arc<MappingConfig>>,
    by_route: DashMap<String, DashMap<String, Arc<MappingConfig>>>,
    registry: Arc<dyn NameRegistry>,
}

impl MappingIndex {
    /// Create an empty index for one adapter instance.
    ///
    /// `adapter_type` is the explicit tag under which documents are
    /// registered with the name registry.
    pub fn new(
        adapter_type: &'static str,
        instance_key: impl Into<String>,
        mode: TransportMode,
        registry: Arc<dyn NameRegistry>,
    ) -> Self {
        Self {
            adapter_type,
            instance_key: instance_key.into(),
            mode,
            by_name: DashMap::new(),
            by_route: DashMap::new(),
            registry,
        }
    }

    /// The instance key documents are matched against
    pub fn instance_key(&self) -> &str {
        &self.instance_key
    }

    /// The transport mode routing keys are built for
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Number of active documents
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the index holds no documents
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn key_of(&self, config: &MappingConfig) -> String {
        routing_key(
            self.mode,
            &config.destination,
            config.group(),
            &config.mapping.database,
            &config.mapping.table,
        )
    }

    /// Insert a document if it is addressed to this instance.
    ///
    /// Returns whether insertion occurred; documents addressed elsewhere are
    /// dropped silently. On success the document is registered with the name
    /// registry under this instance's key.
    pub fn insert(&self, document_name: &str, mut config: MappingConfig) -> bool {
        if !config.accepted_by(&self.instance_key) {
            debug!(
                document = document_name,
                instance = %self.instance_key,
                "mapping document not addressed to this instance, dropped"
            );
            return false;
        }
        config.document_name = document_name.to_string();
        let config = Arc::new(config);
        self.by_name
            .insert(document_name.to_string(), Arc::clone(&config));
        self.route_in(document_name, &config);
        self.registry
            .register(self.adapter_type, document_name, &self.instance_key);
        debug!(document = document_name, "mapping document indexed");
        true
    }

    /// Replace a document, re-deriving its routing-key membership.
    ///
    /// Fails when the new document declares an owner other than this
    /// instance; the index is left unchanged in that case. Ownership is
    /// compared exactly, unlike acceptance. A document whose routing fields
    /// changed is removed from its previous route bucket.
    pub fn upsert(&self, document_name: &str, mut config: MappingConfig) -> Result<()> {
        if let Some(key) = config.outer_adapter_key.as_deref() {
            if key != self.instance_key {
                return Err(AdapterError::ownership(document_name));
            }
        }
        config.document_name = document_name.to_string();
        let config = Arc::new(config);
        let previous = self
            .by_name
            .insert(document_name.to_string(), Arc::clone(&config));
        let new_key = self.key_of(&config);
        self.route_in(document_name, &config);
        if let Some(previous) = previous {
            let old_key = self.key_of(&previous);
            if old_key != new_key {
                if let Some(bucket) = self.by_route.get(&old_key) {
                    bucket.remove(document_name);
                }
                debug!(
                    document = document_name,
                    old_key = %old_key,
                    new_key = %new_key,
                    "mapping document re-keyed"
                );
            }
        }
        Ok(())
    }

    /// Remove a document from both views and unregister it.
    ///
    /// Removing an unknown name is a no-op. The route-side removal scans
    /// every bucket; the key used at insert time is not retained separately.
    pub fn remove(&self, document_name: &str) {
        self.by_name.remove(document_name);
        for bucket in self.by_route.iter() {
            bucket.value().remove(document_name);
        }
        self.registry.unregister(self.adapter_type, document_name);
        debug!(document = document_name, "mapping document removed");
    }

    /// Config loaded under `document_name`, if any
    pub fn get(&self, document_name: &str) -> Option<Arc<MappingConfig>> {
        self.by_name.get(document_name).map(|e| Arc::clone(e.value()))
    }

    /// Configs in the route bucket for `key`.
    ///
    /// `None` when no bucket exists for the key; `Some` with an empty vec
    /// when a bucket exists but holds no documents (every document was
    /// removed from it). Dispatch treats the two differently.
    pub fn route(&self, key: &str) -> Option<Vec<Arc<MappingConfig>>> {
        self.by_route
            .get(key)
            .map(|bucket| bucket.iter().map(|e| Arc::clone(e.value())).collect())
    }

    /// All active configs, in no particular order
    pub fn configs(&self) -> Vec<Arc<MappingConfig>> {
        self.by_name.iter().map(|e| Arc::clone(e.value())).collect()
    }

    fn route_in(&self, document_name: &str, config: &Arc<MappingConfig>) {
        let key = self.key_of(config);
        self.by_route
            .entry(key)
            .or_default()
            .insert(document_name.to_string(), Arc::clone(config));
    }
}
