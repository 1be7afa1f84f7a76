//! Collaborator boundaries.
//!
//! The adapter core resolves *which* mapping applies to an event; everything
//! that touches the external store goes through the traits here: the write
//! client ([`SyncService`]), the bulk-backfill executor ([`EtlService`]),
//! the row-count facility ([`RowCounter`]), and the administrative
//! name registry ([`NameRegistry`]).
//!
//! Collaborator failures are not wrapped or suppressed by the core; they
//! propagate to the caller as the collaborator's own `anyhow::Error`.

use crate::event::ChangeEvent;
use crate::mapping::MappingConfig;
use async_trait::async_trait;
use dashmap::DashMap;

/// Outcome of one bulk-import (backfill) invocation
#[derive(Debug, Clone, Default)]
pub struct EtlResult {
    /// Whether the import succeeded
    pub succeeded: bool,
    /// Human-readable result on success
    pub result_message: Option<String>,
    /// Human-readable error on failure
    pub error_message: Option<String>,
}

impl EtlResult {
    /// Create a successful result
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            result_message: Some(message.into()),
            error_message: None,
        }
    }

    /// Create a failed result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            result_message: None,
            error_message: Some(message.into()),
        }
    }
}

/// Applies one resolved mapping to one change event against the external
/// store.
///
/// The dispatcher awaits each call before moving to the next event of a
/// batch; in-batch ordering is the collaborator's to rely on.
#[async_trait]
pub trait SyncService: Send + Sync {
    /// Write the event's row images to the mapping's target table
    async fn apply(&self, config: &MappingConfig, event: &ChangeEvent) -> anyhow::Result<()>;
}

/// Executes a bulk backfill for one mapping
#[async_trait]
pub trait EtlService: Send + Sync {
    /// Import data for the mapping's source table into its target table.
    ///
    /// `params` is free-form (typically a predicate or time range) and is
    /// interpreted by the executor.
    async fn import(&self, config: &MappingConfig, params: &[String]) -> anyhow::Result<EtlResult>;
}

/// Row-count queries against the external store
#[async_trait]
pub trait RowCounter: Send + Sync {
    /// Count the rows of a target table
    async fn count_rows(&self, target_table: &str) -> anyhow::Result<u64>;
}

/// Administrative lookup of which instance owns a document, across adapter
/// instances of a process.
///
/// Keys are (adapter type, document name); the adapter type is the explicit
/// tag supplied to [`crate::index::MappingIndex::new`].
pub trait NameRegistry: Send + Sync {
    /// Record that `document_name` is owned by `instance_key`
    fn register(&self, adapter_type: &str, document_name: &str, instance_key: &str);

    /// Forget `document_name`; unknown names are a no-op
    fn unregister(&self, adapter_type: &str, document_name: &str);
}

/// Process-local [`NameRegistry`]
#[derive(Debug, Default)]
pub struct InMemoryNameRegistry {
    entries: DashMap<(String, String), String>,
}

impl InMemoryNameRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Instance key registered for a document, if any
    pub fn lookup(&self, adapter_type: &str, document_name: &str) -> Option<String> {
        self.entries
            .get(&(adapter_type.to_string(), document_name.to_string()))
            .map(|e| e.value().clone())
    }

    /// Number of registered documents
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NameRegistry for InMemoryNameRegistry {
    fn register(&self, adapter_type: &str, document_name: &str, instance_key: &str) {
        self.entries.insert(
            (adapter_type.to_string(), document_name.to_string()),
            instance_key.to_string(),
        );
    }

    fn unregister(&self, adapter_type: &str, document_name: &str) {
        self.entries
            .remove(&(adapter_type.to_string(), document_name.to_string()));
    }
}
