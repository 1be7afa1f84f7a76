//! Adapter facade: wires the index, the dispatcher and the admin operations,
//! and owns the configuration lifecycle.

use crate::admin::{AdminOps, RowCount};
use crate::config::AdapterConfig;
use crate::dispatch::{DispatchStatsSnapshot, Dispatcher};
use crate::error::{AdapterError, Result};
use crate::event::ChangeEvent;
use crate::index::MappingIndex;
use crate::loader::ConfigChange;
use crate::mapping::MappingConfig;
use crate::traits::{EtlResult, EtlService, NameRegistry, RowCounter, SyncService};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Registry tag under which this adapter's documents are recorded
pub const ADAPTER_TYPE: &str = "outrigger";

/// External collaborators injected at construction
pub struct Collaborators {
    /// Write client for live change events
    pub sync: Arc<dyn SyncService>,
    /// Bulk-backfill executor
    pub etl: Arc<dyn EtlService>,
    /// Row-count facility
    pub counter: Arc<dyn RowCounter>,
    /// Cross-instance document registry
    pub registry: Arc<dyn NameRegistry>,
}

/// One adapter instance: an index of accepted mapping documents plus the
/// dispatch and admin surfaces over it
pub struct Adapter {
    config: AdapterConfig,
    index: Arc<MappingIndex>,
    dispatcher: Dispatcher,
    admin: AdminOps,
}

impl Adapter {
    /// Build an adapter and populate its index from the initially loaded
    /// documents.
    ///
    /// Documents not addressed to this instance are dropped silently. An
    /// adapter with nothing to route for must not start: when zero documents
    /// are accepted, init fails with
    /// [`AdapterError::NoAcceptedConfigs`].
    pub fn init(
        config: AdapterConfig,
        documents: HashMap<String, MappingConfig>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let index = Arc::new(MappingIndex::new(
            ADAPTER_TYPE,
            config.key.clone(),
            config.mode,
            collaborators.registry,
        ));
        for (name, document) in documents {
            index.insert(&name, document);
        }
        if index.is_empty() {
            return Err(AdapterError::NoAcceptedConfigs {
                instance_key: config.key.clone(),
            });
        }
        info!(
            instance = %config.key,
            mode = %config.mode,
            configs = index.len(),
            "adapter initialized"
        );

        let dispatcher = Dispatcher::new(Arc::clone(&index), collaborators.sync);
        let admin = AdminOps::new(Arc::clone(&index), collaborators.etl, collaborators.counter);
        Ok(Self {
            config,
            index,
            dispatcher,
            admin,
        })
    }

    /// The runtime configuration this instance was built with
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// The mapping index; mutation goes through its own API or
    /// [`on_config_change`](Self::on_config_change)
    pub fn index(&self) -> &Arc<MappingIndex> {
        &self.index
    }

    /// Apply one configuration-source mutation from the external monitor
    pub fn on_config_change(&self, change: ConfigChange) -> Result<()> {
        match change {
            ConfigChange::Added { name, config } => {
                self.index.insert(&name, config);
                Ok(())
            }
            ConfigChange::Updated { name, config } => self.index.upsert(&name, config),
            ConfigChange::Removed { name } => {
                self.index.remove(&name);
                Ok(())
            }
        }
    }

    /// Apply a batch of change events (see [`Dispatcher::sync`])
    pub async fn sync(&self, events: &[ChangeEvent]) -> anyhow::Result<()> {
        self.dispatcher.sync(events).await
    }

    /// Trigger a backfill (see [`AdminOps::etl`])
    pub async fn etl(
        &self,
        task: &str,
        write_mode: Option<&str>,
        params: &[String],
    ) -> anyhow::Result<Option<EtlResult>> {
        self.admin.etl(task, write_mode, params).await
    }

    /// Row count of a mapped target table (see [`AdminOps::count`])
    pub async fn count(&self, task: &str) -> anyhow::Result<Option<RowCount>> {
        self.admin.count(task).await
    }

    /// Destination of a document (see [`AdminOps::destination_of`])
    pub fn destination_of(&self, task: &str) -> Option<String> {
        self.admin.destination_of(task)
    }

    /// Snapshot of the dispatch counters
    pub fn dispatch_stats(&self) -> DispatchStatsSnapshot {
        self.dispatcher.stats()
    }

    /// Shut the instance down.
    ///
    /// The index and counters are dropped with the adapter; collaborators
    /// own their connections and close them on their side.
    pub fn destroy(&self) {
        info!(instance = %self.config.key, "adapter shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportMode;
    use crate::loader::load_document;
    use crate::mapping::TableMapping;
    use crate::testing::{FixedRowCounter, RecordingSync, ScriptedEtl};
    use crate::traits::InMemoryNameRegistry;
    use serde_json::json;

    fn doc(group_id: Option<&str>) -> MappingConfig {
        MappingConfig {
            document_name: String::new(),
            outer_adapter_key: Some("warehouse-1".into()),
            destination: "d".into(),
            group_id: group_id.map(Into::into),
            mapping: TableMapping {
                database: "db".into(),
                table: "t".into(),
                target_table: Some("dwh.t".into()),
                target_pk: Default::default(),
                column_map: Default::default(),
                map_all: true,
            },
        }
    }

    fn adapter_with(
        documents: HashMap<String, MappingConfig>,
    ) -> (Result<Adapter>, Arc<RecordingSync>) {
        let sync = Arc::new(RecordingSync::new());
        let adapter = Adapter::init(
            AdapterConfig::new("warehouse-1", TransportMode::Kafka),
            documents,
            Collaborators {
                sync: sync.clone(),
                etl: Arc::new(ScriptedEtl::succeeding()),
                counter: Arc::new(FixedRowCounter::new(7)),
                registry: Arc::new(InMemoryNameRegistry::new()),
            },
        );
        (adapter, sync)
    }

    fn event(group_id: &str) -> ChangeEvent {
        let mut event = ChangeEvent::insert("d", "db", "t", vec![json!({"id": 1})], 0);
        if !group_id.is_empty() {
            event = event.with_group(group_id);
        }
        event
    }

    #[test]
    fn test_init_fails_with_zero_accepted_documents() {
        let (adapter, _) = adapter_with(HashMap::new());
        assert!(matches!(
            adapter,
            Err(AdapterError::NoAcceptedConfigs { .. })
        ));

        // Documents addressed to another instance do not count either.
        let mut foreign = doc(None);
        foreign.outer_adapter_key = Some("someone-else".into());
        let (adapter, _) = adapter_with(HashMap::from([("foreign.yml".to_string(), foreign)]));
        assert!(adapter.is_err());
    }

    #[tokio::test]
    async fn test_end_to_end_group_fanout() {
        // C1 applies to all groups, C2 only to group "g"; both share the
        // routing identity (destination "d", db "db", table "t").
        let documents = HashMap::from([
            ("c1.yml".to_string(), doc(None)),
            ("c2.yml".to_string(), doc(Some("g"))),
        ]);
        let (adapter, sync) = adapter_with(documents);
        let adapter = adapter.unwrap();

        // Group "g": the non-tcp key "d-g_db-t" selects C2's bucket; C1 keys
        // under "d-_db-t" and is not in play.
        adapter.sync(&[event("g")]).await.unwrap();
        assert_eq!(sync.applied(), vec![("c2.yml".to_string(), "t".to_string())]);

        // Empty group resolves C1's bucket.
        sync.clear();
        adapter.sync(&[event("")]).await.unwrap();
        assert_eq!(sync.applied(), vec![("c1.yml".to_string(), "t".to_string())]);

        // Unknown group: no bucket at all.
        sync.clear();
        adapter.sync(&[event("x")]).await.unwrap();
        assert!(sync.applied().is_empty());
        assert_eq!(adapter.dispatch_stats().unresolved_total, 1);
    }

    #[tokio::test]
    async fn test_end_to_end_group_fanout_tcp() {
        let sync = Arc::new(RecordingSync::new());
        let adapter = Adapter::init(
            AdapterConfig::new("warehouse-1", TransportMode::Tcp),
            HashMap::from([
                ("c1.yml".to_string(), doc(None)),
                ("c2.yml".to_string(), doc(Some("g"))),
            ]),
            Collaborators {
                sync: sync.clone(),
                etl: Arc::new(ScriptedEtl::succeeding()),
                counter: Arc::new(FixedRowCounter::new(7)),
                registry: Arc::new(InMemoryNameRegistry::new()),
            },
        )
        .unwrap();

        // Tcp keys ignore the group, so C1 and C2 share one bucket: an event
        // with group "g" matches both, "x" matches only the all-groups C1.
        adapter.sync(&[event("g")]).await.unwrap();
        let mut applied = sync.applied();
        applied.sort();
        assert_eq!(
            applied,
            vec![
                ("c1.yml".to_string(), "t".to_string()),
                ("c2.yml".to_string(), "t".to_string())
            ]
        );

        sync.clear();
        adapter.sync(&[event("x")]).await.unwrap();
        assert_eq!(sync.applied(), vec![("c1.yml".to_string(), "t".to_string())]);
    }

    #[tokio::test]
    async fn test_config_change_notifications() {
        let (adapter, sync) = adapter_with(HashMap::from([("c1.yml".to_string(), doc(None))]));
        let adapter = adapter.unwrap();

        // Added
        let added = load_document(
            "c2.yml",
            r#"
destination: d
group_id: g
outer_adapter_key: warehouse-1
mapping:
  database: db
  table: t
  target_table: dwh.t
"#,
        )
        .unwrap();
        adapter
            .on_config_change(ConfigChange::Added {
                name: "c2.yml".into(),
                config: added,
            })
            .unwrap();
        adapter.sync(&[event("g")]).await.unwrap();
        assert_eq!(sync.applied().len(), 1);

        // Updated with a foreign owner key is refused.
        let mut stolen = doc(Some("g"));
        stolen.outer_adapter_key = Some("someone-else".into());
        let err = adapter
            .on_config_change(ConfigChange::Updated {
                name: "c2.yml".into(),
                config: stolen,
            })
            .unwrap_err();
        assert!(matches!(err, AdapterError::OwnershipViolation { .. }));

        // Removed
        adapter
            .on_config_change(ConfigChange::Removed {
                name: "c2.yml".into(),
            })
            .unwrap();
        sync.clear();
        adapter.sync(&[event("g")]).await.unwrap();
        assert!(sync.applied().is_empty());
    }

    #[tokio::test]
    async fn test_admin_surface() {
        let (adapter, _) = adapter_with(HashMap::from([("c1.yml".to_string(), doc(None))]));
        let adapter = adapter.unwrap();

        assert_eq!(adapter.destination_of("c1.yml").as_deref(), Some("d"));
        let count = adapter.count("c1.yml").await.unwrap().unwrap();
        assert_eq!(count.count, 7);
        let etl = adapter.etl("c1.yml", None, &[]).await.unwrap().unwrap();
        assert!(etl.succeeded);
    }

    #[tokio::test]
    async fn test_etl_collaborator_error_propagates() {
        let sync = Arc::new(RecordingSync::new());
        let adapter = Adapter::init(
            AdapterConfig::new("warehouse-1", TransportMode::Kafka),
            HashMap::from([("c1.yml".to_string(), doc(None))]),
            Collaborators {
                sync,
                etl: Arc::new(ScriptedEtl::erroring()),
                counter: Arc::new(FixedRowCounter::new(0)),
                registry: Arc::new(InMemoryNameRegistry::new()),
            },
        )
        .unwrap();

        let err = adapter.etl("c1.yml", None, &[]).await.unwrap_err();
        assert!(err.to_string().contains("etl executor unavailable"));
    }
}
