//! Administrative operations keyed by document name.
//!
//! Every operation here resolves through the index's `by_name` view: a
//! backfill trigger ([`AdminOps::etl`]), a target-table row count
//! ([`AdminOps::count`]) and a destination lookup
//! ([`AdminOps::destination_of`]).

use crate::index::MappingIndex;
use crate::traits::{EtlResult, EtlService, RowCounter};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Row count of one target table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowCount {
    /// The counted target table
    pub target_table: String,
    /// Number of rows
    pub count: u64,
}

/// Administrative operations over one adapter instance's index
pub struct AdminOps {
    index: Arc<MappingIndex>,
    etl: Arc<dyn EtlService>,
    counter: Arc<dyn RowCounter>,
}

impl AdminOps {
    /// Create admin operations over an index and its collaborators
    pub fn new(
        index: Arc<MappingIndex>,
        etl: Arc<dyn EtlService>,
        counter: Arc<dyn RowCounter>,
    ) -> Self {
        Self { index, etl, counter }
    }

    /// Trigger a backfill.
    ///
    /// `task` is first treated as a document name; when no document matches,
    /// it is reinterpreted as a destination and every config bound to that
    /// destination is backfilled, aggregating the per-config outcomes:
    /// overall success is the conjunction of per-config success, and the
    /// newline-joined messages land in the result or error slot accordingly.
    /// Returns `None` when neither interpretation matches anything.
    ///
    /// `write_mode` is part of the administrative surface; the backfill
    /// executor does not consume it.
    pub async fn etl(
        &self,
        task: &str,
        _write_mode: Option<&str>,
        params: &[String],
    ) -> anyhow::Result<Option<EtlResult>> {
        if let Some(config) = self.index.get(task) {
            info!(document = task, "triggering backfill");
            return Ok(Some(self.etl.import(&config, params).await?));
        }

        let mut messages = String::new();
        let mut succeeded = true;
        for config in self.index.configs() {
            if config.destination == task {
                info!(
                    document = %config.document_name,
                    destination = task,
                    "triggering backfill by destination"
                );
                let result = self.etl.import(&config, params).await?;
                if !result.succeeded {
                    succeeded = false;
                    if let Some(message) = result.error_message {
                        messages.push_str(&message);
                        messages.push('\n');
                    }
                } else if let Some(message) = result.result_message {
                    messages.push_str(&message);
                    messages.push('\n');
                }
            }
        }

        if messages.is_empty() {
            return Ok(None);
        }
        Ok(Some(if succeeded {
            EtlResult::success(messages)
        } else {
            EtlResult::failure(messages)
        }))
    }

    /// Row count of the target table mapped by `task`.
    ///
    /// `None` when the document is unknown or names no target table.
    pub async fn count(&self, task: &str) -> anyhow::Result<Option<RowCount>> {
        let Some(config) = self.index.get(task) else {
            return Ok(None);
        };
        let Some(target_table) = config.mapping.target_table.clone() else {
            return Ok(None);
        };
        let count = self.counter.count_rows(&target_table).await?;
        Ok(Some(RowCount { target_table, count }))
    }

    /// Destination of the document, if known
    pub fn destination_of(&self, task: &str) -> Option<String> {
        self.index.get(task).map(|config| config.destination.clone())
    }
}
