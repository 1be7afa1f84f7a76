//! Test doubles for the collaborator traits.
//!
//! These mocks let the mapping and dispatch engine be exercised without an
//! external store.
//!
//! # Example
//!
//! ```rust,ignore
//! use outrigger::testing::RecordingSync;
//!
//! let sync = Arc::new(RecordingSync::new());
//! let dispatcher = Dispatcher::new(index, sync.clone());
//! dispatcher.sync(&events).await?;
//! assert_eq!(sync.applied().len(), 2);
//! ```

use crate::event::ChangeEvent;
use crate::mapping::MappingConfig;
use crate::traits::{EtlResult, EtlService, RowCounter, SyncService};
use async_trait::async_trait;
use parking_lot::Mutex;

/// A write client that records every apply call
#[derive(Debug, Default)]
pub struct RecordingSync {
    applied: Mutex<Vec<(String, String)>>,
    fail_message: Mutex<Option<String>>,
}

impl RecordingSync {
    /// Create a recording write client
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent apply fail with an error
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_message.lock() = Some(message.into());
    }

    /// (document name, source table) pairs applied so far
    pub fn applied(&self) -> Vec<(String, String)> {
        self.applied.lock().clone()
    }

    /// Forget recorded applies
    pub fn clear(&self) {
        self.applied.lock().clear();
    }
}

#[async_trait]
impl SyncService for RecordingSync {
    async fn apply(&self, config: &MappingConfig, event: &ChangeEvent) -> anyhow::Result<()> {
        if let Some(message) = self.fail_message.lock().clone() {
            anyhow::bail!(message);
        }
        self.applied
            .lock()
            .push((config.document_name.clone(), event.table.clone()));
        Ok(())
    }
}

/// Backfill behavior of a [`ScriptedEtl`] double
#[derive(Debug, Clone)]
enum EtlScript {
    Succeed,
    FailFor(String),
    Error,
}

/// A backfill executor with scripted per-document outcomes
#[derive(Debug)]
pub struct ScriptedEtl {
    script: EtlScript,
    imported: Mutex<Vec<String>>,
}

impl ScriptedEtl {
    /// Every import succeeds with message `imported <document>`
    pub fn succeeding() -> Self {
        Self {
            script: EtlScript::Succeed,
            imported: Mutex::new(Vec::new()),
        }
    }

    /// Imports of `document_name` report failure, everything else succeeds
    pub fn failing_for(document_name: impl Into<String>) -> Self {
        Self {
            script: EtlScript::FailFor(document_name.into()),
            imported: Mutex::new(Vec::new()),
        }
    }

    /// Every import raises a hard collaborator error
    pub fn erroring() -> Self {
        Self {
            script: EtlScript::Error,
            imported: Mutex::new(Vec::new()),
        }
    }

    /// Document names imported so far
    pub fn imported(&self) -> Vec<String> {
        self.imported.lock().clone()
    }
}

#[async_trait]
impl EtlService for ScriptedEtl {
    async fn import(&self, config: &MappingConfig, _params: &[String]) -> anyhow::Result<EtlResult> {
        let name = config.document_name.clone();
        match &self.script {
            EtlScript::Error => anyhow::bail!("etl executor unavailable"),
            EtlScript::FailFor(failing) if *failing == name => {
                self.imported.lock().push(name.clone());
                Ok(EtlResult::failure(format!("import failed {name}")))
            }
            _ => {
                self.imported.lock().push(name.clone());
                Ok(EtlResult::success(format!("imported {name}")))
            }
        }
    }
}

/// A row counter that answers every query with the same number
#[derive(Debug)]
pub struct FixedRowCounter {
    count: u64,
}

impl FixedRowCounter {
    /// Create a counter answering `count` for every table
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

#[async_trait]
impl RowCounter for FixedRowCounter {
    async fn count_rows(&self, _target_table: &str) -> anyhow::Result<u64> {
        Ok(self.count)
    }
}
