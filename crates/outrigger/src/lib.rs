//! outrigger - mapping and dispatch runtime for CDC outer adapters.
//!
//! An outer adapter sits at the downstream end of a database replication
//! pipeline: it receives batches of row-level change events and applies them
//! to an external analytical store, selecting the target table and column
//! mapping dynamically from a set of hot-reloadable mapping documents.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Adapter                             │
//! │                                                            │
//! │   ConfigChange ──► MappingIndex ◄── Dispatcher ◄── events  │
//! │   (external         by_name │           │                  │
//! │    monitor)         by_route│           ▼                  │
//! │                             │      SyncService             │
//! │                             ▼      (write client)          │
//! │                         AdminOps ──► EtlService,           │
//! │                                      RowCounter            │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core owns only the in-memory mapping state; everything that touches
//! the external store is a collaborator behind a trait (see [`traits`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use outrigger::{Adapter, AdapterConfig, Collaborators, TransportMode};
//!
//! let documents = outrigger::load_dir(Path::new("./mappings"))?;
//! let adapter = Adapter::init(
//!     AdapterConfig::new("warehouse-1", TransportMode::Kafka),
//!     documents,
//!     collaborators,
//! )?;
//!
//! adapter.sync(&batch).await?;
//! ```

pub mod adapter;
pub mod admin;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod index;
pub mod loader;
pub mod mapping;
pub mod testing;
pub mod traits;

pub use adapter::{Adapter, Collaborators, ADAPTER_TYPE};
pub use admin::{AdminOps, RowCount};
pub use config::{AdapterConfig, TransportMode};
pub use dispatch::{DispatchStats, DispatchStatsSnapshot, Dispatcher};
pub use error::{AdapterError, Result};
pub use event::{ChangeEvent, ChangeOp};
pub use index::{routing_key, MappingIndex};
pub use loader::{load_dir, load_document, ConfigChange};
pub use mapping::{MappingConfig, TableMapping, AUTO_GENERATED_PREFIX};
pub use traits::{
    EtlResult, EtlService, InMemoryNameRegistry, NameRegistry, RowCounter, SyncService,
};
