//! Mapping documents: one source-table-to-target-table binding each.
//!
//! A mapping document describes how rows captured from one source table are
//! written into one target table of the external analytical store. Documents
//! are externally loaded (see [`crate::loader`]) and carry an addressing
//! rule deciding which adapter instance they belong to
//! ([`MappingConfig::accepted_by`]).
//!
//! ## Example document
//!
//! ```yaml
//! destination: orders-pipeline
//! group_id: g1
//! outer_adapter_key: warehouse-1
//! mapping:
//!   database: shop
//!   table: orders
//!   target_table: dwh.orders
//!   target_pk:
//!     id: id
//!   map_all: true
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Prefix of auto-generated adapter instance keys.
///
/// Deployments that do not assign explicit instance keys derive one from the
/// subscription identity as `auto-generated-<destination>-<group>`.
pub const AUTO_GENERATED_PREFIX: &str = "auto-generated";

/// One externally-loaded source-to-target table binding
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct MappingConfig {
    /// Identity under which this document was loaded (its file name),
    /// stamped by the loader; stable for the config's lifetime
    #[serde(skip)]
    pub document_name: String,

    /// Owning-adapter key; when set it must equal the instance key for the
    /// document to be accepted
    #[serde(default)]
    pub outer_adapter_key: Option<String>,

    /// Logical source-pipeline name
    #[validate(length(min = 1))]
    pub destination: String,

    /// Consumer-group label; absent or empty applies to all groups
    #[serde(default)]
    pub group_id: Option<String>,

    /// The table binding itself
    #[validate(nested)]
    pub mapping: TableMapping,
}

/// Source table identity and target schema metadata
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct TableMapping {
    /// Source database name
    #[validate(length(min = 1))]
    pub database: String,

    /// Source table name
    #[validate(length(min = 1))]
    pub table: String,

    /// Target table in the analytical store; row counting and backfill
    /// need it, dispatch does not
    #[serde(default)]
    pub target_table: Option<String>,

    /// Target primary-key columns (target column -> source column)
    #[serde(default)]
    pub target_pk: HashMap<String, String>,

    /// Explicit column map (target column -> source column)
    #[serde(default)]
    pub column_map: HashMap<String, String>,

    /// Copy all source columns by name when no explicit column map is given
    #[serde(default)]
    pub map_all: bool,
}

impl MappingConfig {
    /// Destination, trimmed
    pub fn destination_trimmed(&self) -> &str {
        self.destination.trim()
    }

    /// Consumer-group label, trimmed; empty string when unset
    pub fn group(&self) -> &str {
        self.group_id.as_deref().unwrap_or("").trim()
    }

    /// Whether this document is addressed to the given adapter instance.
    ///
    /// A document declaring an `outer_adapter_key` belongs to the instance
    /// whose key equals it (case-insensitively). A document without one
    /// belongs to any instance whose key begins with the auto-generated
    /// prefix for the document's subscription identity,
    /// `auto-generated-<destination>-<group>` (the group part may be empty).
    ///
    /// Documents failing both checks are invisible to this instance and must
    /// never reach the index.
    pub fn accepted_by(&self, instance_key: &str) -> bool {
        match self.outer_adapter_key.as_deref() {
            Some(key) => key.eq_ignore_ascii_case(instance_key),
            None => {
                let prefix = format!(
                    "{}-{}-{}",
                    AUTO_GENERATED_PREFIX,
                    self.destination,
                    self.group_id.as_deref().unwrap_or("")
                );
                instance_key.starts_with(&prefix)
            }
        }
    }
}
