//! Mapping-document loading.
//!
//! Parses YAML mapping documents and stamps each with the document name it
//! was loaded under. Filesystem watching is owned by an external monitor,
//! which drives the adapter through [`ConfigChange`] notifications
//! ([`crate::adapter::Adapter::on_config_change`]).

use crate::mapping::MappingConfig;
use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};
use validator::Validate;

/// A configuration-source mutation observed by the external monitor
#[derive(Debug, Clone)]
pub enum ConfigChange {
    /// A new document appeared
    Added {
        /// Document name (file name)
        name: String,
        /// Parsed document
        config: MappingConfig,
    },
    /// An existing document changed
    Updated {
        /// Document name (file name)
        name: String,
        /// Parsed replacement
        config: MappingConfig,
    },
    /// A document disappeared
    Removed {
        /// Document name (file name)
        name: String,
    },
}

/// Parse and validate one mapping document, stamping its name
pub fn load_document(name: &str, content: &str) -> anyhow::Result<MappingConfig> {
    let mut config: MappingConfig = serde_yaml::from_str(content)
        .with_context(|| format!("failed to parse mapping document '{name}'"))?;
    config
        .validate()
        .with_context(|| format!("mapping document '{name}' failed validation"))?;
    config.document_name = name.to_string();
    Ok(config)
}

/// Load every `.yml`/`.yaml` document in a directory, keyed by file name.
///
/// Unparseable documents are skipped with a warning; one bad document must
/// not take the whole load down.
pub fn load_dir(dir: &Path) -> anyhow::Result<HashMap<String, MappingConfig>> {
    let mut configs = HashMap::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read mapping directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !matches!(extension, "yml" | "yaml") {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match load_document(&name, &content) {
            Ok(config) => {
                configs.insert(name, config);
            }
            Err(err) => warn!(document = %name, "skipping mapping document: {err:#}"),
        }
    }
    info!(
        count = configs.len(),
        directory = %dir.display(),
        "loaded mapping documents"
    );
    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
destination: d1
group_id: g1
outer_adapter_key: warehouse-1
mapping:
  database: shop
  table: orders
  target_table: dwh.orders
"#;

    #[test]
    fn test_load_document_stamps_name() {
        let config = load_document("orders.yml", VALID).unwrap();
        assert_eq!(config.document_name, "orders.yml");
        assert_eq!(config.destination, "d1");
    }

    #[test]
    fn test_load_document_rejects_bad_yaml() {
        let err = load_document("broken.yml", "destination: [").unwrap_err();
        assert!(err.to_string().contains("broken.yml"));
    }

    #[test]
    fn test_load_document_rejects_invalid_fields() {
        let invalid = r#"
destination: d1
mapping:
  database: ""
  table: orders
"#;
        let err = load_document("invalid.yml", invalid).unwrap_err();
        assert!(err.to_string().contains("failed validation"));
    }

    #[test]
    fn test_load_dir_skips_bad_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("orders.yml"), VALID).unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "mapping: [").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a mapping").unwrap();

        let configs = load_dir(dir.path()).unwrap();
        assert_eq!(configs.len(), 1);
        assert!(configs.contains_key("orders.yml"));
    }

    #[test]
    fn test_load_dir_missing_directory_fails() {
        let err = load_dir(Path::new("/nonexistent/mappings")).unwrap_err();
        assert!(err.to_string().contains("mapping directory"));
    }
}
