//! Row-level change events received from the upstream replication pipeline.
//!
//! One `ChangeEvent` carries every row image captured for a single
//! (database, table) operation, together with the routing identity the
//! dispatcher resolves against: the upstream pipeline name (`destination`)
//! and the optional consumer-group label (`group_id`).

use serde::{Deserialize, Serialize};

/// Operation type of a captured row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Row(s) inserted
    Insert,
    /// Row(s) updated
    Update,
    /// Row(s) deleted
    Delete,
    /// Table truncated
    Truncate,
}

/// A row-level change captured from a source database's replication stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Logical name of the upstream replication pipeline
    pub destination: String,
    /// Consumer-group partition label, when the deployment uses groups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Source database name
    pub database: String,
    /// Source table name
    pub table: String,
    /// Operation type
    pub op: ChangeOp,
    /// Current row images (INSERT/UPDATE)
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
    /// Previous row images (UPDATE/DELETE)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Vec<serde_json::Value>>,
    /// Capture timestamp (epoch millis)
    pub ts: i64,
}

impl ChangeEvent {
    /// Create a new INSERT event
    pub fn insert(
        destination: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
        rows: Vec<serde_json::Value>,
        ts: i64,
    ) -> Self {
        Self {
            destination: destination.into(),
            group_id: None,
            database: database.into(),
            table: table.into(),
            op: ChangeOp::Insert,
            rows,
            old: None,
            ts,
        }
    }

    /// Create a new UPDATE event
    pub fn update(
        destination: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
        old: Vec<serde_json::Value>,
        rows: Vec<serde_json::Value>,
        ts: i64,
    ) -> Self {
        Self {
            destination: destination.into(),
            group_id: None,
            database: database.into(),
            table: table.into(),
            op: ChangeOp::Update,
            rows,
            old: Some(old),
            ts,
        }
    }

    /// Create a new DELETE event
    pub fn delete(
        destination: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
        old: Vec<serde_json::Value>,
        ts: i64,
    ) -> Self {
        Self {
            destination: destination.into(),
            group_id: None,
            database: database.into(),
            table: table.into(),
            op: ChangeOp::Delete,
            rows: Vec::new(),
            old: Some(old),
            ts,
        }
    }

    /// Set the consumer-group label
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Destination, trimmed; never absent
    pub fn destination_trimmed(&self) -> &str {
        self.destination.trim()
    }

    /// Consumer-group label, trimmed; empty string when unset
    pub fn group_trimmed(&self) -> &str {
        self.group_id.as_deref().unwrap_or("").trim()
    }

    /// Number of row images carried by this event
    pub fn row_count(&self) -> usize {
        match self.op {
            ChangeOp::Delete => self.old.as_ref().map(Vec::len).unwrap_or(0),
            _ => self.rows.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_event() {
        let event = ChangeEvent::insert("d1", "db", "users", vec![json!({"id": 1})], 1_700_000_000);
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.row_count(), 1);
        assert!(event.old.is_none());
        assert_eq!(event.group_trimmed(), "");
    }

    #[test]
    fn test_delete_event_row_count() {
        let event = ChangeEvent::delete("d1", "db", "users", vec![json!({"id": 1})], 0);
        assert_eq!(event.row_count(), 1);
        assert!(event.rows.is_empty());
    }

    #[test]
    fn test_group_normalization() {
        let event = ChangeEvent::insert("d1", "db", "t", vec![], 0).with_group("  g1  ");
        assert_eq!(event.group_trimmed(), "g1");

        let event = ChangeEvent::insert("  d1 ", "db", "t", vec![], 0);
        assert_eq!(event.destination_trimmed(), "d1");
    }

    #[test]
    fn test_op_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ChangeOp::Insert).unwrap(), "\"insert\"");
        let op: ChangeOp = serde_json::from_str("\"truncate\"").unwrap();
        assert_eq!(op, ChangeOp::Truncate);
    }

    #[test]
    fn test_event_roundtrip() {
        let event = ChangeEvent::update(
            "d1",
            "db",
            "users",
            vec![json!({"id": 1, "name": "old"})],
            vec![json!({"id": 1, "name": "new"})],
            1_700_000_000,
        )
        .with_group("g1");

        let json = serde_json::to_string(&event).unwrap();
        let back: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.op, ChangeOp::Update);
        assert_eq!(back.group_id.as_deref(), Some("g1"));
        assert_eq!(back.old.unwrap().len(), 1);
    }
}
