//! Adapter runtime configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Transport mode of the upstream pipeline deployment.
///
/// Tcp deployments do not support consumer-group partitioning, which
/// changes how routing keys are built (see [`crate::index::routing_key`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Direct TCP consumption from the pipeline (no consumer groups)
    Tcp,
    /// Kafka-backed consumption
    #[default]
    Kafka,
    /// RocketMQ-backed consumption
    RocketMq,
    /// RabbitMQ-backed consumption
    RabbitMq,
    /// Pulsar-backed consumption
    Pulsar,
}

impl TransportMode {
    /// Whether this deployment consumes over direct TCP
    pub fn is_tcp(&self) -> bool {
        matches!(self, Self::Tcp)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Kafka => write!(f, "kafka"),
            Self::RocketMq => write!(f, "rocketmq"),
            Self::RabbitMq => write!(f, "rabbitmq"),
            Self::Pulsar => write!(f, "pulsar"),
        }
    }
}

/// Configuration injected into an adapter instance at construction
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdapterConfig {
    /// Key binding mapping documents to this instance
    /// (see [`crate::mapping::MappingConfig::accepted_by`])
    pub key: String,

    /// Transport mode of the deployment
    #[serde(default)]
    pub mode: TransportMode,

    /// Free-form properties consumed by the write client
    /// (store address, credentials reference, etc.); opaque to the core
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl AdapterConfig {
    /// Create a config with an instance key and transport mode
    pub fn new(key: impl Into<String>, mode: TransportMode) -> Self {
        Self {
            key: key.into(),
            mode,
            properties: HashMap::new(),
        }
    }

    /// Add a property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}
