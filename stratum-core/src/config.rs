//! Session configuration.

use crate::partition::Partition;
use crate::uri::Uri;
use serde::{Deserialize, Serialize};

/// Configuration for one cache session over one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// URI of the model this session is scoped to.
    pub model_uri: Uri,
    /// Partitions a delete is applied to, in store-phase iteration order.
    pub system_partitions: Vec<Partition>,
    /// Partition scanned at init for subtype relations and default settings.
    pub schema_partition: Partition,
    /// When set, replacing a cached handle with a different handle for the
    /// same URI is treated as corruption rather than routine re-population.
    pub strict_duplicates: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model_uri: Uri::new("urn:stratum:model:default"),
            system_partitions: Partition::SYSTEM.to_vec(),
            schema_partition: Partition::Meta,
            strict_duplicates: false,
        }
    }
}

impl SessionConfig {
    /// Create a config for the given model with default partitions.
    pub fn new(model_uri: impl Into<Uri>) -> Self {
        Self {
            model_uri: model_uri.into(),
            ..Self::default()
        }
    }

    /// Override the system partitions.
    pub fn with_system_partitions(mut self, partitions: Vec<Partition>) -> Self {
        self.system_partitions = partitions;
        self
    }

    /// Override the schema partition.
    pub fn with_schema_partition(mut self, partition: Partition) -> Self {
        self.schema_partition = partition;
        self
    }

    /// Enable strict duplicate-handle detection.
    pub fn with_strict_duplicates(mut self, strict: bool) -> Self {
        self.strict_duplicates = strict;
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.system_partitions, Partition::SYSTEM.to_vec());
        assert_eq!(config.schema_partition, Partition::Meta);
        assert!(!config.strict_duplicates);
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::new("urn:stratum:model:42")
            .with_system_partitions(vec![Partition::Asserted])
            .with_schema_partition(Partition::Asserted)
            .with_strict_duplicates(true);
        assert_eq!(config.model_uri.as_str(), "urn:stratum:model:42");
        assert_eq!(config.system_partitions, vec![Partition::Asserted]);
        assert!(config.strict_duplicates);
    }
}
