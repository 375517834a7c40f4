//! Configuration for sharded services.

use serde::{Deserialize, Serialize};

/// Configuration for a [`Sharded`](super::Sharded) service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardedConfig {
    /// Number of shards (typically one per CPU core)
    #[serde(default = "default_shard_count")]
    pub shard_count: usize,

    /// Specific CPU core IDs to use for each shard.
    /// If empty, shard `i` runs on core `i`.
    #[serde(default)]
    pub core_ids: Vec<usize>,

    /// Pin shard threads to their cores
    #[serde(default = "default_true")]
    pub pin_threads: bool,

    /// Stack size for shard threads (bytes)
    #[serde(default = "default_stack_size")]
    pub stack_size: usize,
}

fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

fn default_true() -> bool {
    true
}

fn default_stack_size() -> usize {
    2 * 1024 * 1024
}

impl Default for ShardedConfig {
    fn default() -> Self {
        Self {
            shard_count: default_shard_count(),
            core_ids: Vec::new(),
            pin_threads: true,
            stack_size: default_stack_size(),
        }
    }
}

impl ShardedConfig {
    /// Config with an explicit shard count and defaults elsewhere.
    pub fn with_shards(shard_count: usize) -> Self {
        Self {
            shard_count,
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.shard_count == 0 {
            return Err("shard_count must be at least 1".to_string());
        }

        if self.shard_count > 256 {
            return Err("shard_count exceeds maximum of 256".to_string());
        }

        if !self.core_ids.is_empty() && self.core_ids.len() != self.shard_count {
            return Err(format!(
                "core_ids length ({}) must match shard_count ({})",
                self.core_ids.len(),
                self.shard_count
            ));
        }

        if self.stack_size < 64 * 1024 {
            return Err("stack_size must be at least 64KB".to_string());
        }

        Ok(())
    }

    /// Core id hosting `shard_id`.
    pub fn core_for_shard(&self, shard_id: usize) -> usize {
        self.core_ids.get(shard_id).copied().unwrap_or(shard_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShardedConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.shard_count > 0);
        assert!(config.pin_threads);
    }

    #[test]
    fn test_validation() {
        let mut config = ShardedConfig::with_shards(4);
        assert!(config.validate().is_ok());

        config.shard_count = 0;
        assert!(config.validate().is_err());

        config.shard_count = 4;
        config.core_ids = vec![0, 1]; // wrong length
        assert!(config.validate().is_err());

        config.core_ids = vec![4, 5, 6, 7];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_core_for_shard() {
        let config = ShardedConfig::with_shards(2);
        assert_eq!(config.core_for_shard(1), 1);

        let pinned = ShardedConfig {
            shard_count: 2,
            core_ids: vec![2, 4],
            ..Default::default()
        };
        assert_eq!(pinned.core_for_shard(0), 2);
        assert_eq!(pinned.core_for_shard(1), 4);
    }
}
