//! Feed Cache Configuration
//!
//! Controls the shape of the shared block pool and the default per-partition
//! working set:
//!
//! - **block_size**: feed items per cache block (default: 64). A power of two
//!   keeps block boundaries aligned with the transaction id space.
//! - **max_blocks_per_partition**: default working-set cap for a partition
//!   (default: 32). Adjustable live per partition via
//!   `PartitionCache::set_max_blocks`.
//! - **shared_capacity**: maximum blocks in circulation across all partitions
//!   (default: 1024). At the cap, checkouts report exhaustion and callers
//!   fall through to storage.
//!
//! ## Usage
//!
//! ```ignore
//! use ledgerstream_cache::CacheConfig;
//!
//! // Small cache for a test server
//! let config = CacheConfig {
//!     block_size: 4,
//!     max_blocks_per_partition: 2,
//!     ..Default::default()
//! };
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Feed items per block (default: 64)
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Default per-partition block cap (default: 32)
    #[serde(default = "default_max_blocks_per_partition")]
    pub max_blocks_per_partition: usize,

    /// Maximum blocks in circulation across all partitions (default: 1024)
    #[serde(default = "default_shared_capacity")]
    pub shared_capacity: usize,
}

impl CacheConfig {
    /// Check the configuration for values the pool cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidConfig("block_size must be > 0".to_string()));
        }
        if self.max_blocks_per_partition == 0 {
            return Err(Error::InvalidConfig(
                "max_blocks_per_partition must be > 0".to_string(),
            ));
        }
        if self.shared_capacity == 0 {
            return Err(Error::InvalidConfig(
                "shared_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            max_blocks_per_partition: default_max_blocks_per_partition(),
            shared_capacity: default_shared_capacity(),
        }
    }
}

fn default_block_size() -> usize {
    64
}

fn default_max_blocks_per_partition() -> usize {
    32
}

fn default_shared_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.block_size, 64);
        assert_eq!(config.max_blocks_per_partition, 32);
        assert_eq!(config.shared_capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let config = CacheConfig {
            block_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_partition_cap_rejected() {
        let config = CacheConfig {
            max_blocks_per_partition: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_shared_capacity_rejected() {
        let config = CacheConfig {
            shared_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_power_of_two_block_size_allowed() {
        // Block boundaries are computed with modulo arithmetic, so any
        // positive block size works; powers of two are merely conventional.
        let config = CacheConfig {
            block_size: 10,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: CacheConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config.block_size, 64);
        assert_eq!(config.shared_capacity, 1024);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = CacheConfig {
            block_size: 16,
            max_blocks_per_partition: 4,
            shared_capacity: 256,
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let back: CacheConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.block_size, 16);
        assert_eq!(back.max_blocks_per_partition, 4);
        assert_eq!(back.shared_capacity, 256);
    }
}
