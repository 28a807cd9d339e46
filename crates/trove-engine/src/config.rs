//! Engine configuration
//!
//! Policy decisions live here rather than in ambient state so that
//! differently-configured engines can coexist, e.g. a strict
//! interactive engine next to a lenient import engine.

use serde::{Deserialize, Serialize};
use trove_core::CodeConfig;

/// What to do when a child is attached under an asset whose model is
/// not marked as a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContainerPolicy {
    /// Reject the operation. The interactive default: flipping a shared
    /// model as a side effect of a tree operation is surprising.
    #[default]
    Reject,
    /// Promote the model to a container and proceed. Used by the bulk
    /// importer, where historical data is taken at its word.
    AutoPromote,
}

/// Configuration for engine operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Container promotion policy for attach and move
    pub container_policy: ContainerPolicy,
    /// Upper bound on the generate-and-retry loop of the allocator.
    ///
    /// The reference behavior retried forever; a bound keeps a full
    /// code space from hanging the caller.
    pub max_generate_attempts: u32,
    /// Prefix configuration for checksummed codes
    pub code_config: CodeConfig,
}

impl EngineConfig {
    /// Configuration used by the bulk importer: auto-promotion on.
    pub fn importing() -> Self {
        Self {
            container_policy: ContainerPolicy::AutoPromote,
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            container_policy: ContainerPolicy::default(),
            max_generate_attempts: 10_000,
            code_config: CodeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.container_policy, ContainerPolicy::Reject);
        assert_eq!(config.max_generate_attempts, 10_000);
        assert_eq!(config.code_config.default_prefix, "INV");
    }

    #[test]
    fn test_importing_auto_promotes() {
        let config = EngineConfig::importing();
        assert_eq!(config.container_policy, ContainerPolicy::AutoPromote);
    }
}
