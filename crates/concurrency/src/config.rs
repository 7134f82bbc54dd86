//! Transaction configuration
//!
//! Settings are plain serde data so they can live in the embedding
//! application's TOML config file:
//!
//! ```toml
//! # Fail commits that leave unclaimed diff layers behind (default: true)
//! strict_participants = true
//!
//! # Maximum number of containers one transaction may touch (default: unbounded)
//! max_layers_per_transaction = 4096
//! ```

use serde::{Deserialize, Serialize};
use strata_core::{Error, Result};

/// Configuration for [`TransactionManager`](crate::TransactionManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Reject commits when the context holds layers no participant owns.
    /// When false, such layers are dropped with a warning.
    #[serde(default = "default_strict_participants")]
    pub strict_participants: bool,
    /// Maximum number of diff layers per transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_layers_per_transaction: Option<usize>,
}

fn default_strict_participants() -> bool {
    true
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            strict_participants: default_strict_participants(),
            max_layers_per_transaction: None,
        }
    }
}

impl TransactionConfig {
    /// Parse from TOML text; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Builder: set participant strictness
    pub fn with_strict_participants(mut self, strict: bool) -> Self {
        self.strict_participants = strict;
        self
    }

    /// Builder: bound the number of layers per transaction
    pub fn with_max_layers_per_transaction(mut self, limit: usize) -> Self {
        self.max_layers_per_transaction = Some(limit);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_layers_per_transaction == Some(0) {
            return Err(Error::InvalidConfig(
                "max_layers_per_transaction must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
