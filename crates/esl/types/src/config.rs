//! Configuration for the ownership core

use crate::error::{EslError, EslResult};
use crate::ids::Context;
use serde::{Deserialize, Serialize};

/// Upper bound on the ownership journal; larger values are almost certainly
/// a units mistake.
pub const MAX_JOURNAL_CAPACITY: usize = 10_000_000;

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EslConfig {
    /// Ownership ledger configuration
    pub ownership: OwnershipConfig,

    /// Type-dispatch configuration
    pub dispatch: DispatchConfig,
}

impl EslConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> EslResult<Self> {
        let config: EslConfig =
            serde_json::from_str(json).map_err(|e| EslError::InvalidConfiguration {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> EslResult<()> {
        self.ownership.validate()?;
        self.dispatch.validate()?;
        Ok(())
    }
}

/// Ownership ledger configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipConfig {
    /// Number of ownership events retained in the journal (0 disables it)
    pub journal_capacity: usize,

    /// Whether a transfer from an agent to itself is accepted as a no-op.
    /// When false it is rejected as an invalid extent movement.
    pub allow_self_transfer: bool,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            journal_capacity: 1024,
            allow_self_transfer: true,
        }
    }
}

impl OwnershipConfig {
    /// Reject a journal capacity above [`MAX_JOURNAL_CAPACITY`]
    pub fn validate(&self) -> EslResult<()> {
        if self.journal_capacity > MAX_JOURNAL_CAPACITY {
            return Err(EslError::InvalidConfiguration {
                reason: format!(
                    "journal_capacity {} exceeds maximum {}",
                    self.journal_capacity, MAX_JOURNAL_CAPACITY
                ),
            });
        }
        Ok(())
    }
}

/// Type-dispatch configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Contexts in which a missing handler is skipped by lenient dispatch
    /// instead of failing the step
    pub tolerated_contexts: Vec<Context>,
}

impl DispatchConfig {
    /// Reject empty context names
    pub fn validate(&self) -> EslResult<()> {
        if let Some(empty) = self.tolerated_contexts.iter().find(|c| c.as_str().is_empty()) {
            return Err(EslError::InvalidConfiguration {
                reason: format!("tolerated context name must not be empty ({empty:?})"),
            });
        }
        Ok(())
    }
}
