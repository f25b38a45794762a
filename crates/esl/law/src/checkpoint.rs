//! Ledger checkpoints
//!
//! A checkpoint captures the property catalog, the registered agents and
//! every ownership record of a ledger. Dispatch handlers are code and are
//! not captured; a host re-registers them after a restore. Kind tags are
//! captured, so handlers registered against the same kind names land on
//! the same tags.

use chrono::{DateTime, Utc};
use esl_types::{AgentId, EslError, EslResult, Extent, PropertyId, PropertyTypeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::property::PropertyKind;
use crate::record::OwnershipRecord;

/// Checkpoint format version written by this crate
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable image of an ownership ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCheckpoint {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    /// Catalog contents, ordered by tag
    pub kinds: Vec<PropertyKind>,
    /// Registered agents, including those holding nothing
    pub agents: Vec<AgentId>,
    /// Records ordered by agent, then kind tag, then instance identity
    pub records: Vec<OwnershipRecord>,
}

impl LedgerCheckpoint {
    pub fn to_json(&self) -> EslResult<String> {
        serde_json::to_string(self).map_err(|e| EslError::Checkpoint(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> EslResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EslError::Checkpoint(e.to_string()))
    }

    pub fn from_json(json: &str) -> EslResult<Self> {
        serde_json::from_str(json).map_err(|e| EslError::Checkpoint(e.to_string()))
    }

    /// The (agent, property, extent) triples, sorted
    pub fn triples(&self) -> Vec<(AgentId, PropertyId, Extent)> {
        let mut triples: Vec<_> = self.records.iter().map(OwnershipRecord::triple).collect();
        triples.sort();
        triples
    }

    /// Check that the checkpoint describes a consistent ledger.
    ///
    /// Kind-list consistency (unique tags and names) is checked when the
    /// catalog is rebuilt.
    pub fn validate(&self) -> EslResult<()> {
        if self.version != CHECKPOINT_VERSION {
            return Err(EslError::Checkpoint(format!(
                "unsupported checkpoint version {} (expected {})",
                self.version, CHECKPOINT_VERSION
            )));
        }

        let kinds: HashMap<PropertyTypeId, &PropertyKind> =
            self.kinds.iter().map(|kind| (kind.type_id, kind)).collect();

        let mut agents = HashSet::with_capacity(self.agents.len());
        for agent in &self.agents {
            if !agents.insert(agent) {
                return Err(EslError::Checkpoint(format!("agent '{agent}' listed twice")));
            }
        }

        let mut held = HashSet::with_capacity(self.records.len());
        let mut exclusive_holders: HashMap<PropertyId, &AgentId> = HashMap::new();
        for record in &self.records {
            let property = record.property_id();
            if !agents.contains(&record.agent) {
                return Err(EslError::Checkpoint(format!(
                    "record of property {property} held by undeclared agent '{}'",
                    record.agent
                )));
            }
            let Some(kind) = kinds.get(&record.type_id()) else {
                return Err(EslError::Checkpoint(format!(
                    "record of property {property} has unknown kind {}",
                    record.type_id()
                )));
            };
            if record.extent.is_zero() {
                return Err(EslError::Checkpoint(format!(
                    "record of property {property} held by '{}' has zero extent",
                    record.agent
                )));
            }
            if record.tenure != kind.mode.tenure() {
                return Err(EslError::Checkpoint(format!(
                    "record of property {property} has tenure {:?}, kind '{}' requires {:?}",
                    record.tenure,
                    kind.name,
                    kind.mode.tenure()
                )));
            }
            if !held.insert((&record.agent, property)) {
                return Err(EslError::Checkpoint(format!(
                    "property {property} recorded twice for agent '{}'",
                    record.agent
                )));
            }
            if kind.mode.is_exclusive() {
                if let Some(holder) = exclusive_holders.insert(property, &record.agent) {
                    return Err(EslError::Checkpoint(format!(
                        "exclusive property {property} held by both '{holder}' and '{}'",
                        record.agent
                    )));
                }
            }
        }
        Ok(())
    }
}
