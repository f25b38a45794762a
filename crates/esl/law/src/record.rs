//! Ownership records and query snapshots

use esl_types::{AgentId, Extent, PropertyId, PropertyTypeId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::property::Property;

/// Record variant: sole holding or a share in a co-owned instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tenure {
    Sole,
    CoOwned,
}

/// Binds one property instance to one agent with a non-zero extent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub agent: AgentId,
    pub property: Property,
    pub extent: Extent,
    pub tenure: Tenure,
}

impl OwnershipRecord {
    pub fn property_id(&self) -> PropertyId {
        self.property.id()
    }

    pub fn type_id(&self) -> PropertyTypeId {
        self.property.type_id()
    }

    /// The (agent, property instance, extent) identity of this record
    pub fn triple(&self) -> (AgentId, PropertyId, Extent) {
        (self.agent.clone(), self.property.id(), self.extent)
    }
}

/// Snapshot of records returned by a query.
///
/// Taken under the registry's read lock and detached from it: mutations
/// after the query returns are not visible, and the snapshot can be
/// iterated any number of times. Cloning is cheap.
#[derive(Clone, Debug, Default)]
pub struct OwnershipQuery {
    records: Arc<Vec<OwnershipRecord>>,
}

impl OwnershipQuery {
    pub(crate) fn new(records: Vec<OwnershipRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OwnershipRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, property: PropertyId) -> Option<&OwnershipRecord> {
        self.records.iter().find(|r| r.property.id() == property)
    }

    /// Sum of extents in the snapshot. Widened so a sum of `u64` extents
    /// cannot overflow.
    pub fn total_extent(&self) -> u128 {
        self.records.iter().map(|r| u128::from(r.extent.0)).sum()
    }
}

impl<'a> IntoIterator for &'a OwnershipQuery {
    type Item = &'a OwnershipRecord;
    type IntoIter = std::slice::Iter<'a, OwnershipRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for OwnershipQuery {
    type Item = OwnershipRecord;
    type IntoIter = std::vec::IntoIter<OwnershipRecord>;

    fn into_iter(self) -> Self::IntoIter {
        Arc::unwrap_or_clone(self.records).into_iter()
    }
}
