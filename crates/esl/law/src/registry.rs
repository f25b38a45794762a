//! Per-agent ownership registry
//!
//! A registry exclusively owns its agent's records. Mutations take the
//! registry's write lock; queries take the read lock and return detached
//! snapshots. Transfers between two registries lock both in ascending
//! `AgentId` order, so opposite transfers running concurrently cannot
//! deadlock.

use esl_types::{AgentId, EslError, EslResult, Extent, PropertyId, PropertyTypeId};
use parking_lot::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::PropertyCatalog;
use crate::property::{OwnershipMode, Property};
use crate::record::{OwnershipQuery, OwnershipRecord};

/// Result of a successful transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub property: PropertyId,
    pub mode: OwnershipMode,
    /// Extent moved
    pub extent: Extent,
    /// Extent left with the sender (zero means the record was removed)
    pub from_remaining: Extent,
    /// Extent now held by the receiver
    pub to_held: Extent,
}

/// Records of one agent, keyed by kind tag then instance identity.
///
/// Once retired (the agent left its ledger) every mutation fails with
/// `AgentNotFound`.
#[derive(Debug, Default)]
pub(crate) struct Holdings {
    by_type: BTreeMap<PropertyTypeId, BTreeMap<PropertyId, OwnershipRecord>>,
    index: HashMap<PropertyId, PropertyTypeId>,
    retired: bool,
}

impl Holdings {
    fn ensure_active(&self, agent: &AgentId) -> EslResult<()> {
        if self.retired {
            return Err(EslError::AgentNotFound(agent.clone()));
        }
        Ok(())
    }

    /// Mark the holdings retired and hand back every record.
    pub(crate) fn retire(&mut self) -> Vec<OwnershipRecord> {
        self.retired = true;
        self.drain()
    }

    pub(crate) fn get(&self, property: PropertyId) -> Option<&OwnershipRecord> {
        let type_id = self.index.get(&property)?;
        self.by_type.get(type_id)?.get(&property)
    }

    fn get_mut(&mut self, property: PropertyId) -> Option<&mut OwnershipRecord> {
        let type_id = self.index.get(&property)?;
        self.by_type.get_mut(type_id)?.get_mut(&property)
    }

    pub(crate) fn extent_of(&self, property: PropertyId) -> Extent {
        self.get(property).map(|r| r.extent).unwrap_or_default()
    }

    pub(crate) fn add(
        &mut self,
        catalog: &PropertyCatalog,
        agent: &AgentId,
        property: &Property,
        extent: Extent,
    ) -> EslResult<Extent> {
        self.ensure_active(agent)?;
        if extent.is_zero() {
            return Err(EslError::InvalidExtent {
                property: property.id(),
                reason: "extent to add must be positive".to_string(),
            });
        }
        let mode = catalog.mode_of(property.type_id())?;

        if let Some(held_type) = self.index.get(&property.id()) {
            if *held_type != property.type_id() {
                return Err(EslError::PropertyKindConflict {
                    name: property.id().to_string(),
                    reason: format!(
                        "instance held as kind {}, offered as kind {}",
                        held_type,
                        property.type_id()
                    ),
                });
            }
        }

        if let Some(existing) = self.get_mut(property.id()) {
            if !mode.merges() {
                return Err(EslError::DuplicateOwnership {
                    agent: agent.clone(),
                    property: property.id(),
                    holder: agent.clone(),
                });
            }
            // Records of one instance must agree on its state.
            if existing.property.state() != property.state() {
                return Err(EslError::StateConflict {
                    agent: agent.clone(),
                    property: property.id(),
                });
            }
            let held = existing
                .extent
                .checked_add(extent)
                .ok_or_else(|| EslError::ExtentOverflow {
                    agent: agent.clone(),
                    property: property.id(),
                    held: existing.extent,
                    added: extent,
                })?;
            existing.extent = held;
            return Ok(held);
        }

        self.insert(OwnershipRecord {
            agent: agent.clone(),
            property: property.clone(),
            extent,
            tenure: mode.tenure(),
        });
        Ok(extent)
    }

    pub(crate) fn remove(
        &mut self,
        catalog: &PropertyCatalog,
        agent: &AgentId,
        property: PropertyId,
        extent: Extent,
    ) -> EslResult<Extent> {
        self.ensure_active(agent)?;
        if extent.is_zero() {
            return Err(EslError::InvalidExtent {
                property,
                reason: "extent to remove must be positive".to_string(),
            });
        }

        let (available, type_id) = match self.get(property) {
            Some(record) => (record.extent, record.type_id()),
            None => {
                return Err(EslError::InsufficientExtent {
                    agent: agent.clone(),
                    property,
                    requested: extent,
                    available: Extent::zero(),
                })
            }
        };
        let Some(remaining) = available.checked_sub(extent) else {
            return Err(EslError::InsufficientExtent {
                agent: agent.clone(),
                property,
                requested: extent,
                available,
            });
        };
        if catalog.mode_of(type_id)?.is_exclusive() && !remaining.is_zero() {
            return Err(EslError::InvalidExtent {
                property,
                reason: format!("indivisible property held at {available} must be removed whole"),
            });
        }

        if remaining.is_zero() {
            self.take(property);
        } else if let Some(record) = self.get_mut(property) {
            record.extent = remaining;
        }
        Ok(remaining)
    }

    /// Put a record back exactly as it was, replacing whatever is there.
    pub(crate) fn restore(&mut self, property: PropertyId, saved: Option<OwnershipRecord>) {
        self.take(property);
        if let Some(record) = saved {
            self.insert(record);
        }
    }

    fn insert(&mut self, record: OwnershipRecord) {
        let (type_id, id) = (record.type_id(), record.property_id());
        self.index.insert(id, type_id);
        self.by_type.entry(type_id).or_default().insert(id, record);
    }

    fn take(&mut self, property: PropertyId) -> Option<OwnershipRecord> {
        let type_id = self.index.remove(&property)?;
        let records = self.by_type.get_mut(&type_id)?;
        let record = records.remove(&property);
        if records.is_empty() {
            self.by_type.remove(&type_id);
        }
        record
    }

    pub(crate) fn records_of(&self, type_id: PropertyTypeId) -> Vec<OwnershipRecord> {
        self.by_type
            .get(&type_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn all_records(&self) -> Vec<OwnershipRecord> {
        self.by_type
            .values()
            .flat_map(|records| records.values().cloned())
            .collect()
    }

    fn drain(&mut self) -> Vec<OwnershipRecord> {
        let records = self.all_records();
        self.by_type.clear();
        self.index.clear();
        records
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

/// The set of ownership records of one agent
#[derive(Debug)]
pub struct OwnershipRegistry {
    agent: AgentId,
    catalog: Arc<PropertyCatalog>,
    holdings: RwLock<Holdings>,
}

impl OwnershipRegistry {
    pub fn new(agent: AgentId, catalog: Arc<PropertyCatalog>) -> Self {
        Self {
            agent,
            catalog,
            holdings: RwLock::new(Holdings::default()),
        }
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn catalog(&self) -> &Arc<PropertyCatalog> {
        &self.catalog
    }

    /// Insert `property` or merge `extent` into the existing record.
    ///
    /// Returns the extent now held. Exclusive kinds never merge: a second
    /// add fails with `DuplicateOwnership`. A merge requires the offered
    /// property to carry the same state as the held record, otherwise it
    /// fails with `StateConflict`.
    pub fn add(&self, property: &Property, extent: Extent) -> EslResult<Extent> {
        let held = self
            .holdings
            .write()
            .add(&self.catalog, &self.agent, property, extent)?;
        debug!(agent = %self.agent, property = %property.id(), extent = extent.0, held = held.0, "Property added");
        Ok(held)
    }

    /// Decrement the held extent, removing the record at zero.
    ///
    /// Returns the remaining extent. Fails without mutating anything when
    /// `extent` exceeds what is held.
    pub fn remove(&self, property: &Property, extent: Extent) -> EslResult<Extent> {
        let remaining = self
            .holdings
            .write()
            .remove(&self.catalog, &self.agent, property.id(), extent)
            .inspect_err(|err| warn!(agent = %self.agent, property = %property.id(), error = %err, "Remove rejected"))?;
        debug!(agent = %self.agent, property = %property.id(), extent = extent.0, remaining = remaining.0, "Property removed");
        Ok(remaining)
    }

    /// Snapshot of the records of one kind, ordered by instance identity
    pub fn query(&self, type_id: PropertyTypeId) -> OwnershipQuery {
        OwnershipQuery::new(self.holdings.read().records_of(type_id))
    }

    /// Snapshot of every record, ordered by kind tag then instance identity
    pub fn records(&self) -> OwnershipQuery {
        OwnershipQuery::new(self.holdings.read().all_records())
    }

    pub fn record(&self, property: PropertyId) -> Option<OwnershipRecord> {
        self.holdings.read().get(property).cloned()
    }

    pub fn extent_of(&self, property: PropertyId) -> Extent {
        self.holdings.read().extent_of(property)
    }

    pub fn holds(&self, property: PropertyId) -> bool {
        self.holdings.read().get(property).is_some()
    }

    /// Mutate the internal state of a held property.
    ///
    /// Returns `None` if the property is not held.
    pub fn update_state<T>(
        &self,
        property: PropertyId,
        f: impl FnOnce(&mut serde_json::Value) -> T,
    ) -> Option<T> {
        let mut holdings = self.holdings.write();
        let record = holdings.get_mut(property)?;
        Some(f(record.property.state_mut()))
    }

    pub fn len(&self) -> usize {
        self.holdings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the agent has left its ledger
    pub fn is_retired(&self) -> bool {
        self.holdings.read().retired
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Holdings> {
        self.holdings.write()
    }

    pub(crate) fn read(&self) -> parking_lot::RwLockReadGuard<'_, Holdings> {
        self.holdings.read()
    }

    /// Lock rank: agent identity, ties (two registries for one agent id)
    /// broken by address.
    fn lock_rank(&self) -> (&AgentId, usize) {
        (&self.agent, self as *const Self as usize)
    }
}

/// Write-lock two distinct registries in rank order, returned as
/// `(from, to)` guards.
pub(crate) fn lock_pair<'a>(
    from: &'a OwnershipRegistry,
    to: &'a OwnershipRegistry,
) -> (
    RwLockWriteGuard<'a, Holdings>,
    RwLockWriteGuard<'a, Holdings>,
) {
    if from.lock_rank() <= to.lock_rank() {
        let from_guard = from.holdings.write();
        let to_guard = to.holdings.write();
        (from_guard, to_guard)
    } else {
        let to_guard = to.holdings.write();
        let from_guard = from.holdings.write();
        (from_guard, to_guard)
    }
}

/// Move `extent` of `property` between locked holdings.
///
/// The receiver gets the sender's copy of the property, state included. If
/// the receiving add fails, the sender's record is restored exactly before
/// the error is returned.
pub(crate) fn transfer_locked(
    catalog: &PropertyCatalog,
    from_agent: &AgentId,
    from: &mut Holdings,
    to_agent: &AgentId,
    to: &mut Holdings,
    property: &Property,
    extent: Extent,
) -> EslResult<TransferOutcome> {
    let saved = from.get(property.id()).cloned();
    let from_remaining = from.remove(catalog, from_agent, property.id(), extent)?;
    let moving = saved.as_ref().map_or(property, |record| &record.property);
    let mode = match catalog.mode_of(moving.type_id()) {
        Ok(mode) => mode,
        Err(err) => {
            from.restore(property.id(), saved);
            return Err(err);
        }
    };

    match to.add(catalog, to_agent, moving, extent) {
        Ok(to_held) => Ok(TransferOutcome {
            property: property.id(),
            mode,
            extent,
            from_remaining,
            to_held,
        }),
        Err(err) => {
            from.restore(property.id(), saved);
            Err(err)
        }
    }
}

/// Validate a transfer whose sender and receiver are the same holdings.
pub(crate) fn self_transfer(
    catalog: &PropertyCatalog,
    agent: &AgentId,
    holdings: &Holdings,
    property: &Property,
    extent: Extent,
) -> EslResult<TransferOutcome> {
    holdings.ensure_active(agent)?;
    if extent.is_zero() {
        return Err(EslError::InvalidExtent {
            property: property.id(),
            reason: "extent to transfer must be positive".to_string(),
        });
    }
    let held = holdings.extent_of(property.id());
    if extent > held {
        return Err(EslError::InsufficientExtent {
            agent: agent.clone(),
            property: property.id(),
            requested: extent,
            available: held,
        });
    }
    let held_type = holdings.get(property.id()).map_or(property.type_id(), |r| r.type_id());
    let mode = catalog.mode_of(held_type)?;
    if mode.is_exclusive() && extent != held {
        return Err(EslError::InvalidExtent {
            property: property.id(),
            reason: format!("indivisible property held at {held} must be transferred whole"),
        });
    }
    Ok(TransferOutcome {
        property: property.id(),
        mode,
        extent,
        from_remaining: held,
        to_held: held,
    })
}

/// Atomically move `extent` of `property` from one registry to another.
///
/// Both registries are locked for the duration in a globally consistent
/// order. Either both sides change or neither does. A transfer within one
/// registry only validates the held extent.
pub fn transfer(
    from: &OwnershipRegistry,
    to: &OwnershipRegistry,
    property: &Property,
    extent: Extent,
) -> EslResult<TransferOutcome> {
    if std::ptr::eq(from, to) {
        let holdings = from.holdings.read();
        return self_transfer(&from.catalog, &from.agent, &holdings, property, extent);
    }

    let (mut from_holdings, mut to_holdings) = lock_pair(from, to);
    let outcome = transfer_locked(
        &from.catalog,
        &from.agent,
        &mut from_holdings,
        &to.agent,
        &mut to_holdings,
        property,
        extent,
    )?;
    debug!(
        from = %from.agent,
        to = %to.agent,
        property = %property.id(),
        extent = extent.0,
        "Property transferred"
    );
    Ok(outcome)
}
