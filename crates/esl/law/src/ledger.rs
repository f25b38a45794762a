//! Multi-agent ownership ledger
//!
//! The ledger owns every agent's registry and addresses them by agent
//! identity. On top of the per-registry rules it enforces cross-agent
//! exclusivity: an exclusive property instance is held by at most one agent
//! at a time. The guarantee covers operations made through the ledger;
//! mutating a registry handle directly bypasses the claims index.
//!
//! Lock order: a registry lock may be held while a claims shard is taken,
//! never the reverse. `add` settles its claim before locking the registry.
//! The journal lock is taken last and nothing is acquired under it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use esl_types::{
    AgentId, Context, EslError, EslResult, Extent, OwnershipConfig, PropertyId, PropertyTypeId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::PropertyCatalog;
use crate::checkpoint::{LedgerCheckpoint, CHECKPOINT_VERSION};
use crate::dispatch::DispatchTable;
use crate::journal::{OwnershipAction, OwnershipEvent, OwnershipJournal};
use crate::property::{OwnershipMode, Property, PropertyKind};
use crate::record::{OwnershipQuery, OwnershipRecord};
use crate::registry::{lock_pair, self_transfer, transfer_locked, OwnershipRegistry, TransferOutcome};

/// All agents' registries
#[derive(Debug)]
pub struct OwnershipLedger {
    config: OwnershipConfig,
    catalog: Arc<PropertyCatalog>,
    registries: DashMap<AgentId, Arc<OwnershipRegistry>>,
    /// Current holder of each held exclusive property
    claims: DashMap<PropertyId, AgentId>,
    journal: OwnershipJournal,
}

impl Default for OwnershipLedger {
    fn default() -> Self {
        Self::new(OwnershipConfig::default())
    }
}

impl OwnershipLedger {
    pub fn new(config: OwnershipConfig) -> Self {
        Self::with_catalog(config, Arc::new(PropertyCatalog::new()))
    }

    /// A ledger over an existing catalog, e.g. one shared with another ledger
    pub fn with_catalog(config: OwnershipConfig, catalog: Arc<PropertyCatalog>) -> Self {
        let journal = OwnershipJournal::new(config.journal_capacity);
        Self {
            config,
            catalog,
            registries: DashMap::new(),
            claims: DashMap::new(),
            journal,
        }
    }

    pub fn config(&self) -> &OwnershipConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<PropertyCatalog> {
        &self.catalog
    }

    pub fn register_kind(&self, name: impl Into<String>, mode: OwnershipMode) -> EslResult<PropertyKind> {
        self.catalog.register(name, mode)
    }

    // =========================================================================
    // Agents
    // =========================================================================

    /// Create the agent's registry, or return the existing one.
    pub fn register_agent(&self, agent: AgentId) -> Arc<OwnershipRegistry> {
        match self.registries.entry(agent) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let registry = Arc::new(OwnershipRegistry::new(
                    entry.key().clone(),
                    Arc::clone(&self.catalog),
                ));
                info!(agent = %entry.key(), "Agent registered");
                entry.insert(Arc::clone(&registry));
                registry
            }
        }
    }

    /// Destroy the agent's registry, returning the records it held and
    /// releasing its exclusive claims.
    ///
    /// The registry is retired under its write lock, so an add or transfer
    /// that looked it up before removal fails with `AgentNotFound` instead
    /// of landing in a registry no longer reachable from the ledger.
    pub fn deregister_agent(&self, agent: &AgentId) -> EslResult<Vec<OwnershipRecord>> {
        let (_, registry) = self
            .registries
            .remove(agent)
            .ok_or_else(|| EslError::AgentNotFound(agent.clone()))?;

        let mut holdings = registry.write();
        let records = holdings.retire();
        for record in &records {
            self.release_claim(agent, record.property_id());
        }
        drop(holdings);

        info!(agent = %agent, records = records.len(), "Agent deregistered");
        Ok(records)
    }

    pub fn registry(&self, agent: &AgentId) -> EslResult<Arc<OwnershipRegistry>> {
        self.registries
            .get(agent)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EslError::AgentNotFound(agent.clone()))
    }

    pub fn contains_agent(&self, agent: &AgentId) -> bool {
        self.registries.contains_key(agent)
    }

    /// Registered agents, sorted
    pub fn agents(&self) -> Vec<AgentId> {
        let mut agents: Vec<_> = self.registries.iter().map(|entry| entry.key().clone()).collect();
        agents.sort();
        agents
    }

    /// Registry handles in lock order. Collected before any registry is
    /// locked so no map shard is held across a registry lock.
    fn registries_in_order(&self) -> Vec<Arc<OwnershipRegistry>> {
        let mut registries: Vec<_> = self
            .registries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        registries.sort_by(|a, b| a.agent().cmp(b.agent()));
        registries
    }

    // =========================================================================
    // Ownership operations
    // =========================================================================

    /// Add `extent` of `property` to the agent's holdings.
    ///
    /// Fails with `DuplicateOwnership` if the property is exclusive and
    /// another agent holds it.
    pub fn add(&self, agent: &AgentId, property: &Property, extent: Extent) -> EslResult<Extent> {
        let registry = self.registry(agent)?;
        let mode = self.catalog.mode_of(property.type_id())?;
        let claimed = if mode.is_exclusive() && !extent.is_zero() {
            self.claim(agent, property.id())?
        } else {
            false
        };

        match registry.add(property, extent) {
            Ok(held) => {
                self.journal
                    .record(agent, property.id(), extent, OwnershipAction::Added);
                Ok(held)
            }
            Err(err) => {
                if claimed {
                    self.release_claim(agent, property.id());
                }
                warn!(agent = %agent, property = %property.id(), error = %err, "Add rejected");
                Err(err)
            }
        }
    }

    /// Remove `extent` of `property` from the agent's holdings, returning
    /// what remains.
    pub fn remove(&self, agent: &AgentId, property: &Property, extent: Extent) -> EslResult<Extent> {
        let registry = self.registry(agent)?;
        let mut holdings = registry.write();
        let remaining = holdings
            .remove(&self.catalog, agent, property.id(), extent)
            .inspect_err(|err| {
                warn!(agent = %agent, property = %property.id(), error = %err, "Remove rejected")
            })?;
        if remaining.is_zero() {
            self.release_claim(agent, property.id());
        }
        self.journal
            .record(agent, property.id(), extent, OwnershipAction::Removed);
        drop(holdings);

        debug!(agent = %agent, property = %property.id(), extent = extent.0, remaining = remaining.0, "Property removed");
        Ok(remaining)
    }

    /// Move `extent` of `property` between two agents, all or nothing.
    ///
    /// A transfer from an agent to itself validates the held extent and
    /// changes nothing, unless self-transfers are disabled in the config.
    pub fn transfer(
        &self,
        from: &AgentId,
        to: &AgentId,
        property: &Property,
        extent: Extent,
    ) -> EslResult<TransferOutcome> {
        let from_registry = self.registry(from)?;
        let to_registry = self.registry(to)?;

        if Arc::ptr_eq(&from_registry, &to_registry) {
            if !self.config.allow_self_transfer {
                warn!(agent = %from, property = %property.id(), "Self-transfer rejected");
                return Err(EslError::InvalidExtent {
                    property: property.id(),
                    reason: format!("transfer from agent '{from}' to itself is disabled"),
                });
            }
            let holdings = from_registry.read();
            return self_transfer(&self.catalog, from, &holdings, property, extent);
        }

        let (mut from_holdings, mut to_holdings) = lock_pair(&from_registry, &to_registry);
        let outcome = transfer_locked(
            &self.catalog,
            from,
            &mut from_holdings,
            to,
            &mut to_holdings,
            property,
            extent,
        )
        .inspect_err(|err| {
            warn!(from = %from, to = %to, property = %property.id(), error = %err, "Transfer rejected")
        })?;
        if outcome.mode.is_exclusive() {
            self.claims.insert(property.id(), to.clone());
        }
        self.journal.record_transfer(from, to, property.id(), extent);
        drop(to_holdings);
        drop(from_holdings);

        info!(
            from = %from,
            to = %to,
            property = %property.id(),
            extent = extent.0,
            "Property transferred"
        );
        Ok(outcome)
    }

    /// Snapshot of the agent's records of one kind
    pub fn query(&self, agent: &AgentId, type_id: PropertyTypeId) -> EslResult<OwnershipQuery> {
        Ok(self.registry(agent)?.query(type_id))
    }

    /// Snapshot of all of the agent's records
    pub fn records(&self, agent: &AgentId) -> EslResult<OwnershipQuery> {
        Ok(self.registry(agent)?.records())
    }

    pub fn extent_of(&self, agent: &AgentId, property: PropertyId) -> EslResult<Extent> {
        Ok(self.registry(agent)?.extent_of(property))
    }

    /// Every agent holding part of `property`, sorted by agent
    pub fn holders(&self, property: PropertyId) -> Vec<(AgentId, Extent)> {
        self.registries_in_order()
            .into_iter()
            .filter_map(|registry| {
                let extent = registry.extent_of(property);
                (!extent.is_zero()).then(|| (registry.agent().clone(), extent))
            })
            .collect()
    }

    /// Current holder of an exclusive property
    pub fn exclusive_holder(&self, property: PropertyId) -> Option<AgentId> {
        self.claims.get(&property).map(|entry| entry.value().clone())
    }

    /// Run every record the agent holds through `table` in `context`.
    ///
    /// Works on a snapshot ordered by kind tag then instance identity, so
    /// handlers may call back into the ledger. The first handler failure
    /// stops processing and is returned.
    pub fn process<A, R>(
        &self,
        agent: &AgentId,
        table: &DispatchTable<A, R>,
        context: &Context,
        args: &A,
    ) -> EslResult<Vec<(PropertyId, R)>> {
        let records = self.registry(agent)?.records();
        debug!(agent = %agent, context = %context, records = records.len(), "Processing holdings");
        records
            .iter()
            .map(|record| {
                table
                    .dispatch(&record.property, context, args)
                    .map(|result| (record.property_id(), result))
            })
            .collect()
    }

    /// Copy of the retained ownership events, oldest first
    pub fn journal(&self) -> Vec<OwnershipEvent> {
        self.journal.events()
    }

    /// Retained events with a sequence number of at least `from`
    pub fn journal_since(&self, from: u64) -> Vec<OwnershipEvent> {
        self.journal.since(from)
    }

    // =========================================================================
    // Exclusive claims
    // =========================================================================

    /// Claim an exclusive property for `agent`. Returns whether a new claim
    /// was made; an existing claim by the same agent is left to the
    /// registry to reject.
    fn claim(&self, agent: &AgentId, property: PropertyId) -> EslResult<bool> {
        match self.claims.entry(property) {
            Entry::Occupied(entry) if entry.get() == agent => Ok(false),
            Entry::Occupied(entry) => Err(EslError::DuplicateOwnership {
                agent: agent.clone(),
                property,
                holder: entry.get().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(agent.clone());
                Ok(true)
            }
        }
    }

    fn release_claim(&self, agent: &AgentId, property: PropertyId) {
        self.claims.remove_if(&property, |_, holder| holder == agent);
    }

    // =========================================================================
    // Checkpoints
    // =========================================================================

    /// Consistent image of the whole ledger.
    ///
    /// Read-locks every registry, in lock order, for the duration of the
    /// copy.
    pub fn checkpoint(&self) -> LedgerCheckpoint {
        let registries = self.registries_in_order();
        let guards: Vec<_> = registries.iter().map(|registry| registry.read()).collect();
        let records: Vec<_> = guards.iter().flat_map(|holdings| holdings.all_records()).collect();
        drop(guards);

        let checkpoint = LedgerCheckpoint {
            version: CHECKPOINT_VERSION,
            taken_at: chrono::Utc::now(),
            kinds: self.catalog.kinds(),
            agents: registries.iter().map(|r| r.agent().clone()).collect(),
            records,
        };
        info!(
            agents = checkpoint.agents.len(),
            records = checkpoint.records.len(),
            "Ledger checkpoint taken"
        );
        checkpoint
    }

    /// Rebuild a ledger from a checkpoint.
    ///
    /// The catalog keeps its tags. Handlers must be registered again. The
    /// journal starts empty.
    pub fn restore(checkpoint: LedgerCheckpoint, config: OwnershipConfig) -> EslResult<Self> {
        checkpoint.validate()?;
        let catalog = Arc::new(PropertyCatalog::from_kinds(checkpoint.kinds)?);
        let ledger = Self::with_catalog(config, catalog);

        for agent in checkpoint.agents {
            ledger.register_agent(agent);
        }
        let restored = checkpoint.records.len();
        for record in checkpoint.records {
            let registry = ledger.registry(&record.agent)?;
            registry
                .add(&record.property, record.extent)
                .map_err(|e| EslError::Checkpoint(format!("restoring record: {e}")))?;
            if ledger.catalog.mode_of(record.type_id())?.is_exclusive() {
                ledger.claims.insert(record.property_id(), record.agent);
            }
        }

        info!(agents = ledger.registries.len(), records = restored, "Ledger restored");
        Ok(ledger)
    }
}
