//! Property catalog: runtime registration of property kinds
//!
//! Kind tags are handed out when a kind is registered, not at compile time,
//! so external modules add kinds without recompiling the core. Registration
//! is idempotent per name, which lets a module re-register its kinds after a
//! checkpoint reload and receive the same tags.

use esl_types::{EslError, EslResult, PropertyTypeId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::property::{OwnershipMode, PropertyKind};

/// Process-wide set of known property kinds
#[derive(Debug, Default)]
pub struct PropertyCatalog {
    inner: RwLock<CatalogInner>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    kinds: BTreeMap<PropertyTypeId, PropertyKind>,
    by_name: HashMap<String, PropertyTypeId>,
    next_id: u32,
}

impl CatalogInner {
    fn insert(&mut self, kind: PropertyKind) {
        self.next_id = self.next_id.max(kind.type_id.0.saturating_add(1));
        self.by_name.insert(kind.name.clone(), kind.type_id);
        self.kinds.insert(kind.type_id, kind);
    }
}

impl PropertyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a catalog from previously issued kinds, keeping their tags.
    pub fn from_kinds(kinds: impl IntoIterator<Item = PropertyKind>) -> EslResult<Self> {
        let mut inner = CatalogInner::default();
        for kind in kinds {
            if kind.name.is_empty() {
                return Err(EslError::Checkpoint(format!(
                    "property kind {} has an empty name",
                    kind.type_id
                )));
            }
            if inner.kinds.contains_key(&kind.type_id) {
                return Err(EslError::Checkpoint(format!(
                    "property kind tag {} issued twice",
                    kind.type_id
                )));
            }
            if inner.by_name.contains_key(&kind.name) {
                return Err(EslError::Checkpoint(format!(
                    "property kind name '{}' issued twice",
                    kind.name
                )));
            }
            inner.insert(kind);
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Register a kind, or return the existing one if `name` is already
    /// registered with the same mode.
    pub fn register(&self, name: impl Into<String>, mode: OwnershipMode) -> EslResult<PropertyKind> {
        let name = name.into();
        if name.is_empty() {
            return Err(EslError::InvalidConfiguration {
                reason: "property kind name must not be empty".to_string(),
            });
        }

        let mut inner = self.inner.write();
        if let Some(type_id) = inner.by_name.get(&name).copied() {
            let existing = &inner.kinds[&type_id];
            if existing.mode != mode {
                return Err(EslError::PropertyKindConflict {
                    name,
                    reason: format!(
                        "registered as {:?}, re-registered as {:?}",
                        existing.mode, mode
                    ),
                });
            }
            debug!(kind = %name, type_id = %type_id, "Property kind already registered");
            return Ok(existing.clone());
        }

        let type_id = PropertyTypeId(inner.next_id);
        if inner.next_id == u32::MAX {
            return Err(EslError::InvalidConfiguration {
                reason: "property kind tags exhausted".to_string(),
            });
        }
        let kind = PropertyKind {
            type_id,
            name,
            mode,
        };
        inner.insert(kind.clone());

        info!(kind = %kind.name, type_id = %type_id, mode = ?mode, "Property kind registered");
        Ok(kind)
    }

    pub fn kind(&self, type_id: PropertyTypeId) -> Option<PropertyKind> {
        self.inner.read().kinds.get(&type_id).cloned()
    }

    pub fn lookup(&self, name: &str) -> Option<PropertyKind> {
        let inner = self.inner.read();
        inner
            .by_name
            .get(name)
            .and_then(|type_id| inner.kinds.get(type_id))
            .cloned()
    }

    /// Holding semantics of a kind; unknown tags are an error.
    pub fn mode_of(&self, type_id: PropertyTypeId) -> EslResult<OwnershipMode> {
        self.inner
            .read()
            .kinds
            .get(&type_id)
            .map(|kind| kind.mode)
            .ok_or(EslError::UnknownPropertyKind(type_id))
    }

    /// All kinds, ordered by tag
    pub fn kinds(&self) -> Vec<PropertyKind> {
        self.inner.read().kinds.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().kinds.is_empty()
    }
}
