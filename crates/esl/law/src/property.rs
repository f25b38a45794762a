//! Property kinds and property instances
//!
//! A property is plain data: a stable kind tag, an instance identity, an
//! optional denomination and opaque state. Behaviour lives in the dispatch
//! table, keyed by the kind tag, so adding a kind never touches this module.

use esl_types::{CurrencyCode, PropertyId, PropertyTypeId};
use serde::{Deserialize, Serialize};

use crate::record::Tenure;

/// How extents of one property instance may be held
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnershipMode {
    /// Divisible quantity; one agent's extents merge, many agents may hold
    /// part of the same instance (cash, commodity lots)
    Fungible,
    /// Indivisible and exclusive: one record, one holder (contracts, deeds)
    Exclusive,
    /// Co-owned: several agents hold shares of the same instance
    Shared,
}

impl OwnershipMode {
    /// Whether an add for an already held instance merges into the record
    pub fn merges(&self) -> bool {
        !self.is_exclusive()
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, OwnershipMode::Exclusive)
    }

    /// Record variant used for holdings of this mode
    pub fn tenure(&self) -> Tenure {
        match self {
            OwnershipMode::Shared => Tenure::CoOwned,
            OwnershipMode::Fungible | OwnershipMode::Exclusive => Tenure::Sole,
        }
    }
}

/// A registered property kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyKind {
    /// Tag assigned by the catalog
    pub type_id: PropertyTypeId,
    /// Unique kind name, e.g. "bond"
    pub name: String,
    /// Holding semantics
    pub mode: OwnershipMode,
}

/// One property instance.
///
/// Identity (`id`, `type_id`, `denomination`) never changes. `state` is
/// only mutated while the property sits in a registry, through
/// [`OwnershipRegistry::update_state`](crate::OwnershipRegistry::update_state).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    id: PropertyId,
    type_id: PropertyTypeId,
    denomination: Option<CurrencyCode>,
    #[serde(default)]
    state: serde_json::Value,
}

impl Property {
    /// A fresh instance of `kind` with a generated identity
    pub fn new(kind: &PropertyKind) -> Self {
        Self::with_id(PropertyId::generate(), kind.type_id)
    }

    /// An instance with a caller-chosen identity
    pub fn with_id(id: PropertyId, type_id: PropertyTypeId) -> Self {
        Self {
            id,
            type_id,
            denomination: None,
            state: serde_json::Value::Null,
        }
    }

    pub fn denominated(mut self, currency: CurrencyCode) -> Self {
        self.denomination = Some(currency);
        self
    }

    /// Initial state, before the property is placed in a registry
    pub fn with_state(mut self, state: serde_json::Value) -> Self {
        self.state = state;
        self
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn type_id(&self) -> PropertyTypeId {
        self.type_id
    }

    pub fn denomination(&self) -> Option<CurrencyCode> {
        self.denomination
    }

    pub fn state(&self) -> &serde_json::Value {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut serde_json::Value {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bond_kind() -> PropertyKind {
        PropertyKind {
            type_id: PropertyTypeId(4),
            name: "bond".into(),
            mode: OwnershipMode::Exclusive,
        }
    }

    #[test]
    fn modes() {
        assert!(OwnershipMode::Fungible.merges());
        assert!(OwnershipMode::Shared.merges());
        assert!(!OwnershipMode::Exclusive.merges());
        assert_eq!(OwnershipMode::Shared.tenure(), Tenure::CoOwned);
        assert_eq!(OwnershipMode::Exclusive.tenure(), Tenure::Sole);
    }

    #[test]
    fn new_properties_are_distinct_instances_of_one_kind() {
        let kind = bond_kind();
        let a = Property::new(&kind);
        let b = Property::new(&kind);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.type_id(), b.type_id());
        assert_eq!(a.state(), &serde_json::Value::Null);
    }

    #[test]
    fn serialization_preserves_identity_and_state() {
        let usd = CurrencyCode::new("USD").unwrap();
        let property = Property::new(&bond_kind())
            .denominated(usd)
            .with_state(serde_json::json!({ "coupon_bps": 425, "maturity": "2030-06-30" }));

        let json = serde_json::to_string(&property).unwrap();
        let restored: Property = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, property);
        assert_eq!(restored.denomination(), Some(usd));
    }
}
