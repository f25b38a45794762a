//! Identifiers used across the ownership core

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a simulated economic agent.
///
/// Ordering is significant: cross-agent operations acquire locks in
/// ascending `AgentId` order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Agent with a caller-chosen identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random agent identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Instance identity of a property; two contracts of the same kind differ here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub Uuid);

impl PropertyId {
    /// Fresh random instance identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable tag of a property kind, assigned when the kind is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyTypeId(pub u32);

impl std::fmt::Display for PropertyTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named processing purpose (settle, appraise, ...) used to pick among
/// several handlers for the same property kind.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Context(pub String);

impl Context {
    /// Context with an arbitrary name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Settlement of obligations
    pub fn settle() -> Self {
        Self::new("settle")
    }

    /// Valuation
    pub fn appraise() -> Self {
        Self::new("appraise")
    }

    /// Revaluation at market prices
    pub fn mark_to_market() -> Self {
        Self::new("mark-to-market")
    }

    /// End of life of a contract
    pub fn expire() -> Self {
        Self::new("expire")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Context {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_ids_order_lexicographically() {
        assert!(AgentId::new("alice") < AgentId::new("bob"));
        assert_eq!(AgentId::from("carol"), AgentId::new("carol"));
    }

    #[test]
    fn generated_property_ids_are_distinct() {
        assert_ne!(PropertyId::generate(), PropertyId::generate());
    }

    #[test]
    fn type_id_display() {
        assert_eq!(PropertyTypeId(7).to_string(), "#7");
    }

    #[test]
    fn context_helpers() {
        assert_eq!(Context::settle().as_str(), "settle");
        assert_eq!(Context::mark_to_market().to_string(), "mark-to-market");
        assert_eq!(Context::from("tax"), Context::new("tax"));
    }
}
