//! Ownership journal
//!
//! Bounded in-memory trail of ownership changes applied through a ledger.
//! The oldest events are dropped once capacity is reached; a capacity of
//! zero disables recording entirely.

use chrono::{DateTime, Utc};
use esl_types::{AgentId, Extent, PropertyId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What happened to an agent's holding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OwnershipAction {
    Added,
    Removed,
    TransferredOut { to: AgentId },
    TransferredIn { from: AgentId },
}

/// One journal entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipEvent {
    /// Monotonic per journal, never reused even after eviction
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub agent: AgentId,
    pub property: PropertyId,
    pub extent: Extent,
    pub action: OwnershipAction,
}

#[derive(Debug, Default)]
struct JournalInner {
    events: VecDeque<OwnershipEvent>,
    next_sequence: u64,
}

#[derive(Debug)]
pub struct OwnershipJournal {
    capacity: usize,
    inner: Mutex<JournalInner>,
}

impl OwnershipJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(JournalInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn record(&self, agent: &AgentId, property: PropertyId, extent: Extent, action: OwnershipAction) {
        if !self.is_enabled() {
            return;
        }
        let mut inner = self.inner.lock();
        self.push(&mut inner, agent.clone(), property, extent, action);
    }

    /// Record both sides of a transfer as adjacent events
    pub fn record_transfer(&self, from: &AgentId, to: &AgentId, property: PropertyId, extent: Extent) {
        if !self.is_enabled() {
            return;
        }
        let mut inner = self.inner.lock();
        self.push(
            &mut inner,
            from.clone(),
            property,
            extent,
            OwnershipAction::TransferredOut { to: to.clone() },
        );
        self.push(
            &mut inner,
            to.clone(),
            property,
            extent,
            OwnershipAction::TransferredIn { from: from.clone() },
        );
    }

    fn push(
        &self,
        inner: &mut JournalInner,
        agent: AgentId,
        property: PropertyId,
        extent: Extent,
        action: OwnershipAction,
    ) {
        if inner.events.len() == self.capacity {
            inner.events.pop_front();
        }
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.events.push_back(OwnershipEvent {
            sequence,
            at: Utc::now(),
            agent,
            property,
            extent,
            action,
        });
    }

    /// Copy of the retained events, oldest first
    pub fn events(&self) -> Vec<OwnershipEvent> {
        self.inner.lock().events.iter().cloned().collect()
    }

    /// Retained events with `sequence >= from`
    pub fn since(&self, from: u64) -> Vec<OwnershipEvent> {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|event| event.sequence >= from)
            .cloned()
            .collect()
    }

    /// Retained events touching `agent`
    pub fn for_agent(&self, agent: &AgentId) -> Vec<OwnershipEvent> {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|event| &event.agent == agent)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_records_both_sides_in_order() {
        let journal = OwnershipJournal::new(16);
        let (alice, bob) = (AgentId::new("alice"), AgentId::new("bob"));
        let property = PropertyId::generate();

        journal.record(&alice, property, Extent::new(100), OwnershipAction::Added);
        journal.record_transfer(&alice, &bob, property, Extent::new(40));

        let events = journal.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(events[1].action, OwnershipAction::TransferredOut { to: bob.clone() });
        assert_eq!(events[2].agent, bob);
        assert_eq!(journal.for_agent(&alice).len(), 2);
    }

    #[test]
    fn oldest_events_are_evicted() {
        let journal = OwnershipJournal::new(2);
        let agent = AgentId::new("alice");
        for n in 1..=3 {
            journal.record(&agent, PropertyId::generate(), Extent::new(n), OwnershipAction::Added);
        }
        let events = journal.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(journal.since(2).len(), 1);
    }

    #[test]
    fn zero_capacity_disables_recording() {
        let journal = OwnershipJournal::new(0);
        journal.record(&AgentId::new("a"), PropertyId::generate(), Extent::UNIT, OwnershipAction::Removed);
        assert!(!journal.is_enabled());
        assert!(journal.is_empty());
    }

    #[test]
    fn actions_serialize_tagged() {
        let action = OwnershipAction::TransferredIn {
            from: AgentId::new("alice"),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "transferred_in");
        assert_eq!(json["from"], "alice");
    }
}
