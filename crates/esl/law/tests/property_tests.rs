//! Property tests: extent accounting and transfer reversibility.

use esl_law::*;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Op {
    Add(u64),
    Remove(u64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..1_000).prop_map(Op::Add),
        (1u64..1_000).prop_map(Op::Remove),
    ]
}

fn registry(name: &str, catalog: &Arc<PropertyCatalog>) -> OwnershipRegistry {
    OwnershipRegistry::new(AgentId::new(name), Arc::clone(catalog))
}

fn snapshot(registry: &OwnershipRegistry) -> Vec<OwnershipRecord> {
    registry.records().into_iter().collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Held extent is always adds minus successful removes; a rejected
    /// remove leaves the holding untouched.
    #[test]
    fn held_extent_is_sum_of_applied_operations(ops in prop::collection::vec(arb_op(), 1..60)) {
        let catalog = Arc::new(PropertyCatalog::new());
        let cash = catalog.register("cash", OwnershipMode::Fungible).unwrap();
        let reg = registry("a", &catalog);
        let usd = Property::new(&cash);
        let mut expected = 0u64;

        for op in ops {
            match op {
                Op::Add(n) => {
                    expected += n;
                    prop_assert_eq!(reg.add(&usd, Extent::new(n)).unwrap(), Extent::new(expected));
                }
                Op::Remove(n) if n <= expected => {
                    expected -= n;
                    prop_assert_eq!(reg.remove(&usd, Extent::new(n)).unwrap(), Extent::new(expected));
                }
                Op::Remove(n) => {
                    let is_insufficient = matches!(
                        reg.remove(&usd, Extent::new(n)),
                        Err(EslError::InsufficientExtent { .. })
                    );
                    prop_assert!(is_insufficient);
                }
            }
            prop_assert_eq!(reg.extent_of(usd.id()), Extent::new(expected));
            // Zero-extent records are never retained.
            prop_assert_eq!(reg.holds(usd.id()), expected > 0);
        }
    }

    /// Transferring x from A to B and back restores both registries,
    /// state included. When B already holds the instance with a different
    /// state the transfer is refused and neither side changes.
    #[test]
    fn transfer_round_trip_restores_both_sides(
        held_a in 1u64..10_000,
        held_b in 0u64..10_000,
        fraction in 0.0f64..1.0,
        same_state in any::<bool>(),
    ) {
        let catalog = Arc::new(PropertyCatalog::new());
        let cash = catalog.register("cash", OwnershipMode::Fungible).unwrap();
        let (a, b) = (registry("a", &catalog), registry("b", &catalog));
        let lot = Property::new(&cash).with_state(json!({ "owner": "a", "vintage": held_a }));
        a.add(&lot, Extent::new(held_a)).unwrap();
        if held_b > 0 {
            let b_copy = if same_state {
                lot.clone()
            } else {
                lot.clone().with_state(json!({ "owner": "b" }))
            };
            b.add(&b_copy, Extent::new(held_b)).unwrap();
        }
        let moved = ((held_a as f64 * fraction) as u64).clamp(1, held_a);
        let (before_a, before_b) = (snapshot(&a), snapshot(&b));

        if held_b > 0 && !same_state {
            let is_conflict = matches!(
                transfer(&a, &b, &lot, Extent::new(moved)),
                Err(EslError::StateConflict { .. })
            );
            prop_assert!(is_conflict);
        } else {
            transfer(&a, &b, &lot, Extent::new(moved)).unwrap();
            prop_assert_eq!(a.extent_of(lot.id()).value() + b.extent_of(lot.id()).value(), held_a + held_b);
            transfer(&b, &a, &lot, Extent::new(moved)).unwrap();
        }

        prop_assert_eq!(snapshot(&a), before_a);
        prop_assert_eq!(snapshot(&b), before_b);
    }

    /// Exclusive property keeps exactly one holder through any sequence of
    /// transfers between ledger agents.
    #[test]
    fn exclusive_property_always_has_one_holder(hops in prop::collection::vec(0usize..4, 1..20)) {
        let ledger = OwnershipLedger::default();
        let bond = ledger.register_kind("bond", OwnershipMode::Exclusive).unwrap();
        let agents: Vec<_> = (0..4)
            .map(|i| {
                let agent = AgentId::new(format!("agent-{i}"));
                ledger.register_agent(agent.clone());
                agent
            })
            .collect();
        let contract = Property::new(&bond);
        ledger.add(&agents[0], &contract, Extent::UNIT).unwrap();
        let mut holder = 0;

        for next in hops {
            ledger.transfer(&agents[holder], &agents[next], &contract, Extent::UNIT).unwrap();
            holder = next;
            prop_assert_eq!(ledger.holders(contract.id()), vec![(agents[holder].clone(), Extent::UNIT)]);
            prop_assert_eq!(ledger.exclusive_holder(contract.id()), Some(agents[holder].clone()));
        }
    }
}
