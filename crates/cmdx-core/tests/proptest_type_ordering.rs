#![forbid(unsafe_code)]

//! Property tests for [`TypeOrdering`] over random type hierarchies.
//!
//! Validates:
//! - The ordering is a total order (reflexive equality, antisymmetric,
//!   transitive).
//! - Every proper ancestor sorts before its descendants.
//! - Same-depth types sort by name.
//! - Undoability follows assignability to the built-in undoable type.

use std::cmp::Ordering;

use cmdx_core::{CommandType, TypeOrdering};
use proptest::prelude::*;

/// For each new type: name index and a bitmask selecting earlier types as
/// supertypes (empty mask = extends `Command`).
fn hierarchy_strategy() -> impl Strategy<Value = Vec<(u8, u32, bool)>> {
    prop::collection::vec((0u8..6, any::<u32>(), any::<bool>()), 1..12)
}

fn build(spec: &[(u8, u32, bool)]) -> Vec<CommandType> {
    let mut types: Vec<CommandType> = Vec::with_capacity(spec.len());
    for (name, mask, undoable) in spec {
        let mut supers: Vec<CommandType> = types
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, t)| t.clone())
            .collect();
        if *undoable {
            supers.push(CommandType::undoable().clone());
        }
        types.push(CommandType::new(format!("T{name}"), &supers));
    }
    types
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn ordering_is_total(spec in hierarchy_strategy()) {
        let types = build(&spec);
        for a in &types {
            prop_assert_eq!(TypeOrdering::compare(a, a), Ordering::Equal);
            for b in &types {
                let ab = TypeOrdering::compare(a, b);
                prop_assert_eq!(ab, TypeOrdering::compare(b, a).reverse());
                prop_assert_eq!(ab == Ordering::Equal, a == b);
                for c in &types {
                    if ab == Ordering::Less && TypeOrdering::compare(b, c) == Ordering::Less {
                        prop_assert_eq!(TypeOrdering::compare(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn ancestors_sort_first(spec in hierarchy_strategy()) {
        let types = build(&spec);
        let mut sorted = types.clone();
        sorted.sort();
        for (i, a) in sorted.iter().enumerate() {
            for b in &sorted[i + 1..] {
                prop_assert!(!b.is_proper_supertype_of(a), "{} listed after its descendant {}", b, a);
                if a.depth() == b.depth() {
                    prop_assert!(a.name() <= b.name());
                }
            }
        }
    }

    #[test]
    fn undoable_iff_assignable(spec in hierarchy_strategy()) {
        let types = build(&spec);
        for t in &types {
            prop_assert_eq!(t.is_undoable(), CommandType::undoable().is_assignable_from(t));
            prop_assert!(CommandType::command().is_assignable_from(t));
            for parent in t.supertypes() {
                prop_assert!(parent.depth() < t.depth());
                prop_assert!(parent.is_proper_supertype_of(t));
            }
        }
    }
}
