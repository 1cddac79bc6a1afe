//! Property tests: a sequence of random operations is mirrored against a
//! `BTreeMap` oracle, and every structural invariant is re-checked with
//! `self_check()` after each step.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rbmt::{HashAlgorithm, Tree};

#[derive(Debug, Clone)]
enum Op {
    Insert(u16, u16),
    Set(u16, u16),
    Delete(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u16>(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
        (any::<u16>(), any::<u16>()).prop_map(|(k, v)| Op::Set(k, v)),
        any::<u16>().prop_map(Op::Delete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// After every operation in a random sequence, the tree agrees with a
    /// `BTreeMap` oracle on membership, ordering, and length, and every
    /// structural invariant from `self_check` still holds.
    #[test]
    fn matches_btreemap_oracle(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut tree: Tree<u16, u16> = Tree::new(HashAlgorithm::Sha256);
        let mut oracle: BTreeMap<u16, u16> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let inserted = tree.insert(k, v);
                    prop_assert_eq!(inserted, !oracle.contains_key(&k));
                    oracle.entry(k).or_insert(v);
                }
                Op::Set(k, v) => {
                    tree.set(k, v);
                    oracle.insert(k, v);
                }
                Op::Delete(k) => {
                    let removed = tree.delete(&k);
                    prop_assert_eq!(removed, oracle.remove(&k));
                }
            }

            prop_assert_eq!(tree.len(), oracle.len());
            prop_assert_eq!(tree.is_empty(), oracle.is_empty());
            prop_assert!(tree.self_check().is_ok());

            let tree_keys: Vec<u16> = tree.iterate().map(|(k, _)| *k).collect();
            let oracle_keys: Vec<u16> = oracle.keys().copied().collect();
            prop_assert_eq!(tree_keys, oracle_keys);

            for (k, v) in &oracle {
                prop_assert_eq!(tree.get(k), Some(v));
                prop_assert!(tree.contains(k));
            }
        }
    }

    /// Inserting the same key/value pairs in any order produces the same
    /// root digest and an empty change-set against each other (spec §8,
    /// "insertion order independence").
    #[test]
    fn digest_is_order_independent(
        pairs in prop::collection::vec((any::<u8>(), any::<u8>()), 0..40),
        seed in any::<u64>(),
    ) {
        let mut shuffled = pairs.clone();
        // Deterministic pseudo-shuffle so the test stays reproducible
        // without relying on `rand` (not in this workspace's dependency
        // set) or on disallowed `Math.random`-style sources.
        let mut seed = seed;
        for i in (1..shuffled.len()).rev() {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            let j = (seed >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }

        let a: Tree<u8, u8> = Tree::builder().from_pairs(pairs.iter().copied().map(|(k, v)| (k, v)));
        let b: Tree<u8, u8> = Tree::builder().from_pairs(shuffled.iter().copied().map(|(k, v)| (k, v)));

        prop_assert!(a.equals(&b));
        prop_assert!(a.get_change_set(&b).is_empty());
        prop_assert!(a.self_check().is_ok());
        prop_assert!(b.self_check().is_ok());
    }

    /// A verification object for a present key verifies against the
    /// tree's current digest; one for an absent key proves absence; both
    /// fail against a digest that isn't the tree's own.
    #[test]
    fn verification_objects_are_sound(
        pairs in prop::collection::vec((any::<u16>(), any::<u16>()), 1..40),
        probe in any::<u16>(),
    ) {
        let tree: Tree<u16, u16> = Tree::builder().from_pairs(pairs.iter().copied());

        let (value, vo) = tree.get_verified(&probe);
        prop_assert_eq!(value.is_some(), tree.contains(&probe));
        prop_assert!(tree.verify(&vo));

        let other: Tree<u16, u16> = Tree::builder().from_pairs(pairs.iter().copied().map(|(k, v)| (k, v.wrapping_add(1))));
        if !other.equals(&tree) {
            prop_assert!(!other.verify(&vo));
        }
    }
}
