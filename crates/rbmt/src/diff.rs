//! Change-set computation between two trees.
//!
//! Equal subtrees are pruned by a single digest comparison, so traversal
//! cost scales with the size of the symmetric difference rather than with
//! either tree's full size.

use rbmt_hash::HashAdapter;

use crate::encode::{CanonicalEncode, KeyEncode};
use crate::store::{Node, NodeId, Store};

/// Which side of a `get_change_set` comparison an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Source,
    Destination,
}

impl Origin {
    fn opposite(self) -> Origin {
        match self {
            Origin::Source => Origin::Destination,
            Origin::Destination => Origin::Source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry<K, V> {
    pub origin: Origin,
    pub key: K,
    pub value: V,
}

/// Walks `self_store` (as `Source`) and `other_store` (as `Destination`)
/// in lockstep from their roots, emitting every key/value pair that
/// differs between the two.
pub(crate) fn get_change_set<K, V>(
    self_store: &Store<K, V>,
    adapter: &HashAdapter,
    other_store: &Store<K, V>,
) -> Vec<ChangeEntry<K, V>>
where
    K: Clone + PartialEq + KeyEncode,
    V: Clone + PartialEq + CanonicalEncode,
{
    let mut out = Vec::new();
    walk(self_store, other_store, adapter, self_store.root, other_store.root, &mut out);
    out
}

fn walk<K, V>(
    a_store: &Store<K, V>,
    b_store: &Store<K, V>,
    adapter: &HashAdapter,
    a: NodeId,
    b: NodeId,
    out: &mut Vec<ChangeEntry<K, V>>,
) where
    K: Clone + PartialEq + KeyEncode,
    V: Clone + PartialEq + CanonicalEncode,
{
    let da = crate::digest::node_digest(a_store, adapter, a);
    let db = crate::digest::node_digest(b_store, adapter, b);
    if da == db {
        return;
    }

    match (a_store.node(a), b_store.node(b)) {
        (Node::Internal(na), Node::Internal(nb)) => {
            walk(a_store, b_store, adapter, na.left, nb.left, out);
            walk(a_store, b_store, adapter, na.right, nb.right, out);
        }
        (Node::Internal(_), Node::Leaf(_)) => match leaf_payload(b_store, b) {
            Some((k, v)) => {
                let mut found = false;
                diff_against_singleton(a_store, a, Origin::Source, &k, &v, &mut found, out);
                if !found {
                    out.push(ChangeEntry { origin: Origin::Destination, key: k, value: v });
                }
            }
            // `b` is the sentinel: every real leaf on the internal side is
            // a one-sided difference.
            None => enumerate_leaves(a_store, a, Origin::Source, out),
        },
        (Node::Leaf(_), Node::Internal(_)) => match leaf_payload(a_store, a) {
            Some((k, v)) => {
                let mut found = false;
                diff_against_singleton(b_store, b, Origin::Destination, &k, &v, &mut found, out);
                if !found {
                    out.push(ChangeEntry { origin: Origin::Source, key: k, value: v });
                }
            }
            None => enumerate_leaves(b_store, b, Origin::Destination, out),
        },
        (Node::Leaf(la), Node::Leaf(lb)) => match (&la.key, &la.value, &lb.key, &lb.value) {
            (Some(ka), Some(va), Some(kb), Some(vb)) => {
                if ka != kb {
                    out.push(ChangeEntry { origin: Origin::Source, key: ka.clone(), value: va.clone() });
                    out.push(ChangeEntry { origin: Origin::Destination, key: kb.clone(), value: vb.clone() });
                } else if va != vb {
                    out.push(ChangeEntry { origin: Origin::Source, key: ka.clone(), value: va.clone() });
                    out.push(ChangeEntry { origin: Origin::Destination, key: kb.clone(), value: vb.clone() });
                }
            }
            // Both sentinels with unequal digests is impossible (the
            // sentinel digest is a fixed constant for a given adapter).
            _ => {}
        },
    }
}

/// Emits every real leaf under `node` with the given `origin`.
fn enumerate_leaves<K, V>(store: &Store<K, V>, node: NodeId, origin: Origin, out: &mut Vec<ChangeEntry<K, V>>)
where
    K: Clone,
    V: Clone,
{
    match store.node(node) {
        Node::Internal(n) => {
            enumerate_leaves(store, n.left, origin, out);
            enumerate_leaves(store, n.right, origin, out);
        }
        Node::Leaf(l) => {
            if let (Some(k), Some(v)) = (&l.key, &l.value) {
                out.push(ChangeEntry { origin, key: k.clone(), value: v.clone() });
            }
        }
    }
}

fn leaf_payload<K, V>(store: &Store<K, V>, id: NodeId) -> Option<(K, V)>
where
    K: Clone,
    V: Clone,
{
    match store.node(id) {
        Node::Leaf(l) => match (&l.key, &l.value) {
            (Some(k), Some(v)) => Some((k.clone(), v.clone())),
            _ => None,
        },
        Node::Internal(_) => unreachable!("leaf_payload expects a leaf id"),
    }
}

/// Walks every real leaf under `other` (tagged `other_origin`), comparing
/// each against `(single_key, single_value)`. A leaf with a different key
/// is always a one-sided difference. A leaf with the same key but a
/// different value produces entries on *both* sides (and sets
/// `found_match`, so the caller knows not to separately report the
/// singleton as key-absent-on-the-other-side). A leaf with the same key
/// and the same value means no difference for that key at all — nothing
/// is emitted, but `found_match` is still set.
fn diff_against_singleton<K, V>(
    other_store: &Store<K, V>,
    other: NodeId,
    other_origin: Origin,
    single_key: &K,
    single_value: &V,
    found_match: &mut bool,
    out: &mut Vec<ChangeEntry<K, V>>,
) where
    K: Clone + PartialEq,
    V: Clone + PartialEq,
{
    match other_store.node(other) {
        Node::Internal(n) => {
            diff_against_singleton(other_store, n.left, other_origin, single_key, single_value, found_match, out);
            diff_against_singleton(other_store, n.right, other_origin, single_key, single_value, found_match, out);
        }
        Node::Leaf(l) => {
            if let (Some(k), Some(v)) = (&l.key, &l.value) {
                if k == single_key {
                    *found_match = true;
                    if v != single_value {
                        out.push(ChangeEntry { origin: other_origin, key: k.clone(), value: v.clone() });
                        out.push(ChangeEntry {
                            origin: other_origin.opposite(),
                            key: single_key.clone(),
                            value: single_value.clone(),
                        });
                    }
                } else {
                    out.push(ChangeEntry { origin: other_origin, key: k.clone(), value: v.clone() });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance;
    use rbmt_hash::HashAlgorithm;

    fn adapter() -> HashAdapter {
        HashAdapter::named(HashAlgorithm::Sha256)
    }

    #[test]
    fn identical_trees_have_no_change_set() {
        let a_adapter = adapter();
        let mut a: Store<u32, u32> = Store::new();
        let mut b: Store<u32, u32> = Store::new();
        for k in [1, 2, 3, 4] {
            balance::insert(&mut a, &a_adapter, k, k * 10);
        }
        for k in [4, 3, 2, 1] {
            balance::insert(&mut b, &a_adapter, k, k * 10);
        }
        let changes = get_change_set(&a, &a_adapter, &b);
        assert!(changes.is_empty());
    }

    #[test]
    fn disjoint_and_modified_keys_are_all_reported() {
        let a_adapter = adapter();
        let mut a: Store<u32, String> = Store::new();
        let mut b: Store<u32, String> = Store::new();
        for (k, v) in [(1, "a"), (2, "b"), (3, "c")] {
            balance::insert(&mut a, &a_adapter, k, v.to_string());
        }
        for (k, v) in [(2, "B"), (3, "c"), (4, "d")] {
            balance::insert(&mut b, &a_adapter, k, v.to_string());
        }
        let mut changes = get_change_set(&a, &a_adapter, &b);
        changes.sort_by(|x, y| (x.key, x.origin as u8).cmp(&(y.key, y.origin as u8)));

        let expected_pairs = [
            (Origin::Source, 1u32, "a".to_string()),
            (Origin::Source, 2, "b".to_string()),
            (Origin::Destination, 2, "B".to_string()),
            (Origin::Destination, 4, "d".to_string()),
        ];
        assert_eq!(changes.len(), expected_pairs.len());
        for (entry, (origin, key, value)) in changes.iter().zip(expected_pairs.iter()) {
            assert_eq!(entry.origin, *origin);
            assert_eq!(&entry.key, key);
            assert_eq!(&entry.value, value);
        }
    }
}
