//! Leaf list.
//!
//! Doubly linked chain of leaves in ascending key order, with the `+∞`
//! sentinel leaf always present as the tail (invariant 5). Splicing is
//! kept in lock-step with the structural change that necessitates it —
//! `insert`/`delete` call these helpers in the same breath as they
//! rewrite the tree shape, per spec.md §4.2's "atomically" requirement.

use crate::store::{NodeId, Store, NIL};

/// Links `new_leaf` into the list immediately before `anchor`.
pub(crate) fn splice_before<K, V>(store: &mut Store<K, V>, anchor: NodeId, new_leaf: NodeId) {
    let prev = store.leaf(anchor).prev;
    store.leaf_mut(new_leaf).prev = prev;
    store.leaf_mut(new_leaf).next = anchor;
    store.leaf_mut(anchor).prev = new_leaf;
    if prev == NIL {
        store.head = new_leaf;
    } else {
        store.leaf_mut(prev).next = new_leaf;
    }
}

/// Links `new_leaf` into the list immediately after `anchor`.
pub(crate) fn splice_after<K, V>(store: &mut Store<K, V>, anchor: NodeId, new_leaf: NodeId) {
    let next = store.leaf(anchor).next;
    store.leaf_mut(new_leaf).prev = anchor;
    store.leaf_mut(new_leaf).next = next;
    store.leaf_mut(anchor).next = new_leaf;
    if next != NIL {
        store.leaf_mut(next).prev = new_leaf;
    }
}

/// Removes `leaf` from the list, reconnecting its neighbors.
pub(crate) fn unsplice<K, V>(store: &mut Store<K, V>, leaf: NodeId) {
    let (prev, next) = {
        let l = store.leaf(leaf);
        (l.prev, l.next)
    };
    if prev == NIL {
        store.head = next;
    } else {
        store.leaf_mut(prev).next = next;
    }
    if next != NIL {
        store.leaf_mut(next).prev = prev;
    }
}
