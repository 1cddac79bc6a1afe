//! Digest engine.
//!
//! Given any node, recomputes its digest from its current children and
//! propagates the change up to the root. Rotations and color flips that
//! change a node's children must call [`set_digests_from_children`] for
//! that node and then [`recompute_up`] so every ancestor's digest pair
//! stays consistent (invariant 6).

use rbmt_hash::{Digest, HashAdapter};

use crate::encode::{CanonicalEncode, KeyEncode};
use crate::store::{Node, NodeId, Side, Store, NIL};

/// The digest of `id` as its parent would see it: a leaf digest, the fixed
/// sentinel digest, or an internal node's `H(digest_left, digest_right)`.
pub(crate) fn node_digest<K, V>(store: &Store<K, V>, adapter: &HashAdapter, id: NodeId) -> Digest
where
    K: KeyEncode,
    V: CanonicalEncode,
{
    match store.node(id) {
        Node::Leaf(leaf) => match (&leaf.key, &leaf.value) {
            (Some(k), Some(v)) => adapter.leaf_digest(&k.encode_key(), &v.encode_value()),
            _ => adapter.sentinel_digest(),
        },
        Node::Internal(n) => adapter.internal_digest(&n.digest_left, &n.digest_right),
    }
}

/// Sets `id`'s stored `digest_left`/`digest_right` directly from its
/// current children, without touching anything above `id`.
pub(crate) fn set_digests_from_children<K, V>(
    store: &mut Store<K, V>,
    adapter: &HashAdapter,
    id: NodeId,
) where
    K: KeyEncode,
    V: CanonicalEncode,
{
    let (left, right) = {
        let n = store.internal(id);
        (n.left, n.right)
    };
    let dl = node_digest(store, adapter, left);
    let dr = node_digest(store, adapter, right);
    let n = store.internal_mut(id);
    n.digest_left = dl;
    n.digest_right = dr;
}

/// Walks from `node` up to the root, recomputing each ancestor's digest
/// pair. `node` itself must already have a correct digest (as computed by
/// [`node_digest`]); this only patches the *parent* links above it.
pub(crate) fn recompute_up<K, V>(store: &mut Store<K, V>, adapter: &HashAdapter, mut node: NodeId)
where
    K: KeyEncode,
    V: CanonicalEncode,
{
    loop {
        let parent = store.parent_of(node);
        if parent == NIL {
            break;
        }
        let side = store.side_of(node);
        let child_digest = node_digest(store, adapter, node);
        let p = store.internal_mut(parent);
        match side {
            Side::Left => p.digest_left = child_digest,
            Side::Right => p.digest_right = child_digest,
        }
        node = parent;
    }
}
