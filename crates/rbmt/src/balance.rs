//! RB balancer.
//!
//! Insert/delete fix-ups via rotations and recoloring, preserving BST
//! order, the internal-key rule, and red-black balance (spec.md §4.4).
//! Leaves always count as Black for the purposes of the red-black rules,
//! which makes this tree's fix-up logic a direct transcription of the
//! classic (CLRS) insert/delete fix-up algorithms: our "internal nodes"
//! play the role of CLRS's colored nodes, and our "leaves" play the role
//! of CLRS's black `T.nil` sentinels — except ours hold real data instead
//! of being a single shared sentinel.

use rbmt_hash::HashAdapter;

use crate::digest::{node_digest, recompute_up, set_digests_from_children};
use crate::encode::{CanonicalEncode, KeyEncode};
use crate::list;
use crate::store::{Color, Side, Store, NIL};

type NodeId = crate::store::NodeId;

/// Inserts `key`/`value`. Returns `false` (no-op) if `key` was already
/// present.
pub(crate) fn insert<K, V>(store: &mut Store<K, V>, adapter: &HashAdapter, key: K, value: V) -> bool
where
    K: Ord + Clone + KeyEncode,
    V: CanonicalEncode,
{
    let mut cur = store.root;
    while !store.is_leaf(cur) {
        cur = if key <= store.internal(cur).key {
            store.internal(cur).left
        } else {
            store.internal(cur).right
        };
    }
    let leaf = cur;
    let existing_key = store.leaf(leaf).key.clone();
    if existing_key.as_ref() == Some(&key) {
        return false;
    }

    // The sentinel (`+∞`) sorts after every finite key, so landing on it
    // always means the new key goes to its left.
    let new_is_left = match &existing_key {
        Some(xk) => key < *xk,
        None => true,
    };

    let parent = store.parent_of(leaf);
    let new_leaf = store.alloc_leaf(key.clone(), value, NIL);

    if new_is_left {
        list::splice_before(store, leaf, new_leaf);
    } else {
        list::splice_after(store, leaf, new_leaf);
    }

    let (left_child, right_child, m_key) = if new_is_left {
        (new_leaf, leaf, key.clone())
    } else {
        // `leaf` cannot be the sentinel here: new_is_left is forced `true`
        // whenever `existing_key` is `None`.
        (leaf, new_leaf, existing_key.clone().unwrap())
    };

    let dl = node_digest(store, adapter, left_child);
    let dr = node_digest(store, adapter, right_child);
    let m = store.alloc_internal(m_key, Color::Red, parent, left_child, right_child, dl, dr);
    store.set_parent(left_child, m);
    store.set_parent(right_child, m);

    if parent == NIL {
        store.root = m;
    } else {
        let side = store.side_of(leaf);
        match side {
            Side::Left => store.internal_mut(parent).left = m,
            Side::Right => store.internal_mut(parent).right = m,
        }
    }

    store.size += 1;
    insert_fixup(store, adapter, m);
    store.set_color(store.root, Color::Black);
    recompute_up(store, adapter, m);
    true
}

/// Removes the leaf for `key`, returning its value, or `None` if absent.
pub(crate) fn delete<K, V>(store: &mut Store<K, V>, adapter: &HashAdapter, key: &K) -> Option<V>
where
    K: Ord + Clone + KeyEncode,
    V: CanonicalEncode,
{
    let mut cur = store.root;
    while !store.is_leaf(cur) {
        cur = if *key <= store.internal(cur).key {
            store.internal(cur).left
        } else {
            store.internal(cur).right
        };
    }
    let leaf = cur;
    if store.leaf(leaf).key.as_ref() != Some(key) {
        return None;
    }

    let deleted_key = store.leaf(leaf).key.clone().unwrap();
    let removed_value = store.leaf_mut(leaf).value.take();
    let predecessor = store.leaf(leaf).prev;

    let p = store.parent_of(leaf);
    debug_assert_ne!(p, NIL, "a finite leaf always has an internal parent");
    let side = store.side_of(leaf);
    let s = match side {
        Side::Left => store.internal(p).right,
        Side::Right => store.internal(p).left,
    };
    let p_color = store.color_of(p);
    let grandparent = store.parent_of(p);

    list::unsplice(store, leaf);
    store.free_node(leaf);

    if grandparent == NIL {
        store.root = s;
        store.set_parent(s, NIL);
    } else {
        let gside = store.side_of(p);
        store.set_child(grandparent, gside, s);
    }
    store.free_node(p);
    store.size -= 1;

    // `deleted_key` can only still be a stale routing key somewhere above
    // when `leaf` was `p`'s right child: only then was `deleted_key` the
    // maximum of `p`'s whole subtree (and thus possibly of some ancestor's
    // left subtree too). When `leaf` was `p`'s left child, `p.key` alone
    // equaled `deleted_key`, and `p` itself is being freed, so no ancestor
    // needs fixing.
    if side == Side::Right {
        let predecessor_key = store.leaf(predecessor).key.clone().unwrap();
        fix_ancestor_keys(store, s, grandparent, &deleted_key, predecessor_key);
    }

    if p_color == Color::Black {
        delete_fixup(store, adapter, s);
    }
    recompute_up(store, adapter, s);

    removed_value
}

/// Delete's mirror image of "inserting a new subtree maximum": climbs
/// from `node` (occupying a specific child slot of `parent`) up through
/// right-child links, stopping at the first left-child link, and fixes
/// that ancestor's routing key if it equals `old_key`. An ancestor
/// reached via a right-child link has a routing key derived entirely
/// from its own left subtree, never from `node`'s side, so it is never a
/// candidate; at most one ancestor — the first reached via a left-child
/// link — can have `old_key` as its routing key.
fn fix_ancestor_keys<K, V>(store: &mut Store<K, V>, mut node: NodeId, mut parent: NodeId, old_key: &K, new_key: K)
where
    K: Clone + PartialEq,
{
    while parent != NIL && store.internal(parent).right == node {
        node = parent;
        parent = store.parent_of(parent);
    }
    if parent != NIL && store.internal(parent).key == *old_key {
        store.internal_mut(parent).key = new_key;
    }
}

fn rotate_left<K, V>(store: &mut Store<K, V>, adapter: &HashAdapter, x: NodeId)
where
    K: Ord + Clone + KeyEncode,
    V: CanonicalEncode,
{
    let y = store.internal(x).right;
    let parent = store.parent_of(x);
    let side = if parent != NIL { Some(store.side_of(x)) } else { None };
    let t2 = store.internal(y).left;

    store.set_child(x, Side::Right, t2);
    store.set_child(y, Side::Left, x);

    match side {
        Some(side) => store.set_child(parent, side, y),
        None => {
            store.root = y;
            store.set_parent(y, NIL);
        }
    }

    let x_left = store.internal(x).left;
    let xk = store.subtree_max_key(x_left);
    store.internal_mut(x).key = xk;
    let y_left = store.internal(y).left;
    let yk = store.subtree_max_key(y_left);
    store.internal_mut(y).key = yk;

    set_digests_from_children(store, adapter, x);
    set_digests_from_children(store, adapter, y);
}

fn rotate_right<K, V>(store: &mut Store<K, V>, adapter: &HashAdapter, x: NodeId)
where
    K: Ord + Clone + KeyEncode,
    V: CanonicalEncode,
{
    let y = store.internal(x).left;
    let parent = store.parent_of(x);
    let side = if parent != NIL { Some(store.side_of(x)) } else { None };
    let t2 = store.internal(y).right;

    store.set_child(x, Side::Left, t2);
    store.set_child(y, Side::Right, x);

    match side {
        Some(side) => store.set_child(parent, side, y),
        None => {
            store.root = y;
            store.set_parent(y, NIL);
        }
    }

    let y_left = store.internal(y).left;
    let yk = store.subtree_max_key(y_left);
    store.internal_mut(y).key = yk;
    let x_left = store.internal(x).left;
    let xk = store.subtree_max_key(x_left);
    store.internal_mut(x).key = xk;

    set_digests_from_children(store, adapter, x);
    set_digests_from_children(store, adapter, y);
}

fn insert_fixup<K, V>(store: &mut Store<K, V>, adapter: &HashAdapter, mut z: NodeId)
where
    K: Ord + Clone + KeyEncode,
    V: CanonicalEncode,
{
    while store.parent_of(z) != NIL && store.color_of(store.parent_of(z)) == Color::Red {
        let parent = store.parent_of(z);
        let grandparent = store.parent_of(parent);
        if parent == store.internal(grandparent).left {
            let uncle = store.internal(grandparent).right;
            if store.color_of(uncle) == Color::Red {
                store.set_color(parent, Color::Black);
                store.set_color(uncle, Color::Black);
                store.set_color(grandparent, Color::Red);
                z = grandparent;
            } else {
                if z == store.internal(parent).right {
                    z = parent;
                    rotate_left(store, adapter, z);
                }
                let parent = store.parent_of(z);
                let grandparent = store.parent_of(parent);
                store.set_color(parent, Color::Black);
                store.set_color(grandparent, Color::Red);
                rotate_right(store, adapter, grandparent);
            }
        } else {
            let uncle = store.internal(grandparent).left;
            if store.color_of(uncle) == Color::Red {
                store.set_color(parent, Color::Black);
                store.set_color(uncle, Color::Black);
                store.set_color(grandparent, Color::Red);
                z = grandparent;
            } else {
                if z == store.internal(parent).left {
                    z = parent;
                    rotate_right(store, adapter, z);
                }
                let parent = store.parent_of(z);
                let grandparent = store.parent_of(parent);
                store.set_color(parent, Color::Black);
                store.set_color(grandparent, Color::Red);
                rotate_left(store, adapter, grandparent);
            }
        }
    }
}

/// The loop body assumes `w` (x's sibling) is always an internal node.
/// This holds because black-height uniformity forces it: if `w` were a
/// plain (black-height-1) leaf, `x`'s "proper" black height would also be
/// 1, but `x` is currently short by exactly one black unit relative to
/// that proper height — which would make its current height 0, impossible
/// for any real node. So whenever this loop runs, `w` has real children.
fn delete_fixup<K, V>(store: &mut Store<K, V>, adapter: &HashAdapter, mut x: NodeId)
where
    K: Ord + Clone + KeyEncode,
    V: CanonicalEncode,
{
    while x != store.root && store.color_of(x) == Color::Black {
        let parent = store.parent_of(x);
        if x == store.internal(parent).left {
            let mut w = store.internal(parent).right;
            if store.color_of(w) == Color::Red {
                store.set_color(w, Color::Black);
                store.set_color(parent, Color::Red);
                rotate_left(store, adapter, parent);
                w = store.internal(parent).right;
            }
            let w_left_black = store.color_of(store.internal(w).left) == Color::Black;
            let w_right_black = store.color_of(store.internal(w).right) == Color::Black;
            if w_left_black && w_right_black {
                store.set_color(w, Color::Red);
                x = parent;
            } else {
                if w_right_black {
                    let w_left = store.internal(w).left;
                    store.set_color(w_left, Color::Black);
                    store.set_color(w, Color::Red);
                    rotate_right(store, adapter, w);
                    w = store.internal(parent).right;
                }
                store.set_color(w, store.color_of(parent));
                store.set_color(parent, Color::Black);
                let w_right = store.internal(w).right;
                store.set_color(w_right, Color::Black);
                rotate_left(store, adapter, parent);
                x = store.root;
            }
        } else {
            let mut w = store.internal(parent).left;
            if store.color_of(w) == Color::Red {
                store.set_color(w, Color::Black);
                store.set_color(parent, Color::Red);
                rotate_right(store, adapter, parent);
                w = store.internal(parent).left;
            }
            let w_right_black = store.color_of(store.internal(w).right) == Color::Black;
            let w_left_black = store.color_of(store.internal(w).left) == Color::Black;
            if w_right_black && w_left_black {
                store.set_color(w, Color::Red);
                x = parent;
            } else {
                if w_left_black {
                    let w_right = store.internal(w).right;
                    store.set_color(w_right, Color::Black);
                    store.set_color(w, Color::Red);
                    rotate_left(store, adapter, w);
                    w = store.internal(parent).left;
                }
                store.set_color(w, store.color_of(parent));
                store.set_color(parent, Color::Black);
                let w_left = store.internal(w).left;
                store.set_color(w_left, Color::Black);
                rotate_right(store, adapter, parent);
                x = store.root;
            }
        }
    }
    store.set_color(x, Color::Black);
}
