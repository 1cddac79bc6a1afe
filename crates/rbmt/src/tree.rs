//! Public façade.
//!
//! `Tree<K, V>` orchestrates the other modules: mutations delegate to
//! [`crate::balance`], reads to [`crate::query`], proofs to
//! [`crate::proof`], and cross-tree comparison to [`crate::diff`].

use rbmt_hash::{HashAdapter, HashAlgorithm};
use tracing::{debug, instrument, trace};

use crate::balance;
use crate::diff::ChangeEntry;
use crate::encode::{CanonicalEncode, KeyEncode};
use crate::error::InvariantError;
use crate::proof::{RootDigest, Vo};
use crate::query;
use crate::store::{Color, Node, NodeId, Store, NIL};
use crate::{diff, proof};

/// An authenticated ordered key-value map.
///
/// Every mutation leaves `digest()` consistent with the tree's current
/// contents (spec invariant 6); every read is `O(log n)` except
/// `iterate`/`self_check`, which are `O(n)`.
pub struct Tree<K, V> {
    store: Store<K, V>,
    adapter: HashAdapter,
}

impl<K, V> Tree<K, V>
where
    K: Ord + Clone + KeyEncode,
    V: Clone + CanonicalEncode,
{
    /// A tree using the named hash algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Builder::new().with_hash(algorithm).build()
    }

    pub fn builder() -> Builder<K, V> {
        Builder::new()
    }

    /// Inserts `key`/`value`; a no-op if `key` is already present.
    #[instrument(level = "info", skip(self, key, value))]
    pub fn insert(&mut self, key: K, value: V) -> bool {
        balance::insert(&mut self.store, &self.adapter, key, value)
    }

    /// Removes `key`, returning its value if it was present.
    #[instrument(level = "info", skip(self, key))]
    pub fn delete(&mut self, key: &K) -> Option<V> {
        balance::delete(&mut self.store, &self.adapter, key)
    }

    /// `insert` when `key` is absent, in-place value replacement
    /// otherwise (with digest recomputation from the modified leaf up to
    /// the root).
    #[instrument(level = "info", skip(self, key, value))]
    pub fn set(&mut self, key: K, value: V) {
        if !self.set_existing(&key, &value) {
            balance::insert(&mut self.store, &self.adapter, key, value);
        }
    }

    fn set_existing(&mut self, key: &K, value: &V) -> bool {
        let mut cur = self.store.root;
        while !self.store.is_leaf(cur) {
            cur = if *key <= self.store.internal(cur).key {
                self.store.internal(cur).left
            } else {
                self.store.internal(cur).right
            };
        }
        if self.store.leaf(cur).key.as_ref() != Some(key) {
            return false;
        }
        self.store.leaf_mut(cur).value = Some(value.clone());
        crate::digest::recompute_up(&mut self.store, &self.adapter, cur);
        true
    }

    #[instrument(level = "trace", skip(self, key))]
    pub fn get(&self, key: &K) -> Option<&V> {
        query::get(&self.store, key)
    }

    /// Looks up `key` together with a verification object proving either
    /// its membership or its absence against `self.digest()`.
    pub fn get_verified(&self, key: &K) -> (Option<&V>, Vo<K, V>) {
        let vo = proof::build(&self.store, &self.adapter, key);
        (query::get(&self.store, key), vo)
    }

    #[instrument(level = "trace", skip(self, key))]
    pub fn contains(&self, key: &K) -> bool {
        query::contains(&self.store, key)
    }

    pub fn by_keys_order(&self, index: i64) -> Option<(&K, &V)> {
        query::by_keys_order(&self.store, index)
    }

    pub fn iterate(&self) -> impl Iterator<Item = (&K, &V)> {
        query::iterate(&self.store)
    }

    pub fn len(&self) -> usize {
        self.store.size
    }

    pub fn is_empty(&self) -> bool {
        self.store.size == 0
    }

    /// `(D(left(root)), D(right(root)))` — see spec §3, "root digest".
    pub fn digest(&self) -> RootDigest {
        if self.store.is_leaf(self.store.root) {
            let s = crate::digest::node_digest(&self.store, &self.adapter, self.store.root);
            (s.clone(), s)
        } else {
            let n = self.store.internal(self.store.root);
            (n.digest_left.clone(), n.digest_right.clone())
        }
    }

    /// Root-digest equality.
    pub fn equals(&self, other: &Tree<K, V>) -> bool {
        self.digest() == other.digest()
    }

    /// The symmetric difference between `self` (tagged `Source`) and
    /// `other` (tagged `Destination`).
    #[instrument(level = "debug", skip(self, other))]
    pub fn get_change_set(&self, other: &Tree<K, V>) -> Vec<ChangeEntry<K, V>>
    where
        K: PartialEq,
        V: PartialEq,
    {
        diff::get_change_set(&self.store, &self.adapter, &other.store)
    }

    /// Verifies `vo` against `self.digest()`.
    pub fn verify(&self, vo: &Vo<K, V>) -> bool {
        proof::verify(&self.digest(), vo, &self.adapter)
    }

    /// Walks the whole tree once, checking every structural invariant
    /// (spec §9, "self-test method"). `O(n)`.
    pub fn self_check(&self) -> Result<(), InvariantError> {
        self_check(&self.store, &self.adapter)
    }
}

impl<K, V> std::fmt::Debug for Tree<K, V>
where
    K: std::fmt::Debug + Ord + Clone + KeyEncode,
    V: std::fmt::Debug + Clone + CanonicalEncode,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iterate()).finish()
    }
}

/// Construction options: hash algorithm and bulk loading (spec §6,
/// "Construction options").
pub struct Builder<K, V> {
    adapter: HashAdapter,
    _marker: std::marker::PhantomData<fn() -> (K, V)>,
}

impl<K, V> Builder<K, V>
where
    K: Ord + Clone + KeyEncode,
    V: Clone + CanonicalEncode,
{
    pub fn new() -> Self {
        Builder {
            adapter: HashAdapter::named(HashAlgorithm::Sha256),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn with_hash(mut self, algorithm: HashAlgorithm) -> Self {
        self.adapter = HashAdapter::named(algorithm);
        self
    }

    pub fn with_custom_hash<F>(mut self, combine: F) -> Self
    where
        F: Fn(&[u8], &[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        self.adapter = HashAdapter::custom(combine);
        self
    }

    pub fn build(self) -> Tree<K, V> {
        debug!(algorithm = ?self.adapter, "building empty tree");
        Tree {
            store: Store::new(),
            adapter: self.adapter,
        }
    }

    /// Bulk construction from key/value pairs, or equivalently from any
    /// key→value mapping (anything with `IntoIterator<Item = (K, V)>`,
    /// which every `HashMap`/`BTreeMap` already is); first occurrence
    /// wins on duplicate keys (spec §6).
    pub fn from_pairs<I>(self, pairs: I) -> Tree<K, V>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tree = self.build();
        for (k, v) in pairs {
            tree.insert(k, v);
        }
        tree
    }

    /// Bulk construction from a bare sequence of keys, each paired with
    /// `V::default()` (spec §6, "bulk construction from ... a sequence of
    /// keys"); first occurrence wins on duplicate keys.
    pub fn from_keys<I>(self, keys: I) -> Tree<K, V>
    where
        I: IntoIterator<Item = K>,
        V: Default,
    {
        self.from_pairs(keys.into_iter().map(|k| (k, V::default())))
    }
}

impl<K, V> Default for Builder<K, V>
where
    K: Ord + Clone + KeyEncode,
    V: Clone + CanonicalEncode,
{
    fn default() -> Self {
        Self::new()
    }
}

fn self_check<K, V>(store: &Store<K, V>, adapter: &HashAdapter) -> Result<(), InvariantError>
where
    K: Ord + Clone + KeyEncode,
    V: CanonicalEncode,
{
    if store.color_of(store.root) != Color::Black {
        return Err(InvariantError::RootNotBlack);
    }
    let mut visited_leaves = 0usize;
    check_node(store, adapter, store.root, None, &mut visited_leaves)?;
    if visited_leaves != store.size + 1 {
        return Err(InvariantError::LeafListCorrupt {
            expected: store.size + 1,
            actual: visited_leaves,
        });
    }
    check_leaf_list(store)?;
    Ok(())
}

/// Recursively checks BST order, the internal-key rule, red-black
/// balance, and digest consistency under `node`; returns its black
/// height (counting only internal Black nodes, excluding the terminal
/// leaf itself).
fn check_node<K, V>(
    store: &Store<K, V>,
    adapter: &HashAdapter,
    node: NodeId,
    bound: Option<&K>,
    visited_leaves: &mut usize,
) -> Result<usize, InvariantError>
where
    K: Ord + Clone + KeyEncode,
    V: CanonicalEncode,
{
    match store.node(node) {
        Node::Leaf(_) => {
            *visited_leaves += 1;
            Ok(0)
        }
        Node::Internal(n) => {
            if let Some(b) = bound {
                if n.key > *b {
                    return Err(InvariantError::BstOrder { at: format!("node {node}") });
                }
            }
            let left_max = store.subtree_max_key(n.left);
            if left_max != n.key {
                return Err(InvariantError::InternalKeyRule {
                    at: format!("node {node}"),
                    expected: "max(left subtree)".to_string(),
                });
            }
            if n.color == Color::Red {
                if store.color_of(n.left) == Color::Red || store.color_of(n.right) == Color::Red {
                    return Err(InvariantError::RedRedViolation { at: format!("node {node}") });
                }
            }
            let dl = crate::digest::node_digest(store, adapter, n.left);
            let dr = crate::digest::node_digest(store, adapter, n.right);
            if dl != n.digest_left || dr != n.digest_right {
                return Err(InvariantError::DigestMismatch { at: format!("node {node}") });
            }

            let left_height = check_node(store, adapter, n.left, Some(&n.key), visited_leaves)?;
            let right_height = check_node(store, adapter, n.right, bound, visited_leaves)?;
            if left_height != right_height {
                return Err(InvariantError::BlackHeightMismatch {
                    left: left_height,
                    right: right_height,
                });
            }
            Ok(left_height + if n.color == Color::Black { 1 } else { 0 })
        }
    }
}

fn check_leaf_list<K, V>(store: &Store<K, V>) -> Result<(), InvariantError>
where
    K: Ord,
{
    let mut cur = store.head;
    let mut prev = NIL;
    let mut count = 0usize;
    let mut last_key: Option<&K> = None;
    loop {
        let leaf = store.leaf(cur);
        if leaf.prev != prev {
            return Err(InvariantError::SentinelMisplaced);
        }
        if cur == store.sentinel {
            break;
        }
        if let Some(k) = &leaf.key {
            if let Some(last) = last_key {
                if k <= last {
                    return Err(InvariantError::BstOrder { at: "leaf list".to_string() });
                }
            }
            last_key = Some(k);
        }
        count += 1;
        prev = cur;
        cur = leaf.next;
    }
    if count != store.size {
        return Err(InvariantError::LeafListCorrupt {
            expected: store.size,
            actual: count,
        });
    }
    trace!(count, "leaf list walked");
    Ok(())
}
