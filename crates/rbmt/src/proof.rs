//! Verification objects: compact witnesses proving membership or absence
//! against a trusted root-digest pair, independent of the tree itself.

use rbmt_hash::{Digest, HashAdapter, HashError};

use crate::encode::{CanonicalEncode, KeyEncode};
use crate::store::{NodeId, Side, Store, NIL};

/// The root digest pair a verifier trusts (see `Tree::digest`).
pub type RootDigest = (Digest, Digest);

/// One step of a root-to-leaf descent path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step<K> {
    pub side: Side,
    pub node_key: K,
    pub sibling_digest: Digest,
}

/// A membership witness for one specific leaf: its key/value plus the
/// root-to-leaf path that lets a verifier recompute the root digest pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor<K, V> {
    pub key: K,
    pub value: V,
    pub path: Vec<Step<K>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status<K, V> {
    Found { value: V, path: Vec<Step<K>> },
    /// Witnessed by the two leaves immediately surrounding where
    /// `search_key` would fall; either side is `None` when `search_key`
    /// is smaller than every present key, or larger than every present
    /// key, respectively.
    Absent {
        left: Option<Neighbor<K, V>>,
        right: Option<Neighbor<K, V>>,
    },
}

/// A verification object: proves one statement about `search_key` against
/// a trusted root digest pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vo<K, V> {
    pub search_key: K,
    pub status: Status<K, V>,
}

/// Builds the root-to-leaf path for `leaf`, in root-first order.
fn build_path<K, V>(store: &Store<K, V>, adapter: &HashAdapter, leaf: NodeId) -> Vec<Step<K>>
where
    K: Clone + KeyEncode,
    V: CanonicalEncode,
{
    let mut steps = Vec::new();
    let mut node = leaf;
    loop {
        let parent = store.parent_of(node);
        if parent == NIL {
            break;
        }
        let side = store.side_of(node);
        let sibling = match side {
            Side::Left => store.internal(parent).right,
            Side::Right => store.internal(parent).left,
        };
        let sibling_digest = crate::digest::node_digest(store, adapter, sibling);
        steps.push(Step {
            side,
            node_key: store.internal(parent).key.clone(),
            sibling_digest,
        });
        node = parent;
    }
    steps.reverse();
    steps
}

fn neighbor_at<K, V>(store: &Store<K, V>, adapter: &HashAdapter, leaf: NodeId) -> Option<Neighbor<K, V>>
where
    K: Clone + KeyEncode,
    V: Clone + CanonicalEncode,
{
    if leaf == NIL || leaf == store.sentinel {
        return None;
    }
    let l = store.leaf(leaf);
    let key = l.key.clone()?;
    let value = l.value.clone()?;
    let path = build_path(store, adapter, leaf);
    Some(Neighbor { key, value, path })
}

/// Builds a VO for `key` by descending the tree once.
pub(crate) fn build<K, V>(store: &Store<K, V>, adapter: &HashAdapter, key: &K) -> Vo<K, V>
where
    K: Ord + Clone + KeyEncode,
    V: Clone + CanonicalEncode,
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
    let leaf_key = store.leaf(leaf).key.clone();

    if leaf_key.as_ref() == Some(key) {
        let value = store.leaf(leaf).value.clone().expect("present leaf has a value");
        let path = build_path(store, adapter, leaf);
        return Vo {
            search_key: key.clone(),
            status: Status::Found { value, path },
        };
    }

    // `leaf` is the smallest real leaf with key > search_key (or the
    // sentinel if search_key exceeds every present key) — i.e. the right
    // neighbor. Its list predecessor is the left neighbor.
    let right_id = leaf;
    let left_id = store.leaf(leaf).prev;
    Vo {
        search_key: key.clone(),
        status: Status::Absent {
            left: neighbor_at(store, adapter, left_id),
            right: neighbor_at(store, adapter, right_id),
        },
    }
}

/// Replays `path` from `leaf_digest` up to the root, returning the
/// reconstructed root digest pair, or `None` if a step's `node_key` is
/// inconsistent with its `side` under the descent rule.
fn replay<K>(search_key: &K, leaf_digest: Digest, path: &[Step<K>], adapter: &HashAdapter) -> Option<RootDigest>
where
    K: Ord,
{
    let mut running = leaf_digest;
    let mut pair: RootDigest = (running.clone(), running.clone());
    for step in path.iter().rev() {
        let went_left = *search_key <= step.node_key;
        if went_left != (step.side == Side::Left) {
            return None;
        }
        pair = match step.side {
            Side::Left => (running.clone(), step.sibling_digest.clone()),
            Side::Right => (step.sibling_digest.clone(), running.clone()),
        };
        running = adapter.internal_digest(&pair.0, &pair.1);
    }
    Some(pair)
}

/// Verifies `vo` against `trusted_root`.
///
/// Absence proofs check that both neighbors independently verify and that
/// they straddle `search_key`; the two neighbors being true leaf-list
/// neighbors (not merely two present keys on either side) is an assertion
/// this function trusts rather than re-derives, matching this structure's
/// honest-prover assumption (non-membership under an adversarial prover is
/// out of scope).
pub fn verify<K, V>(trusted_root: &RootDigest, vo: &Vo<K, V>, adapter: &HashAdapter) -> bool
where
    K: Ord + Clone + KeyEncode,
    V: CanonicalEncode,
{
    match &vo.status {
        Status::Found { value, path } => {
            let leaf_digest = adapter.leaf_digest(&vo.search_key.encode_key(), &value.encode_value());
            match replay(&vo.search_key, leaf_digest, path, adapter) {
                Some(root) => root == *trusted_root,
                None => false,
            }
        }
        Status::Absent { left, right } => {
            if left.is_none() && right.is_none() {
                let empty_root = adapter.sentinel_digest();
                return *trusted_root == (empty_root.clone(), empty_root);
            }
            let left_ok = match left {
                Some(n) => {
                    n.key < vo.search_key
                        && verify_neighbor(n, adapter)
                            .map(|root| root == *trusted_root)
                            .unwrap_or(false)
                }
                None => true,
            };
            let right_ok = match right {
                Some(n) => {
                    vo.search_key < n.key
                        && verify_neighbor(n, adapter)
                            .map(|root| root == *trusted_root)
                            .unwrap_or(false)
                }
                None => true,
            };
            left_ok && right_ok
        }
    }
}

fn verify_neighbor<K, V>(n: &Neighbor<K, V>, adapter: &HashAdapter) -> Option<RootDigest>
where
    K: Ord + KeyEncode,
    V: CanonicalEncode,
{
    let leaf_digest = adapter.leaf_digest(&n.key.encode_key(), &n.value.encode_value());
    replay(&n.key, leaf_digest, &n.path, adapter)
}

/// The normative bit-identical wire encoding (spec §6): a version byte, a
/// status byte, then length-prefixed keys/values and digests throughout,
/// so the format does not depend on any particular hash algorithm's fixed
/// output length.
pub mod wire {
    use super::*;

    const VERSION: u8 = 1;
    const STATUS_FOUND: u8 = 0;
    const STATUS_ABSENT: u8 = 1;
    const SIDE_LEFT: u8 = 0;
    const SIDE_RIGHT: u8 = 1;
    const PRESENT: u8 = 1;
    const ABSENT: u8 = 0;

    fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
        out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(bytes);
    }

    fn read_bytes<'a>(input: &'a [u8], pos: &mut usize) -> Result<&'a [u8], crate::error::ProofError> {
        if input.len() < *pos + 4 {
            return Err(crate::error::ProofError::Truncated("length prefix"));
        }
        let len = u32::from_le_bytes(input[*pos..*pos + 4].try_into().unwrap()) as usize;
        *pos += 4;
        if input.len() < *pos + len {
            return Err(crate::error::ProofError::Truncated("length-prefixed payload"));
        }
        let bytes = &input[*pos..*pos + len];
        *pos += len;
        Ok(bytes)
    }

    fn write_step<K: KeyEncode>(out: &mut Vec<u8>, step: &Step<K>) {
        out.push(match step.side {
            Side::Left => SIDE_LEFT,
            Side::Right => SIDE_RIGHT,
        });
        write_bytes(out, &step.node_key.encode_key());
        write_bytes(out, step.sibling_digest.as_bytes());
    }

    fn read_step(input: &[u8], pos: &mut usize) -> Result<Step<Vec<u8>>, crate::error::ProofError> {
        if *pos >= input.len() {
            return Err(crate::error::ProofError::Truncated("step side tag"));
        }
        let side_tag = input[*pos];
        *pos += 1;
        let side = match side_tag {
            SIDE_LEFT => Side::Left,
            SIDE_RIGHT => Side::Right,
            other => return Err(crate::error::ProofError::UnrecognizedStatus(other)),
        };
        let node_key = read_bytes(input, pos)?.to_vec();
        let sibling_digest = Digest::from_bytes(read_bytes(input, pos)?.to_vec());
        Ok(Step { side, node_key, sibling_digest })
    }

    fn write_path<K: KeyEncode>(out: &mut Vec<u8>, path: &[Step<K>]) {
        out.extend_from_slice(&(path.len() as u32).to_le_bytes());
        for step in path {
            write_step(out, step);
        }
    }

    fn read_path(input: &[u8], pos: &mut usize) -> Result<Vec<Step<Vec<u8>>>, crate::error::ProofError> {
        if input.len() < *pos + 4 {
            return Err(crate::error::ProofError::Truncated("path length"));
        }
        let count = u32::from_le_bytes(input[*pos..*pos + 4].try_into().unwrap()) as usize;
        *pos += 4;
        (0..count).map(|_| read_step(input, pos)).collect()
    }

    /// Encodes a VO whose keys/values already canonicalize to bytes. This
    /// loses the original `K`/`V` types; `decode` returns a byte-oriented
    /// VO suitable for re-verification via [`super::verify`] with `K = V =
    /// Vec<u8>`-style callers, or for forwarding opaquely.
    pub fn encode<K, V>(vo: &Vo<K, V>) -> Vec<u8>
    where
        K: KeyEncode,
        V: CanonicalEncode,
    {
        let mut out = Vec::new();
        out.push(VERSION);
        match &vo.status {
            Status::Found { value, path } => {
                out.push(STATUS_FOUND);
                write_bytes(&mut out, &vo.search_key.encode_key());
                write_bytes(&mut out, &value.encode_value());
                write_path(&mut out, path);
            }
            Status::Absent { left, right } => {
                out.push(STATUS_ABSENT);
                write_bytes(&mut out, &vo.search_key.encode_key());
                match left {
                    Some(n) => {
                        out.push(PRESENT);
                        write_bytes(&mut out, &n.key.encode_key());
                        write_bytes(&mut out, &n.value.encode_value());
                        write_path(&mut out, &n.path);
                    }
                    None => out.push(ABSENT),
                }
                match right {
                    Some(n) => {
                        out.push(PRESENT);
                        write_bytes(&mut out, &n.key.encode_key());
                        write_bytes(&mut out, &n.value.encode_value());
                        write_path(&mut out, &n.path);
                    }
                    None => out.push(ABSENT),
                }
            }
        }
        out
    }

    /// Decodes the normative wire form into a byte-keyed, byte-valued VO
    /// (`Vo<Vec<u8>, Vec<u8>>`) — decoding cannot recover the original `K`/
    /// `V` types, only their canonical byte encodings, which is exactly
    /// what [`super::verify`] needs to replay digests.
    ///
    /// Every sibling digest is checked against `adapter`'s expected output
    /// length (for a `Named` adapter); a wrong-length digest means the
    /// bytes were corrupted or encoded under a different algorithm, so
    /// it is reported as [`crate::error::ProofError::DigestLength`]
    /// rather than left to fail `verify` silently later.
    pub fn decode(input: &[u8], adapter: &HashAdapter) -> Result<Vo<Vec<u8>, Vec<u8>>, crate::error::ProofError> {
        let mut pos = 0usize;
        if input.is_empty() {
            return Err(crate::error::ProofError::Truncated("version byte"));
        }
        let version = input[pos];
        pos += 1;
        if version != VERSION {
            return Err(crate::error::ProofError::UnsupportedVersion(version));
        }
        if pos >= input.len() {
            return Err(crate::error::ProofError::Truncated("status byte"));
        }
        let status = input[pos];
        pos += 1;
        let search_key = read_bytes(input, &mut pos)?.to_vec();
        let status = match status {
            STATUS_FOUND => {
                let value = read_bytes(input, &mut pos)?.to_vec();
                let path = read_path(input, &mut pos)?;
                validate_path_digests(&path, adapter)?;
                Status::Found { value, path }
            }
            STATUS_ABSENT => {
                let left = read_neighbor(input, &mut pos)?;
                let right = read_neighbor(input, &mut pos)?;
                if let Some(n) = &left {
                    validate_path_digests(&n.path, adapter)?;
                }
                if let Some(n) = &right {
                    validate_path_digests(&n.path, adapter)?;
                }
                Status::Absent { left, right }
            }
            other => return Err(crate::error::ProofError::UnrecognizedStatus(other)),
        };
        Ok(Vo { search_key, status })
    }

    fn validate_path_digests(path: &[Step<Vec<u8>>], adapter: &HashAdapter) -> Result<(), crate::error::ProofError> {
        for step in path {
            if let Err(HashError::IncorrectLength { expected, actual }) = adapter.validate_digest(&step.sibling_digest)
            {
                return Err(crate::error::ProofError::DigestLength { expected, actual });
            }
        }
        Ok(())
    }

    fn read_neighbor(
        input: &[u8],
        pos: &mut usize,
    ) -> Result<Option<Neighbor<Vec<u8>, Vec<u8>>>, crate::error::ProofError> {
        if *pos >= input.len() {
            return Err(crate::error::ProofError::Truncated("neighbor presence tag"));
        }
        let tag = input[*pos];
        *pos += 1;
        if tag == ABSENT {
            return Ok(None);
        }
        if tag != PRESENT {
            return Err(crate::error::ProofError::UnrecognizedStatus(tag));
        }
        let key = read_bytes(input, pos)?.to_vec();
        let value = read_bytes(input, pos)?.to_vec();
        let path = read_path(input, pos)?;
        Ok(Some(Neighbor { key, value, path }))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use rbmt_hash::HashAlgorithm;

        fn adapter() -> HashAdapter {
            HashAdapter::named(HashAlgorithm::Sha256)
        }

        #[test]
        fn found_round_trips() {
            let vo = Vo {
                search_key: 7u32,
                status: Status::Found {
                    value: "seven".to_string(),
                    path: vec![Step {
                        side: Side::Left,
                        node_key: 9u32,
                        sibling_digest: Digest::from_bytes(vec![7u8; 32]),
                    }],
                },
            };
            let bytes = encode(&vo);
            let decoded = decode(&bytes, &adapter()).unwrap();
            assert_eq!(decoded.search_key, 7u32.encode_key());
            match decoded.status {
                Status::Found { value, path } => {
                    assert_eq!(value, "seven".encode_value());
                    assert_eq!(path.len(), 1);
                    assert_eq!(path[0].side, Side::Left);
                }
                Status::Absent { .. } => panic!("expected found"),
            }
        }

        #[test]
        fn truncated_input_is_rejected() {
            let a = adapter();
            assert!(decode(&[], &a).is_err());
            assert!(decode(&[VERSION], &a).is_err());
            assert!(decode(&[VERSION, STATUS_FOUND], &a).is_err());
        }

        #[test]
        fn unknown_version_is_rejected() {
            let bytes = vec![99, STATUS_FOUND];
            assert!(matches!(
                decode(&bytes, &adapter()),
                Err(crate::error::ProofError::UnsupportedVersion(99))
            ));
        }

        #[test]
        fn wrong_length_digest_is_rejected_for_named_adapter() {
            let vo = Vo {
                search_key: 7u32,
                status: Status::Found {
                    value: "seven".to_string(),
                    path: vec![Step {
                        side: Side::Left,
                        node_key: 9u32,
                        sibling_digest: Digest::from_bytes(vec![1, 2, 3]),
                    }],
                },
            };
            let bytes = encode(&vo);
            assert!(matches!(
                decode(&bytes, &adapter()),
                Err(crate::error::ProofError::DigestLength { expected: 32, actual: 3 })
            ));
        }

        #[test]
        fn wrong_length_digest_is_accepted_for_custom_adapter() {
            let vo = Vo {
                search_key: 7u32,
                status: Status::Found {
                    value: "seven".to_string(),
                    path: vec![Step {
                        side: Side::Left,
                        node_key: 9u32,
                        sibling_digest: Digest::from_bytes(vec![1, 2, 3]),
                    }],
                },
            };
            let bytes = encode(&vo);
            let custom = HashAdapter::custom(|a, b| [a, b].concat());
            assert!(decode(&bytes, &custom).is_ok());
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

    fn root_of<K: Clone + KeyEncode, V: CanonicalEncode>(store: &Store<K, V>, adapter: &HashAdapter) -> RootDigest {
        if store.is_leaf(store.root) {
            let s = crate::digest::node_digest(store, adapter, store.root);
            (s.clone(), s)
        } else {
            let n = store.internal(store.root);
            (n.digest_left.clone(), n.digest_right.clone())
        }
    }

    #[test]
    fn membership_vo_verifies_and_tamper_fails() {
        let mut store: Store<u32, String> = Store::new();
        let a = adapter();
        for k in [5u32, 3, 8, 1, 9, 7] {
            balance::insert(&mut store, &a, k, k.to_string());
        }
        let root = root_of(&store, &a);
        let vo = build(&store, &a, &7u32);
        assert!(verify(&root, &vo, &a));

        let mut tampered = vo.clone();
        if let Status::Found { value, .. } = &mut tampered.status {
            value.push('X');
        }
        assert!(!verify(&root, &tampered, &a));
    }

    #[test]
    fn absence_vo_verifies() {
        let mut store: Store<u32, String> = Store::new();
        let a = adapter();
        for k in [5u32, 3, 8, 1, 9, 7] {
            balance::insert(&mut store, &a, k, k.to_string());
        }
        let root = root_of(&store, &a);
        let vo = build(&store, &a, &6u32);
        assert!(matches!(vo.status, Status::Absent { .. }));
        assert!(verify(&root, &vo, &a));
    }

    #[test]
    fn absence_vo_below_minimum_has_no_left_neighbor() {
        let mut store: Store<u32, String> = Store::new();
        let a = adapter();
        for k in [5u32, 3, 8] {
            balance::insert(&mut store, &a, k, k.to_string());
        }
        let root = root_of(&store, &a);
        let vo = build(&store, &a, &0u32);
        match &vo.status {
            Status::Absent { left, right } => {
                assert!(left.is_none());
                assert!(right.is_some());
            }
            Status::Found { .. } => panic!("expected absent"),
        }
        assert!(verify(&root, &vo, &a));
    }

    #[test]
    fn vo_fails_against_a_different_roots_digest() {
        let mut store_a: Store<u32, String> = Store::new();
        let mut store_b: Store<u32, String> = Store::new();
        let a = adapter();
        for k in [5u32, 3, 8, 1, 9, 7] {
            balance::insert(&mut store_a, &a, k, k.to_string());
        }
        for k in [5u32, 3, 8, 1, 9] {
            balance::insert(&mut store_b, &a, k, k.to_string());
        }
        let root_b = root_of(&store_b, &a);
        let vo = build(&store_a, &a, &7u32);
        assert!(!verify(&root_b, &vo, &a));
    }
}
