//! Error kinds surfaced by `rbmt`.
//!
//! Ordinary map operations are total: a missing key, an out-of-range rank
//! index, or a duplicate insert is reported as a benign "absent" value,
//! never an error (see the crate-level docs). The two error enums here
//! cover the narrower cases the spec calls out explicitly: malformed
//! verification-object bytes, and a self-test diagnostic.

use thiserror::Error;

/// Returned by [`crate::wire::decode`] when the wire bytes are not even
/// well-formed. A verification that runs to completion but fails returns
/// `false`, not this error (see [`crate::Tree::verify`]).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProofError {
    #[error("unsupported verification object version {0}")]
    UnsupportedVersion(u8),

    #[error("unrecognized verification object status byte {0}")]
    UnrecognizedStatus(u8),

    #[error("verification object bytes truncated while reading {0}")]
    Truncated(&'static str),

    #[error("digest length {actual} does not match adapter's expected length {expected}")]
    DigestLength { expected: usize, actual: usize },
}

/// Returned by [`crate::Tree::self_check`] describing which structural
/// invariant was found violated. Ordinary operations never construct this;
/// it exists purely as a fuzzing/testing diagnostic (spec.md §9).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvariantError {
    #[error("bst order violated at an internal node with key {at:?}")]
    BstOrder { at: String },

    #[error("internal-key rule violated at node with key {at:?}: expected max-left-key {expected:?}")]
    InternalKeyRule { at: String, expected: String },

    #[error("red node has a red child at node with key {at:?}")]
    RedRedViolation { at: String },

    #[error("black-height mismatch: {left} on one path, {right} on another")]
    BlackHeightMismatch { left: usize, right: usize },

    #[error("root is not black")]
    RootNotBlack,

    #[error("digest consistency violated at node with key {at:?}")]
    DigestMismatch { at: String },

    #[error("leaf list is not in ascending key order or its length ({actual}) does not match size ({expected})")]
    LeafListCorrupt { expected: usize, actual: usize },

    #[error("sentinel leaf is not the tail of the leaf list")]
    SentinelMisplaced,
}
