//! An authenticated ordered key-value map: a red-black tree fused with a
//! Merkle digest augmentation.
//!
//! ```
//! use rbmt::Tree;
//! use rbmt_hash::HashAlgorithm;
//!
//! let mut tree: Tree<u32, String> = Tree::new(HashAlgorithm::Sha256);
//! tree.insert(7, "seven".to_string());
//! let (value, vo) = tree.get_verified(&7);
//! assert_eq!(value, Some(&"seven".to_string()));
//! assert!(tree.verify(&vo));
//! ```

mod balance;
mod digest;
mod diff;
mod encode;
mod error;
mod list;
mod proof;
mod query;
mod store;
mod tree;

pub use diff::{ChangeEntry, Origin};
pub use encode::{CanonicalEncode, KeyEncode};
pub use error::{InvariantError, ProofError};
pub use proof::{wire, Neighbor, RootDigest, Status, Step, Vo};
pub use tree::{Builder, Tree};

pub use rbmt_hash::{Digest, HashAdapter, HashAlgorithm, HashError};
