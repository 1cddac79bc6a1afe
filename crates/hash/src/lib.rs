//! Hash adapter
//!
//! Resolves a named algorithm (or a user-supplied combiner) to a
//! dual-argument hasher `H(a, b) -> digest`. Every node in an [`rbmt`
//! tree](https://docs.rs/rbmt) shares one [`HashAdapter`] by value; two
//! trees are only meaningfully comparable when their adapters produce
//! identical digests on identical inputs.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use digest::Digest as _;
use thiserror::Error;

/// One of the named hash algorithms the adapter can resolve by string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum HashAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Blake2b,
    Blake2s,
    Blake3,
}

impl HashAlgorithm {
    /// The output length in bytes of this algorithm's digest.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
            HashAlgorithm::Blake2b => 64,
            HashAlgorithm::Blake2s => 32,
            HashAlgorithm::Blake3 => 32,
        }
    }

    fn combine(&self, a: &[u8], b: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => {
                let mut d = sha1::Sha1::new();
                d.update(a);
                d.update(b);
                d.finalize().to_vec()
            }
            HashAlgorithm::Sha224 => {
                let mut d = sha2::Sha224::new();
                d.update(a);
                d.update(b);
                d.finalize().to_vec()
            }
            HashAlgorithm::Sha256 => {
                let mut d = sha2::Sha256::new();
                d.update(a);
                d.update(b);
                d.finalize().to_vec()
            }
            HashAlgorithm::Sha384 => {
                let mut d = sha2::Sha384::new();
                d.update(a);
                d.update(b);
                d.finalize().to_vec()
            }
            HashAlgorithm::Sha512 => {
                let mut d = sha2::Sha512::new();
                d.update(a);
                d.update(b);
                d.finalize().to_vec()
            }
            HashAlgorithm::Blake2b => {
                let mut d = blake2::Blake2b512::new();
                d.update(a);
                d.update(b);
                d.finalize().to_vec()
            }
            HashAlgorithm::Blake2s => {
                let mut d = blake2::Blake2s256::new();
                d.update(a);
                d.update(b);
                d.finalize().to_vec()
            }
            HashAlgorithm::Blake3 => {
                let mut d = blake3::Hasher::new();
                d.update(a);
                d.update(b);
                d.finalize().as_bytes().to_vec()
            }
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake2b => "blake2b",
            HashAlgorithm::Blake2s => "blake2s",
            HashAlgorithm::Blake3 => "blake3",
        };
        f.write_str(s)
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "blake2b" => Ok(HashAlgorithm::Blake2b),
            "blake2s" => Ok(HashAlgorithm::Blake2s),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(HashError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Errors surfaced by the hash adapter.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HashError {
    #[error("unknown hash algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("digest length mismatch: expected {expected} bytes, got {actual}")]
    IncorrectLength { expected: usize, actual: usize },
}

/// A digest produced by a [`HashAdapter`].
///
/// Digests are opaque byte strings; their length is determined by the
/// adapter that produced them. Two digests only compare equal if their
/// bytes match exactly.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(Vec<u8>);

impl Digest {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Domain-separation tag mixed into the first argument of a leaf digest.
pub const LEAF_TAG: u8 = 0x00;
/// Domain-separation tag used for both arguments of the sentinel digest.
pub const SENTINEL_TAG: u8 = 0x01;

/// Resolves a name or custom callable to a dual-argument hasher
/// `H(a, b) -> digest`.
///
/// The adapter is pure and stateless; cloning is cheap (named algorithms are
/// `Copy`, custom combiners are reference-counted).
#[derive(Clone)]
pub enum HashAdapter {
    Named(HashAlgorithm),
    Custom(Arc<dyn Fn(&[u8], &[u8]) -> Vec<u8> + Send + Sync>),
}

impl fmt::Debug for HashAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAdapter::Named(algo) => write!(f, "HashAdapter::Named({algo})"),
            HashAdapter::Custom(_) => write!(f, "HashAdapter::Custom(..)"),
        }
    }
}

impl HashAdapter {
    /// Construct an adapter from a named algorithm.
    pub fn named(algo: HashAlgorithm) -> Self {
        HashAdapter::Named(algo)
    }

    /// Construct an adapter by parsing an algorithm name (`"sha256"`, ...).
    pub fn by_name(name: &str) -> Result<Self, HashError> {
        Ok(HashAdapter::Named(name.parse()?))
    }

    /// Construct an adapter from a custom two-argument combiner.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[u8], &[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        HashAdapter::Custom(Arc::new(f))
    }

    /// `H(a, b)`, the adapter's sole primitive operation.
    pub fn combine(&self, a: &[u8], b: &[u8]) -> Digest {
        let bytes = match self {
            HashAdapter::Named(algo) => algo.combine(a, b),
            HashAdapter::Custom(f) => f(a, b),
        };
        Digest(bytes)
    }

    /// `D(leaf) = H(tag_leaf ‖ enc(key), enc(value))`.
    pub fn leaf_digest(&self, key_bytes: &[u8], value_bytes: &[u8]) -> Digest {
        let mut left = Vec::with_capacity(1 + key_bytes.len());
        left.push(LEAF_TAG);
        left.extend_from_slice(key_bytes);
        self.combine(&left, value_bytes)
    }

    /// `D(+∞) = H(tag_sentinel, tag_sentinel)`, a fixed constant.
    pub fn sentinel_digest(&self) -> Digest {
        self.combine(&[SENTINEL_TAG], &[SENTINEL_TAG])
    }

    /// `D(internal) = H(digest_left, digest_right)`.
    pub fn internal_digest(&self, left: &Digest, right: &Digest) -> Digest {
        self.combine(left.as_bytes(), right.as_bytes())
    }

    /// Checks that `digest`'s length matches the output length this
    /// adapter produces. Always succeeds for a `Custom` adapter, whose
    /// output length is not fixed ahead of time.
    pub fn validate_digest(&self, digest: &Digest) -> Result<(), HashError> {
        if let HashAdapter::Named(algo) = self {
            let expected = algo.output_len();
            let actual = digest.as_bytes().len();
            if actual != expected {
                return Err(HashError::IncorrectLength { expected, actual });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_round_trips_through_display_and_parse() {
        for algo in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha224,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
            HashAlgorithm::Blake2b,
            HashAlgorithm::Blake2s,
            HashAlgorithm::Blake3,
        ] {
            let parsed: HashAlgorithm = algo.to_string().parse().unwrap();
            assert_eq!(parsed, algo);
        }
    }

    #[test]
    fn unknown_algorithm_name_is_rejected() {
        assert!(matches!(
            "sha42".parse::<HashAlgorithm>(),
            Err(HashError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn sha256_is_deterministic_and_sensitive_to_argument_order() {
        let adapter = HashAdapter::named(HashAlgorithm::Sha256);
        let ab = adapter.combine(b"a", b"b");
        let ab2 = adapter.combine(b"a", b"b");
        let ba = adapter.combine(b"b", b"a");
        assert_eq!(ab, ab2);
        assert_ne!(ab, ba);
        assert_eq!(ab.as_bytes().len(), HashAlgorithm::Sha256.output_len());
    }

    #[test]
    fn custom_adapter_passes_arguments_through() {
        let adapter = HashAdapter::custom(|a, b| {
            let mut out = a.to_vec();
            out.extend_from_slice(b);
            out
        });
        let digest = adapter.combine(b"foo", b"bar");
        assert_eq!(digest.as_bytes(), b"foobar");
    }

    #[test]
    fn sentinel_digest_is_constant_regardless_of_tree_state() {
        let adapter = HashAdapter::named(HashAlgorithm::Sha256);
        assert_eq!(adapter.sentinel_digest(), adapter.sentinel_digest());
    }

    #[test]
    fn validate_digest_rejects_wrong_length_for_named_algorithms() {
        let adapter = HashAdapter::named(HashAlgorithm::Sha256);
        let digest = adapter.combine(b"x", b"y");
        assert!(adapter.validate_digest(&digest).is_ok());

        let short = Digest::from_bytes(vec![0u8; 3]);
        assert_eq!(
            adapter.validate_digest(&short),
            Err(HashError::IncorrectLength { expected: 32, actual: 3 })
        );
    }

    #[test]
    fn validate_digest_accepts_any_length_for_custom_adapters() {
        let adapter = HashAdapter::custom(|a, b| {
            let mut out = a.to_vec();
            out.extend_from_slice(b);
            out
        });
        let digest = Digest::from_bytes(vec![0u8; 3]);
        assert!(adapter.validate_digest(&digest).is_ok());
    }

    #[test]
    fn every_named_algorithm_produces_its_declared_output_length() {
        for algo in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha224,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
            HashAlgorithm::Blake2b,
            HashAlgorithm::Blake2s,
            HashAlgorithm::Blake3,
        ] {
            let adapter = HashAdapter::named(algo);
            let digest = adapter.combine(b"x", b"y");
            assert_eq!(digest.as_bytes().len(), algo.output_len());
        }
    }
}
