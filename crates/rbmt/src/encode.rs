//! Canonical byte encodings.
//!
//! The Merkle augmentation never interprets key or value contents; it only
//! ever hashes a fixed, deterministic byte encoding. [`KeyEncode`] supplies
//! that encoding for keys; [`CanonicalEncode`] supplies it for values via a
//! blanket `serde_json` implementation (sorted object keys, no
//! insignificant whitespace — `serde_json`'s default map representation is
//! a `BTreeMap`, which serializes keys in sorted order without the
//! `preserve_order` feature).

use serde::Serialize;

/// A totally ordered key with a fixed byte encoding used as hash input.
///
/// The tree's own ordering comes from `K: Ord`; this trait only determines
/// what bytes get hashed, so two keys that are `Ord`-equal should encode
/// identically and two `Ord`-unequal keys should encode differently.
pub trait KeyEncode {
    fn encode_key(&self) -> Vec<u8>;
}

macro_rules! impl_key_encode_int {
    ($($t:ty),*) => {
        $(
            impl KeyEncode for $t {
                fn encode_key(&self) -> Vec<u8> {
                    self.to_be_bytes().to_vec()
                }
            }
        )*
    };
}

impl_key_encode_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

impl KeyEncode for String {
    fn encode_key(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl KeyEncode for Vec<u8> {
    fn encode_key(&self) -> Vec<u8> {
        self.clone()
    }
}

/// A value with a canonical byte encoding used as hash input.
///
/// This is the "JSON encoding of values" collaborator the core data
/// structure treats as an opaque, external concern (anything that
/// implements `serde::Serialize` gets canonical JSON for free); swap in a
/// different encoding by implementing this trait directly for a type that
/// does not go through `serde_json`.
pub trait CanonicalEncode {
    fn encode_value(&self) -> Vec<u8>;
}

impl<T: Serialize> CanonicalEncode for T {
    fn encode_value(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("value must serialize to canonical JSON")
    }
}
