//! Standard collection type aliases for Meridian.
//!
//! Use these instead of direct HashMap so hashing stays consistent
//! across the codebase.
//!
//! | Type | Use Case |
//! |------|----------|
//! | [`FxMap`] | Single-threaded hash map |
//! | [`FxIndexMap`] | Insertion-order preserving map |
//!
//! # Example
//!
//! ```rust
//! use meridian_common::collections::{fx_map, FxMap};
//!
//! let mut map: FxMap<String, i32> = fx_map();
//! map.insert("key".to_string(), 42);
//! ```

use rustc_hash::FxBuildHasher;

/// Standard HashMap with FxHash (fast, non-cryptographic).
///
/// FxHash works well for the small integer and string keys used for type
/// names and descriptors.
pub type FxMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// Ordered map preserving insertion order.
///
/// Used where lookups must scan candidates in a deterministic order, such as
/// wildcard matching over cached topology descriptors.
pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;

/// Create a new empty [`FxMap`].
#[inline]
#[must_use]
pub fn fx_map<K, V>() -> FxMap<K, V> {
    FxMap::with_hasher(FxBuildHasher)
}

/// Create a new empty [`FxIndexMap`].
#[inline]
#[must_use]
pub fn fx_index_map<K, V>() -> FxIndexMap<K, V> {
    FxIndexMap::with_hasher(FxBuildHasher)
}
