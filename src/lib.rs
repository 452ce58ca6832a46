#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod error;

/// Hash mixing used to derive slot indices, and a small deterministic
/// fallback hasher.
pub mod hash;

/// A HashMap implementation using Robin Hood hashing.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

pub mod hash_table;

/// A hash set implementation using Robin Hood hashing.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

#[cfg(feature = "serde")]
mod serde_impls;

pub use error::Error;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`HashMap::new`] and [`HashSet::new`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`HashMap::new`] and [`HashSet::new`].
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// The hasher builder used by [`HashMap::new`] and [`HashSet::new`].
        pub type DefaultHashBuilder = hash::MixState;
    }
}
