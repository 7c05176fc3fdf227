//! # Error Types for the Ordered Map and Collections
//!
//! Every failure in this crate is local and non-fatal. A failed lookup or
//! delete leaves the tree unchanged and fully usable, and no operation can
//! leave a tree half-modified: a mutation either completes (possibly
//! cascading a split all the way to the root) or has no visible effect.
//!
//! ## Not Found vs. Deleted
//!
//! The tree itself never hides tombstoned entries. A lookup of a deleted key
//! succeeds and reports the tombstone flag:
//!
//! ```text
//! OrderedMap::at(key)
//!      │
//!      ├── no entry ─────────────► Err(KeyNotFound)
//!      │
//!      └── entry ────────────────► Ok(Found { value, tombstone })
//!                                              │
//! Collection::get(key)                         │
//!      │                                       │
//!      ├── tombstone == true ◄─────────────────┤
//!      │        └──────────────► Err(KeyDeleted)
//!      └── tombstone == false ◄────────────────┘
//!               └──────────────► Ok(value)
//! ```

use thiserror::Error;

/// Errors returned by the ordered map, the collection layer and their
/// configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// No entry, live or tombstoned, exists for the requested key.
	///
	/// Returned by [`OrderedMap::at`](crate::OrderedMap::at) for keys that
	/// were never inserted and for every lookup on an empty tree.
	#[error("key not found")]
	KeyNotFound,

	/// The entry exists but has been marked deleted.
	///
	/// Only the collection layer produces this. At the tree level a deleted
	/// entry is a successful lookup carrying a set tombstone flag.
	#[error("key has been deleted")]
	KeyDeleted,

	/// A branching factor too small for the split arithmetic.
	///
	/// A leaf holds at most `factor - 1` entries, so a factor below 2 would
	/// produce nodes that split on every insert into empty halves. Rejected
	/// when the tree is built, never discovered mid-split.
	#[error("invalid branching factor {factor}: must be at least 2")]
	InvalidBranchingFactor {
		/// The rejected factor.
		factor: usize,
	},

	/// The database holds no collection with this name.
	#[error("collection not found: {name}")]
	CollectionNotFound {
		/// The requested collection name.
		name: String,
	},
}

/// A Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;
