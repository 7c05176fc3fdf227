//! Iterators for the `OrderedMap` data structure
//!
//! Traversal never goes back to the root: a cursor walks one leaf's slots,
//! then follows the leaf chain to the next leaf.
//!
//! ```text
//! begin()                                            end()
//!    │                                                 │
//!    ▼                                                 ▼
//! ┌─────────────┐  next  ┌─────────────┐  next  ┌──────────┐
//! │ [7 | 8]     │ ─────► │ [9 | 10]    │ ─────► │ sentinel │
//! └─────────────┘        └─────────────┘        └──────────┘
//! ```
use crate::{NodeId, OrderedMap};
use std::fmt;
use std::iter::FusedIterator;

/// An entry produced by traversal.
#[derive(Debug, PartialEq, Eq)]
pub struct Entry<'a, K, V> {
	/// The entry's key.
	pub key: &'a K,
	/// The stored value. Still present for tombstoned entries.
	pub value: &'a V,
	/// Whether the entry has been deleted.
	pub tombstone: bool,
}

impl<K, V> Clone for Entry<'_, K, V> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<K, V> Copy for Entry<'_, K, V> {}

/// A position in the tree's in-order sequence.
///
/// Either a slot in a leaf or the end sentinel. Two cursors are equal when
/// they point at the same slot of the same leaf of the same map, or when both
/// are at the end.
pub struct Cursor<'a, K, V> {
	map: &'a OrderedMap<K, V>,
	/// `None` is the end sentinel.
	position: Option<(NodeId, usize)>,
}

impl<'a, K, V> Cursor<'a, K, V> {
	pub(crate) fn new(map: &'a OrderedMap<K, V>, position: Option<(NodeId, usize)>) -> Self {
		Cursor {
			map,
			position,
		}
	}

	/// Returns `true` if the cursor is past the last entry.
	pub fn is_end(&self) -> bool {
		self.position.is_none()
	}

	/// Materializes the entry under the cursor, or `None` at the end.
	pub fn entry(&self) -> Option<Entry<'a, K, V>> {
		let (leaf, index) = self.position?;
		let leaf = self.map.node(leaf).as_leaf();
		let slot = &leaf.slots[index];
		Some(Entry {
			key: &leaf.keys[index],
			value: &slot.value,
			tombstone: slot.tombstone,
		})
	}

	/// Moves to the next entry in key order.
	///
	/// Advances within the leaf, then to the first slot of the next leaf,
	/// then to the end sentinel. Advancing the end sentinel is a no-op.
	pub fn advance(&mut self) {
		let Some((id, index)) = self.position else {
			return;
		};

		let leaf = self.map.node(id).as_leaf();
		self.position = if index + 1 < leaf.keys.len() {
			Some((id, index + 1))
		} else {
			// Leaves other than an empty root are never empty
			leaf.next.map(|next| (next, 0))
		};
	}
}

impl<K, V> Clone for Cursor<'_, K, V> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<K, V> Copy for Cursor<'_, K, V> {}

impl<K, V> PartialEq for Cursor<'_, K, V> {
	fn eq(&self, other: &Self) -> bool {
		match (self.position, other.position) {
			(None, None) => true,
			(Some(a), Some(b)) => a == b && std::ptr::eq(self.map, other.map),
			_ => false,
		}
	}
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K, V> fmt::Debug for Cursor<'_, K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.position {
			Some((leaf, index)) => {
				f.debug_struct("Cursor").field("leaf", &leaf).field("index", &index).finish()
			}
			None => f.write_str("Cursor(End)"),
		}
	}
}

/// Iterator over every entry of an [`OrderedMap`] in ascending key order,
/// tombstoned entries included.
///
/// Created by [`OrderedMap::iter`]. Lazy and forward-only; to start over,
/// ask the map for a new iterator.
pub struct Iter<'a, K, V> {
	cursor: Cursor<'a, K, V>,
	remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
	pub(crate) fn new(cursor: Cursor<'a, K, V>, remaining: usize) -> Self {
		Iter {
			cursor,
			remaining,
		}
	}
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
	type Item = Entry<'a, K, V>;

	fn next(&mut self) -> Option<Self::Item> {
		let entry = self.cursor.entry()?;
		self.cursor.advance();
		self.remaining -= 1;
		Some(entry)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

#[cfg(test)]
mod tests {
	use crate::OrderedMap;

	fn sample(n: i32, branching_factor: usize) -> OrderedMap<i32, i32> {
		let mut map = OrderedMap::with_branching_factor(branching_factor).unwrap();
		for k in 0..n {
			map.set(k, k * 10);
		}
		map
	}

	#[test]
	fn empty_map_begins_at_end() {
		let map: OrderedMap<i32, i32> = OrderedMap::new();
		assert!(map.begin().is_end());
		assert_eq!(map.begin(), map.end());
		assert_eq!(map.iter().next(), None);
	}

	#[test]
	fn cursor_walks_leaf_chain() {
		let map = sample(10, 3);
		let mut cursor = map.begin();
		let mut keys = Vec::new();
		while cursor != map.end() {
			let entry = cursor.entry().unwrap();
			assert_eq!(*entry.value, *entry.key * 10);
			keys.push(*entry.key);
			cursor.advance();
		}
		assert_eq!(keys, (0..10).collect::<Vec<_>>());
		assert_eq!(cursor.entry(), None);
	}

	#[test]
	fn end_sentinels_compare_equal() {
		let map = sample(5, 3);
		let mut a = map.begin();
		for _ in 0..5 {
			a.advance();
		}
		assert!(a.is_end());
		assert_eq!(a, map.end());

		// Advancing past the end stays at the end
		a.advance();
		assert_eq!(a, map.end());
	}

	#[test]
	fn cursors_compare_by_position() {
		let map = sample(5, 3);
		let mut a = map.begin();
		let b = map.begin();
		assert_eq!(a, b);
		a.advance();
		assert_ne!(a, b);

		let other = sample(5, 3);
		assert_ne!(map.begin(), other.begin());
		assert_eq!(map.end(), other.end());
	}

	#[test]
	fn iter_reports_exact_len() {
		let map = sample(100, 4);
		let mut iter = map.iter();
		assert_eq!(iter.len(), 100);
		iter.next();
		assert_eq!(iter.len(), 99);
		assert_eq!(iter.count(), 99);
	}

	#[test]
	fn iter_includes_tombstones() {
		let mut map = sample(20, 3);
		for k in (0..20).step_by(2) {
			assert!(map.del(&k));
		}
		for entry in &map {
			assert_eq!(entry.tombstone, *entry.key % 2 == 0);
		}
		assert_eq!(map.iter().count(), 20);
	}

	#[test]
	fn iteration_restarts_from_leftmost_leaf() {
		let map = sample(30, 5);
		let first: Vec<_> = map.iter().take(10).map(|e| *e.key).collect();
		let again: Vec<_> = map.iter().take(10).map(|e| *e.key).collect();
		assert_eq!(first, again);
		assert_eq!(first[0], 0);
	}
}
