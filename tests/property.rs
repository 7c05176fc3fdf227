//! # Property-Based Tests for the SimpleKVS Ordered Map
//!
//! Randomized tests using proptest. Every property also runs the structural
//! invariant checker.
//!
//! ## Test Properties
//!
//! - Ordering: traversal yields the sorted set of inserted keys
//! - Round-trip: every inserted key is found, live, with its latest value
//! - Tombstones: deleted keys are found flagged; missing keys stay missing
//! - Oracle comparison: behavior matches a `BTreeMap` of `(value, tombstone)`

use proptest::prelude::*;
use simplekvs::{Error, OrderedMap};
use std::collections::BTreeMap;

// ===========================================================================
// Strategy Helpers
// ===========================================================================

/// Generate a vector of unique keys for testing
fn unique_keys(max_len: usize) -> impl Strategy<Value = Vec<i32>> {
	prop::collection::hash_set(any::<i32>(), 0..max_len).prop_map(|s| s.into_iter().collect())
}

/// Generate a vector of key-value pairs
fn key_value_pairs(max_len: usize) -> impl Strategy<Value = Vec<(i32, i32)>> {
	prop::collection::vec((any::<i32>(), any::<i32>()), 0..max_len)
}

/// Branching factors from the smallest legal one to a wide node
fn branching_factor() -> impl Strategy<Value = usize> {
	prop_oneof![2usize..6, 6usize..130]
}

/// Operations that can be performed on the tree
#[derive(Debug, Clone)]
enum Op {
	Set(i32, i32),
	SetDeleted(i32, i32),
	Del(i32),
	At(i32),
}

/// Generate a sequence of random operations over a small key space so that
/// overwrites and deletes hit existing keys often.
fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
	prop::collection::vec(
		prop_oneof![
			4 => (0..200i32, any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
			1 => (0..200i32, any::<i32>()).prop_map(|(k, v)| Op::SetDeleted(k, v)),
			2 => (0..200i32).prop_map(Op::Del),
			2 => (0..200i32).prop_map(Op::At),
		],
		0..max_ops,
	)
}

fn build(factor: usize) -> OrderedMap<i32, i32> {
	OrderedMap::with_branching_factor(factor).unwrap()
}

// ===========================================================================
// Ordering and Round-Trip Properties
// ===========================================================================

proptest! {
	/// Property: Traversal yields exactly the sorted distinct keys
	#[test]
	fn iteration_is_sorted(factor in branching_factor(), keys in unique_keys(500)) {
		let mut map = build(factor);
		for k in &keys {
			map.set(*k, *k);
		}

		map.assert_invariants();

		let mut sorted = keys.clone();
		sorted.sort();
		let traversed: Vec<i32> = map.iter().map(|e| *e.key).collect();
		prop_assert_eq!(traversed, sorted);
	}

	/// Property: Every inserted key is found, live, with its latest value
	#[test]
	fn set_then_at(factor in branching_factor(), entries in key_value_pairs(500)) {
		let mut map = build(factor);
		let mut expected: BTreeMap<i32, i32> = BTreeMap::new();

		// Last value wins for duplicates
		for (k, v) in &entries {
			map.set(*k, *v);
			expected.insert(*k, *v);
		}

		map.assert_invariants();

		for (k, v) in &expected {
			let found = map.at(k).unwrap();
			prop_assert_eq!(found.value, v, "Key {} should have value {}", k, v);
			prop_assert!(!found.tombstone);
		}
		prop_assert_eq!(map.len(), expected.len());
	}
}

// ===========================================================================
// Tombstone Properties
// ===========================================================================

proptest! {
	/// Property: Deleting reports presence and keeps the old value findable
	#[test]
	fn del_then_at(
		factor in branching_factor(),
		existing in unique_keys(200),
		probes in unique_keys(100)
	) {
		let mut map = build(factor);
		for k in &existing {
			map.set(*k, k.wrapping_mul(3));
		}

		for k in &probes {
			let present = existing.contains(k);
			prop_assert_eq!(map.del(k), present, "del({}) should report {}", k, present);
			match map.at(k) {
				Ok(found) => {
					prop_assert!(present);
					prop_assert!(found.tombstone);
					prop_assert_eq!(*found.value, k.wrapping_mul(3));
				}
				Err(err) => {
					prop_assert!(!present);
					prop_assert_eq!(err, Error::KeyNotFound);
				}
			}
		}

		map.assert_invariants();
		prop_assert_eq!(map.len(), existing.len());
	}

	/// Property: Setting a deleted key revives it
	#[test]
	fn set_revives_deleted(factor in branching_factor(), keys in unique_keys(200)) {
		let mut map = build(factor);
		for k in &keys {
			map.set(*k, 0);
		}
		for k in &keys {
			prop_assert!(map.del(k));
		}
		for k in &keys {
			map.set(*k, 1);
		}

		map.assert_invariants();
		for entry in &map {
			prop_assert!(!entry.tombstone);
			prop_assert_eq!(*entry.value, 1);
		}
	}
}

// ===========================================================================
// Oracle Comparison
// ===========================================================================

proptest! {
	/// Property: Arbitrary operation sequences match a BTreeMap model
	#[test]
	fn matches_btreemap_oracle(factor in branching_factor(), ops in operations(400)) {
		let mut map = build(factor);
		let mut oracle: BTreeMap<i32, (i32, bool)> = BTreeMap::new();

		for op in &ops {
			match *op {
				Op::Set(k, v) => {
					map.set(k, v);
					oracle.insert(k, (v, false));
				}
				Op::SetDeleted(k, v) => {
					map.set_deleted(k, v);
					oracle.insert(k, (v, true));
				}
				Op::Del(k) => {
					let expected = match oracle.get_mut(&k) {
						Some(entry) => {
							entry.1 = true;
							true
						}
						None => false,
					};
					prop_assert_eq!(map.del(&k), expected);
				}
				Op::At(k) => {
					let actual = map.at(&k).map(|f| (*f.value, f.tombstone));
					let expected = oracle.get(&k).copied().ok_or(Error::KeyNotFound);
					prop_assert_eq!(actual, expected);
				}
			}
		}

		map.assert_invariants();
		prop_assert_eq!(map.len(), oracle.len());

		let traversed: Vec<(i32, i32, bool)> =
			map.iter().map(|e| (*e.key, *e.value, e.tombstone)).collect();
		let modelled: Vec<(i32, i32, bool)> =
			oracle.iter().map(|(k, (v, t))| (*k, *v, *t)).collect();
		prop_assert_eq!(traversed, modelled);
	}
}
