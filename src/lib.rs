//! # SimpleKVS: An Embedded Ordered Key-Value Index
//!
//! This crate provides [`OrderedMap`], a single-threaded in-memory B+ tree with
//! sorted-key storage and linear-time in-order traversal, and a minimal
//! key-value store ([`Collection`], [`Database`]) built on top of it.
//!
//! ## Design Overview
//!
//! **Branch summaries**: Every branch node stores, at position `i`, the
//! minimum key reachable in child `i`. Lookups route with
//! [`child_position`], which treats slot 0 as a catch-all for everything
//! below `keys[1]`. Inserting a new minimum lowers the summaries on the way
//! down so they stay exact.
//!
//! **Tombstones**: Deleting never removes an entry. It flips the entry's
//! tombstone flag, and the slot stays where it is. Nodes are never merged or
//! rebalanced, so a node, once created, lives as long as the tree.
//!
//! **Leaf chain**: Leaves are linked in key order. Iteration walks the chain
//! without going back to the root.
//!
//! ### Tree Structure
//!
//! ```text
//!                  ┌──────────────────────┐
//!                  │ Branch  [10 | 40]    │  <- keys[i] = min key of child i
//!                  └──────┬────────┬──────┘
//!                         │        │
//!              ┌──────────┘        └──────────┐
//!              ▼                              ▼
//!        ┌───────────┐   next          ┌───────────┐   next
//!        │ Leaf      │ ──────────────► │ Leaf      │ ──────► None
//!        │ [10 | 20] │                 │ [40 | 50] │
//!        └───────────┘                 └───────────┘
//! ```
//!
//! ### Ownership
//!
//! All nodes live in an arena owned by the tree and are addressed by
//! handles. A branch's child handles are the only structural references.
//! The leaf `next` link is a non-owning handle used purely for traversal, so
//! dropping the tree drops the arena and nothing else.
//!
//! ## Basic Usage
//!
//! ```
//! use simplekvs::{Error, Found, OrderedMap};
//!
//! let mut map = OrderedMap::new();
//!
//! map.set(2, "two");
//! map.set(1, "one");
//! assert_eq!(map.at(&1), Ok(Found { value: &"one", tombstone: false }));
//!
//! // Deleted entries are still found, flagged as tombstoned
//! assert!(map.del(&1));
//! assert_eq!(map.at(&1), Ok(Found { value: &"one", tombstone: true }));
//! assert_eq!(map.at(&3), Err(Error::KeyNotFound));
//!
//! // In-order traversal includes tombstoned entries
//! let keys: Vec<_> = map.iter().map(|entry| *entry.key).collect();
//! assert_eq!(keys, vec![1, 2]);
//! ```
//!
//! ## Thread Safety
//!
//! Nothing here synchronizes. Mutation takes `&mut self`, so concurrent use
//! requires external serialization (one tree per shard, or a caller-held
//! lock). The map is `Send` and `Sync` whenever its keys and values are.

use smallvec::SmallVec;
use tracing::{debug, trace, Span};

use std::borrow::Borrow;
use std::fmt;

#[cfg(any(test, feature = "test-utils"))]
pub mod alloc;
pub mod config;
pub mod db;
pub mod error;
pub mod iter;

pub use config::{CollectionConfig, Config, DEFAULT_BRANCHING_FACTOR};
pub use db::{Collection, Database};
pub use error::{Error, Result};
pub use iter::{Cursor, Entry, Iter};

// ---------------------------------------------------------------------------
// Public Types
// ---------------------------------------------------------------------------

/// A successful lookup.
///
/// A tombstoned entry is still found. It is up to the caller whether a
/// deleted entry counts as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found<'a, V> {
	/// The stored value.
	pub value: &'a V,
	/// Whether the entry has been deleted.
	pub tombstone: bool,
}

/// Handle of a node inside the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

/// Root-to-leaf path recorded during insertion. Inline for trees up to 16
/// levels, which covers any realistic branching factor.
type Path = SmallVec<[NodeId; 16]>;

// ---------------------------------------------------------------------------
// Core Tree Structure
// ---------------------------------------------------------------------------

/// A map with linear-time key-order traversal, implemented as a B+ tree.
///
/// # Type Parameters
///
/// - `K`: The key type. Must implement `Clone + Ord`.
/// - `V`: The value type.
///
/// # Internal Structure
///
/// - `nodes`: the arena. Nodes are only ever appended; the tree never
///   shrinks because deletion is tombstone-only.
/// - `root`: handle of the root node. Starts as an empty leaf.
/// - `height`: number of levels. Height 1 means the root is a leaf.
/// - `len`: number of entries, tombstoned ones included.
pub struct OrderedMap<K, V> {
	nodes: Vec<Node<K, V>>,
	root: NodeId,
	height: usize,
	len: usize,
	branching_factor: usize,
	/// Caller-supplied tracing context, entered by every mutation.
	span: Span,
}

impl<K: Clone + Ord, V> Default for OrderedMap<K, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K: fmt::Debug, V> fmt::Debug for OrderedMap<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OrderedMap")
			.field("len", &self.len)
			.field("height", &self.height)
			.field("branching_factor", &self.branching_factor)
			.field("nodes", &self.nodes.len())
			.finish()
	}
}

impl<K: Clone + Ord, V> OrderedMap<K, V> {
	// -----------------------------------------------------------------------
	// Construction
	// -----------------------------------------------------------------------

	/// Creates an empty map with [`DEFAULT_BRANCHING_FACTOR`].
	///
	/// # Example
	///
	/// ```
	/// use simplekvs::OrderedMap;
	///
	/// let map: OrderedMap<String, i32> = OrderedMap::new();
	/// assert!(map.is_empty());
	/// assert_eq!(map.height(), 1); // Single leaf node
	/// ```
	pub fn new() -> Self {
		Self::build(DEFAULT_BRANCHING_FACTOR, Span::none())
	}

	/// Creates an empty map from a configuration.
	///
	/// Fails with [`Error::InvalidBranchingFactor`] if the configuration
	/// cannot produce a valid tree.
	pub fn with_config(config: Config) -> Result<Self> {
		Self::with_span(config, Span::none())
	}

	/// Creates an empty map with the given branching factor.
	pub fn with_branching_factor(branching_factor: usize) -> Result<Self> {
		Self::with_config(Config::with_branching_factor(branching_factor))
	}

	/// Creates an empty map whose operations are recorded inside `span`.
	///
	/// ```
	/// use simplekvs::{Config, OrderedMap};
	///
	/// let span = tracing::debug_span!("index", name = "users");
	/// let mut map = OrderedMap::with_span(Config::default(), span).unwrap();
	/// map.set("alice", 1);
	/// ```
	pub fn with_span(config: Config, span: Span) -> Result<Self> {
		config.validate()?;
		Ok(Self::build(config.branching_factor, span))
	}

	fn build(branching_factor: usize, span: Span) -> Self {
		OrderedMap {
			nodes: vec![Node::Leaf(LeafNode::new(branching_factor))],
			root: NodeId(0),
			height: 1,
			len: 0,
			branching_factor,
			span,
		}
	}

	// -----------------------------------------------------------------------
	// Tree Metadata
	// -----------------------------------------------------------------------

	/// Returns the number of levels in the tree.
	///
	/// - Height 1: the root is a leaf
	/// - Height N: N-1 levels of branch nodes plus one level of leaves
	pub fn height(&self) -> usize {
		self.height
	}

	/// Returns the number of entries, tombstoned entries included.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Returns `true` if no entry was ever inserted (or since [`clear`]).
	///
	/// [`clear`]: OrderedMap::clear
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Returns the configured branching factor.
	pub fn branching_factor(&self) -> usize {
		self.branching_factor
	}

	// -----------------------------------------------------------------------
	// Lookup
	// -----------------------------------------------------------------------

	/// Looks up the entry for `key`.
	///
	/// Tombstoned entries are found, with [`Found::tombstone`] set.
	///
	/// # Errors
	///
	/// [`Error::KeyNotFound`] if no entry exists for `key`, including every
	/// lookup on an empty tree. Never falls back to a default value.
	pub fn at<Q>(&self, key: &Q) -> Result<Found<'_, V>>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		let leaf = self.node(self.leaf_for(key)).as_leaf();
		let pos = leaf.search(key).ok_or(Error::KeyNotFound)?;
		let slot = &leaf.slots[pos];
		Ok(Found {
			value: &slot.value,
			tombstone: slot.tombstone,
		})
	}

	/// Returns the value for `key` if a live (not deleted) entry exists.
	pub fn get<Q>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		match self.at(key) {
			Ok(Found {
				value,
				tombstone: false,
			}) => Some(value),
			_ => None,
		}
	}

	/// Returns `true` if a live (not deleted) entry exists for `key`.
	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		self.get(key).is_some()
	}

	// -----------------------------------------------------------------------
	// Mutation
	// -----------------------------------------------------------------------

	/// Inserts `value` under `key`, or overwrites the existing entry.
	///
	/// Overwriting a tombstoned entry revives it. Never fails.
	///
	/// # Example
	///
	/// ```
	/// use simplekvs::OrderedMap;
	///
	/// let mut map = OrderedMap::new();
	/// map.set(57, 1);
	/// map.set(57, 4444);
	/// assert_eq!(map.at(&57).unwrap().value, &4444);
	/// assert_eq!(map.len(), 1);
	/// ```
	pub fn set(&mut self, key: K, value: V) {
		self.upsert(key, value, false);
	}

	/// Inserts a tombstoned placeholder under `key`, or overwrites the
	/// existing entry with one.
	///
	/// Used to record that a key was deleted before it ever reached the
	/// structure holding its live value.
	pub fn set_deleted(&mut self, key: K, value: V) {
		self.upsert(key, value, true);
	}

	/// Marks the entry for `key` as deleted.
	///
	/// Returns `true` if an entry existed, whether or not it was already
	/// deleted. Returns `false` and leaves the tree untouched otherwise. The
	/// entry keeps its slot; nodes are never shrunk or merged.
	pub fn del<Q>(&mut self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		let span = self.span.clone();
		let _entered = span.enter();

		let id = self.leaf_for(key);
		let leaf = self.node_mut(id).as_leaf_mut();
		match leaf.search(key) {
			Some(pos) => {
				leaf.slots[pos].tombstone = true;
				true
			}
			None => {
				trace!(len = self.len, "delete missed");
				false
			}
		}
	}

	/// Removes every entry and resets the tree to a single empty leaf.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.nodes.push(Node::Leaf(LeafNode::new(self.branching_factor)));
		self.root = NodeId(0);
		self.height = 1;
		self.len = 0;
	}

	/// Two-phase insertion: descend to the leaf, then propagate splits up
	/// the recorded path.
	fn upsert(&mut self, key: K, value: V, tombstone: bool) {
		let span = self.span.clone();
		let _entered = span.enter();

		// Phase 1: descend, keeping branch summaries exact for a new minimum.
		let mut path = Path::with_capacity(self.height);
		let mut current = self.root;
		while let Node::Branch(branch) = &mut self.nodes[current.0] {
			let pos = child_position(&branch.keys, &key);
			if key < branch.keys[pos] {
				branch.keys[pos] = key.clone();
			}
			path.push(current);
			current = branch.children[pos];
		}

		// The right half of a leaf split is allocated next, so the leaf can
		// link to it before it exists.
		let right_id = NodeId(self.nodes.len());
		let branching_factor = self.branching_factor;
		let outcome = self.node_mut(current).as_leaf_mut().insert(
			key,
			Slot {
				value,
				tombstone,
			},
			branching_factor,
			right_id,
		);

		let mut pending = match outcome {
			LeafInsert::Replaced => return,
			LeafInsert::Inserted => {
				self.len += 1;
				return;
			}
			LeafInsert::Split(right) => {
				self.len += 1;
				debug!(
					kind = "leaf",
					left = self.node(current).len(),
					right = right.keys.len(),
					"split node"
				);
				self.alloc(Node::Leaf(right))
			}
		};
		trace!(height = self.height, len = self.len, "inserted with split");

		// Phase 2: hand the new sibling to each ancestor until one absorbs it.
		while let Some(parent) = path.pop() {
			let separator = self.min_key(pending).clone();
			let split = self.node_mut(parent).as_branch_mut().insert(
				separator,
				pending,
				branching_factor,
			);
			match split {
				None => return,
				Some(right) => {
					debug!(
						kind = "branch",
						left = self.node(parent).len(),
						right = right.keys.len(),
						"split node"
					);
					pending = self.alloc(Node::Branch(right));
				}
			}
		}

		self.grow_root(pending);
	}

	/// Replaces the root with a branch over the old root and its new sibling.
	fn grow_root(&mut self, sibling: NodeId) {
		let old_root = self.root;
		if let Node::Leaf(leaf) = self.node(old_root) {
			// The split already spliced the sibling into the chain.
			debug_assert_eq!(leaf.next, Some(sibling), "root leaf not linked to its sibling");
		}

		let mut keys = Vec::with_capacity(self.branching_factor + 1);
		keys.push(self.min_key(old_root).clone());
		keys.push(self.min_key(sibling).clone());
		let mut children = Vec::with_capacity(self.branching_factor + 1);
		children.push(old_root);
		children.push(sibling);

		self.root = self.alloc(Node::Branch(BranchNode {
			keys,
			children,
		}));
		self.height += 1;
		debug!(height = self.height, "grew root");
	}

	// -----------------------------------------------------------------------
	// Iteration
	// -----------------------------------------------------------------------

	/// Returns a cursor at the smallest entry, or [`end`](Self::end) if the
	/// tree is empty.
	pub fn begin(&self) -> Cursor<'_, K, V> {
		let first = self.first_leaf();
		if self.node(first).len() == 0 {
			return self.end();
		}
		Cursor::new(self, Some((first, 0)))
	}

	/// Returns the end sentinel.
	pub fn end(&self) -> Cursor<'_, K, V> {
		Cursor::new(self, None)
	}

	/// Iterates over every entry in ascending key order, tombstoned entries
	/// included.
	pub fn iter(&self) -> Iter<'_, K, V> {
		Iter::new(self.begin(), self.len)
	}

	// -----------------------------------------------------------------------
	// Navigation Helpers
	// -----------------------------------------------------------------------

	/// Descends from the root to the leaf that holds (or would hold) `key`.
	fn leaf_for<Q>(&self, key: &Q) -> NodeId
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		let mut current = self.root;
		while let Node::Branch(branch) = self.node(current) {
			current = branch.children[child_position(&branch.keys, key)];
		}
		current
	}

	/// Leftmost leaf, where every traversal starts.
	fn first_leaf(&self) -> NodeId {
		let mut current = self.root;
		while let Node::Branch(branch) = self.node(current) {
			current = branch.children[0];
		}
		current
	}

	/// True minimum key of a subtree, read from the leaf at the end of its
	/// leftmost spine. The subtree must be non-empty.
	fn min_key(&self, id: NodeId) -> &K {
		let leaf = self.node(self.first_leaf_under(id)).as_leaf();
		&leaf.keys[0]
	}

	fn first_leaf_under(&self, id: NodeId) -> NodeId {
		let mut current = id;
		while let Node::Branch(branch) = self.node(current) {
			current = branch.children[0];
		}
		current
	}

	fn alloc(&mut self, node: Node<K, V>) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(node);
		id
	}
}

impl<K, V> OrderedMap<K, V> {
	#[inline]
	pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
		&self.nodes[id.0]
	}

	#[inline]
	fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
		&mut self.nodes[id.0]
	}
}

impl<'a, K: Clone + Ord, V> IntoIterator for &'a OrderedMap<K, V> {
	type Item = Entry<'a, K, V>;
	type IntoIter = Iter<'a, K, V>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Indented dump of the tree structure.
///
/// ```text
/// == BEGIN TREE ==
///  (10)
///     10: a
///     20: b
/// > 30
///     30: c (deleted)
/// == END TREE ==
/// ```
impl<K: fmt::Display, V: fmt::Display> fmt::Display for OrderedMap<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "== BEGIN TREE ==")?;
		self.fmt_node(f, self.root, 0)?;
		writeln!(f, "== END TREE ==")
	}
}

impl<K: fmt::Display, V: fmt::Display> OrderedMap<K, V> {
	fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
		let indent = depth * 4;
		match self.node(id) {
			Node::Leaf(leaf) => {
				for (key, slot) in leaf.keys.iter().zip(&leaf.slots) {
					let marker = if slot.tombstone {
						" (deleted)"
					} else {
						""
					};
					writeln!(f, "{:indent$}{}: {}{}", "", key, slot.value, marker)?;
				}
			}
			Node::Branch(branch) => {
				for (i, (key, child)) in branch.keys.iter().zip(&branch.children).enumerate() {
					if i == 0 {
						writeln!(f, "{:indent$} ({})", "", key)?;
					} else {
						writeln!(f, "{:indent$}> {}", "", key)?;
					}
					self.fmt_node(f, *child, depth + 1)?;
				}
			}
		}
		Ok(())
	}
}

// ===========================================================================
// Branch Routing
// ===========================================================================

/// Returns the index of the child subtree that must contain `key`.
///
/// `keys[0]` summarizes the first child's minimum but is not a lower bound
/// for routing: anything below `keys[1]` goes to child 0. Otherwise the
/// result is the greatest index `i >= 1` with `keys[i] <= key`.
///
/// For summaries `[10, 20, 30, 40, 50, 60]`: `9 -> 0`, `20 -> 1`, `39 -> 2`,
/// `100 -> 5`.
pub fn child_position<K, Q>(keys: &[K], key: &Q) -> usize
where
	K: Borrow<Q>,
	Q: ?Sized + Ord,
{
	if keys.len() <= 1 || key < keys[1].borrow() {
		return 0;
	}

	// Upper-bound search over [1, len - 1], biased right on ties
	let mut left = 1;
	let mut right = keys.len() - 1;
	while right > left {
		let mid = (left + right + 1) / 2;
		if key < keys[mid].borrow() {
			right = mid - 1;
		} else {
			left = mid;
		}
	}
	left
}

// ===========================================================================
// Node Types
// ===========================================================================

/// A node in the B+ tree - either a branch or a leaf.
#[derive(Debug)]
pub(crate) enum Node<K, V> {
	/// A branch node routing to child subtrees.
	Branch(BranchNode<K>),
	/// A leaf node holding entries.
	Leaf(LeafNode<K, V>),
}

impl<K, V> Node<K, V> {
	/// Number of occupied slots.
	#[inline]
	pub(crate) fn len(&self) -> usize {
		match self {
			Node::Branch(ref branch) => branch.keys.len(),
			Node::Leaf(ref leaf) => leaf.keys.len(),
		}
	}

	/// Returns a reference to the inner leaf node.
	///
	/// # Panics
	///
	/// Panics if called on a branch node.
	#[inline]
	pub(crate) fn as_leaf(&self) -> &LeafNode<K, V> {
		match self {
			Node::Leaf(ref leaf) => leaf,
			Node::Branch(_) => {
				unreachable!("as_leaf() called on branch node - this indicates a tree traversal bug")
			}
		}
	}

	#[inline]
	pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
		match self {
			Node::Leaf(ref mut leaf) => leaf,
			Node::Branch(_) => {
				unreachable!(
					"as_leaf_mut() called on branch node - this indicates a tree traversal bug"
				)
			}
		}
	}

	#[inline]
	pub(crate) fn as_branch_mut(&mut self) -> &mut BranchNode<K> {
		match self {
			Node::Branch(ref mut branch) => branch,
			Node::Leaf(_) => {
				unreachable!(
					"as_branch_mut() called on leaf node - this indicates a tree traversal bug"
				)
			}
		}
	}
}

/// A leaf entry's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slot<V> {
	pub(crate) value: V,
	pub(crate) tombstone: bool,
}

/// Outcome of inserting into a leaf.
pub(crate) enum LeafInsert<K, V> {
	/// An entry with the same key was overwritten in place.
	Replaced,
	/// A new entry was added without overflowing.
	Inserted,
	/// A new entry overflowed the leaf; carries the new right half.
	Split(LeafNode<K, V>),
}

// ===========================================================================
// Leaf Node
// ===========================================================================

/// A leaf node, storing sorted keys and their slots.
///
/// Holds at most `branching_factor - 1` entries once an insert completes.
/// Storage for `branching_factor` entries is reserved up front: the extra
/// slot holds the overflowing entry until the split moves half of them out.
#[derive(Debug)]
pub(crate) struct LeafNode<K, V> {
	/// Strictly increasing keys.
	pub(crate) keys: Vec<K>,
	/// Slots corresponding to keys (same index).
	pub(crate) slots: Vec<Slot<V>>,
	/// The next leaf in key order. Non-owning; `None` for the rightmost leaf.
	pub(crate) next: Option<NodeId>,
}

impl<K, V> LeafNode<K, V> {
	pub(crate) fn new(branching_factor: usize) -> LeafNode<K, V> {
		LeafNode {
			keys: Vec::with_capacity(branching_factor),
			slots: Vec::with_capacity(branching_factor),
			next: None,
		}
	}

	/// Binary search for an exact match.
	#[inline]
	pub(crate) fn search<Q>(&self, key: &Q) -> Option<usize>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		self.keys.binary_search_by(|k| k.borrow().cmp(key)).ok()
	}
}

impl<K: Ord, V> LeafNode<K, V> {
	/// Inserts or overwrites `key`.
	///
	/// An exact match is overwritten in place and never splits. Otherwise the
	/// entry goes in at the first position whose key is greater, and a leaf
	/// that was already holding `branching_factor - 1` entries splits. The
	/// new right half is linked in as `right_id`.
	pub(crate) fn insert(
		&mut self,
		key: K,
		slot: Slot<V>,
		branching_factor: usize,
		right_id: NodeId,
	) -> LeafInsert<K, V> {
		match self.keys.binary_search(&key) {
			Ok(pos) => {
				self.slots[pos] = slot;
				LeafInsert::Replaced
			}
			Err(pos) => {
				self.keys.insert(pos, key);
				self.slots.insert(pos, slot);
				if self.keys.len() < branching_factor {
					return LeafInsert::Inserted;
				}
				LeafInsert::Split(self.split(branching_factor, right_id))
			}
		}
	}

	/// Moves the upper half of an overflowing leaf into a new right sibling
	/// and splices it into the chain after `self`.
	///
	/// With `n` entries before the insert, the left keeps `ceil(n / 2)` of
	/// the `n + 1` entries now present.
	fn split(&mut self, branching_factor: usize, right_id: NodeId) -> LeafNode<K, V> {
		let half = self.keys.len() / 2;

		let mut right = LeafNode::new(branching_factor);
		right.keys.extend(self.keys.drain(half..));
		right.slots.extend(self.slots.drain(half..));
		right.next = self.next.replace(right_id);
		right
	}
}

// ===========================================================================
// Branch Node
// ===========================================================================

/// A branch node, routing to child subtrees.
///
/// `keys[i]` is the minimum key in `children[i]`. Holds at most
/// `branching_factor` children once an insert completes; one extra slot is
/// reserved for the child that overflows it.
#[derive(Debug)]
pub(crate) struct BranchNode<K> {
	/// Strictly increasing branch summary keys.
	pub(crate) keys: Vec<K>,
	/// Owned child handles, one per key.
	pub(crate) children: Vec<NodeId>,
}

impl<K: Ord> BranchNode<K> {
	/// Inserts `child` keyed by its minimum `key`.
	///
	/// Returns the new right sibling if the node already held
	/// `branching_factor` children.
	pub(crate) fn insert(
		&mut self,
		key: K,
		child: NodeId,
		branching_factor: usize,
	) -> Option<BranchNode<K>> {
		let pos = self.keys.partition_point(|k| *k < key);
		self.keys.insert(pos, key);
		self.children.insert(pos, child);
		if self.children.len() <= branching_factor {
			return None;
		}
		Some(self.split(branching_factor))
	}

	fn split(&mut self, branching_factor: usize) -> BranchNode<K> {
		let half = self.keys.len() / 2;

		let mut keys = Vec::with_capacity(branching_factor + 1);
		keys.extend(self.keys.drain(half..));
		let mut children = Vec::with_capacity(branching_factor + 1);
		children.extend(self.children.drain(half..));
		BranchNode {
			keys,
			children,
		}
	}
}

// ===========================================================================
// Test-Only Validation Module
// ===========================================================================

/// Invariant validation for testing.
#[cfg(any(test, feature = "test-utils"))]
impl<K: Clone + Ord + fmt::Debug, V> OrderedMap<K, V> {
	/// Validates all tree invariants. Panics with diagnostic info if any
	/// invariant is violated.
	///
	/// # Invariants Checked
	///
	/// 1. Height consistency: all leaves at depth `height`
	/// 2. Key ordering: keys strictly increasing within each node
	/// 3. Branch summaries: `keys[i]` equals the minimum key of child `i`
	/// 4. Occupancy: leaves hold `1..branching_factor` entries (an empty
	///    root leaf is allowed), branches `1..=branching_factor` children
	///    (at least 2 at the root)
	/// 5. Leaf chain: following `next` from the leftmost leaf visits every
	///    leaf in order, with keys strictly increasing across leaves
	/// 6. Length consistency: `len` equals the number of entries
	/// 7. Reachability: every node in the arena is in the tree
	pub fn assert_invariants(&self) {
		assert!(self.height >= 1, "height must be at least 1");

		let mut leaves = Vec::new();
		let mut visited = 0;
		self.validate_node_recursive(self.root, 1, &mut leaves, &mut visited);

		// Invariant 7: Reachability
		assert_eq!(visited, self.nodes.len(), "arena holds unreachable nodes");

		// Invariant 5: Leaf chain
		let mut chain = Vec::with_capacity(leaves.len());
		let mut current = Some(self.first_leaf());
		while let Some(id) = current {
			assert!(chain.len() < self.nodes.len(), "leaf chain does not terminate");
			chain.push(id);
			current = self.node(id).as_leaf().next;
		}
		assert_eq!(chain, leaves, "leaf chain does not match in-order leaves");

		let mut count = 0;
		let mut previous: Option<&K> = None;
		for id in chain {
			for key in &self.node(id).as_leaf().keys {
				if let Some(prev) = previous {
					assert!(prev < key, "keys out of order across leaves: {:?} >= {:?}", prev, key);
				}
				previous = Some(key);
				count += 1;
			}
		}

		// Invariant 6: Length consistency
		assert_eq!(count, self.len, "len {} != entry count {}", self.len, count);
	}

	/// Recursively validates a subtree, returning its minimum key.
	fn validate_node_recursive(
		&self,
		id: NodeId,
		level: usize,
		leaves: &mut Vec<NodeId>,
		visited: &mut usize,
	) -> Option<&K> {
		*visited += 1;
		let is_root = id == self.root;

		match self.node(id) {
			Node::Leaf(leaf) => {
				// Invariant 1: Height consistency
				assert_eq!(
					level, self.height,
					"Found leaf at level {} but height is {}",
					level, self.height
				);
				assert_eq!(leaf.keys.len(), leaf.slots.len(), "leaf keys and slots differ in length");

				// Invariant 4: Occupancy
				assert!(
					leaf.keys.len() < self.branching_factor,
					"leaf holds {} entries with branching factor {}",
					leaf.keys.len(),
					self.branching_factor
				);
				assert!(is_root || !leaf.keys.is_empty(), "non-root leaf is empty");

				// Invariant 2: Key ordering
				for pair in leaf.keys.windows(2) {
					assert!(pair[0] < pair[1], "Keys not sorted: {:?} >= {:?}", pair[0], pair[1]);
				}

				leaves.push(id);
				leaf.keys.first()
			}
			Node::Branch(branch) => {
				assert!(level < self.height, "Found branch at leaf level {}", level);
				assert_eq!(
					branch.keys.len(),
					branch.children.len(),
					"branch keys and children differ in length"
				);

				// Invariant 4: Occupancy
				assert!(
					branch.children.len() <= self.branching_factor,
					"branch holds {} children with branching factor {}",
					branch.children.len(),
					self.branching_factor
				);
				let min_children = if is_root {
					2
				} else {
					1
				};
				assert!(
					branch.children.len() >= min_children,
					"branch at level {} holds {} children",
					level,
					branch.children.len()
				);

				// Invariant 2: Key ordering
				for pair in branch.keys.windows(2) {
					assert!(
						pair[0] < pair[1],
						"Branch keys not sorted: {:?} >= {:?}",
						pair[0],
						pair[1]
					);
				}

				// Invariant 3: Branch summaries
				for (key, child) in branch.keys.iter().zip(&branch.children) {
					let child_min = self.validate_node_recursive(*child, level + 1, leaves, visited);
					assert_eq!(Some(key), child_min, "summary key does not match child minimum");
				}

				branch.keys.first()
			}
		}
	}

	/// Entry counts of every leaf, left to right.
	pub fn leaf_lens(&self) -> Vec<usize> {
		let mut lens = Vec::new();
		let mut current = Some(self.first_leaf());
		while let Some(id) = current {
			let leaf = self.node(id).as_leaf();
			lens.push(leaf.keys.len());
			current = leaf.next;
		}
		lens
	}
}
