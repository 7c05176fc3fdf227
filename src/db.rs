//! A minimal key-value store on top of [`OrderedMap`].
//!
//! A [`Collection`] keeps two kinds of trees:
//!
//! - **Write buffers**: pending writes not yet reconciled anywhere else.
//!   Writes go to the newest buffer; older buffers are kept in order.
//! - **Cache**: a mirror of every write, consulted for reads.
//!
//! Deletes tombstone the cache entry. If the newest write buffer does not
//! already hold the key, a tombstoned placeholder is written there too, so
//! the delete survives when buffers are later reconciled.

use std::borrow::Borrow;
use std::collections::HashMap;

use tracing::{debug, debug_span, Span};

use crate::config::CollectionConfig;
use crate::error::{Error, Result};
use crate::OrderedMap;

/// A named set of keys and values.
pub struct Collection<K = String, V = String> {
	name: String,
	config: CollectionConfig,
	write_buffers: Vec<OrderedMap<K, V>>,
	cache: OrderedMap<K, V>,
	span: Span,
}

impl<K: Clone + Ord, V: Clone + Default> Collection<K, V> {
	/// Creates an empty collection with the default configuration.
	pub fn new(name: impl Into<String>) -> Self {
		let name = name.into();
		let config = CollectionConfig::default();
		let span = debug_span!("collection", name = %name);
		// The default configuration is always valid
		let cache = OrderedMap::build(config.cache.branching_factor, span.clone());
		Collection {
			name,
			config,
			write_buffers: Vec::new(),
			cache,
			span,
		}
	}

	/// Creates an empty collection with the given configuration.
	pub fn with_config(name: impl Into<String>, config: CollectionConfig) -> Result<Self> {
		config.validate()?;
		let name = name.into();
		let span = debug_span!("collection", name = %name);
		let cache = OrderedMap::with_span(config.cache, span.clone())?;
		Ok(Collection {
			name,
			config,
			write_buffers: Vec::new(),
			cache,
			span,
		})
	}

	/// Returns the collection's name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Writes `value` under `key` into the newest write buffer and the cache.
	pub fn set(&mut self, key: K, value: V) {
		self.current_buffer().set(key.clone(), value.clone());
		self.cache.set(key, value);
	}

	/// Reads the value for `key` from the cache.
	///
	/// # Errors
	///
	/// - [`Error::KeyNotFound`] if the key was never written
	/// - [`Error::KeyDeleted`] if the key was deleted
	pub fn get<Q>(&self, key: &Q) -> Result<&V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		let found = self.cache.at(key)?;
		if found.tombstone {
			return Err(Error::KeyDeleted);
		}
		Ok(found.value)
	}

	/// Deletes `key`.
	///
	/// Tombstones the cached entry and makes sure the newest write buffer
	/// records the delete, inserting a placeholder if it never saw the key.
	pub fn del(&mut self, key: K) {
		self.cache.del(&key);
		let buffer = self.current_buffer();
		if !buffer.del(&key) {
			buffer.set_deleted(key, V::default());
		}
	}

	/// Starts a new write buffer. Later writes land in it; the sealed buffers
	/// stay pending.
	pub fn seal_write_buffer(&mut self) {
		let buffer = self.new_buffer();
		self.write_buffers.push(buffer);
		debug!(parent: &self.span, buffers = self.write_buffers.len(), "sealed write buffer");
	}

	/// Pending write buffers, oldest first.
	pub fn write_buffers(&self) -> &[OrderedMap<K, V>] {
		&self.write_buffers
	}

	/// The read cache.
	pub fn cache(&self) -> &OrderedMap<K, V> {
		&self.cache
	}

	fn current_buffer(&mut self) -> &mut OrderedMap<K, V> {
		if self.write_buffers.is_empty() {
			let buffer = self.new_buffer();
			self.write_buffers.push(buffer);
		}
		let last = self.write_buffers.len() - 1;
		&mut self.write_buffers[last]
	}

	fn new_buffer(&self) -> OrderedMap<K, V> {
		OrderedMap::build(self.config.write_buffer.branching_factor, self.span.clone())
	}
}

/// A set of collections addressed by name.
pub struct Database<K = String, V = String> {
	collections: HashMap<String, Collection<K, V>>,
}

impl<K, V> Default for Database<K, V> {
	fn default() -> Self {
		Database {
			collections: HashMap::new(),
		}
	}
}

impl<K: Clone + Ord, V: Clone + Default> Database<K, V> {
	/// Creates an empty database.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the collection called `name`, creating it if needed.
	pub fn add_collection(&mut self, name: &str) -> &mut Collection<K, V> {
		self.collections.entry(name.to_string()).or_insert_with(|| Collection::new(name))
	}

	/// Returns the collection called `name`.
	pub fn collection(&self, name: &str) -> Result<&Collection<K, V>> {
		self.collections.get(name).ok_or_else(|| Error::CollectionNotFound {
			name: name.to_string(),
		})
	}

	/// Returns the collection called `name` for writing.
	pub fn collection_mut(&mut self, name: &str) -> Result<&mut Collection<K, V>> {
		self.collections.get_mut(name).ok_or_else(|| Error::CollectionNotFound {
			name: name.to_string(),
		})
	}

	/// Returns `true` if a collection called `name` exists.
	pub fn contains_collection(&self, name: &str) -> bool {
		self.collections.contains_key(name)
	}

	/// Number of collections.
	pub fn len(&self) -> usize {
		self.collections.len()
	}

	/// Returns `true` if the database holds no collections.
	pub fn is_empty(&self) -> bool {
		self.collections.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Config;

	#[test]
	fn set_writes_buffer_and_cache() {
		let mut collection: Collection = Collection::new("test");
		collection.set("test1".to_string(), "value1".to_string());

		assert_eq!(collection.get("test1"), Ok(&"value1".to_string()));
		assert_eq!(collection.write_buffers().len(), 1);
		assert_eq!(collection.write_buffers()[0].at("test1").unwrap().value, "value1");
		assert_eq!(collection.cache().branching_factor(), 100);
	}

	#[test]
	fn get_distinguishes_missing_from_deleted() {
		let mut collection: Collection = Collection::new("test");
		collection.set("a".to_string(), "1".to_string());
		collection.del("a".to_string());

		assert_eq!(collection.get("a"), Err(Error::KeyDeleted));
		assert_eq!(collection.get("b"), Err(Error::KeyNotFound));
	}

	#[test]
	fn del_before_any_write_creates_buffer() {
		let mut collection: Collection<i32, i32> = Collection::new("numbers");
		collection.del(7);

		let buffers = collection.write_buffers();
		assert_eq!(buffers.len(), 1);
		let found = buffers[0].at(&7).unwrap();
		assert!(found.tombstone);
		assert_eq!(found.value, &0);
	}

	#[test]
	fn with_config_rejects_invalid_trees() {
		let config = CollectionConfig {
			write_buffer: Config::with_branching_factor(0),
			..Default::default()
		};
		assert_eq!(
			Collection::<i32, i32>::with_config("bad", config).err().map(|e| e.to_string()),
			Some("invalid branching factor 0: must be at least 2".to_string())
		);
	}

	#[test]
	fn add_collection_is_get_or_create() {
		let mut db: Database = Database::new();
		db.add_collection("test").set("k".to_string(), "v".to_string());
		db.add_collection("test");

		assert_eq!(db.len(), 1);
		assert_eq!(db.collection("test").unwrap().get("k"), Ok(&"v".to_string()));
		assert!(matches!(db.collection("other"), Err(Error::CollectionNotFound { .. })));
	}
}
