//! Configuration for ordered maps and collections.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Branching factor used when none is configured.
pub const DEFAULT_BRANCHING_FACTOR: usize = 3;

/// Branching factor of a collection's cache tree.
pub const DEFAULT_CACHE_BRANCHING_FACTOR: usize = 100;

/// Smallest branching factor for which splits always leave both halves
/// non-empty.
pub const MIN_BRANCHING_FACTOR: usize = 2;

/// Configuration for a single [`OrderedMap`](crate::OrderedMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Maximum children per branch node. Leaves hold at most
	/// `branching_factor - 1` entries.
	pub branching_factor: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			branching_factor: DEFAULT_BRANCHING_FACTOR,
		}
	}
}

impl Config {
	/// Creates a configuration with the given branching factor.
	pub fn with_branching_factor(branching_factor: usize) -> Self {
		Self {
			branching_factor,
		}
	}

	/// Checks that the configuration describes a usable tree.
	pub fn validate(&self) -> Result<()> {
		if self.branching_factor < MIN_BRANCHING_FACTOR {
			return Err(Error::InvalidBranchingFactor {
				factor: self.branching_factor,
			});
		}
		Ok(())
	}
}

/// Configuration for a [`Collection`](crate::db::Collection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
	/// Tree configuration for each pending write buffer.
	pub write_buffer: Config,
	/// Tree configuration for the read cache.
	pub cache: Config,
}

impl Default for CollectionConfig {
	fn default() -> Self {
		Self {
			write_buffer: Config::default(),
			cache: Config::with_branching_factor(DEFAULT_CACHE_BRANCHING_FACTOR),
		}
	}
}

impl CollectionConfig {
	/// Checks both tree configurations.
	pub fn validate(&self) -> Result<()> {
		self.write_buffer.validate()?;
		self.cache.validate()
	}
}
