//! Allocation tracking for memory leak detection.
//!
//! A counting wrapper around the system allocator. Install it in a dedicated
//! test binary, since counters are process-wide:
//!
//! ```ignore
//! use simplekvs::alloc::TrackingAllocator;
//!
//! #[global_allocator]
//! static ALLOC: TrackingAllocator = TrackingAllocator;
//!
//! #[test]
//! fn no_leaks() {
//!     simplekvs::alloc::reset_counters();
//!     let mut map = simplekvs::OrderedMap::new();
//!     map.set(1, 1);
//!     drop(map);
//!     simplekvs::alloc::check_balanced_with_tolerance(0);
//! }
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

/// Total number of allocations since the last reset.
pub static ALLOC_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Total number of deallocations since the last reset.
pub static DEALLOC_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Net bytes allocated since the last reset.
pub static BYTES_ALLOCATED: AtomicIsize = AtomicIsize::new(0);

/// Counts every allocation and deallocation, then forwards to [`System`].
pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
	unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
		ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
		BYTES_ALLOCATED.fetch_add(layout.size() as isize, Ordering::Relaxed);
		System.alloc(layout)
	}

	unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
		DEALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
		BYTES_ALLOCATED.fetch_sub(layout.size() as isize, Ordering::Relaxed);
		System.dealloc(ptr, layout)
	}

	unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
		ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
		BYTES_ALLOCATED.fetch_add(layout.size() as isize, Ordering::Relaxed);
		System.alloc_zeroed(layout)
	}

	unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
		BYTES_ALLOCATED.fetch_add(new_size as isize - layout.size() as isize, Ordering::Relaxed);
		System.realloc(ptr, layout, new_size)
	}
}

/// Resets all counters to zero.
pub fn reset_counters() {
	ALLOC_COUNT.store(0, Ordering::SeqCst);
	DEALLOC_COUNT.store(0, Ordering::SeqCst);
	BYTES_ALLOCATED.store(0, Ordering::SeqCst);
}

/// Allocation statistics snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AllocationStats {
	/// Allocations since reset.
	pub alloc_count: usize,
	/// Deallocations since reset.
	pub dealloc_count: usize,
	/// Net bytes allocated since reset.
	pub bytes_allocated: isize,
}

/// Returns the current counters.
pub fn get_stats() -> AllocationStats {
	AllocationStats {
		alloc_count: ALLOC_COUNT.load(Ordering::SeqCst),
		dealloc_count: DEALLOC_COUNT.load(Ordering::SeqCst),
		bytes_allocated: BYTES_ALLOCATED.load(Ordering::SeqCst),
	}
}

/// Panics if allocations and deallocations since the last reset differ by
/// more than `tolerance`.
///
/// The tolerance absorbs allocations made by the test harness itself.
pub fn check_balanced_with_tolerance(tolerance: usize) {
	let stats = get_stats();
	let diff = (stats.alloc_count as isize - stats.dealloc_count as isize).unsigned_abs();

	if diff > tolerance {
		panic!(
			"Memory leak detected (beyond tolerance of {})!\n\
             Allocations: {}\n\
             Deallocations: {}\n\
             Bytes still allocated: {}",
			tolerance, stats.alloc_count, stats.dealloc_count, stats.bytes_allocated
		);
	}
}
