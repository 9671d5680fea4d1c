//! Cubes which own or wrap the memory holding their elements.
//!
//! All backends implement [`Hypercube`](crate::Hypercube) directly and
//! synchronize access internally, so they can be shared between threads and
//! views without extra locking by the caller.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

mod array;
mod bits;
#[cfg(feature = "mmap")]
mod mapped;
mod ragged;
mod sparse;

pub use array::{ArrayCube, DEFAULT_CHUNK_SHIFT};
pub use bits::BitSetCube;
#[cfg(feature = "mmap")]
pub use mapped::MappedCube;
pub use ragged::{Nested, RaggedCube};
pub use sparse::{SparseCube, SparseOptions};

// A panic while a lock is held cannot leave an element half-written, so
// poisoned locks are used as if they were not poisoned.

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
