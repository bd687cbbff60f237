//! Type aliases for shared state.
//!
//! The protocol engine publishes read-only snapshots of its state through
//! these; only the engine thread ever takes the write lock.

use parking_lot::RwLock;
use std::sync::Arc;

/// A thread-safe read-write lock wrapper, for state read far more often than written.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// Create a new `ThreadSafeRw<T>`.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}
