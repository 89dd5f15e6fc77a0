//! Chunked append-only storage with stable element references
//!
//! This module provides the backing store for interval records. The store
//! grows by allocating fixed-size chunks; every chunk allocates its full
//! capacity before the first insertion and is frozen once full. Because a
//! chunk's slab never reallocates, a reference returned by [`ChunkStore::append`]
//! stays valid for the lifetime of the store, even while other threads keep
//! appending. That stability is what lets a call site hold on to its record
//! and stamp timestamps into it long after millions of later appends.
//!
//! Slots are `UnsafeCell<MaybeUninit<T>>` and every element access goes
//! through per-slot raw pointers, so handing out a `&T` and then mutating
//! the chunk list for later appends touch disjoint permissions: no borrow of
//! a whole slab or of an occupied slot is ever created on the append or
//! lookup paths, and the handed-out borrows survive them.
//!
//! # Performance Characteristics
//!
//! - **Append:** amortized O(1); one slab allocation every `chunk_capacity`
//!   appends, no per-element heap allocation.
//! - **Iteration:** append order, which is also the chronological order of
//!   record creation.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One fixed-capacity slab of element slots.
///
/// `len` counts initialized slots; it only grows, and only under the store
/// lock. Slots at `..len` hold live elements until the chunk is dropped.
struct Chunk<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    len: usize,
}

impl<T> Chunk<T> {
    fn new(capacity: usize) -> Self {
        let slots = std::iter::repeat_with(|| UnsafeCell::new(MaybeUninit::uninit()))
            .take(capacity)
            .collect();
        Self { slots, len: 0 }
    }

    fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Raw pointer to slot `index`.
    ///
    /// Goes through `UnsafeCell::get`, so no borrow of the slot's interior is
    /// created and outstanding element borrows are left undisturbed.
    fn slot(&self, index: usize) -> *mut MaybeUninit<T> {
        self.slots[index].get()
    }
}

impl<T> Drop for Chunk<T> {
    fn drop(&mut self) {
        for slot in &mut self.slots[..self.len] {
            // SAFETY: slots below `len` were initialized exactly once by
            // `append` and never moved out; `&mut self` proves no borrows of
            // them remain.
            unsafe { slot.get_mut().assume_init_drop() };
        }
    }
}

/// Append-only chunked store handing out stable references.
///
/// All operations require `T: Send + Sync` because appended elements are
/// readable through `&self` from any thread for the store's lifetime.
///
/// # Example
///
/// ```
/// use lapwatch::chunk_store::ChunkStore;
///
/// let store: ChunkStore<u64> = ChunkStore::new(4);
/// let first = store.append(10);
/// for i in 0..100 {
///     store.append(i);
/// }
/// // `first` survived 100 further appends and several chunk allocations.
/// assert_eq!(*first, 10);
/// assert_eq!(store.len(), 101);
/// ```
pub struct ChunkStore<T> {
    chunk_capacity: usize,
    chunks: Mutex<Vec<Chunk<T>>>,
}

impl<T: Send + Sync> ChunkStore<T> {
    /// Create a store whose chunks each hold `chunk_capacity` elements.
    ///
    /// The first chunk is allocated eagerly so the hot path never starts
    /// from an empty chunk list.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_capacity` is 0.
    pub fn new(chunk_capacity: usize) -> Self {
        assert!(chunk_capacity > 0, "chunk capacity must be > 0");
        Self {
            chunk_capacity,
            chunks: Mutex::new(vec![Chunk::new(chunk_capacity)]),
        }
    }

    /// Append a value and return a reference to its slot.
    ///
    /// The reference remains valid until the store is dropped; later appends
    /// never relocate or invalidate it.
    pub fn append(&self, value: T) -> &T {
        let mut chunks = self.lock();
        if chunks.last().map_or(true, Chunk::is_full) {
            // Current chunk is full; it is frozen from here on.
            chunks.push(Chunk::new(self.chunk_capacity));
        }
        let chunk = chunks.last_mut().expect("store always has a current chunk");
        let slot = chunk.slot(chunk.len);
        chunk.len += 1;
        // SAFETY: `slot` addresses the first free slot of the current chunk;
        // `len` was bumped under the lock, so no other append targets it, and
        // the write below happens before any shared borrow of the slot
        // exists. Stability: the slab is a boxed slice allocated at full
        // capacity, so the address is fixed for the store's lifetime (the
        // outer Vec moves chunk headers, never slabs). Aliasing: element
        // access always goes through `UnsafeCell` slot pointers and occupied
        // slots are never borrowed wholesale or written again, so later
        // `append`/`get` calls taking the lock and mutating the chunk list do
        // not invalidate the borrow returned here. Interior mutation of the
        // element after hand-out is governed by `T` itself.
        unsafe {
            (*slot).write(value);
            &*(*slot).as_ptr()
        }
    }

    /// Positional access in append order.
    pub fn get(&self, index: usize) -> Option<&T> {
        let chunks = self.lock();
        let chunk = chunks.get(index / self.chunk_capacity)?;
        let offset = index % self.chunk_capacity;
        if offset >= chunk.len {
            return None;
        }
        let slot = chunk.slot(offset);
        // SAFETY: `offset < len`, so the slot holds an element initialized by
        // `append`; same stability and aliasing argument as there.
        Some(unsafe { &*(*slot).as_ptr() })
    }

    /// Number of elements appended so far.
    pub fn len(&self) -> usize {
        self.lock().iter().map(|chunk| chunk.len).sum()
    }

    /// True when nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of chunks allocated so far (including the current one).
    pub fn chunk_count(&self) -> usize {
        self.lock().len()
    }

    /// Visit every element in append order.
    ///
    /// The internal lock is held for the duration of the walk; concurrent
    /// appends block until it finishes.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        let chunks = self.lock();
        for chunk in chunks.iter() {
            for index in 0..chunk.len {
                let slot = chunk.slot(index);
                // SAFETY: `index < len`; see `get`.
                f(unsafe { &*(*slot).as_ptr() });
            }
        }
    }

    /// Fallible variant of [`ChunkStore::for_each`]; stops at the first error.
    pub fn try_for_each<E>(&self, mut f: impl FnMut(&T) -> Result<(), E>) -> Result<(), E> {
        let chunks = self.lock();
        for chunk in chunks.iter() {
            for index in 0..chunk.len {
                let slot = chunk.slot(index);
                // SAFETY: `index < len`; see `get`.
                f(unsafe { &*(*slot).as_ptr() })?;
            }
        }
        Ok(())
    }

    // A poisoned lock only means some thread panicked mid-append; the chunk
    // list itself is still structurally sound, so recording keeps working.
    fn lock(&self) -> MutexGuard<'_, Vec<Chunk<T>>> {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_store_is_empty() {
        let store: ChunkStore<u32> = ChunkStore::new(8);
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert_eq!(store.chunk_count(), 1);
    }

    #[test]
    #[should_panic(expected = "chunk capacity must be > 0")]
    fn test_zero_capacity_panics() {
        let _ = ChunkStore::<u32>::new(0);
    }

    #[test]
    fn test_append_returns_written_value() {
        let store = ChunkStore::new(4);
        let slot = store.append(42u64);
        assert_eq!(*slot, 42);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_references_stable_across_chunk_boundaries() {
        let store = ChunkStore::new(3);
        let mut slots = Vec::new();
        for i in 0..20u64 {
            slots.push(store.append(i));
        }
        // 20 elements at capacity 3 forces 7 chunks.
        assert_eq!(store.chunk_count(), 7);
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(**slot, i as u64);
        }
    }

    #[test]
    fn test_handles_stay_valid_across_interleaved_access() {
        // Read old handles and positional lookups between appends, so the
        // borrows handed out earlier coexist with every mutating path.
        let store = ChunkStore::new(2);
        let mut handles: Vec<&u64> = Vec::new();
        for i in 0..50u64 {
            handles.push(store.append(i));
            for (j, handle) in handles.iter().enumerate() {
                assert_eq!(**handle, j as u64);
                assert_eq!(store.get(j), Some(*handle));
            }
        }
    }

    #[test]
    fn test_iteration_preserves_append_order() {
        let store = ChunkStore::new(5);
        for i in 0..23u64 {
            store.append(i);
        }
        let mut seen = Vec::new();
        store.for_each(|v| seen.push(*v));
        assert_eq!(seen, (0..23).collect::<Vec<u64>>());
    }

    #[test]
    fn test_get_matches_append_order() {
        let store = ChunkStore::new(4);
        for i in 0..10u64 {
            store.append(i * 100);
        }
        for i in 0..10usize {
            assert_eq!(store.get(i), Some(&(i as u64 * 100)));
        }
        assert_eq!(store.get(10), None);
        assert_eq!(store.get(usize::MAX), None);
    }

    #[test]
    fn test_full_chunk_is_frozen() {
        let store = ChunkStore::new(2);
        store.append(1u32);
        store.append(2);
        assert_eq!(store.chunk_count(), 1);
        store.append(3);
        assert_eq!(store.chunk_count(), 2);
        // The frozen chunk still reads back intact.
        assert_eq!(store.get(0), Some(&1));
        assert_eq!(store.get(1), Some(&2));
        assert_eq!(store.get(2), Some(&3));
    }

    #[test]
    fn test_drop_releases_partially_filled_chunks() {
        // Two chunks, the second half-filled: drop must release exactly the
        // initialized slots (heap-owning elements make leaks or double
        // drops visible to sanitizers).
        let store = ChunkStore::new(4);
        for i in 0..6 {
            store.append(format!("value_{i}"));
        }
        assert_eq!(store.chunk_count(), 2);
        drop(store);
    }

    #[test]
    fn test_try_for_each_stops_on_error() {
        let store = ChunkStore::new(4);
        for i in 0..10u32 {
            store.append(i);
        }
        let mut visited = 0;
        let result: Result<(), &str> = store.try_for_each(|v| {
            visited += 1;
            if *v == 5 {
                Err("stop")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(visited, 6);
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let store = Arc::new(ChunkStore::new(16));
        let threads = 8;
        let per_thread = 1000u64;

        thread::scope(|scope| {
            for t in 0..threads {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for i in 0..per_thread {
                        store.append(t * per_thread + i);
                    }
                });
            }
        });

        assert_eq!(store.len(), threads as usize * per_thread as usize);
        let mut sum = 0u64;
        store.for_each(|v| sum += v);
        let n = threads * per_thread;
        assert_eq!(sum, n * (n - 1) / 2);
    }
}
