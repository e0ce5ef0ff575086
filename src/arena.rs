//! A fixed-capacity bump allocator.
//!
//! A [`BoundedArena<T, N>`] owns one heap block with room for exactly `N`
//! values of type `T`. Each allocation advances a cursor through the block,
//! and space is never reused within the lifetime of the arena: handing a
//! region back only records that its slots no longer hold values.
//!
//! When the arena is dropped it destroys, in ascending slot order, every slot
//! which was handed out and not handed back, and then frees the block. A
//! client which allocates a region must therefore initialize all of it, or
//! return it through [`RawAlloc::deallocate`], before the arena is dropped.
//! [`GrowableBuffer`](crate::GrowableBuffer) always does so: it moves its
//! elements out of the old region before returning it, and returns its final
//! region during its own teardown. This is what makes it sound for one arena
//! to serve several growth cycles of the same buffer.

use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::mem::size_of;
use core::ptr::{self, NonNull};

use alloc_crate::boxed::Box;

use crate::alloc::{Global, RawAlloc};
use crate::error::StorageError;

/// A bump allocator carving up to `N` values of type `T` out of a single
/// fixed block.
pub struct BoundedArena<T, const N: usize> {
    block: NonNull<T>,
    cursor: Cell<usize>,
    released: Box<[Cell<bool>]>,
    _marker: PhantomData<T>,
}

impl<T, const N: usize> BoundedArena<T, N> {
    /// Create a new arena, allocating its backing block.
    ///
    /// Panics if the host allocator cannot provide the block.
    pub fn new() -> Self {
        match Self::try_new() {
            Ok(arena) => arena,
            Err(err) => err.panic(),
        }
    }

    /// Try to create a new arena, allocating its backing block.
    pub fn try_new() -> Result<Self, StorageError> {
        // SAFETY: the block is released with the same count in `Drop`
        let block = unsafe { <Global as RawAlloc<T>>::allocate(&Global, N) }?;
        Ok(Self {
            block,
            cursor: Cell::new(0),
            released: (0..N).map(|_| Cell::new(false)).collect(),
            _marker: PhantomData,
        })
    }

    /// The total number of slots in the backing block.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// The number of slots handed out so far.
    #[inline]
    pub fn allocated(&self) -> usize {
        self.cursor.get()
    }

    /// The number of slots which may still be handed out.
    #[inline]
    pub fn remaining(&self) -> usize {
        N - self.cursor.get()
    }

    /// Check whether a pointer lies within the backing block.
    ///
    /// Zero-sized types occupy no addresses, so this is always `false` for them.
    pub fn contains(&self, ptr: *const T) -> bool {
        let start = self.block.as_ptr() as usize;
        let end = start + N * size_of::<T>();
        let addr = ptr as usize;
        addr >= start && addr < end
    }

    fn mark_released(&self, ptr: NonNull<T>, count: usize) {
        let cursor = self.cursor.get();
        if size_of::<T>() == 0 {
            // Zero-sized slots cannot be told apart, so release the earliest live ones.
            self.released[..cursor]
                .iter()
                .filter(|flag| !flag.get())
                .take(count)
                .for_each(|flag| flag.set(true));
            return;
        }
        if !self.contains(ptr.as_ptr()) {
            debug_assert!(false, "released region does not belong to this arena");
            return;
        }
        let start = (ptr.as_ptr() as usize - self.block.as_ptr() as usize) / size_of::<T>();
        debug_assert!(start + count <= cursor, "released region was never allocated");
        let end = (start + count).min(cursor);
        for flag in &self.released[start..end] {
            flag.set(true);
        }
    }
}

impl<T, const N: usize> Default for BoundedArena<T, N> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<T, const N: usize> RawAlloc<T> for BoundedArena<T, N> {
    unsafe fn allocate(&self, count: usize) -> Result<NonNull<T>, StorageError> {
        let cursor = self.cursor.get();
        let available = N - cursor;
        if count > available {
            tracing::debug!(
                requested = count,
                available,
                capacity = N,
                "bounded arena exhausted"
            );
            return Err(StorageError::OutOfCapacity {
                requested: count,
                available,
            });
        }
        self.cursor.set(cursor + count);
        Ok(NonNull::new_unchecked(self.block.as_ptr().add(cursor)))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        // The cursor never moves back: released slots are only marked as
        // holding no value, they are not handed out again.
        if count > 0 {
            self.mark_released(ptr, count);
        }
    }

    #[inline]
    fn is_interchangeable(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T, const N: usize> Drop for BoundedArena<T, N> {
    fn drop(&mut self) {
        let allocated = self.cursor.get();
        let mut live = 0usize;
        for (index, flag) in self.released[..allocated].iter().enumerate() {
            if !flag.get() {
                // SAFETY: clients must initialize every slot they do not release
                unsafe { ptr::drop_in_place(self.block.as_ptr().add(index)) };
                live += 1;
            }
        }
        tracing::trace!(allocated, live, capacity = N, "dropping bounded arena");
        unsafe { <Global as RawAlloc<T>>::deallocate(&Global, self.block, N) };
    }
}

/// Arenas compare equal whenever their capacities match, regardless of the
/// element type. Equal arenas still own distinct blocks, and a region may
/// only be handed back to the arena which produced it.
impl<T, U, const N: usize, const M: usize> PartialEq<BoundedArena<U, M>> for BoundedArena<T, N> {
    #[inline]
    fn eq(&self, _other: &BoundedArena<U, M>) -> bool {
        N == M
    }
}

impl<T, const N: usize> Eq for BoundedArena<T, N> {}

impl<T, const N: usize> fmt::Debug for BoundedArena<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedArena")
            .field("capacity", &N)
            .field("allocated", &self.cursor.get())
            .finish_non_exhaustive()
    }
}

// The block is owned exclusively; shared access is prevented by `Cell`.
unsafe impl<T: Send, const N: usize> Send for BoundedArena<T, N> {}
