//! A growable, contiguous buffer which acquires its storage through an
//! allocation capability.
//!
//! [`GrowableBuffer<T, A, G>`] owns a single block of storage obtained from
//! the capability `A`. Elements `[0, len)` are always initialized and slots
//! `[len, capacity)` never are. When an insertion finds the block full, a new
//! block sized by the growth policy `G` is acquired first, the elements are
//! moved across in index order, and only then is the old block handed back.
//! A failed acquisition therefore leaves the buffer exactly as it was.

use core::borrow::Borrow;
use core::fmt;
use core::iter::repeat;
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop, MaybeUninit};
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};
use core::slice;

use const_default::ConstDefault;

use crate::alloc::{AllocatorDefault, Global, RawAlloc};
use crate::capacity::{Grow, GrowDoubling};
use crate::error::{AllocationFailure, StorageError};

use self::insert::Inserter;

pub use self::into_iter::IntoIter;

#[macro_use]
mod macros;

mod insert;
mod into_iter;

#[cfg(feature = "zeroize")]
/// A buffer which zeroizes every block of storage it hands back.
pub type ZeroizingBuffer<T> = GrowableBuffer<T, crate::alloc::ZeroizingAlloc<Global>>;

/// Create a buffer containing `count` clones of `elem`, allocating through
/// the capability `alloc`.
pub fn from_elem_in<T, A>(elem: T, count: usize, alloc: A) -> GrowableBuffer<T, A>
where
    T: Clone,
    A: RawAlloc<T>,
{
    let mut buf = GrowableBuffer::with_capacity_in(count, alloc);
    buf.extend(repeat(elem).take(count));
    buf
}

/// Create a buffer from an array, allocating through the capability `alloc`.
pub fn from_array_in<T, A, const N: usize>(data: [T; N], alloc: A) -> GrowableBuffer<T, A>
where
    A: RawAlloc<T>,
{
    let mut buf = GrowableBuffer::with_capacity_in(N, alloc);
    buf.extend(data);
    buf
}

/// Hands a block back to its capability when dropped, so that storage is
/// returned even if dropping an element panics.
pub(super) struct Release<'a, T, A: RawAlloc<T>> {
    pub(super) alloc: &'a A,
    pub(super) data: NonNull<T>,
    pub(super) capacity: usize,
}

impl<T, A: RawAlloc<T>> Drop for Release<'_, T, A> {
    #[inline]
    fn drop(&mut self) {
        if self.capacity > 0 {
            unsafe { self.alloc.deallocate(self.data, self.capacity) };
        }
    }
}

/// A growable sequence container whose storage is acquired from the
/// allocation capability `A` and expanded according to the policy `G`.
pub struct GrowableBuffer<T, A: RawAlloc<T> = Global, G: Grow = GrowDoubling> {
    data: NonNull<T>,
    length: usize,
    capacity: usize,
    alloc: A,
    _marker: PhantomData<(T, G)>,
}

impl<T> GrowableBuffer<T> {
    /// Constructs a new, empty buffer backed by the global allocator.
    ///
    /// The buffer will not allocate until elements are pushed onto it.
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Try to construct a buffer with room for at least `capacity` elements.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, StorageError> {
        Self::try_with_capacity_in(capacity, Global)
    }

    /// Construct a buffer with room for at least `capacity` elements,
    /// panicking if the storage cannot be acquired.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// Construct a buffer holding clones of the elements of `data`.
    pub fn from_slice(data: &[T]) -> Self
    where
        T: Clone,
    {
        Self::from_slice_in(data, Global)
    }
}

impl<T, A: RawAlloc<T>> GrowableBuffer<T, A> {
    /// Constructs a new, empty buffer which will acquire its storage from
    /// `alloc`.
    ///
    /// The buffer will not allocate until elements are pushed onto it.
    pub const fn new_in(alloc: A) -> Self {
        Self::with_growth_in(alloc)
    }

    /// Try to construct a buffer with room for exactly `capacity` elements,
    /// acquired from `alloc`.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, StorageError> {
        let mut buf = Self::new_in(alloc);
        buf.try_reserve_exact(capacity)?;
        Ok(buf)
    }

    /// Construct a buffer with room for exactly `capacity` elements acquired
    /// from `alloc`, panicking if the storage cannot be acquired.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        match Self::try_with_capacity_in(capacity, alloc) {
            Ok(buf) => buf,
            Err(err) => err.panic(),
        }
    }

    /// Try to construct a buffer in `alloc` holding clones of the elements of `data`.
    pub fn try_from_slice_in(data: &[T], alloc: A) -> Result<Self, StorageError>
    where
        T: Clone,
    {
        let mut buf = Self::try_with_capacity_in(data.len(), alloc)?;
        buf.try_extend_from_slice(data)?;
        Ok(buf)
    }

    /// Construct a buffer in `alloc` holding clones of the elements of `data`,
    /// panicking if the storage cannot be acquired.
    pub fn from_slice_in(data: &[T], alloc: A) -> Self
    where
        T: Clone,
    {
        match Self::try_from_slice_in(data, alloc) {
            Ok(buf) => buf,
            Err(err) => err.panic(),
        }
    }
}

impl<T, A: RawAlloc<T>, G: Grow> GrowableBuffer<T, A, G> {
    /// Constructs a new, empty buffer acquiring storage from `alloc` and
    /// growing according to the policy `G`.
    pub const fn with_growth_in(alloc: A) -> Self {
        Self {
            data: NonNull::dangling(),
            length: 0,
            capacity: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Access the allocation capability backing this buffer.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// The number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Check whether the buffer holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The number of element slots in the current storage block.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Access the elements as a slice, in index order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.length) }
    }

    /// Access the elements as a mutable slice, in index order.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.length) }
    }

    /// Iterate over the elements in index order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Access the uninitialized slots following the live elements.
    #[inline]
    pub fn spare_capacity_mut(&mut self) -> &mut [MaybeUninit<T>] {
        unsafe {
            slice::from_raw_parts_mut(
                self.data.as_ptr().add(self.length).cast(),
                self.capacity - self.length,
            )
        }
    }

    /// Reserve room for at least `additional` more elements, growing
    /// according to the buffer's policy. Panics on failure.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            err.panic();
        }
    }

    /// Try to reserve room for at least `additional` more elements, growing
    /// according to the buffer's policy.
    #[inline]
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), StorageError> {
        self._try_reserve(additional, false)
    }

    /// Reserve room for exactly `additional` more elements. Panics on failure.
    #[inline]
    pub fn reserve_exact(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve_exact(additional) {
            err.panic();
        }
    }

    /// Try to reserve room for exactly `additional` more elements.
    #[inline]
    pub fn try_reserve_exact(&mut self, additional: usize) -> Result<(), StorageError> {
        self._try_reserve(additional, true)
    }

    fn _try_reserve(&mut self, additional: usize, exact: bool) -> Result<(), StorageError> {
        let Some(needed) = self.length.checked_add(additional) else {
            return Err(StorageError::CapacityOverflow);
        };
        if self.capacity >= needed {
            return Ok(());
        }
        let capacity = if exact {
            needed
        } else {
            G::next_capacity(self.capacity, needed)
        };
        self.grow_to(capacity)
    }

    /// Move the elements into a new block of `capacity` slots. Nothing is
    /// modified unless the new block is acquired.
    fn grow_to(&mut self, capacity: usize) -> Result<(), StorageError> {
        // SAFETY: the new block is always handed back, either on the next
        // growth or when the buffer is dropped
        let data = unsafe { self.alloc.allocate(capacity) }?;
        if self.capacity > 0 {
            unsafe {
                ptr::copy_nonoverlapping(self.data.as_ptr(), data.as_ptr(), self.length);
                self.alloc.deallocate(self.data, self.capacity);
            }
        }
        tracing::trace!(
            from = self.capacity,
            to = capacity,
            length = self.length,
            "grew buffer storage"
        );
        self.data = data;
        self.capacity = capacity;
        Ok(())
    }

    /// Append a value to the end of the buffer, panicking if storage for it
    /// cannot be acquired.
    pub fn push(&mut self, value: T) {
        if let Err(err) = self.try_push(value) {
            err.panic();
        }
    }

    /// Append a value to the end of the buffer.
    ///
    /// If the buffer is full, a larger block is acquired from the allocation
    /// capability and the existing elements are moved into it. Should that
    /// fail, the value is returned within the error and the buffer is left
    /// unchanged.
    pub fn try_push(&mut self, value: T) -> Result<(), AllocationFailure<T>> {
        if self.length == self.capacity {
            if let Err(error) = self._try_reserve(1, false) {
                return Err(AllocationFailure::new(error, value));
            }
        }
        unsafe { self.push_unchecked(value) };
        Ok(())
    }

    /// Append a value to the end of the buffer without checking capacity.
    ///
    /// # Safety
    /// The buffer must have at least one spare slot.
    #[inline]
    pub unsafe fn push_unchecked(&mut self, value: T) {
        self.data.as_ptr().add(self.length).write(value);
        self.length += 1;
    }

    /// Remove and return the last element, if any.
    pub fn pop(&mut self) -> Option<T> {
        if self.length > 0 {
            self.length -= 1;
            Some(unsafe { self.data.as_ptr().add(self.length).read() })
        } else {
            None
        }
    }

    /// Drop the elements beyond `length` in ascending index order, keeping
    /// the current storage.
    pub fn truncate(&mut self, length: usize) {
        let old_len = self.length;
        if length < old_len {
            self.length = length;
            unsafe {
                let to_drop =
                    ptr::slice_from_raw_parts_mut(self.data.as_ptr().add(length), old_len - length);
                ptr::drop_in_place(to_drop);
            }
        }
    }

    /// Drop all elements, keeping the current storage.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Append clones of the elements of `items`, panicking if storage cannot
    /// be acquired.
    pub fn extend_from_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        if let Err(err) = self.try_extend_from_slice(items) {
            err.panic();
        }
    }

    /// Try to append clones of the elements of `items`. On failure no
    /// elements are appended.
    pub fn try_extend_from_slice(&mut self, items: &[T]) -> Result<(), StorageError>
    where
        T: Clone,
    {
        self._try_reserve(items.len(), false)?;
        let mut insert = Inserter::new(self.spare_capacity_mut());
        for item in items {
            insert.push_clone(item);
        }
        let count = insert.complete();
        self.length += count;
        Ok(())
    }

    /// Try to append every item produced by `iter`. Should storage run out,
    /// the items appended so far are kept and the item which could not be
    /// stored is returned within the error.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<(), AllocationFailure<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let mut iter = iter.into_iter();
        loop {
            let mut insert = Inserter::new(self.spare_capacity_mut());
            let mut full;
            loop {
                full = insert.full();
                if full {
                    break;
                }
                let Some(item) = iter.next() else { break };
                insert.push(item);
            }
            let count = insert.complete();
            self.length += count;
            if !full {
                // ran out of items to insert
                break;
            }
            let Some(item) = iter.next() else { break };
            let min_reserve = iter.size_hint().0.saturating_add(1);
            if let Err(error) = self._try_reserve(min_reserve, false) {
                return Err(AllocationFailure::new(error, item));
            }
            unsafe { self.push_unchecked(item) };
        }
        Ok(())
    }

    /// Move every element of `other` onto the end of this buffer, leaving
    /// `other` empty. Panics if storage cannot be acquired.
    pub fn append(&mut self, other: &mut Self) {
        if let Err(err) = self.try_append(other) {
            err.panic();
        }
    }

    /// Try to move every element of `other` onto the end of this buffer,
    /// leaving `other` empty.
    ///
    /// When this buffer is empty and the two capabilities are
    /// interchangeable, the buffers exchange their storage together with the
    /// capabilities which produced it. Otherwise the elements are moved into
    /// storage acquired from this buffer's own capability, and `other` keeps
    /// its block. A block is never handed back to a capability other than
    /// its own. On failure both buffers are left unchanged.
    pub fn try_append(&mut self, other: &mut Self) -> Result<(), StorageError> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() && self.alloc.is_interchangeable(&other.alloc) {
            mem::swap(self, other);
            return Ok(());
        }
        let count = other.length;
        self._try_reserve(count, false)?;
        unsafe {
            ptr::copy_nonoverlapping(
                other.data.as_ptr(),
                self.data.as_ptr().add(self.length),
                count,
            );
        }
        other.length = 0;
        self.length += count;
        Ok(())
    }

    #[inline]
    fn into_parts(self) -> (NonNull<T>, usize, usize, A) {
        let me = ManuallyDrop::new(self);
        let alloc = unsafe { ptr::read(&me.alloc) };
        (me.data, me.length, me.capacity, alloc)
    }
}

impl<T, A: RawAlloc<T>, G: Grow> AsRef<[T]> for GrowableBuffer<T, A, G> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: RawAlloc<T>, G: Grow> AsMut<[T]> for GrowableBuffer<T, A, G> {
    #[inline]
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: RawAlloc<T>, G: Grow> Borrow<[T]> for GrowableBuffer<T, A, G> {
    #[inline]
    fn borrow(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Clone, A: RawAlloc<T> + Clone, G: Grow> Clone for GrowableBuffer<T, A, G> {
    fn clone(&self) -> Self {
        let mut inst = Self::with_growth_in(self.alloc.clone());
        if let Err(err) = inst.try_reserve_exact(self.length) {
            err.panic();
        }
        inst.extend_from_slice(self);
        inst
    }
}

impl<T, A, G> ConstDefault for GrowableBuffer<T, A, G>
where
    A: RawAlloc<T> + AllocatorDefault,
    G: Grow,
{
    const DEFAULT: Self = Self::with_growth_in(A::DEFAULT);
}

impl<T, A, G> Default for GrowableBuffer<T, A, G>
where
    A: RawAlloc<T> + AllocatorDefault,
    G: Grow,
{
    #[inline]
    fn default() -> Self {
        Self::with_growth_in(A::DEFAULT)
    }
}

impl<T: fmt::Debug, A: RawAlloc<T>, G: Grow> fmt::Debug for GrowableBuffer<T, A, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl<T, A: RawAlloc<T>, G: Grow> Deref for GrowableBuffer<T, A, G> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, A: RawAlloc<T>, G: Grow> DerefMut for GrowableBuffer<T, A, G> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T, A: RawAlloc<T>, G: Grow> Drop for GrowableBuffer<T, A, G> {
    fn drop(&mut self) {
        let _release = Release {
            alloc: &self.alloc,
            data: self.data,
            capacity: self.capacity,
        };
        // slices drop their elements in ascending index order
        let to_drop = ptr::slice_from_raw_parts_mut(self.data.as_ptr(), self.length);
        unsafe { ptr::drop_in_place(to_drop) };
    }
}

impl<T, A: RawAlloc<T>, G: Grow> Extend<T> for GrowableBuffer<T, A, G> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        if let Err(err) = self.try_extend(iter) {
            err.panic();
        }
    }
}

impl<'a, T: Clone + 'a, A: RawAlloc<T>, G: Grow> Extend<&'a T> for GrowableBuffer<T, A, G> {
    #[inline]
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        if let Err(err) = self.try_extend(iter.into_iter().cloned()) {
            err.panic();
        }
    }
}

impl<T, A, G> FromIterator<T> for GrowableBuffer<T, A, G>
where
    A: RawAlloc<T> + AllocatorDefault,
    G: Grow,
{
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut buf = Self::default();
        buf.extend(iter);
        buf
    }
}

impl<T, A: RawAlloc<T>, G: Grow> IntoIterator for GrowableBuffer<T, A, G> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        let (data, length, capacity, alloc) = self.into_parts();
        IntoIter::new(data, length, capacity, alloc)
    }
}

impl<'a, T, A: RawAlloc<T>, G: Grow> IntoIterator for &'a GrowableBuffer<T, A, G> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T, A: RawAlloc<T>, G: Grow> IntoIterator for &'a mut GrowableBuffer<T, A, G> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

impl<T1, A1, G1, T2, A2, G2> PartialEq<GrowableBuffer<T2, A2, G2>> for GrowableBuffer<T1, A1, G1>
where
    T1: PartialEq<T2>,
    A1: RawAlloc<T1>,
    A2: RawAlloc<T2>,
    G1: Grow,
    G2: Grow,
{
    #[inline]
    fn eq(&self, other: &GrowableBuffer<T2, A2, G2>) -> bool {
        self.as_slice().eq(other.as_slice())
    }
}

impl<T: Eq, A: RawAlloc<T>, G: Grow> Eq for GrowableBuffer<T, A, G> {}

impl<T1, T2, A: RawAlloc<T1>, G: Grow> PartialEq<[T2]> for GrowableBuffer<T1, A, G>
where
    T1: PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &[T2]) -> bool {
        self.as_slice().eq(other)
    }
}

impl<T1, T2, A: RawAlloc<T1>, G: Grow> PartialEq<&[T2]> for GrowableBuffer<T1, A, G>
where
    T1: PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &&[T2]) -> bool {
        self.as_slice().eq(*other)
    }
}

impl<T1, T2, A: RawAlloc<T1>, G: Grow, const N: usize> PartialEq<[T2; N]>
    for GrowableBuffer<T1, A, G>
where
    T1: PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &[T2; N]) -> bool {
        self.as_slice().eq(&other[..])
    }
}

impl<T1, T2, A: RawAlloc<T1>, G: Grow, const N: usize> PartialEq<&[T2; N]>
    for GrowableBuffer<T1, A, G>
where
    T1: PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &&[T2; N]) -> bool {
        self.as_slice().eq(&other[..])
    }
}

// The capability is owned by the buffer, so thread-safety follows from
// the element type and the capability type.
unsafe impl<T: Send, A: RawAlloc<T> + Send, G: Grow> Send for GrowableBuffer<T, A, G> {}

unsafe impl<T: Sync, A: RawAlloc<T> + Sync, G: Grow> Sync for GrowableBuffer<T, A, G> {}
