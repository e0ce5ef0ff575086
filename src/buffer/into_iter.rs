use core::fmt;
use core::iter::FusedIterator;
use core::ops::Range;
use core::ptr::{self, NonNull};
use core::slice;

use crate::alloc::{Global, RawAlloc};

use super::Release;

/// An iterator which moves the remaining elements out of a buffer. The
/// storage is handed back to the allocation capability when it is dropped.
pub struct IntoIter<T, A: RawAlloc<T> = Global> {
    data: NonNull<T>,
    capacity: usize,
    remain: Range<usize>,
    alloc: A,
}

impl<T, A: RawAlloc<T>> IntoIter<T, A> {
    pub(super) fn new(data: NonNull<T>, length: usize, capacity: usize, alloc: A) -> Self {
        Self {
            data,
            capacity,
            remain: Range {
                start: 0,
                end: length,
            },
            alloc,
        }
    }

    /// Access the remaining elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        unsafe {
            slice::from_raw_parts(self.data.as_ptr().add(self.remain.start), self.remain.len())
        }
    }

    /// Access the remaining elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe {
            slice::from_raw_parts_mut(self.data.as_ptr().add(self.remain.start), self.remain.len())
        }
    }

    /// The number of remaining elements.
    pub const fn len(&self) -> usize {
        self.remain.end - self.remain.start
    }

    /// Check whether all elements have been consumed.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, A: RawAlloc<T>> AsRef<[T]> for IntoIter<T, A> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: fmt::Debug, A: RawAlloc<T>> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T, A: RawAlloc<T>> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.remain.start;
        if index != self.remain.end {
            self.remain.start = index + 1;
            Some(unsafe { ptr::read(self.data.as_ptr().add(index)) })
        } else {
            None
        }
    }

    #[inline]
    fn count(self) -> usize
    where
        Self: Sized,
    {
        self.len()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl<T, A: RawAlloc<T>> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        let mut index = self.remain.end;
        if index != self.remain.start {
            index -= 1;
            self.remain.end = index;
            Some(unsafe { ptr::read(self.data.as_ptr().add(index)) })
        } else {
            None
        }
    }
}

impl<T, A: RawAlloc<T>> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: RawAlloc<T>> FusedIterator for IntoIter<T, A> {}

impl<T, A: RawAlloc<T>> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        let _release = Release {
            alloc: &self.alloc,
            data: self.data,
            capacity: self.capacity,
        };
        let remain = ptr::slice_from_raw_parts_mut(
            unsafe { self.data.as_ptr().add(self.remain.start) },
            self.remain.len(),
        );
        unsafe { ptr::drop_in_place(remain) };
    }
}

unsafe impl<T: Send, A: RawAlloc<T> + Send> Send for IntoIter<T, A> {}

unsafe impl<T: Sync, A: RawAlloc<T> + Sync> Sync for IntoIter<T, A> {}
