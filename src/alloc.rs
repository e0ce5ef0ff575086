//! Allocation capabilities.

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;
#[cfg(feature = "zeroize")]
use core::{mem::size_of, slice};

#[cfg(all(feature = "alloc", not(feature = "allocator-api2")))]
use alloc_crate::alloc::{alloc as raw_alloc, dealloc as raw_dealloc};

#[cfg(all(feature = "alloc", feature = "allocator-api2"))]
pub use allocator_api2::alloc::Global;
#[cfg(all(feature = "alloc", feature = "allocator-api2"))]
use allocator_api2::alloc::Allocator;

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

use crate::error::StorageError;

#[cfg(all(not(test), feature = "alloc"))]
pub use alloc_crate::alloc::handle_alloc_error;

#[cfg(any(test, not(feature = "alloc")))]
/// Custom allocation error handler.
pub fn handle_alloc_error(layout: Layout) -> ! {
    panic!("memory allocation of {} bytes failed", layout.size());
}

/// A capability which hands out contiguous, uninitialized storage for
/// elements of type `T`, and accepts that storage back when a client is
/// finished with it.
///
/// # Safety
/// Implementations must return regions which are properly aligned for `T`,
/// which remain valid until they are passed to `deallocate` (or until the
/// capability is dropped), and which do not overlap any other region
/// currently handed out by the same instance. Moving the capability must not
/// invalidate any region.
pub unsafe trait RawAlloc<T>: fmt::Debug {
    /// Try to allocate storage for `count` contiguous elements.
    ///
    /// A request for zero elements always succeeds and may return a
    /// dangling pointer.
    ///
    /// # Safety
    /// Some capabilities destroy the contents of any slots they still
    /// consider live when they are dropped. Before this instance is dropped,
    /// every slot of the returned region must either hold an initialized
    /// value or have been passed back through `deallocate`.
    unsafe fn allocate(&self, count: usize) -> Result<NonNull<T>, StorageError>;

    /// Hand back a region produced by `allocate`. Any values in the region
    /// must already have been dropped or moved out.
    ///
    /// # Safety
    /// The value `ptr` must represent a region produced by this same
    /// instance, and `count` must be the count which was passed to
    /// `allocate`. A region may never be handed back through another
    /// instance, even one for which `is_interchangeable` returns `true`.
    unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize);

    /// Allocator equality: determine whether two instances may stand in for
    /// one another when ownership moves between containers.
    ///
    /// This only permits transfers in which each region travels together
    /// with the instance which produced it, such as two buffers exchanging
    /// both their storage and their capabilities. It does not make regions
    /// interchangeable: a region must still be handed back to the instance
    /// that allocated it.
    fn is_interchangeable(&self, other: &Self) -> bool;
}

/// A trait implemented by allocation capabilities supporting a constant initializer.
/// This cannot use ConstDefault as it is not implemented for the external
/// `Global` allocator.
pub trait AllocatorDefault: Default {
    /// The constant initializer for this allocator.
    const DEFAULT: Self;
}

/// The global memory allocator.
///
/// When the `alloc` feature is enabled, this type implements `RawAlloc` by
/// forwarding calls to the allocator registered with the `#[global_allocator]`
/// attribute if there is one, or the `std` crate's default.
#[cfg(any(not(feature = "alloc"), not(feature = "allocator-api2")))]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "alloc", derive(Default, Copy))]
pub struct Global;

#[cfg(feature = "alloc")]
unsafe impl<T> RawAlloc<T> for Global {
    #[inline]
    unsafe fn allocate(&self, count: usize) -> Result<NonNull<T>, StorageError> {
        let layout = Layout::array::<T>(count)?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        #[cfg(not(feature = "allocator-api2"))]
        let ptr = NonNull::new(raw_alloc(layout)).ok_or(StorageError::AllocError(layout))?;
        #[cfg(feature = "allocator-api2")]
        let ptr = Allocator::allocate(self, layout)
            .map_err(|_| StorageError::AllocError(layout))?
            .cast::<u8>();
        Ok(ptr.cast())
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        // SAFETY: the same layout was computed successfully by `allocate`
        let layout = Layout::array::<T>(count).unwrap_unchecked();
        if layout.size() > 0 {
            #[cfg(not(feature = "allocator-api2"))]
            raw_dealloc(ptr.as_ptr().cast(), layout);
            #[cfg(feature = "allocator-api2")]
            Allocator::deallocate(self, ptr.cast(), layout);
        }
    }

    #[inline]
    fn is_interchangeable(&self, _other: &Self) -> bool {
        true
    }
}

#[cfg(not(feature = "alloc"))]
// Stub implementation to allow Global as the default allocator type
// even when the `alloc` feature is not enabled. Any usage as an allocator
// will result in a panic.
unsafe impl<T> RawAlloc<T> for Global {
    unsafe fn allocate(&self, _count: usize) -> Result<NonNull<T>, StorageError> {
        unimplemented!();
    }

    unsafe fn deallocate(&self, _ptr: NonNull<T>, _count: usize) {
        unimplemented!();
    }

    fn is_interchangeable(&self, _other: &Self) -> bool {
        true
    }
}

#[cfg(feature = "alloc")]
impl AllocatorDefault for Global {
    const DEFAULT: Self = Global;
}

#[cfg(feature = "zeroize")]
/// An allocation capability which allocates via `A` and zeroizes every
/// region when it is handed back.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroizingAlloc<A>(pub A);

#[cfg(feature = "zeroize")]
unsafe impl<T, A: RawAlloc<T>> RawAlloc<T> for ZeroizingAlloc<A> {
    #[inline]
    unsafe fn allocate(&self, count: usize) -> Result<NonNull<T>, StorageError> {
        self.0.allocate(count)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        let len = count * size_of::<T>();
        if len > 0 {
            let mem = slice::from_raw_parts_mut(ptr.as_ptr().cast::<u8>(), len);
            mem.zeroize();
        }
        self.0.deallocate(ptr, count)
    }

    #[inline]
    fn is_interchangeable(&self, other: &Self) -> bool {
        self.0.is_interchangeable(&other.0)
    }
}

#[cfg(feature = "zeroize")]
impl<A: AllocatorDefault> AllocatorDefault for ZeroizingAlloc<A> {
    const DEFAULT: Self = ZeroizingAlloc(A::DEFAULT);
}
