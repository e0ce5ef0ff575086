//! Error handling.

use core::alloc::{Layout, LayoutError};
use core::fmt;

/// An enumeration of error types raised by allocation capabilities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// The host allocator failed to provide memory for the layout.
    AllocError(Layout),
    /// A bounded allocator could not satisfy the request from its fixed block.
    OutOfCapacity {
        /// The number of element slots requested.
        requested: usize,
        /// The number of element slots left in the block.
        available: usize,
    },
    /// The requested element count overflowed `usize`.
    CapacityOverflow,
    /// The requested element count could not be represented as a layout.
    LayoutError(LayoutError),
}

impl StorageError {
    /// Generic description of this error.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllocError(_) => "Allocation error",
            Self::OutOfCapacity { .. } => "Exceeded fixed allocator capacity",
            Self::CapacityOverflow => "Capacity overflow",
            Self::LayoutError(_) => "Layout error",
        }
    }

    /// Check whether this error was raised by an exhausted bounded allocator.
    #[inline]
    pub fn is_out_of_capacity(&self) -> bool {
        matches!(self, Self::OutOfCapacity { .. })
    }

    /// Generate a panic with this error as the reason.
    #[cold]
    #[inline(never)]
    pub fn panic(self) -> ! {
        if let Self::AllocError(layout) = self {
            crate::alloc::handle_alloc_error(layout);
        } else {
            panic!("{}", self)
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfCapacity {
                requested,
                available,
            } => write!(
                f,
                "{}: requested {} slots, {} available",
                self.as_str(),
                requested,
                available
            ),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl From<LayoutError> for StorageError {
    fn from(err: LayoutError) -> Self {
        Self::LayoutError(err)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StorageError {}

/// An error raised by buffer updates when new storage could not be acquired.
/// Includes the value which could not be stored.
#[derive(Clone)]
pub struct AllocationFailure<T> {
    pub(crate) error: StorageError,
    pub(crate) value: T,
}

impl<T> AllocationFailure<T> {
    pub(crate) fn new(error: StorageError, value: T) -> Self {
        Self { error, value }
    }

    /// Generic description of this error
    pub fn as_str(&self) -> &'static str {
        "Allocation failure"
    }

    /// Get a reference to the underlying `StorageError`
    pub fn error(&self) -> &StorageError {
        &self.error
    }

    /// Unwrap the value which was not inserted
    pub fn into_value(self) -> T {
        self.value
    }

    /// Generate a panic with this error as the reason
    #[cold]
    #[inline(never)]
    pub fn panic(self) -> ! {
        panic!("{}: {}", self.as_str(), self.error);
    }
}

impl<T> fmt::Debug for AllocationFailure<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationFailure")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for AllocationFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.as_str(), self.error)
    }
}

#[cfg(feature = "std")]
impl<T> std::error::Error for AllocationFailure<T> {}
