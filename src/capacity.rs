//! Growth policies for buffers which have exhausted their storage.

use core::fmt::Debug;

/// The capacity requested by the first growth of an empty buffer.
pub const INITIAL_CAPACITY: usize = 10;

/// Growth behavior for collections which have exceeded their available storage
pub trait Grow: Debug {
    /// Calculate the next capacity to request from the allocator, given the
    /// previous capacity and the minimum capacity required
    fn next_capacity(prev: usize, minimum: usize) -> usize;
}

/// Growth behavior which never requests extra capacity
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct GrowExact;

impl Grow for GrowExact {
    #[inline]
    fn next_capacity(_prev: usize, minimum: usize) -> usize {
        minimum
    }
}

/// Growth behavior which starts at [`INITIAL_CAPACITY`] and consistently
/// doubles in size
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct GrowDoubling;

impl Grow for GrowDoubling {
    #[inline]
    fn next_capacity(prev: usize, minimum: usize) -> usize {
        let preferred = if prev == 0 {
            INITIAL_CAPACITY
        } else {
            prev.saturating_mul(2)
        };
        preferred.max(minimum)
    }
}
