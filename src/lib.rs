//! A growable buffer over pluggable allocators, with a fixed-capacity bump arena.
//!
//! [`GrowableBuffer`] requests its storage through the [`RawAlloc`] capability,
//! so the same container may be backed by the [`Global`] heap allocator or by a
//! [`BoundedArena`] which hands out slots from a single block of fixed size.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

#[cfg(test)]
#[macro_use]
extern crate std;

#[cfg(feature = "alloc")]
extern crate alloc as alloc_crate;

pub mod alloc;

#[cfg(feature = "alloc")]
pub mod arena;

pub mod buffer;

pub mod capacity;

pub(crate) mod error;

pub use self::{
    alloc::{Global, RawAlloc},
    buffer::GrowableBuffer,
    error::{AllocationFailure, StorageError},
};

#[cfg(feature = "alloc")]
pub use self::arena::BoundedArena;
