/// Create a [`GrowableBuffer`](crate::GrowableBuffer) containing the arguments.
///
/// `buffer![in alloc; ...]` seeds the buffer with a specific allocation
/// capability. Panics if storage for the elements cannot be acquired.
///
/// ```
/// # #[cfg(feature = "alloc")] {
/// use arena_buffer::{buffer, BoundedArena};
///
/// let b = buffer![in BoundedArena::<u32, 16>::new(); 1, 2, 3];
/// assert_eq!(b, [1, 2, 3]);
/// let z = buffer![0u8; 4];
/// assert_eq!(z.len(), 4);
/// # }
/// ```
#[macro_export]
macro_rules! buffer {
    (in $alloc:expr $(;)?) => (
        $crate::buffer::GrowableBuffer::new_in($alloc)
    );
    (in $alloc:expr; $elem:expr; $n:expr) => (
        $crate::buffer::from_elem_in($elem, $n, $alloc)
    );
    (in $alloc:expr; $($x:expr),+ $(,)?) => (
        $crate::buffer::from_array_in([$($x),+], $alloc)
    );
    () => (
        $crate::buffer::GrowableBuffer::new()
    );
    ($elem:expr; $n:expr) => (
        $crate::buffer::from_elem_in($elem, $n, $crate::alloc::Global)
    );
    ($($x:expr),+ $(,)?) => (
        $crate::buffer::from_array_in([$($x),+], $crate::alloc::Global)
    );
}
