use core::mem::MaybeUninit;
use core::ptr;

/// Writes values into the spare capacity of a buffer. Values written before
/// the inserter is completed are dropped if it is abandoned, for instance
/// when a clone or an iterator panics part way through.
pub(crate) struct Inserter<'a, T> {
    buf: &'a mut [MaybeUninit<T>],
    end: usize,
}

impl<'a, T> Inserter<'a, T> {
    #[inline]
    pub fn new(spare: &'a mut [MaybeUninit<T>]) -> Self {
        Self { buf: spare, end: 0 }
    }

    #[inline]
    pub fn push(&mut self, val: T) {
        self.buf[self.end].write(val);
        self.end += 1;
    }

    #[inline]
    pub fn push_clone(&mut self, val: &T)
    where
        T: Clone,
    {
        self.push(val.clone());
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.end == self.buf.len()
    }

    /// Give up ownership of the written values, returning their count.
    #[inline]
    pub fn complete(mut self) -> usize {
        let count = self.end;
        self.end = 0;
        count
    }
}

impl<T> Drop for Inserter<'_, T> {
    #[inline]
    fn drop(&mut self) {
        if self.end > 0 {
            unsafe {
                ptr::drop_in_place(
                    &mut self.buf[..self.end] as *mut [MaybeUninit<T>] as *mut [T],
                )
            };
        }
    }
}
