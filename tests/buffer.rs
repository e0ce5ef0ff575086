use core::cell::{Cell, RefCell};
use core::marker::PhantomData as Cfg;
use core::ptr::NonNull;

use const_default::ConstDefault;

#[cfg(feature = "alloc")]
use rand::Rng;
#[cfg(feature = "alloc")]
use rstest::rstest;

#[cfg(feature = "alloc")]
use arena_buffer::BoundedArena;
use arena_buffer::{
    alloc::AllocatorDefault,
    buffer,
    capacity::{GrowExact, INITIAL_CAPACITY},
    Global, GrowableBuffer, RawAlloc, StorageError,
};

const SLICE: &[usize] = &[1, 2, 3, 4, 5];

/// Records construction and destruction in a shared log.
#[derive(Debug)]
struct Tracked<'a> {
    id: usize,
    log: &'a RefCell<Vec<(&'static str, usize)>>,
}

impl<'a> Tracked<'a> {
    fn new(id: usize, log: &'a RefCell<Vec<(&'static str, usize)>>) -> Self {
        log.borrow_mut().push(("new", id));
        Self { id, log }
    }
}

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        self.log.borrow_mut().push(("drop", self.id));
    }
}

/// Forwards to `Global` until the allowance of successful allocations is spent.
#[derive(Debug, Clone)]
struct Limited {
    allowance: Cell<usize>,
}

impl Limited {
    fn new(allowance: usize) -> Self {
        Self {
            allowance: Cell::new(allowance),
        }
    }
}

unsafe impl<T> RawAlloc<T> for Limited {
    unsafe fn allocate(&self, count: usize) -> Result<NonNull<T>, StorageError> {
        let allowance = self.allowance.get();
        if allowance == 0 {
            return Err(StorageError::OutOfCapacity {
                requested: count,
                available: 0,
            });
        }
        self.allowance.set(allowance - 1);
        <Global as RawAlloc<T>>::allocate(&Global, count)
    }

    unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        <Global as RawAlloc<T>>::deallocate(&Global, ptr, count)
    }

    fn is_interchangeable(&self, _other: &Self) -> bool {
        false
    }
}

#[rstest]
#[cfg(feature = "alloc")]
#[case::global(Cfg::<Global>)]
fn buffer_default<A: RawAlloc<usize> + AllocatorDefault>(#[case] _config: Cfg<A>) {
    let buf = GrowableBuffer::<usize, A>::default();
    assert!(buf.is_empty());
    assert_eq!(buf.capacity(), 0);
}

#[rstest]
#[cfg(feature = "alloc")]
#[case::global(Global)]
#[case::arena(BoundedArena::<usize, 64>::new())]
fn buffer_extend<A: RawAlloc<usize>>(#[case] alloc: A) {
    let mut buf = GrowableBuffer::new_in(alloc);
    buf.extend(SLICE.iter().cloned());
    assert!(buf.capacity() >= SLICE.len());
    assert_eq!(buf.len(), SLICE.len());
    assert_eq!(buf.as_slice(), SLICE);
}

#[rstest]
#[cfg(feature = "alloc")]
#[case::global(Global)]
#[case::arena(BoundedArena::<usize, 64>::new())]
fn buffer_extend_from_slice<A: RawAlloc<usize>>(#[case] alloc: A) {
    let mut buf = GrowableBuffer::new_in(alloc);
    buf.extend_from_slice(SLICE);
    buf.extend(SLICE);
    assert_eq!(buf.len(), SLICE.len() * 2);
    assert_eq!(&buf[..5], SLICE);
    assert_eq!(&buf[5..], SLICE);
}

#[rstest]
#[cfg(feature = "alloc")]
#[case::global(Global)]
#[case::arena(BoundedArena::<usize, 1000>::new())]
fn buffer_growth_preserves_contents<A: RawAlloc<usize>>(#[case] alloc: A) {
    let mut rng = rand::thread_rng();
    let count = rng.gen_range(1..=300);
    let mut buf = GrowableBuffer::new_in(alloc);
    for value in 0..count {
        buf.push(value);
        assert_eq!(buf.len(), value + 1);
        assert!(buf.capacity() >= buf.len());
    }
    assert!(buf.iter().copied().eq(0..count));
    for idx in 0..count {
        assert_eq!(buf.get(idx), Some(&idx));
    }
    assert_eq!(buf.get(count), None);
}

#[test]
fn buffer_capacity_growth() {
    let mut caps = [0usize; 12];
    let mut buf = GrowableBuffer::<usize>::new();
    for cap in caps.iter_mut() {
        buf.push(1);
        *cap = buf.capacity();
    }
    assert_eq!(caps[0], INITIAL_CAPACITY);
    assert_eq!(caps[9], INITIAL_CAPACITY);
    assert_eq!(caps[10], INITIAL_CAPACITY * 2);
}

#[test]
fn buffer_const_default() {
    const EMPTY: GrowableBuffer<u8> = ConstDefault::DEFAULT;
    let mut buf = EMPTY;
    assert!(buf.is_empty());
    assert_eq!(buf.capacity(), 0);
    buf.push(1);
    assert_eq!(buf, [1]);
}

#[test]
fn buffer_with_capacity() {
    let buf = GrowableBuffer::<u64>::with_capacity(37);
    assert_eq!(buf.capacity(), 37);
    assert!(buf.is_empty());
}

#[test]
fn buffer_exact_growth() {
    let mut buf = GrowableBuffer::<u8, Global, GrowExact>::with_growth_in(Global);
    buf.extend_from_slice(&[1, 2, 3]);
    assert_eq!(buf.capacity(), 3);
    buf.push(4);
    assert_eq!(buf.capacity(), 4);
}

#[test]
fn buffer_push_failure_is_atomic() {
    let log = RefCell::new(Vec::new());
    let mut buf = GrowableBuffer::new_in(Limited::new(1));
    for id in 0..INITIAL_CAPACITY {
        buf.push(Tracked::new(id, &log));
    }
    let before = buf.as_slice().as_ptr();
    let err = buf.try_push(Tracked::new(99, &log)).unwrap_err();
    assert!(err.error().is_out_of_capacity());
    assert_eq!(buf.len(), INITIAL_CAPACITY);
    assert_eq!(buf.capacity(), INITIAL_CAPACITY);
    assert_eq!(buf.as_slice().as_ptr(), before);
    assert!(buf.iter().map(|t| t.id).eq(0..INITIAL_CAPACITY));
    // nothing was destroyed, and the rejected value comes back intact
    assert!(log.borrow().iter().all(|(event, _)| *event == "new"));
    let value = err.into_value();
    assert_eq!(value.id, 99);
}

#[test]
fn buffer_reserve_failure_is_atomic() {
    let mut buf = GrowableBuffer::new_in(Limited::new(1));
    buf.extend_from_slice(SLICE);
    let cap = buf.capacity();
    assert!(buf.try_reserve(100).is_err());
    assert!(buf.try_extend_from_slice(&[0; 50]).is_err());
    assert_eq!(buf.capacity(), cap);
    assert_eq!(buf.as_slice(), SLICE);
}

#[test]
fn buffer_reserve_overflow() {
    let mut buf = GrowableBuffer::<u8>::new();
    buf.push(1);
    assert_eq!(
        buf.try_reserve(usize::MAX),
        Err(StorageError::CapacityOverflow)
    );
}

#[test]
fn buffer_try_extend_partial() {
    let mut buf = GrowableBuffer::new_in(Limited::new(1));
    buf.reserve_exact(3);
    let err = buf.try_extend(10..20).unwrap_err();
    assert_eq!(err.into_value(), 13);
    assert_eq!(buf, [10, 11, 12]);
}

#[test]
fn buffer_drop_order() {
    let log = RefCell::new(Vec::new());
    {
        let mut buf = GrowableBuffer::new();
        for id in 0..25 {
            buf.push(Tracked::new(id, &log));
        }
        // growth moves elements without constructing or destroying any
        assert_eq!(log.borrow().len(), 25);
    }
    let drops: Vec<usize> = log
        .borrow()
        .iter()
        .filter(|(event, _)| *event == "drop")
        .map(|(_, id)| *id)
        .collect();
    assert_eq!(drops, (0..25).collect::<Vec<_>>());
}

#[test]
fn buffer_truncate_and_clear() {
    let log = RefCell::new(Vec::new());
    let mut buf = GrowableBuffer::new();
    for id in 0..6 {
        buf.push(Tracked::new(id, &log));
    }
    log.borrow_mut().clear();
    buf.truncate(3);
    assert_eq!(*log.borrow(), [("drop", 3), ("drop", 4), ("drop", 5)]);
    buf.truncate(10);
    assert_eq!(buf.len(), 3);
    let cap = buf.capacity();
    buf.clear();
    assert!(buf.is_empty());
    assert_eq!(buf.capacity(), cap);
    assert_eq!(log.borrow().len(), 6);
}

#[test]
fn buffer_pop() {
    let mut buf = buffer![1, 2, 3];
    assert_eq!(buf.pop(), Some(3));
    assert_eq!(buf.pop(), Some(2));
    assert_eq!(buf.pop(), Some(1));
    assert_eq!(buf.pop(), None);
}

#[cfg(feature = "alloc")]
#[test]
fn buffer_arena_end_to_end() {
    let mut buf = GrowableBuffer::<i32, _>::new_in(BoundedArena::<i32, 10>::new());
    for value in 0..=9 {
        buf.push(value);
    }
    assert_eq!(buf.len(), 10);
    assert_eq!(buf.capacity(), 10);
    assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(buf.allocator().remaining(), 0);

    let err = buf.try_push(10).unwrap_err();
    assert_eq!(
        *err.error(),
        StorageError::OutOfCapacity {
            requested: 20,
            available: 0
        }
    );
    assert_eq!(err.into_value(), 10);
    assert_eq!(buf.len(), 10);
    assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

#[cfg(feature = "alloc")]
#[test]
#[should_panic(expected = "Allocation failure: Exceeded fixed allocator capacity")]
fn buffer_arena_push_panics_when_exhausted() {
    let mut buf = GrowableBuffer::<i32, _>::new_in(BoundedArena::<i32, 10>::new());
    buf.extend(0..11);
}

#[cfg(feature = "alloc")]
#[test]
fn buffer_arena_serves_several_growths() {
    let log = RefCell::new(Vec::new());
    {
        let mut buf = GrowableBuffer::new_in(BoundedArena::<Tracked<'_>, 30>::new());
        for id in 0..20 {
            buf.push(Tracked::new(id, &log));
        }
        assert_eq!(buf.capacity(), 20);
        assert_eq!(buf.allocator().allocated(), 30);
        assert!(buf.iter().map(|t| t.id).eq(0..20));
        assert!(buf.try_push(Tracked::new(20, &log)).is_err());
    }
    // every element is destroyed exactly once, the rejected one included
    let log = log.into_inner();
    for id in 0..=20 {
        let drops = log.iter().filter(|e| **e == ("drop", id)).count();
        assert_eq!(drops, 1, "element {id} dropped {drops} times");
    }
}

#[test]
fn buffer_append_moves_elements() {
    let mut a = buffer![1, 2, 3];
    let mut b = buffer![4, 5];
    a.append(&mut b);
    assert_eq!(a, [1, 2, 3, 4, 5]);
    assert!(b.is_empty());
}

#[test]
fn buffer_append_swaps_into_empty() {
    let mut a = GrowableBuffer::<u32>::new();
    let mut b = GrowableBuffer::with_capacity(40);
    b.extend_from_slice(&[7, 8, 9]);
    let data = b.as_ptr();
    a.append(&mut b);
    assert_eq!(a.as_ptr(), data);
    assert_eq!(a.capacity(), 40);
    assert_eq!(a, [7, 8, 9]);
    assert!(b.is_empty());
    assert_eq!(b.capacity(), 0);
}

#[cfg(feature = "alloc")]
#[test]
fn buffer_append_arena_swap() {
    let mut a = GrowableBuffer::new_in(BoundedArena::<u32, 10>::new());
    let mut b = GrowableBuffer::new_in(BoundedArena::<u32, 10>::new());
    b.extend(0..10);
    a.append(&mut b);
    assert_eq!(a.len(), 10);
    assert_eq!(a.allocator().remaining(), 0);
    assert_eq!(b.allocator().remaining(), 10);
    // the storage moved together with the arena which produced it
    assert!(a.allocator().contains(a.as_ptr()));
    b.push(99);
    assert_eq!(b, [99]);
    assert!(b.allocator().contains(b.as_ptr()));
}

#[cfg(feature = "alloc")]
#[test]
fn buffer_append_arena_keeps_storage_with_owner() {
    let log = RefCell::new(Vec::new());
    {
        let mut a = GrowableBuffer::new_in(BoundedArena::<Tracked<'_>, 10>::new());
        let mut b = GrowableBuffer::new_in(BoundedArena::<Tracked<'_>, 10>::new());
        for id in 0..3 {
            a.push(Tracked::new(id, &log));
        }
        for id in 3..8 {
            b.push(Tracked::new(id, &log));
        }
        assert!(a.allocator().is_interchangeable(b.allocator()));
        let b_block = b.as_ptr();
        a.append(&mut b);

        // elements were moved into a's own block, b kept its block
        assert!(a.iter().map(|t| t.id).eq(0..8));
        assert!(a.allocator().contains(a.as_ptr()));
        assert!(b.is_empty());
        assert_eq!(b.capacity(), INITIAL_CAPACITY);
        assert_eq!(b.as_ptr(), b_block);
        assert!(b.allocator().contains(b_block));
        assert!(!a.allocator().contains(b_block));
    }
    let log = log.into_inner();
    for id in 0..8 {
        let drops = log.iter().filter(|e| **e == ("drop", id)).count();
        assert_eq!(drops, 1, "element {id} dropped {drops} times");
    }
}

#[test]
fn buffer_append_copies_without_interchange() {
    let mut a = GrowableBuffer::new_in(Limited::new(4));
    let mut b = GrowableBuffer::new_in(Limited::new(4));
    b.extend_from_slice(SLICE);
    a.append(&mut b);
    assert_eq!(a, SLICE);
    assert!(b.is_empty());
    assert_eq!(b.capacity(), INITIAL_CAPACITY);
}

#[test]
fn buffer_into_iter() {
    let log = RefCell::new(Vec::new());
    let buf: GrowableBuffer<_> = (0..5).map(|id| Tracked::new(id, &log)).collect();
    let mut iter = buf.into_iter();
    assert_eq!(iter.len(), 5);
    assert_eq!(iter.next().map(|t| t.id), Some(0));
    assert_eq!(iter.next_back().map(|t| t.id), Some(4));
    assert_eq!(iter.as_slice().len(), 3);
    log.borrow_mut().clear();
    drop(iter);
    assert_eq!(*log.borrow(), [("drop", 1), ("drop", 2), ("drop", 3)]);
}

#[test]
fn buffer_iter_mut() {
    let mut buf = GrowableBuffer::from_slice(SLICE);
    for item in &mut buf {
        *item *= 2;
    }
    let total: usize = (&buf).into_iter().sum();
    assert_eq!(total, 30);
}

#[test]
fn buffer_clone_and_eq() {
    let a = buffer![1usize, 2, 3];
    let b = a.clone();
    assert_eq!(a, b);
    assert_eq!(b, &[1, 2, 3][..]);
    assert_eq!(format!("{:?}", b), "[1, 2, 3]");
}

#[test]
fn buffer_macro_repeat() {
    let buf = buffer![String::from("x"); 3];
    assert_eq!(buf.len(), 3);
    assert!(buf.iter().all(|s| s == "x"));
    let empty: GrowableBuffer<u8> = buffer![];
    assert!(empty.is_empty());
}

#[test]
fn buffer_zero_sized() {
    let mut buf = GrowableBuffer::new();
    for _ in 0..100 {
        buf.push(());
    }
    assert_eq!(buf.len(), 100);
    assert_eq!(buf.into_iter().count(), 100);
}
