use std::collections::BTreeMap;
use std::fmt::Display;

use arena_buffer::{BoundedArena, GrowableBuffer, RawAlloc};

fn factorial(n: u64) -> u64 {
    (1..=n).product()
}

fn print_row<T: Display, A: RawAlloc<T>>(buf: &GrowableBuffer<T, A>) {
    let row: Vec<String> = buf.iter().map(ToString::to_string).collect();
    println!("{}", row.join(" "));
}

fn main() {
    let factorials: BTreeMap<u64, u64> = (0..10).map(|k| (k, factorial(k))).collect();
    for (k, v) in &factorials {
        println!("{k} {v}");
    }

    let mut heap = GrowableBuffer::<i32>::new();
    for value in 0..10 {
        heap.push(value);
    }
    print_row(&heap);

    let mut bounded = GrowableBuffer::new_in(BoundedArena::<i32, 10>::new());
    for value in 0..10 {
        bounded.push(value);
    }
    print_row(&bounded);

    if let Err(err) = bounded.try_push(10) {
        println!("{}", err);
    }
}
