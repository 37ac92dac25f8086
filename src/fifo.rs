//! Thread-safe FIFO event queue (spec C2), ported from `original_source/src/fifo.c`.

use std::sync::{Condvar, Mutex};

/// Hard ceiling on FIFO capacity. Exceeding it is a programmer error: the
/// canvas event array this queue feeds is sized against this constant.
pub const MAX_FIFO_CAPACITY: usize = 1 << 16;

struct Inner<T> {
    items: Vec<Option<T>>,
    head: usize,
    tail: usize,
    is_empty: bool,
}

/// Bounded-then-growing blocking-dequeue queue of items of type `T`.
///
/// Mirrors `DvzFifo`: full triggers a capacity doubling, and if the logical
/// data wrapped around the end of the backing array, the wrapped prefix is
/// relocated into the newly-grown space so FIFO order is preserved without
/// touching `tail`.
pub struct Fifo<T> {
    inner: Mutex<Inner<T>>,
    cond: Condvar,
}

impl<T> Fifo<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "FIFO capacity must be at least 2");
        assert!(
            capacity <= MAX_FIFO_CAPACITY,
            "FIFO capacity {capacity} exceeds hard maximum {MAX_FIFO_CAPACITY}"
        );
        let mut items = Vec::with_capacity(capacity);
        items.resize_with(capacity, || None);
        Self {
            inner: Mutex::new(Inner {
                items,
                head: 0,
                tail: 0,
                is_empty: true,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn enqueue(&self, item: T) {
        let mut inner = self.inner.lock().unwrap();

        let old_cap = inner.items.len();
        let size = Self::size_of(&inner);

        if (inner.head + 1) % old_cap == inner.tail {
            assert!(
                old_cap * 2 <= MAX_FIFO_CAPACITY,
                "FIFO would exceed hard maximum {MAX_FIFO_CAPACITY} capacity"
            );
            log::debug!("FIFO queue is full, enlarging it to {}", old_cap * 2);
            let new_cap = old_cap * 2;
            inner.items.resize_with(new_cap, || None);

            if (inner.head + 1) % new_cap == inner.tail {
                // Data wrapped: relocate the prefix [0, head) into the freshly
                // grown tail of the buffer so the logical order is preserved.
                let head = inner.head;
                for i in 0..head {
                    let moved = inner.items[i].take();
                    inner.items[old_cap + i] = moved;
                }
                inner.head += old_cap;
                debug_assert_eq!(Self::size_of(&inner), size);
            }
        }

        let head = inner.head;
        let cap = inner.items.len();
        inner.items[head] = Some(item);
        inner.head = (head + 1) % cap;
        inner.is_empty = false;

        debug_assert!(inner.head < cap);
        self.cond.notify_one();
    }

    pub fn dequeue(&self, wait: bool) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();

        if wait {
            while inner.head == inner.tail && inner.is_empty {
                inner = self.cond.wait(inner).unwrap();
            }
        }

        if inner.head == inner.tail && inner.is_empty {
            return None;
        }

        let tail = inner.tail;
        let cap = inner.items.len();
        let item = inner.items[tail].take();
        inner.tail = (tail + 1) % cap;
        if inner.head == inner.tail {
            inner.is_empty = true;
        }
        item
    }

    pub fn size(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        Self::size_of(&inner)
    }

    fn size_of(inner: &Inner<T>) -> usize {
        if inner.is_empty {
            return 0;
        }
        let cap = inner.items.len();
        let mut size = inner.head as isize - inner.tail as isize;
        if size <= 0 {
            size += cap as isize;
        }
        size as usize
    }

    /// Drop oldest items until `size() <= max_size`.
    pub fn discard(&self, max_size: usize) {
        if max_size == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        let cap = inner.items.len();
        let size = Self::size_of(&inner);
        if size > max_size {
            log::trace!(
                "discarding {} items in the FIFO queue which is getting overloaded",
                size - max_size
            );
            let mut new_tail = inner.head as isize - max_size as isize;
            if new_tail < 0 {
                new_tail += cap as isize;
            }
            // Drop the skipped-over items so they don't leak.
            let mut t = inner.tail;
            while t != new_tail as usize {
                inner.items[t] = None;
                t = (t + 1) % cap;
            }
            inner.tail = new_tail as usize;
            inner.is_empty = inner.head == inner.tail;
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        for slot in inner.items.iter_mut() {
            *slot = None;
        }
        inner.head = 0;
        inner.tail = 0;
        inner.is_empty = true;
        self.cond.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_then_dequeue_is_fifo_order() {
        let fifo = Fifo::new(4);
        fifo.enqueue(1);
        fifo.enqueue(2);
        assert_eq!(fifo.dequeue(false), Some(1));
        assert_eq!(fifo.dequeue(false), Some(2));
        assert_eq!(fifo.dequeue(false), None);
    }

    #[test]
    fn dequeue_non_waiting_on_empty_returns_none_without_blocking() {
        let fifo: Fifo<i32> = Fifo::new(2);
        assert_eq!(fifo.dequeue(false), None);
    }

    #[test]
    fn grows_exactly_once_and_preserves_order_across_the_grow() {
        // Scenario 4 from spec.md: initial capacity 2, enqueue a, b (full),
        // enqueue c triggers grow to 4, then dequeue returns a, b, c in order.
        let fifo = Fifo::new(2);
        fifo.enqueue("a");
        fifo.enqueue("b");
        fifo.enqueue("c");
        assert_eq!(fifo.dequeue(false), Some("a"));
        assert_eq!(fifo.dequeue(false), Some("b"));
        assert_eq!(fifo.dequeue(false), Some("c"));
        assert_eq!(fifo.size(), 0);
    }

    #[test]
    fn grow_preserves_order_when_head_has_wrapped() {
        let fifo = Fifo::new(4);
        // Fill and drain so head/tail sit mid-buffer before we force a grow.
        fifo.enqueue(1);
        fifo.enqueue(2);
        assert_eq!(fifo.dequeue(false), Some(1));
        assert_eq!(fifo.dequeue(false), Some(2));
        fifo.enqueue(3);
        fifo.enqueue(4);
        fifo.enqueue(5); // head wraps past index 0 here
        fifo.enqueue(6); // queue full at capacity 4, triggers grow to 8
        assert_eq!(fifo.dequeue(false), Some(3));
        assert_eq!(fifo.dequeue(false), Some(4));
        assert_eq!(fifo.dequeue(false), Some(5));
        assert_eq!(fifo.dequeue(false), Some(6));
    }

    #[test]
    fn reset_empties_the_queue() {
        let fifo = Fifo::new(4);
        fifo.enqueue(1);
        fifo.enqueue(2);
        fifo.reset();
        assert_eq!(fifo.size(), 0);
        assert_eq!(fifo.dequeue(false), None);
    }

    #[test]
    fn discard_drops_oldest_items() {
        let fifo = Fifo::new(8);
        for i in 0..5 {
            fifo.enqueue(i);
        }
        fifo.discard(2);
        assert_eq!(fifo.size(), 2);
        assert_eq!(fifo.dequeue(false), Some(3));
        assert_eq!(fifo.dequeue(false), Some(4));
    }

    #[test]
    fn size_bounds_hold() {
        let fifo = Fifo::new(4);
        assert_eq!(fifo.size(), 0);
        fifo.enqueue(1);
        fifo.enqueue(2);
        assert!(fifo.size() <= 3);
    }
}
