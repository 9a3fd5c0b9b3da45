//! An indexable binary min-heap keyed by an `i64` priority.
//!
//! This is the queue of *buckets*, not of individual timers: [`crate::delay_queue::DelayQueue`]
//! pushes a bucket once, when its expiration first becomes due, and the heap only ever
//! needs to answer "what's the smallest expiration, and is it due yet". Capacity tracks
//! its own doubling/halving independently of `Vec`'s internal growth strategy so that
//! callers can rely on deterministic grow/shrink points.

struct Entry<T> {
    value: T,
    priority: i64,
}

pub struct PriorityQueue<T> {
    entries: Vec<Entry<T>>,
    cap: usize,
}

impl<T> PriorityQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1);
        Self {
            entries: Vec::with_capacity(cap),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Insert `value` at `priority`, returning the index it settled at. An index of `0`
    /// means this value is now the root (the smallest priority in the heap).
    pub fn push(&mut self, value: T, priority: i64) -> usize {
        if self.entries.len() == self.cap {
            self.grow();
        }
        self.entries.push(Entry { value, priority });
        let last = self.entries.len() - 1;
        self.sift_up(last)
    }

    /// Remove and return the minimum-priority element.
    pub fn pop(&mut self) -> Option<(T, i64)> {
        self.remove(0)
    }

    pub fn peek_priority(&self) -> Option<i64> {
        self.entries.first().map(|e| e.priority)
    }

    fn remove(&mut self, i: usize) -> Option<(T, i64)> {
        if i >= self.entries.len() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(i, last);
        let removed = self.entries.pop()?;
        self.maybe_shrink();
        if i < self.entries.len() {
            let settled = self.sift_up(i);
            self.sift_down(settled);
        }
        Some((removed.value, removed.priority))
    }

    /// If the minimum element is due (`priority <= max_priority`), pop and return it
    /// alongside a delay of `0`. Otherwise return `None` alongside how many milliseconds
    /// remain until it becomes due (`0` if the heap is empty, matching "wait indefinitely").
    pub fn peek_and_shift(&mut self, max_priority: i64) -> (Option<(T, i64)>, i64) {
        let top_priority = match self.entries.first() {
            None => return (None, 0),
            Some(e) => e.priority,
        };
        if top_priority > max_priority {
            return (None, top_priority - max_priority);
        }
        (self.remove(0), 0)
    }

    fn grow(&mut self) {
        self.cap = if self.cap == 0 { 1 } else { self.cap * 2 };
        let have = self.entries.capacity();
        if have < self.cap {
            self.entries.reserve_exact(self.cap - have);
        }
    }

    fn maybe_shrink(&mut self) {
        if self.cap > 1 && self.entries.len() < self.cap / 4 {
            self.cap /= 2;
            self.entries.shrink_to(self.cap);
        }
    }

    fn sift_up(&mut self, mut i: usize) -> usize {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.entries[i].priority < self.entries[parent].priority {
                self.entries.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
        i
    }

    fn sift_down(&mut self, mut i: usize) -> usize {
        let len = self.entries.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < len && self.entries[left].priority < self.entries[smallest].priority {
                smallest = left;
            }
            if right < len && self.entries[right].priority < self.entries[smallest].priority {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.entries.swap(i, smallest);
            i = smallest;
        }
        i
    }
}
