//! Bounded lock-free ring queue with per-slot sequence numbers.
//!
//! Each slot carries its own sequence counter: a slot is writable when
//! `seq == pos` and readable when `seq == pos + 1`, with the counter
//! advancing by `capacity` per lap. The monotonic sequences make a global
//! read cursor unnecessary for gating writes and rule out ABA. Correct
//! under multiple producers and consumers; this crate drives each queue
//! with exactly one of each.
//!
//! `push`/`pop` never block and never retry past a lost CAS race; callers
//! own the backoff policy.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

struct Slot<T> {
    seq: AtomicUsize,
    data: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded MPMC ring of trivially copyable elements.
///
/// `T: Copy` is the element contract: payloads move by byte copy, so they
/// must carry no drop logic.
pub struct RingQueue<T> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    /// Consumer cursor. Padded so the two cursors never share a cache line.
    head: CachePadded<AtomicUsize>,
    /// Producer cursor.
    tail: CachePadded<AtomicUsize>,
}

unsafe impl<T: Copy + Send> Send for RingQueue<T> {}
unsafe impl<T: Copy + Send> Sync for RingQueue<T> {}

impl<T: Copy> RingQueue<T> {
    /// Create a queue holding at least `size` elements; capacity rounds up
    /// to the next power of two (minimum 2).
    pub fn new(size: usize) -> Self {
        let capacity = size.next_power_of_two().max(2);
        let slots = (0..capacity)
            .map(|i| Slot {
                seq: AtomicUsize::new(i),
                data: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();
        Self {
            slots,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueue one element. Returns `false` when the queue is full.
    pub fn push(&self, item: T) -> bool {
        let mut pos = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let dif = seq as isize - pos as isize;

            if dif == 0 {
                // Slot is writable at this lap; claim the position.
                match self.tail.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe { (*slot.data.get()).write(item) };
                        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
                        return true;
                    }
                    Err(current) => pos = current,
                }
            } else if dif < 0 {
                // Slot still holds an unconsumed element from the previous
                // lap: full.
                return false;
            } else {
                // Another producer advanced past us; refresh.
                pos = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Dequeue one element. Returns `None` when no committed element exists.
    pub fn pop(&self) -> Option<T> {
        let mut pos = self.head.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let dif = seq as isize - pos.wrapping_add(1) as isize;

            if dif == 0 {
                match self.head.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let item = unsafe { (*slot.data.get()).assume_init() };
                        // Re-arm the slot for the producer's next lap.
                        slot.seq
                            .store(pos.wrapping_add(self.mask + 1), Ordering::Release);
                        return Some(item);
                    }
                    Err(current) => pos = current,
                }
            } else if dif < 0 {
                return None;
            } else {
                pos = self.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Push elements in order until the first failure; returns how many
    /// went in. No rollback.
    pub fn push_batch(&self, items: &[T]) -> usize {
        for (i, &item) in items.iter().enumerate() {
            if !self.push(item) {
                return i;
            }
        }
        items.len()
    }

    /// Pop up to `out.len()` elements; returns how many came out.
    pub fn pop_batch(&self, out: &mut [T]) -> usize {
        for (i, slot) in out.iter_mut().enumerate() {
            match self.pop() {
                Some(item) => *slot = item,
                None => return i,
            }
        }
        out.len()
    }

    /// Snapshot of the element count. Exact only when producers and
    /// consumers are quiescent.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head).min(self.capacity())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Reset to the freshly-constructed state. Exclusive access makes this
    /// safe without any ordering concerns.
    pub fn clear(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            *slot.seq.get_mut() = i;
        }
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
    }
}
