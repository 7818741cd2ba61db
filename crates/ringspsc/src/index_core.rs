//! Unified ring-core index algebra: head/tail sequence counters, the
//! producer/consumer shadow-cache fast path, occupancy queries and the
//! non-concurrent advancement/resync primitives.
//!
//! A single generic type serves both the static and dynamic containers.
//! Capacity/mask are always stored at runtime (in `P::Geometry` cells); for
//! "static" container use they are set exactly once at construction via
//! [`IndexCore::new`] and never touched again (`resize` is only reachable on
//! the dynamic forms). This is a deliberate simplification over mirroring
//! the source's two parallel template specializations on `Capacity == 0` -
//! see `DESIGN.md`. Storage itself (inline const-generic array vs. heap
//! allocation) stays a container-level distinction, matching the source's
//! real `Ring<T>` (heap) vs `StackRing<T, const N: usize>` (inline) split.

use crate::geometry::{is_pow2, next_pow2_clamped};
use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_monotonic,
    debug_assert_no_wrap,
};
use crate::policy::Policy;

/// Head/tail sequence counters plus the producer/consumer shadow caches and
/// capacity/mask geometry, generic over a [`Policy`].
pub struct IndexCore<P: Policy> {
    /// Advanced by the producer after publishing new slots.
    head: P::Counter,
    /// Advanced by the consumer after popping slots.
    tail: P::Counter,
    /// Producer-owned cached view of `tail` (written only by the producer).
    shadow_tail: P::Counter,
    /// Consumer-owned cached view of `head` (written only by the consumer).
    shadow_head: P::Counter,
    capacity: P::Geometry,
    mask: P::Geometry,
}

impl<P: Policy> IndexCore<P> {
    /// Builds a core for the given capacity. `capacity = 0` marks an
    /// invalid/uninitialized container (dynamic form, pre-`init`).
    pub fn new(capacity: u64) -> Self {
        let c = next_pow2_clamped(capacity);
        debug_assert!(c == 0 || is_pow2(c));
        Self {
            head: P::Counter::new(0),
            tail: P::Counter::new(0),
            shadow_tail: P::Counter::new(0),
            shadow_head: P::Counter::new(0),
            capacity: P::Geometry::new(c),
            mask: P::Geometry::new(c.wrapping_sub(1)),
        }
    }

    /// Re-initializes geometry and indices directly (non-concurrent only):
    /// used by `resize`, `swap`, `move`, `clear`. Re-syncs both shadows.
    pub fn init(&self, capacity: u64, head: u64, tail: u64) {
        let c = next_pow2_clamped(capacity);
        self.capacity.store(c);
        self.mask.store(c.wrapping_sub(1));
        self.head.store(head);
        self.tail.store(tail);
        self.sync_cache();
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity.load()
    }

    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask.load()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.capacity() != 0
    }

    #[inline]
    pub fn head(&self) -> u64 {
        self.head.load()
    }

    #[inline]
    pub fn tail(&self) -> u64 {
        self.tail.load()
    }

    #[inline]
    pub fn write_index(&self) -> usize {
        (self.head() & self.mask()) as usize
    }

    #[inline]
    pub fn read_index(&self) -> usize {
        (self.tail() & self.mask()) as usize
    }

    /// Contiguous run length available from the head to the end of the
    /// backing array, used for wrap-split bulk writes.
    #[inline]
    pub fn write_run(&self) -> usize {
        self.capacity() as usize - self.write_index()
    }

    /// Contiguous run length available from the tail to the end of the
    /// backing array, used for wrap-split bulk reads.
    #[inline]
    pub fn read_run(&self) -> usize {
        self.capacity() as usize - self.read_index()
    }

    /// Double-load with one retry, reporting `None` if still observed
    /// inconsistent (`used > capacity`, only possible from a torn
    /// cross-thread observation of head and tail at different times).
    fn used_checked(&self) -> Option<u64> {
        let cap = self.capacity();
        let used = self.head().wrapping_sub(self.tail());
        if used <= cap {
            return Some(used);
        }
        let used2 = self.head().wrapping_sub(self.tail());
        if used2 <= cap {
            Some(used2)
        } else {
            None
        }
    }

    /// Current occupancy. Reports `0` (favors "empty") on persistent
    /// transient inconsistency.
    #[inline]
    pub fn size(&self) -> u64 {
        self.used_checked().unwrap_or(0)
    }

    /// Current free space. Reports `0` (favors "full") on persistent
    /// transient inconsistency.
    #[inline]
    pub fn free(&self) -> u64 {
        match self.used_checked() {
            Some(used) => self.capacity() - used,
            None => 0,
        }
    }

    #[inline]
    pub fn empty(&self) -> bool {
        self.size() == 0
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.size() >= self.capacity()
    }

    #[inline]
    pub fn can_read(&self, n: u64) -> bool {
        if n == 0 {
            return true;
        }
        if n > self.capacity() {
            return false;
        }
        self.size() >= n
    }

    #[inline]
    pub fn can_write(&self, n: u64) -> bool {
        if n == 0 {
            return true;
        }
        if n > self.capacity() {
            return false;
        }
        self.free() >= n
    }

    /// Producer-side "is there room for n" check. Consults the producer's
    /// own cached view of tail first; a stale `shadow_tail <= tail` can only
    /// under-estimate free space, never over-estimate it, so the fast path
    /// never needs retry logic. Refreshes the shadow on a cache miss.
    #[inline]
    pub fn producer_can_write(&self, n: u64) -> bool {
        if n == 0 {
            return true;
        }
        if n > self.capacity() {
            return false;
        }
        if !P::SHADOW_CAPABLE {
            return self.can_write(n);
        }
        let head = self.head();
        let cached_tail = self.shadow_tail.load();
        let free_est = self.capacity() - head.wrapping_sub(cached_tail);
        if free_est >= n {
            return true;
        }
        let tail = self.tail();
        self.shadow_tail.store(tail);
        self.capacity() - head.wrapping_sub(tail) >= n
    }

    /// Consumer-side "is there n to read" check, mirroring
    /// [`Self::producer_can_write`] with the roles reversed.
    #[inline]
    pub fn consumer_can_read(&self, n: u64) -> bool {
        if n == 0 {
            return true;
        }
        if n > self.capacity() {
            return false;
        }
        if !P::SHADOW_CAPABLE {
            return self.can_read(n);
        }
        let tail = self.tail();
        let cached_head = self.shadow_head.load();
        let avail_est = cached_head.wrapping_sub(tail);
        if avail_est >= n {
            return true;
        }
        let head = self.head();
        self.shadow_head.store(head);
        head.wrapping_sub(tail) >= n
    }

    /// Advances head by `n` (producer-only). Asserts bounded count and
    /// monotonic progress in debug builds.
    #[inline]
    pub fn advance_head(&self, n: u64) {
        let head = self.head();
        let new_head = head.wrapping_add(n);
        let tail = self.tail();

        debug_assert_bounded_count!(new_head.wrapping_sub(tail), self.capacity());
        debug_assert_monotonic!("head", head, new_head);
        debug_assert_no_wrap!("head", head, new_head);

        self.head.store(new_head);
    }

    /// Advances tail by `n` (consumer-only). Asserts tail never passes head.
    #[inline]
    pub fn advance_tail(&self, n: u64) {
        let tail = self.tail();
        let new_tail = tail.wrapping_add(n);
        let head = self.head();

        debug_assert_head_not_past_tail!(new_tail, head);
        debug_assert_monotonic!("tail", tail, new_tail);

        self.tail.store(new_tail);
    }

    /// Consumer's "consume all": tail := head. Touches only the
    /// consumer-owned shadow.
    pub fn sync_tail_to_head(&self) {
        let head = self.head();
        self.tail.store(head);
        self.shadow_head.store(head);
    }

    /// Producer's "drop unread": head := tail. May decrease head.
    /// Non-concurrent only: any concurrent consumer observation during this
    /// call is undefined.
    pub fn sync_head_to_tail(&self) {
        let tail = self.tail();
        self.head.store(tail);
        self.shadow_tail.store(tail);
    }

    /// Resets counters and both shadows to zero. Non-concurrent.
    pub fn clear(&self) {
        self.head.store(0);
        self.tail.store(0);
        self.shadow_tail.store(0);
        self.shadow_head.store(0);
    }

    /// Re-syncs both shadow caches from the live counters. Must be called
    /// after any non-concurrent mutation of head/tail from outside the
    /// normal advance path (restore, move, swap) - otherwise a stale shadow
    /// can under-report free space and allow an overwrite of a live slot.
    pub fn sync_cache(&self) {
        self.shadow_tail.store(self.tail());
        self.shadow_head.store(self.head());
    }
}
