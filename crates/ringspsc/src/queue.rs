//! FIFO queue containers: `Queue<T, P>` (dynamic, heap-backed) and
//! `StaticQueue<T, C, P>` (const-generic, inline-array-backed). Both manage
//! object lifetime by placement construction on publish and explicit
//! destruction on pop/clear/destroy, mirroring the source's `Ring<T>` /
//! `StackRing<T, N>` split rather than unifying storage behind one generic
//! type.

use crate::alloc::{GlobalAlloc, RawAlloc};
use crate::error::ResizeError;
use crate::index_core::IndexCore;
use crate::invariants::debug_assert_initialized_read;
use crate::policy::{DefaultPolicy, Policy};
use crate::snapshot::{self, Snapshot};
use std::alloc::Layout;
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ops::Index;
use std::ptr::{self, NonNull};

// ============================================================================
// Dynamic queue
// ============================================================================

/// Dynamic-capacity FIFO queue. Invalid (capacity 0) until [`Queue::init`].
pub struct Queue<T, P: Policy = DefaultPolicy, A: RawAlloc = GlobalAlloc> {
    core: IndexCore<P>,
    buffer: UnsafeCell<Option<NonNull<MaybeUninit<T>>>>,
    alloc: A,
}

unsafe impl<T: Send, P: Policy, A: RawAlloc> Send for Queue<T, P, A> {}
unsafe impl<T: Send, P: Policy, A: RawAlloc> Sync for Queue<T, P, A> {}

impl<T, P: Policy, A: RawAlloc> Queue<T, P, A> {
    /// Creates an invalid (uninitialized) queue. Call [`Self::init`] before use.
    pub fn new() -> Self {
        Self {
            core: IndexCore::new(0),
            buffer: UnsafeCell::new(None),
            alloc: A::default(),
        }
    }

    /// Allocates storage for `depth` slots (coerced to a power of two) and
    /// makes the queue operational. No-op if already at this capacity.
    pub fn init(&mut self, depth: usize) -> Result<(), ResizeError> {
        if self.core.is_valid() {
            return self.resize(depth);
        }
        let target = crate::geometry::next_pow2_clamped(depth as u64) as usize;
        if target == 0 {
            return Ok(());
        }
        let layout = Layout::array::<MaybeUninit<T>>(target).expect("layout overflow");
        let ptr = self
            .alloc
            .alloc(layout)
            .ok_or_else(|| {
                tracing::warn!(requested = target, bytes = layout.size(), "queue init allocation failed");
                ResizeError::Alloc {
                    requested: target,
                    layout_bytes: layout.size(),
                }
            })?
            .cast::<MaybeUninit<T>>();
        unsafe { *self.buffer.get() = Some(ptr) };
        self.core.init(target as u64, 0, 0);
        tracing::debug!(capacity = target, "queue initialized");
        Ok(())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.core.capacity() as usize
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.core.is_valid()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.core.size() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.core.empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.core.full()
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.core.free() as usize
    }

    #[inline]
    pub fn can_write(&self, n: usize) -> bool {
        self.core.producer_can_write(n as u64)
    }

    #[inline]
    pub fn can_read(&self, n: usize) -> bool {
        self.core.consumer_can_read(n as u64)
    }

    #[inline]
    fn slot_ptr(&self, idx: usize) -> *mut MaybeUninit<T> {
        // SAFETY: buffer is only replaced non-concurrently (init/resize/destroy).
        let base = unsafe { (*self.buffer.get()).expect("queue not initialized") };
        unsafe { base.as_ptr().add(idx) }
    }

    // -- producer --------------------------------------------------------

    /// Returns a pointer to the uninitialized slot at the write index, or
    /// `None` if full. The caller must construct `T` before [`Self::publish`].
    pub fn try_claim(&self) -> Option<*mut MaybeUninit<T>> {
        if !self.core.is_valid() || !self.core.producer_can_write(1) {
            return None;
        }
        Some(self.slot_ptr(self.core.write_index()))
    }

    /// Advances head by one, publishing the slot filled by `try_claim`.
    pub fn publish(&self) {
        self.core.advance_head(1);
    }

    pub fn try_push(&self, value: T) -> bool {
        match self.try_claim() {
            Some(slot) => {
                unsafe { ptr::write(slot, MaybeUninit::new(value)) };
                self.publish();
                true
            }
            None => false,
        }
    }

    /// Up to two contiguous uninitialized regions covering `min(free, max)`
    /// slots, for bulk wrap-split writes. The caller must construct every
    /// returned slot and then call [`Self::publish_n`] with the total.
    pub fn claim_write(&self, max: usize) -> (&mut [MaybeUninit<T>], &mut [MaybeUninit<T>]) {
        let avail = self.free().min(max);
        if avail == 0 {
            return (&mut [], &mut []);
        }
        let idx = self.core.write_index();
        let run = self.core.write_run().min(avail);
        let rest = avail - run;
        unsafe {
            let base = (*self.buffer.get()).expect("queue not initialized").as_ptr();
            let first = std::slice::from_raw_parts_mut(base.add(idx), run);
            let second = std::slice::from_raw_parts_mut(base, rest);
            (first, second)
        }
    }

    pub fn try_publish_n(&self, n: usize) -> bool {
        if !self.core.producer_can_write(n as u64) {
            return false;
        }
        self.core.advance_head(n as u64);
        true
    }

    /// Spins (via [`crate::backoff::Backoff`]) until a slot is free, then
    /// publishes `value`. Never blocks on an OS primitive; gives up the
    /// thread once the backoff escalates past spinning. Only sensible
    /// against a live consumer - with none, this spins for the full backoff
    /// schedule and then keeps yielding forever.
    pub fn push_with_backoff(&self, value: T) {
        let mut backoff = crate::backoff::Backoff::new();
        let slot = loop {
            if let Some(slot) = self.try_claim() {
                break slot;
            }
            backoff.snooze();
        };
        unsafe { ptr::write(slot, MaybeUninit::new(value)) };
        self.publish();
    }

    /// Spins until an element is available, then pops it.
    pub fn pop_with_backoff(&self) -> T {
        let mut backoff = crate::backoff::Backoff::new();
        loop {
            if let Some(value) = self.try_pop() {
                return value;
            }
            backoff.snooze();
        }
    }

    // -- consumer --------------------------------------------------------

    /// Pointer to the live element at the read index, or `None` if empty.
    pub fn try_front(&self) -> Option<&T> {
        if !self.core.is_valid() || !self.core.consumer_can_read(1) {
            return None;
        }
        let idx = self.core.read_index();
        debug_assert_initialized_read!(self.core.tail(), self.core.tail(), self.core.head());
        Some(unsafe { (*self.slot_ptr(idx)).assume_init_ref() })
    }

    pub fn try_pop(&self) -> Option<T> {
        if !self.core.is_valid() || !self.core.consumer_can_read(1) {
            return None;
        }
        let idx = self.core.read_index();
        let value = unsafe { ptr::read(self.slot_ptr(idx)).assume_init() };
        self.core.advance_tail(1);
        Some(value)
    }

    /// Up to two contiguous initialized regions spanning at most `max`
    /// live elements, for bulk wrap-split reads; does not advance tail.
    pub fn claim_read(&self, max: usize) -> (&[T], &[T]) {
        let avail = self.len().min(max);
        if avail == 0 {
            return (&[], &[]);
        }
        let idx = self.core.read_index();
        let run = self.core.read_run().min(avail);
        let rest = avail - run;
        unsafe {
            let base = (*self.buffer.get())
                .expect("queue not initialized")
                .as_ptr()
                .cast_const()
                .cast::<T>();
            let first = std::slice::from_raw_parts(base.add(idx), run);
            let second = std::slice::from_raw_parts(base, rest);
            (first, second)
        }
    }

    /// Destroys and advances past up to `n` live elements. Returns the
    /// number actually popped.
    pub fn pop_n(&self, n: usize) -> usize {
        let avail = self.len().min(n);
        for _ in 0..avail {
            let idx = self.core.read_index();
            unsafe { ptr::drop_in_place(self.slot_ptr(idx).cast::<T>()) };
            self.core.advance_tail(1);
        }
        avail
    }

    pub fn make_snapshot(&self) -> Snapshot {
        snapshot::capture(&self.core)
    }

    /// Pops exactly the range captured by `snap`, asserting the consumer
    /// hasn't advanced independently.
    pub fn consume(&self, snap: &Snapshot) {
        assert!(snapshot::validate_consume(snap, &self.core));
        self.pop_n(snap.len() as usize);
    }

    pub fn try_consume(&self, snap: &Snapshot) -> bool {
        if !snapshot::validate_consume(snap, &self.core) {
            return false;
        }
        self.pop_n(snap.len() as usize);
        true
    }

    /// Destroys all live elements and advances tail to head.
    pub fn consume_all(&self) {
        let n = self.len();
        self.pop_n(n);
        self.core.sync_tail_to_head();
    }

    /// Destroys all live elements and resets indices. Keeps allocation.
    pub fn clear(&self) {
        self.consume_all();
        self.core.clear();
    }

    /// Clears then releases the allocation, returning the queue to invalid.
    pub fn destroy(&mut self) {
        if !self.core.is_valid() {
            return;
        }
        self.clear();
        let cap = self.capacity();
        let layout = Layout::array::<MaybeUninit<T>>(cap).expect("layout overflow");
        if let Some(ptr) = unsafe { (*self.buffer.get()).take() } {
            unsafe { self.alloc.dealloc(ptr.cast::<u8>(), layout) };
        }
        self.core.init(0, 0, 0);
        tracing::debug!(capacity = cap, "queue destroyed");
    }

    /// Grows the queue to `depth` (coerced to a power of two), migrating
    /// live elements in logical order. Never shrinks a valid, non-empty
    /// request (depth = 0 destroys instead); same-capacity request is a
    /// no-op.
    pub fn resize(&mut self, depth: usize) -> Result<(), ResizeError> {
        if depth == 0 {
            self.destroy();
            return Ok(());
        }
        let target = crate::geometry::next_pow2_clamped(depth as u64) as usize;
        let current = self.capacity();
        if target == current {
            return Ok(());
        }
        if target < current {
            return Err(ResizeError::ShrinkNotSupported {
                current,
                requested: target,
            });
        }

        let layout = Layout::array::<MaybeUninit<T>>(target).expect("layout overflow");
        let new_ptr = self
            .alloc
            .alloc(layout)
            .ok_or_else(|| {
                tracing::warn!(requested = target, bytes = layout.size(), "queue resize allocation failed");
                ResizeError::Alloc {
                    requested: target,
                    layout_bytes: layout.size(),
                }
            })?
            .cast::<MaybeUninit<T>>();

        let used = self.len();
        let old_base = unsafe { (*self.buffer.get()).expect("queue not initialized").as_ptr() };
        for i in 0..used {
            let idx = self.core.read_index().wrapping_add(i) & (current - 1);
            unsafe {
                let v = ptr::read(old_base.add(idx));
                ptr::write(new_ptr.as_ptr().add(i), v);
            }
        }
        let old_layout = Layout::array::<MaybeUninit<T>>(current).expect("layout overflow");
        unsafe {
            self.alloc
                .dealloc(NonNull::new_unchecked(old_base).cast::<u8>(), old_layout);
            *self.buffer.get() = Some(new_ptr);
        }
        self.core.init(target as u64, used as u64, 0);
        tracing::debug!(from = current, to = target, "queue resized");
        Ok(())
    }

    /// Opens a bulk write scope over up to `max` slots (clamped to current
    /// free space). Nothing is published until [`WriteGuard::commit`]; a
    /// guard dropped or cancelled without committing destroys whatever it
    /// constructed and leaves the queue otherwise untouched.
    pub fn write_guard(&self, max: usize) -> WriteGuard<'_, T, P, A> {
        let claimed = self.free().min(max);
        WriteGuard {
            queue: self,
            start_head: self.core.head(),
            max: claimed,
            written: 0,
            armed: false,
        }
    }

    /// Opens a bulk read scope over up to `max` live elements. Nothing is
    /// popped until [`ReadGuard::commit`]; a guard dropped or cancelled
    /// without committing leaves the queue untouched.
    pub fn read_guard(&self, max: usize) -> ReadGuard<'_, T, P, A> {
        let claimed = self.len().min(max);
        ReadGuard {
            queue: self,
            start_tail: self.core.tail(),
            max: claimed,
            consumed: 0,
            armed: false,
        }
    }

    /// Consumer-side iterator over the window `[tail, head)` captured at
    /// call time; later pushes or pops are not reflected.
    pub fn iter(&self) -> Iter<'_, T> {
        let base = unsafe {
            (*self.buffer.get())
                .map_or(ptr::null(), |b| b.as_ptr().cast_const().cast::<T>())
        };
        Iter {
            base,
            mask: self.core.mask(),
            pos: self.core.tail(),
            end: self.core.head(),
            _marker: PhantomData,
        }
    }
}

impl<T, P: Policy, A: RawAlloc> Index<usize> for Queue<T, P, A> {
    type Output = T;

    /// Random access into the live window `[tail, tail + len)`. Panics if
    /// `i` is out of range.
    fn index(&self, i: usize) -> &T {
        assert!(i < self.len(), "index {i} out of bounds for queue of len {}", self.len());
        let idx = ((self.core.tail().wrapping_add(i as u64)) & self.core.mask()) as usize;
        unsafe { (*self.slot_ptr(idx)).assume_init_ref() }
    }
}

/// Structured bulk-write scope opened by [`Queue::write_guard`]. Claims up
/// to `max` slots at construction; [`Self::emplace_next`] constructs them
/// one at a time. [`Self::commit`] publishes exactly the constructed
/// prefix. Dropping or [`Self::cancel`]ing without committing destroys any
/// already-constructed slots and advances nothing. Must not outlive the
/// queue it was opened from.
pub struct WriteGuard<'a, T, P: Policy, A: RawAlloc> {
    queue: &'a Queue<T, P, A>,
    start_head: u64,
    max: usize,
    written: usize,
    armed: bool,
}

impl<'a, T, P: Policy, A: RawAlloc> WriteGuard<'a, T, P, A> {
    /// Total slots claimed by this guard (the `max` passed to `write_guard`,
    /// clamped to free space at claim time).
    pub fn available(&self) -> usize {
        self.max
    }

    /// Number of slots constructed so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Constructs `value` into the next claimed slot. Returns `false`
    /// without touching the queue once `available()` slots are used.
    pub fn emplace_next(&mut self, value: T) -> bool {
        if self.written >= self.max {
            return false;
        }
        let mask = self.queue.core.mask();
        let idx = (self.start_head.wrapping_add(self.written as u64) & mask) as usize;
        unsafe { ptr::write(self.queue.slot_ptr(idx), MaybeUninit::new(value)) };
        self.written += 1;
        true
    }

    /// Publishes exactly the constructed prefix, returning its length.
    pub fn commit(mut self) -> usize {
        let n = self.written;
        self.queue.core.advance_head(n as u64);
        self.armed = true;
        n
    }

    /// Destroys whatever has been constructed so far without publishing
    /// any of it. Equivalent to dropping the guard.
    pub fn cancel(self) {}
}

impl<'a, T, P: Policy, A: RawAlloc> Drop for WriteGuard<'a, T, P, A> {
    fn drop(&mut self) {
        if self.armed {
            return;
        }
        let mask = self.queue.core.mask();
        for i in 0..self.written {
            let idx = (self.start_head.wrapping_add(i as u64) & mask) as usize;
            unsafe { ptr::drop_in_place(self.queue.slot_ptr(idx).cast::<T>()) };
        }
    }
}

/// Structured bulk-read scope opened by [`Queue::read_guard`]. Claims up to
/// `max` live elements at construction without touching the queue;
/// [`Self::commit`] pops exactly the elements visited via
/// [`Self::consume_next`]. Dropping or [`Self::cancel`]ing without
/// committing leaves the queue untouched. Must not outlive the queue it was
/// opened from.
pub struct ReadGuard<'a, T, P: Policy, A: RawAlloc> {
    queue: &'a Queue<T, P, A>,
    start_tail: u64,
    max: usize,
    consumed: usize,
    armed: bool,
}

impl<'a, T, P: Policy, A: RawAlloc> ReadGuard<'a, T, P, A> {
    /// Total live elements claimed by this guard.
    pub fn available(&self) -> usize {
        self.max
    }

    /// Advances to and returns the next claimed element without popping it.
    pub fn consume_next(&mut self) -> Option<&T> {
        if self.consumed >= self.max {
            return None;
        }
        let mask = self.queue.core.mask();
        let idx = (self.start_tail.wrapping_add(self.consumed as u64) & mask) as usize;
        self.consumed += 1;
        Some(unsafe { (*self.queue.slot_ptr(idx)).assume_init_ref() })
    }

    /// Up to two contiguous spans covering the full claimed range, for bulk
    /// inspection without advancing the guard's own cursor.
    pub fn spans(&self) -> (&[T], &[T]) {
        if self.max == 0 {
            return (&[], &[]);
        }
        let cap = self.queue.capacity();
        let start_idx = (self.start_tail & self.queue.core.mask()) as usize;
        let run = (cap - start_idx).min(self.max);
        let rest = self.max - run;
        unsafe {
            let base = (*self.queue.buffer.get())
                .expect("queue not initialized")
                .as_ptr()
                .cast_const()
                .cast::<T>();
            let first = std::slice::from_raw_parts(base.add(start_idx), run);
            let second = std::slice::from_raw_parts(base, rest);
            (first, second)
        }
    }

    /// Pops exactly the prefix visited via [`Self::consume_next`], returning
    /// its length.
    pub fn commit(mut self) -> usize {
        let n = self.consumed;
        self.queue.pop_n(n);
        self.armed = true;
        n
    }

    /// Leaves the queue untouched. Equivalent to dropping the guard.
    pub fn cancel(self) {}
}

/// Consumer-side iterator over a `[tail, head)` window captured at
/// construction time, returned by [`Queue::iter`] and [`StaticQueue::iter`].
pub struct Iter<'a, T> {
    base: *const T,
    mask: u64,
    pos: u64,
    end: u64,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.pos >= self.end {
            return None;
        }
        let idx = (self.pos & self.mask) as usize;
        self.pos += 1;
        Some(unsafe { &*self.base.add(idx) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.pos) as usize;
        (remaining, Some(remaining))
    }
}

impl<T, P: Policy, A: RawAlloc> Default for Queue<T, P, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P: Policy, A: RawAlloc> Drop for Queue<T, P, A> {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ============================================================================
// Static queue
// ============================================================================

/// Static-capacity FIFO queue with inline, const-generic storage. `C` must
/// be a power of two.
pub struct StaticQueue<T, const C: usize, P: Policy = DefaultPolicy> {
    core: IndexCore<P>,
    buffer: UnsafeCell<[MaybeUninit<T>; C]>,
}

unsafe impl<T: Send, const C: usize, P: Policy> Send for StaticQueue<T, C, P> {}
unsafe impl<T: Send, const C: usize, P: Policy> Sync for StaticQueue<T, C, P> {}

impl<T, const C: usize, P: Policy> StaticQueue<T, C, P> {
    pub fn new() -> Self {
        assert!(crate::geometry::is_pow2(C as u64), "capacity must be a power of two");
        Self {
            core: IndexCore::new(C as u64),
            buffer: UnsafeCell::new(std::array::from_fn(|_| MaybeUninit::uninit())),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        C
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.core.size() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.core.empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.core.full()
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.core.free() as usize
    }

    #[inline]
    fn slot_ptr(&self, idx: usize) -> *mut MaybeUninit<T> {
        unsafe { (*self.buffer.get()).as_mut_ptr().add(idx) }
    }

    pub fn try_claim(&self) -> Option<*mut MaybeUninit<T>> {
        if !self.core.producer_can_write(1) {
            return None;
        }
        Some(self.slot_ptr(self.core.write_index()))
    }

    pub fn publish(&self) {
        self.core.advance_head(1);
    }

    pub fn try_push(&self, value: T) -> bool {
        match self.try_claim() {
            Some(slot) => {
                unsafe { ptr::write(slot, MaybeUninit::new(value)) };
                self.publish();
                true
            }
            None => false,
        }
    }

    pub fn try_front(&self) -> Option<&T> {
        if !self.core.consumer_can_read(1) {
            return None;
        }
        let idx = self.core.read_index();
        Some(unsafe { (*self.slot_ptr(idx)).assume_init_ref() })
    }

    pub fn try_pop(&self) -> Option<T> {
        if !self.core.consumer_can_read(1) {
            return None;
        }
        let idx = self.core.read_index();
        let value = unsafe { ptr::read(self.slot_ptr(idx)).assume_init() };
        self.core.advance_tail(1);
        Some(value)
    }

    pub fn make_snapshot(&self) -> Snapshot {
        snapshot::capture(&self.core)
    }

    pub fn try_consume(&self, snap: &Snapshot) -> bool {
        if !snapshot::validate_consume(snap, &self.core) {
            return false;
        }
        for _ in 0..snap.len() {
            let idx = self.core.read_index();
            unsafe { ptr::drop_in_place(self.slot_ptr(idx).cast::<T>()) };
            self.core.advance_tail(1);
        }
        true
    }

    pub fn consume_all(&self) {
        while self.try_pop().is_some() {}
    }

    pub fn clear(&self) {
        self.consume_all();
        self.core.clear();
    }

    /// Swaps contents with `other` (non-concurrent only): swaps raw storage
    /// and re-syncs both shadow caches to the newly-adopted head/tail.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self.buffer.get_mut(), other.buffer.get_mut());
        let (sc, sh, st) = (self.core.capacity(), self.core.head(), self.core.tail());
        let (oc, oh, ot) = (other.core.capacity(), other.core.head(), other.core.tail());
        self.core.init(oc, oh, ot);
        other.core.init(sc, sh, st);
    }

    /// Opens a bulk write scope over up to `max` slots, mirroring
    /// [`Queue::write_guard`].
    pub fn write_guard(&self, max: usize) -> StaticWriteGuard<'_, T, C, P> {
        let claimed = self.free().min(max);
        StaticWriteGuard {
            queue: self,
            start_head: self.core.head(),
            max: claimed,
            written: 0,
            armed: false,
        }
    }

    /// Opens a bulk read scope over up to `max` live elements, mirroring
    /// [`Queue::read_guard`].
    pub fn read_guard(&self, max: usize) -> StaticReadGuard<'_, T, C, P> {
        let claimed = self.len().min(max);
        StaticReadGuard {
            queue: self,
            start_tail: self.core.tail(),
            max: claimed,
            consumed: 0,
            armed: false,
        }
    }

    /// Consumer-side iterator over the window `[tail, head)` captured at
    /// call time.
    pub fn iter(&self) -> Iter<'_, T> {
        let base = unsafe { (*self.buffer.get()).as_ptr().cast::<T>() };
        Iter {
            base,
            mask: self.core.mask(),
            pos: self.core.tail(),
            end: self.core.head(),
            _marker: PhantomData,
        }
    }
}

impl<T, const C: usize, P: Policy> Index<usize> for StaticQueue<T, C, P> {
    type Output = T;

    /// Random access into the live window `[tail, tail + len)`. Panics if
    /// `i` is out of range.
    fn index(&self, i: usize) -> &T {
        assert!(i < self.len(), "index {i} out of bounds for queue of len {}", self.len());
        let idx = ((self.core.tail().wrapping_add(i as u64)) & self.core.mask()) as usize;
        unsafe { (*self.slot_ptr(idx)).assume_init_ref() }
    }
}

/// Structured bulk-write scope opened by [`StaticQueue::write_guard`];
/// behaves exactly like [`WriteGuard`] over inline storage.
pub struct StaticWriteGuard<'a, T, const C: usize, P: Policy> {
    queue: &'a StaticQueue<T, C, P>,
    start_head: u64,
    max: usize,
    written: usize,
    armed: bool,
}

impl<'a, T, const C: usize, P: Policy> StaticWriteGuard<'a, T, C, P> {
    pub fn available(&self) -> usize {
        self.max
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn emplace_next(&mut self, value: T) -> bool {
        if self.written >= self.max {
            return false;
        }
        let mask = self.queue.core.mask();
        let idx = (self.start_head.wrapping_add(self.written as u64) & mask) as usize;
        unsafe { ptr::write(self.queue.slot_ptr(idx), MaybeUninit::new(value)) };
        self.written += 1;
        true
    }

    pub fn commit(mut self) -> usize {
        let n = self.written;
        self.queue.core.advance_head(n as u64);
        self.armed = true;
        n
    }

    pub fn cancel(self) {}
}

impl<'a, T, const C: usize, P: Policy> Drop for StaticWriteGuard<'a, T, C, P> {
    fn drop(&mut self) {
        if self.armed {
            return;
        }
        let mask = self.queue.core.mask();
        for i in 0..self.written {
            let idx = (self.start_head.wrapping_add(i as u64) & mask) as usize;
            unsafe { ptr::drop_in_place(self.queue.slot_ptr(idx).cast::<T>()) };
        }
    }
}

/// Structured bulk-read scope opened by [`StaticQueue::read_guard`];
/// behaves exactly like [`ReadGuard`] over inline storage.
pub struct StaticReadGuard<'a, T, const C: usize, P: Policy> {
    queue: &'a StaticQueue<T, C, P>,
    start_tail: u64,
    max: usize,
    consumed: usize,
    armed: bool,
}

impl<'a, T, const C: usize, P: Policy> StaticReadGuard<'a, T, C, P> {
    pub fn available(&self) -> usize {
        self.max
    }

    pub fn consume_next(&mut self) -> Option<&T> {
        if self.consumed >= self.max {
            return None;
        }
        let mask = self.queue.core.mask();
        let idx = (self.start_tail.wrapping_add(self.consumed as u64) & mask) as usize;
        self.consumed += 1;
        Some(unsafe { (*self.queue.slot_ptr(idx)).assume_init_ref() })
    }

    pub fn spans(&self) -> (&[T], &[T]) {
        if self.max == 0 {
            return (&[], &[]);
        }
        let start_idx = (self.start_tail & self.queue.core.mask()) as usize;
        let run = (C - start_idx).min(self.max);
        let rest = self.max - run;
        unsafe {
            let base = (*self.queue.buffer.get()).as_ptr().cast::<T>();
            let first = std::slice::from_raw_parts(base.add(start_idx), run);
            let second = std::slice::from_raw_parts(base, rest);
            (first, second)
        }
    }

    pub fn commit(mut self) -> usize {
        let n = self.consumed;
        for _ in 0..n {
            let idx = self.queue.core.read_index();
            unsafe { ptr::drop_in_place(self.queue.slot_ptr(idx).cast::<T>()) };
            self.queue.core.advance_tail(1);
        }
        self.armed = true;
        n
    }

    pub fn cancel(self) {}
}

impl<T, const C: usize, P: Policy> Default for StaticQueue<T, C, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const C: usize, P: Policy> Drop for StaticQueue<T, C, P> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DefaultPolicy;

    #[test]
    fn fifo_monotonicity_1_to_20() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(8).unwrap();
        for v in 1..=20u32 {
            assert!(q.try_push(v));
            assert_eq!(q.try_pop(), Some(v));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn wrap_split_bulk_regions() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(16).unwrap();
        for v in 0..11u32 {
            assert!(q.try_push(v));
        }
        assert_eq!(q.pop_n(9), 9);
        let (first, second) = q.claim_write(12);
        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 7);
        for (i, slot) in first.iter_mut().enumerate() {
            slot.write(100 + i as u32);
        }
        for (i, slot) in second.iter_mut().enumerate() {
            slot.write(100 + 5 + i as u32);
        }
        assert!(q.try_publish_n(12));
        let mut out = Vec::new();
        while let Some(v) = q.try_pop() {
            out.push(v);
        }
        let expected: Vec<u32> = vec![9, 10].into_iter().chain(100..111).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn static_queue_full_and_drain() {
        let q: StaticQueue<u32, 8, DefaultPolicy> = StaticQueue::new();
        for v in 0..8u32 {
            assert!(q.try_push(v));
        }
        assert!(q.is_full());
        assert!(!q.try_push(99));
        for v in 0..8u32 {
            assert_eq!(q.try_pop(), Some(v));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn static_queue_swap_resyncs_shadow() {
        let mut a: StaticQueue<u32, 16, DefaultPolicy> = StaticQueue::new();
        let mut b: StaticQueue<u32, 16, DefaultPolicy> = StaticQueue::new();

        // Run both rings through 90 push/pop cycles first, so head/tail have
        // wrapped many times over before the swap - a stale shadow would
        // under-report free space against the post-swap sequence numbers.
        for cycle in 0..90u32 {
            assert!(a.try_push(cycle));
            assert_eq!(a.try_pop(), Some(cycle));
            assert!(b.try_push(cycle));
            assert_eq!(b.try_pop(), Some(cycle));
        }

        for v in 1000..1016u32 {
            assert!(a.try_push(v));
        }
        for v in 3000..3016u32 {
            assert!(b.try_push(v));
        }
        a.swap(&mut b);
        assert!(a.is_full());
        assert!(!a.try_push(0));
        assert_eq!(a.try_front(), Some(&3000));
    }

    #[test]
    fn backoff_push_pop_roundtrip() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(4).unwrap();
        q.push_with_backoff(7);
        assert_eq!(q.pop_with_backoff(), 7);
    }

    #[test]
    fn destroy_then_reinit_allocator_roundtrip() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(128).unwrap();
        q.destroy();
        assert!(!q.is_valid());
        q.init(64).unwrap();
        assert_eq!(q.capacity(), 64);
        q.resize(256).unwrap();
        assert_eq!(q.capacity(), 256);
        q.destroy();
        assert!(!q.is_valid());
    }

    #[test]
    fn resize_migrates_live_elements_in_order() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(4).unwrap();
        for v in 0..4u32 {
            assert!(q.try_push(v));
        }
        assert!(q.try_pop().is_some()); // tail advances to 1, head=4
        assert!(q.try_push(4));
        q.resize(8).unwrap();
        let mut out = Vec::new();
        while let Some(v) = q.try_pop() {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn write_guard_commit_publishes_constructed_prefix() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(8).unwrap();
        let mut guard = q.write_guard(5);
        assert_eq!(guard.available(), 5);
        assert!(guard.emplace_next(10));
        assert!(guard.emplace_next(11));
        assert!(guard.emplace_next(12));
        assert_eq!(guard.written(), 3);
        assert_eq!(guard.commit(), 3);
        assert_eq!(q.len(), 3);
        assert_eq!(q.try_pop(), Some(10));
        assert_eq!(q.try_pop(), Some(11));
        assert_eq!(q.try_pop(), Some(12));
    }

    #[test]
    fn write_guard_drop_without_commit_destroys_constructed_and_publishes_nothing() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static DROPS: AtomicUsize = AtomicUsize::new(0);
        struct Counted;
        impl Drop for Counted {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut q: Queue<Counted, DefaultPolicy> = Queue::new();
        q.init(8).unwrap();
        {
            let mut guard = q.write_guard(4);
            assert!(guard.emplace_next(Counted));
            assert!(guard.emplace_next(Counted));
            // guard dropped here without commit
        }
        assert_eq!(DROPS.load(Ordering::SeqCst), 2);
        assert!(q.is_empty());
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn read_guard_commit_pops_visited_prefix_only() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(8).unwrap();
        for v in 0..5u32 {
            assert!(q.try_push(v));
        }
        let mut guard = q.read_guard(3);
        assert_eq!(guard.available(), 3);
        assert_eq!(guard.consume_next(), Some(&0));
        assert_eq!(guard.consume_next(), Some(&1));
        assert_eq!(guard.commit(), 2);
        assert_eq!(q.len(), 3);
        assert_eq!(q.try_pop(), Some(2));
    }

    #[test]
    fn read_guard_cancel_leaves_queue_untouched() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(8).unwrap();
        for v in 0..4u32 {
            assert!(q.try_push(v));
        }
        {
            let mut guard = q.read_guard(4);
            guard.consume_next();
            guard.consume_next();
            guard.cancel();
        }
        assert_eq!(q.len(), 4);
        assert_eq!(q.try_pop(), Some(0));
    }

    #[test]
    fn index_accesses_live_window_in_order() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(8).unwrap();
        for v in 0..3u32 {
            assert!(q.try_push(v));
        }
        assert!(q.try_pop().is_some());
        assert!(q.try_push(3));
        assert_eq!(q[0], 1);
        assert_eq!(q[1], 2);
        assert_eq!(q[2], 3);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn index_out_of_range_panics() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(4).unwrap();
        assert!(q.try_push(1));
        let _ = q[1];
    }

    #[test]
    fn iter_reflects_window_captured_at_call_time() {
        let mut q: Queue<u32, DefaultPolicy> = Queue::new();
        q.init(8).unwrap();
        for v in 0..4u32 {
            assert!(q.try_push(v));
        }
        assert!(q.try_pop().is_some());
        let collected: Vec<u32> = q.iter().copied().collect();
        assert_eq!(collected, vec![1, 2, 3]);
        // Later mutation is not reflected in the already-captured iterator.
        assert!(q.try_push(4));
        assert_eq!(collected, vec![1, 2, 3]);
    }

    #[test]
    fn static_queue_guards_and_index_mirror_dynamic_behavior() {
        let q: StaticQueue<u32, 8, DefaultPolicy> = StaticQueue::new();
        let mut wg = q.write_guard(3);
        assert!(wg.emplace_next(1));
        assert!(wg.emplace_next(2));
        assert_eq!(wg.commit(), 2);
        assert_eq!(q[0], 1);
        assert_eq!(q[1], 2);

        let mut rg = q.read_guard(1);
        assert_eq!(rg.consume_next(), Some(&1));
        assert_eq!(rg.commit(), 1);
        assert_eq!(q.len(), 1);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    proptest::proptest! {
        /// For any sequence of push/pop decisions against a small static
        /// queue, whatever comes out is a prefix of what went in, in order.
        #[test]
        fn fifo_order_holds_for_arbitrary_push_pop_sequences(ops in proptest::collection::vec(proptest::bool::ANY, 0..500)) {
            let q: StaticQueue<u32, 8, DefaultPolicy> = StaticQueue::new();
            let mut next_push = 0u32;
            let mut next_expected = 0u32;
            for do_push in ops {
                if do_push {
                    if q.try_push(next_push) {
                        next_push += 1;
                    }
                } else if let Some(v) = q.try_pop() {
                    assert_eq!(v, next_expected);
                    next_expected += 1;
                }
            }
        }
    }
}
