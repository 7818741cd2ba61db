//! Latest-value containers: publish-overwrite semantics with a sticky
//! consumer snapshot. The consumer only ever observes the newest published
//! slot; `pop` discards everything up to the head captured by the *last*
//! `front`, not the live head, so further publishes between `front` and
//! `pop` remain visible to the next `front`.
//!
//! Three shapes, mirroring the source: dynamic typed ([`Latest`]), static
//! typed ([`StaticLatest`]), and dynamic raw bytes ([`RawLatest`]) for
//! trivially-copyable payloads of a runtime-chosen size.

use crate::index_core::IndexCore;
use crate::policy::{DefaultPolicy, Policy};
use std::alloc::Layout;
use std::cell::{Cell, UnsafeCell};
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

/// Consumer-owned sticky snapshot state, shared by all three shapes.
struct StickySnapshot {
    has_snapshot: Cell<bool>,
    head_snapshot: Cell<u64>,
}

impl StickySnapshot {
    fn new() -> Self {
        Self {
            has_snapshot: Cell::new(false),
            head_snapshot: Cell::new(0),
        }
    }

    fn set(&self, head: u64) {
        self.has_snapshot.set(true);
        self.head_snapshot.set(head);
    }

    fn reset(&self) {
        self.has_snapshot.set(false);
    }

    /// Number of slots the next `pop` should consume: the sticky span if one
    /// is set, else the live occupancy (drains everything unread).
    fn pop_span<P: Policy>(&self, core: &IndexCore<P>) -> u64 {
        if self.has_snapshot.get() {
            self.head_snapshot.get().wrapping_sub(core.tail())
        } else {
            core.size()
        }
    }
}

#[inline]
fn should_advance(cap: u64, free: u64) -> bool {
    if cap < 4 {
        free >= 1
    } else {
        free >= 3
    }
}

// ============================================================================
// Dynamic typed latest
// ============================================================================

pub struct Latest<T, P: Policy = DefaultPolicy> {
    core: IndexCore<P>,
    buffer: UnsafeCell<Option<NonNull<MaybeUninit<T>>>>,
    snapshot: StickySnapshot,
}

unsafe impl<T: Send, P: Policy> Send for Latest<T, P> {}
unsafe impl<T: Send, P: Policy> Sync for Latest<T, P> {}

impl<T, P: Policy> Latest<T, P> {
    pub fn new() -> Self {
        Self {
            core: IndexCore::new(0),
            buffer: UnsafeCell::new(None),
            snapshot: StickySnapshot::new(),
        }
    }

    /// Allocates storage for `depth` slots (coerced to a power of two,
    /// minimum 2). Grow-only: resizing drops all prior state (latest is not
    /// a FIFO; resize is not a concurrent operation, so nothing needs to be
    /// migrated).
    pub fn init(&mut self, depth: usize) {
        self.destroy();
        let target = crate::geometry::next_pow2_clamped(depth.max(2) as u64) as usize;
        let layout = Layout::array::<MaybeUninit<T>>(target).expect("layout overflow");
        let ptr = unsafe { std::alloc::alloc(layout) } as *mut MaybeUninit<T>;
        let ptr = NonNull::new(ptr).expect("allocation failed");
        unsafe { *self.buffer.get() = Some(ptr) };
        self.core.init(target as u64, 0, 0);
        tracing::debug!(capacity = target, "latest container initialized");
    }

    pub fn resize(&mut self, depth: usize) {
        self.init(depth);
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

    fn slot_ptr(&self, idx: usize) -> *mut MaybeUninit<T> {
        let base = unsafe { (*self.buffer.get()).expect("latest not initialized") };
        unsafe { base.as_ptr().add(idx) }
    }

    /// Plain (non-coalescing) publish: refuses if full.
    pub fn try_push(&self, value: T) -> bool {
        if !self.core.is_valid() || !self.core.producer_can_write(1) {
            return false;
        }
        let idx = self.core.write_index();
        unsafe { ptr::write(self.slot_ptr(idx), MaybeUninit::new(value)) };
        self.core.advance_head(1);
        true
    }

    /// Publishes `value`, overwriting the newest slot in place instead of
    /// advancing head once free space drops to the coalescing threshold
    /// (`free < 3` for capacity >= 4, `free < 1` otherwise). Returns whether
    /// a new slot was advanced into (`true`) or the newest slot was
    /// overwritten (`false`).
    pub fn coalescing_publish(&self, value: T) -> bool {
        let cap = self.core.capacity() as u64;
        let free = self.core.free() as u64;
        if self.core.empty() || should_advance(cap, free) {
            let idx = self.core.write_index();
            unsafe { ptr::write(self.slot_ptr(idx), MaybeUninit::new(value)) };
            self.core.advance_head(1);
            true
        } else {
            let idx = ((self.core.head().wrapping_sub(1)) & self.core.mask()) as usize;
            let slot = self.slot_ptr(idx);
            unsafe {
                ptr::drop_in_place(slot.cast::<T>());
                ptr::write(slot, MaybeUninit::new(value));
            }
            false
        }
    }

    /// Newest published value, or `None` if empty. Sets the sticky snapshot
    /// consumed by the next `pop`.
    pub fn try_front(&self) -> Option<&T> {
        if !self.core.is_valid() {
            return None;
        }
        let head = self.core.head();
        if head.wrapping_sub(self.core.tail()) == 0 {
            return None;
        }
        self.snapshot.set(head);
        let idx = ((head.wrapping_sub(1)) & self.core.mask()) as usize;
        Some(unsafe { (*self.slot_ptr(idx)).assume_init_ref() })
    }

    /// Consumes up to the sticky snapshot (if set) or everything unread
    /// (if not), then resets the sticky state.
    pub fn try_pop(&self) -> bool {
        let span = self.snapshot.pop_span(&self.core);
        if span == 0 || span > self.core.capacity() {
            self.snapshot.reset();
            return false;
        }
        for _ in 0..span {
            let idx = self.core.read_index();
            unsafe { ptr::drop_in_place(self.slot_ptr(idx).cast::<T>()) };
            self.core.advance_tail(1);
        }
        self.snapshot.reset();
        true
    }

    pub fn consume_all(&self) {
        let n = self.core.size();
        for _ in 0..n {
            let idx = self.core.read_index();
            unsafe { ptr::drop_in_place(self.slot_ptr(idx).cast::<T>()) };
            self.core.advance_tail(1);
        }
        self.core.sync_tail_to_head();
        self.snapshot.reset();
    }

    pub fn clear(&self) {
        self.consume_all();
        self.core.clear();
    }

    pub fn destroy(&mut self) {
        if !self.core.is_valid() {
            return;
        }
        self.clear();
        let cap = self.capacity();
        let layout = Layout::array::<MaybeUninit<T>>(cap).expect("layout overflow");
        if let Some(ptr) = unsafe { (*self.buffer.get()).take() } {
            unsafe { std::alloc::dealloc(ptr.as_ptr().cast::<u8>(), layout) };
        }
        self.core.init(0, 0, 0);
        tracing::debug!(capacity = cap, "latest container destroyed");
    }
}

impl<T, P: Policy> Default for Latest<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P: Policy> Drop for Latest<T, P> {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ============================================================================
// Static typed latest
// ============================================================================

pub struct StaticLatest<T, const C: usize, P: Policy = DefaultPolicy> {
    core: IndexCore<P>,
    buffer: UnsafeCell<[MaybeUninit<T>; C]>,
    snapshot: StickySnapshot,
}

unsafe impl<T: Send, const C: usize, P: Policy> Send for StaticLatest<T, C, P> {}
unsafe impl<T: Send, const C: usize, P: Policy> Sync for StaticLatest<T, C, P> {}

impl<T, const C: usize, P: Policy> StaticLatest<T, C, P> {
    pub fn new() -> Self {
        assert!(crate::geometry::is_pow2(C as u64) && C >= 2);
        Self {
            core: IndexCore::new(C as u64),
            buffer: UnsafeCell::new(std::array::from_fn(|_| MaybeUninit::uninit())),
            snapshot: StickySnapshot::new(),
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

    fn slot_ptr(&self, idx: usize) -> *mut MaybeUninit<T> {
        unsafe { (*self.buffer.get()).as_mut_ptr().add(idx) }
    }

    pub fn try_push(&self, value: T) -> bool {
        if !self.core.producer_can_write(1) {
            return false;
        }
        let idx = self.core.write_index();
        unsafe { ptr::write(self.slot_ptr(idx), MaybeUninit::new(value)) };
        self.core.advance_head(1);
        true
    }

    pub fn coalescing_publish(&self, value: T) -> bool {
        let cap = C as u64;
        let free = self.core.free() as u64;
        if self.core.empty() || should_advance(cap, free) {
            let idx = self.core.write_index();
            unsafe { ptr::write(self.slot_ptr(idx), MaybeUninit::new(value)) };
            self.core.advance_head(1);
            true
        } else {
            let idx = ((self.core.head().wrapping_sub(1)) & self.core.mask()) as usize;
            let slot = self.slot_ptr(idx);
            unsafe {
                ptr::drop_in_place(slot.cast::<T>());
                ptr::write(slot, MaybeUninit::new(value));
            }
            false
        }
    }

    pub fn try_front(&self) -> Option<&T> {
        let head = self.core.head();
        if head.wrapping_sub(self.core.tail()) == 0 {
            return None;
        }
        self.snapshot.set(head);
        let idx = ((head.wrapping_sub(1)) & self.core.mask()) as usize;
        Some(unsafe { (*self.slot_ptr(idx)).assume_init_ref() })
    }

    pub fn try_pop(&self) -> bool {
        let span = self.snapshot.pop_span(&self.core);
        if span == 0 || span > self.core.capacity() {
            self.snapshot.reset();
            return false;
        }
        for _ in 0..span {
            let idx = self.core.read_index();
            unsafe { ptr::drop_in_place(self.slot_ptr(idx).cast::<T>()) };
            self.core.advance_tail(1);
        }
        self.snapshot.reset();
        true
    }

    pub fn clear(&self) {
        let n = self.core.size();
        for _ in 0..n {
            let idx = self.core.read_index();
            unsafe { ptr::drop_in_place(self.slot_ptr(idx).cast::<T>()) };
            self.core.advance_tail(1);
        }
        self.core.clear();
        self.snapshot.reset();
    }

    /// Swaps storage and all consumer-snapshot state with `other`
    /// (non-concurrent only); re-syncs shadow caches afterward. This is
    /// where a stale shadow would otherwise under-report occupancy.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self.buffer.get_mut(), other.buffer.get_mut());
        let (sc, sh, st) = (self.core.capacity(), self.core.head(), self.core.tail());
        let (oc, oh, ot) = (other.core.capacity(), other.core.head(), other.core.tail());
        self.core.init(oc, oh, ot);
        other.core.init(sc, sh, st);
        let s_snap = (self.snapshot.has_snapshot.get(), self.snapshot.head_snapshot.get());
        let o_snap = (other.snapshot.has_snapshot.get(), other.snapshot.head_snapshot.get());
        self.snapshot.has_snapshot.set(o_snap.0);
        self.snapshot.head_snapshot.set(o_snap.1);
        other.snapshot.has_snapshot.set(s_snap.0);
        other.snapshot.head_snapshot.set(s_snap.1);
    }
}

impl<T, const C: usize, P: Policy> Default for StaticLatest<T, C, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const C: usize, P: Policy> Drop for StaticLatest<T, C, P> {
    fn drop(&mut self) {
        self.clear();
    }
}

// ============================================================================
// Dynamic raw-bytes latest
// ============================================================================

/// Dynamic latest-value buffer of raw, fixed-size byte slots, for
/// trivially-copyable payloads whose concrete type isn't known until
/// `init`. Used when callers push heterogeneous POD payloads into the same
/// buffer via `memcpy`-style copies.
pub struct RawLatest<P: Policy = DefaultPolicy> {
    core: IndexCore<P>,
    buffer: UnsafeCell<Option<NonNull<u8>>>,
    bytes_per_slot: Cell<usize>,
    snapshot: StickySnapshot,
}

unsafe impl<P: Policy> Send for RawLatest<P> {}
unsafe impl<P: Policy> Sync for RawLatest<P> {}

impl<P: Policy> RawLatest<P> {
    pub fn new() -> Self {
        Self {
            core: IndexCore::new(0),
            buffer: UnsafeCell::new(None),
            bytes_per_slot: Cell::new(0),
            snapshot: StickySnapshot::new(),
        }
    }

    pub fn init(&mut self, depth: usize, bytes_per_slot: usize) {
        self.destroy();
        let target = crate::geometry::next_pow2_clamped(depth.max(2) as u64) as usize;
        let layout = Layout::array::<u8>(target * bytes_per_slot).expect("layout overflow");
        let ptr = unsafe { std::alloc::alloc(layout) };
        let ptr = NonNull::new(ptr).expect("allocation failed");
        unsafe { *self.buffer.get() = Some(ptr) };
        self.bytes_per_slot.set(bytes_per_slot);
        self.core.init(target as u64, 0, 0);
        tracing::debug!(capacity = target, bytes_per_slot, "raw latest container initialized");
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.core.capacity() as usize
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.core.is_valid()
    }

    fn slot_ptr(&self, idx: usize) -> *mut u8 {
        let base = unsafe { (*self.buffer.get()).expect("raw latest not initialized") };
        unsafe { base.as_ptr().add(idx * self.bytes_per_slot.get()) }
    }

    /// Copies `value`'s bytes into the claimed slot. Refuses if `U` doesn't
    /// fit in `bytes_per_slot` or the buffer is full.
    pub fn try_push<U: Copy>(&self, value: U) -> bool {
        if !self.core.is_valid() || std::mem::size_of::<U>() > self.bytes_per_slot.get() {
            return false;
        }
        if !self.core.producer_can_write(1) {
            return false;
        }
        let idx = self.core.write_index();
        unsafe { ptr::copy_nonoverlapping(&value as *const U as *const u8, self.slot_ptr(idx), std::mem::size_of::<U>()) };
        self.core.advance_head(1);
        true
    }

    /// Copies out the newest slot's bytes as a `U`, or `None` if empty or
    /// size mismatched. Sets the sticky snapshot like the typed variants.
    pub fn try_front<U: Copy>(&self) -> Option<U> {
        if !self.core.is_valid() || std::mem::size_of::<U>() > self.bytes_per_slot.get() {
            return None;
        }
        let head = self.core.head();
        if head.wrapping_sub(self.core.tail()) == 0 {
            return None;
        }
        self.snapshot.set(head);
        let idx = ((head.wrapping_sub(1)) & self.core.mask()) as usize;
        let mut out = MaybeUninit::<U>::uninit();
        unsafe {
            ptr::copy_nonoverlapping(self.slot_ptr(idx), out.as_mut_ptr().cast::<u8>(), std::mem::size_of::<U>());
            Some(out.assume_init())
        }
    }

    pub fn try_pop(&self) -> bool {
        let span = self.snapshot.pop_span(&self.core);
        if span == 0 || span > self.core.capacity() {
            self.snapshot.reset();
            return false;
        }
        self.core.advance_tail(span);
        self.snapshot.reset();
        true
    }

    pub fn destroy(&mut self) {
        if !self.core.is_valid() {
            return;
        }
        self.snapshot.reset();
        self.core.clear();
        let layout =
            Layout::array::<u8>(self.capacity() * self.bytes_per_slot.get()).expect("layout overflow");
        if let Some(ptr) = unsafe { (*self.buffer.get()).take() } {
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        }
        self.core.init(0, 0, 0);
        self.bytes_per_slot.set(0);
    }
}

impl<P: Policy> Default for RawLatest<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Policy> Drop for RawLatest<P> {
    fn drop(&mut self) {
        self.destroy();
    }
}
