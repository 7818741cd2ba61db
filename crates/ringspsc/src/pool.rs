//! Typed object pool: a FIFO of *pointers* into persistent per-slot storages.
//! Each storage address is allocated once and rebound to new objects across
//! many publish/pop cycles; no storage is freed until the pool shrinks to
//! zero or is dropped. Pointer identity at a given logical position is
//! stable across empty<->full cycles as long as the pool is not resized.
//!
//! The ring of pointers *is* the set of storage addresses - the slot ring
//! always holds a permutation of every live storage pointer, so there is no
//! separate bookkeeping list distinct from the ring itself.
//!
//! A "static" pool still boxes each per-slot storage individually: unlike a
//! C++ value type, a Rust struct is freely movable with no pinning, so
//! inlining persistent storage directly in the container would invalidate
//! pointer identity the moment the container itself moved. Only the ring
//! of pointers (not the storages) uses const-generic inline array storage
//! for the "static" form.

use crate::index_core::IndexCore;
use crate::policy::{DefaultPolicy, Policy};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

type Slot<T> = NonNull<MaybeUninit<T>>;

fn alloc_slot<T>() -> Slot<T> {
    let boxed = Box::new(MaybeUninit::<T>::uninit());
    unsafe { NonNull::new_unchecked(Box::into_raw(boxed)) }
}

unsafe fn free_slot<T>(ptr: Slot<T>) {
    // SAFETY: ptr was produced by `alloc_slot` and not live (caller's contract).
    unsafe { drop(Box::from_raw(ptr.as_ptr())) };
}

// ============================================================================
// Dynamic typed pool
// ============================================================================

pub struct TypedPool<T, P: Policy = DefaultPolicy> {
    core: IndexCore<P>,
    ring: UnsafeCell<Vec<Slot<T>>>,
}

unsafe impl<T: Send, P: Policy> Send for TypedPool<T, P> {}
unsafe impl<T: Send, P: Policy> Sync for TypedPool<T, P> {}

impl<T, P: Policy> TypedPool<T, P> {
    pub fn new() -> Self {
        Self {
            core: IndexCore::new(0),
            ring: UnsafeCell::new(Vec::new()),
        }
    }

    pub fn init(&mut self, depth: usize) {
        if self.core.is_valid() {
            self.resize(depth);
            return;
        }
        let target = crate::geometry::next_pow2_clamped(depth as u64) as usize;
        if target == 0 {
            return;
        }
        let ring = unsafe { &mut *self.ring.get() };
        ring.extend((0..target).map(|_| alloc_slot::<T>()));
        self.core.init(target as u64, 0, 0);
        tracing::debug!(capacity = target, "typed pool initialized");
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

    /// The storage address currently bound to logical ring position `idx`
    /// (raw, not `& mask`). Exposed for the pointer-stability property.
    pub fn data(&self, idx: usize) -> *const MaybeUninit<T> {
        let ring = unsafe { &*self.ring.get() };
        ring[idx].as_ptr()
    }

    fn slot(&self, idx: usize) -> Slot<T> {
        let ring = unsafe { &*self.ring.get() };
        ring[idx]
    }

    pub fn try_claim(&self) -> Option<*mut MaybeUninit<T>> {
        if !self.core.is_valid() || !self.core.producer_can_write(1) {
            return None;
        }
        Some(self.slot(self.core.write_index()).as_ptr())
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
        if !self.core.is_valid() || !self.core.consumer_can_read(1) {
            return None;
        }
        let slot = self.slot(self.core.read_index());
        Some(unsafe { slot.as_ref().assume_init_ref() })
    }

    pub fn try_pop(&self) -> Option<T> {
        if !self.core.is_valid() || !self.core.consumer_can_read(1) {
            return None;
        }
        let slot = self.slot(self.core.read_index());
        let value = unsafe { ptr::read(slot.as_ptr()).assume_init() };
        self.core.advance_tail(1);
        Some(value)
    }

    pub fn clear(&self) {
        while self.try_pop().is_some() {}
        self.core.clear();
    }

    /// Grows the pool to `depth` (coerced to a power of two). Migrates the
    /// existing pointer ring, in logical order, into `[0, used)`; the
    /// remaining (free) pointers follow in ring order; fresh storages are
    /// allocated only for the newly added range. No storage is freed.
    pub fn resize(&mut self, depth: usize) {
        if depth == 0 {
            self.destroy();
            return;
        }
        let target = crate::geometry::next_pow2_clamped(depth as u64) as usize;
        let current = self.capacity();
        if target <= current {
            return;
        }

        let used = self.len();
        let tail_idx = self.core.read_index();
        let head_idx = self.core.write_index();
        let old_ring = std::mem::take(unsafe { &mut *self.ring.get() });

        let mut new_ring = Vec::with_capacity(target);
        for i in 0..used {
            new_ring.push(old_ring[(tail_idx + i) % current]);
        }
        for i in 0..(current - used) {
            new_ring.push(old_ring[(head_idx + i) % current]);
        }
        new_ring.extend((current..target).map(|_| alloc_slot::<T>()));

        unsafe { *self.ring.get() = new_ring };
        self.core.init(target as u64, used as u64, 0);
        tracing::debug!(from = current, to = target, "typed pool resized");
    }

    /// Drops live objects, frees every storage, and returns the pool to
    /// invalid.
    pub fn destroy(&mut self) {
        if !self.core.is_valid() {
            return;
        }
        self.clear();
        let cap = self.capacity();
        let ring = std::mem::take(unsafe { &mut *self.ring.get() });
        for ptr in ring {
            unsafe { free_slot(ptr) };
        }
        self.core.init(0, 0, 0);
        tracing::debug!(capacity = cap, "typed pool destroyed");
    }
}

impl<T, P: Policy> Default for TypedPool<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P: Policy> Drop for TypedPool<T, P> {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ============================================================================
// Static typed pool
// ============================================================================

/// Fixed-capacity `C` typed pool: the ring of pointers is inline
/// (const-generic array), but the `C` per-slot storages it points to are
/// still individually heap-boxed (see module docs) so pointer identity
/// survives the container itself being moved.
pub struct StaticTypedPool<T, const C: usize, P: Policy = DefaultPolicy> {
    core: IndexCore<P>,
    ring: UnsafeCell<[Slot<T>; C]>,
}

unsafe impl<T: Send, const C: usize, P: Policy> Send for StaticTypedPool<T, C, P> {}
unsafe impl<T: Send, const C: usize, P: Policy> Sync for StaticTypedPool<T, C, P> {}

impl<T, const C: usize, P: Policy> StaticTypedPool<T, C, P> {
    pub fn new() -> Self {
        assert!(crate::geometry::is_pow2(C as u64), "capacity must be a power of two");
        Self {
            core: IndexCore::new(C as u64),
            ring: UnsafeCell::new(std::array::from_fn(|_| alloc_slot::<T>())),
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

    pub fn data(&self, idx: usize) -> *const MaybeUninit<T> {
        unsafe { (*self.ring.get())[idx].as_ptr() }
    }

    fn slot(&self, idx: usize) -> Slot<T> {
        unsafe { (*self.ring.get())[idx] }
    }

    pub fn try_claim(&self) -> Option<*mut MaybeUninit<T>> {
        if !self.core.producer_can_write(1) {
            return None;
        }
        Some(self.slot(self.core.write_index()).as_ptr())
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
        let slot = self.slot(self.core.read_index());
        Some(unsafe { slot.as_ref().assume_init_ref() })
    }

    pub fn try_pop(&self) -> Option<T> {
        if !self.core.consumer_can_read(1) {
            return None;
        }
        let slot = self.slot(self.core.read_index());
        let value = unsafe { ptr::read(slot.as_ptr()).assume_init() };
        self.core.advance_tail(1);
        Some(value)
    }

    pub fn clear(&self) {
        while self.try_pop().is_some() {}
        self.core.clear();
    }
}

impl<T, const C: usize, P: Policy> Default for StaticTypedPool<T, C, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const C: usize, P: Policy> Drop for StaticTypedPool<T, C, P> {
    fn drop(&mut self) {
        self.clear();
        for ptr in unsafe { *self.ring.get() } {
            unsafe { free_slot(ptr) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DefaultPolicy;

    #[test]
    fn pointer_stability_over_200_cycles() {
        let mut pool: TypedPool<[u64; 4], DefaultPolicy> = TypedPool::new();
        pool.init(64);

        let original: Vec<*const MaybeUninit<[u64; 4]>> = (0..64).map(|i| pool.data(i)).collect();
        let original_set: std::collections::HashSet<_> = original.iter().copied().collect();

        for cycle in 0..200u64 {
            let n = 1 + (cycle % 30) as usize;
            for i in 0..n {
                assert!(pool.try_push([cycle, i as u64, 0, 0]));
            }
            for _ in 0..n {
                assert!(pool.try_pop().is_some());
            }
        }

        let after: Vec<*const MaybeUninit<[u64; 4]>> = (0..64).map(|i| pool.data(i)).collect();
        let after_set: std::collections::HashSet<_> = after.iter().copied().collect();
        assert_eq!(original_set, after_set);
    }

    #[test]
    fn resize_preserves_live_elements_and_grows_storage() {
        let mut pool: TypedPool<u32, DefaultPolicy> = TypedPool::new();
        pool.init(4);
        for v in 0..4u32 {
            assert!(pool.try_push(v));
        }
        assert!(pool.try_pop().is_some());
        pool.resize(8);
        assert_eq!(pool.capacity(), 8);
        let mut out = Vec::new();
        while let Some(v) = pool.try_pop() {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn destroy_frees_all_storages() {
        let mut pool: TypedPool<u32, DefaultPolicy> = TypedPool::new();
        pool.init(16);
        assert!(pool.try_push(1));
        pool.destroy();
        assert!(!pool.is_valid());
        assert_eq!(pool.capacity(), 0);
    }

    #[test]
    fn static_pool_pointer_stability_over_200_cycles() {
        let pool: StaticTypedPool<u32, 64, DefaultPolicy> = StaticTypedPool::new();
        let original: Vec<_> = (0..64).map(|i| pool.data(i)).collect();
        let original_set: std::collections::HashSet<_> = original.iter().copied().collect();

        for cycle in 0..200u32 {
            let n = 1 + (cycle % 30) as usize;
            for i in 0..n {
                assert!(pool.try_push(cycle * 1000 + i as u32));
            }
            for _ in 0..n {
                assert!(pool.try_pop().is_some());
            }
        }

        let after_set: std::collections::HashSet<_> =
            (0..64).map(|i| pool.data(i)).collect();
        assert_eq!(original_set, after_set);
    }
}
