//! Counter backends: uniform store/load/add/inc over plain, volatile and
//! atomic storage, used for both the head/tail sequence counters and (in the
//! dynamic geometry controller) the capacity/mask cells.
//!
//! All backends operate on the 64-bit unsigned sequence domain (see the
//! register-width note in `geometry.rs`). They differ only in what
//! synchronization, if any, accompanies a load or store.

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// Uniform contract for head/tail/geometry storage cells.
///
/// `IS_ATOMIC` lets policy-level code (shadow cache enablement, lock-free
/// assertions) branch at compile time on whether this backend carries
/// cross-thread ordering at all.
pub trait Counter: Send + Sync {
    const IS_ATOMIC: bool;

    fn new(value: u64) -> Self;
    fn load(&self) -> u64;
    fn store(&self, value: u64);
    fn add(&self, delta: u64) -> u64;
    #[inline]
    fn inc(&self) -> u64 {
        self.add(1)
    }
}

/// No fence at all. Correct only under single-threaded or externally
/// synchronized use (e.g. disabled interrupts around the whole operation).
pub struct PlainCounter {
    value: UnsafeCell<u64>,
}

impl Counter for PlainCounter {
    const IS_ATOMIC: bool = false;

    #[inline]
    fn new(value: u64) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    #[inline]
    fn load(&self) -> u64 {
        // SAFETY: caller guarantees single-writer / externally synchronized access.
        unsafe { *self.value.get() }
    }

    #[inline]
    fn store(&self, value: u64) {
        // SAFETY: caller guarantees single-writer / externally synchronized access.
        unsafe { *self.value.get() = value }
    }

    #[inline]
    fn add(&self, delta: u64) -> u64 {
        let old = self.load();
        self.store(old.wrapping_add(delta));
        old
    }
}

// SAFETY: PlainCounter is only sound when the caller upholds single-writer
// discipline; we expose that contract on the container, not here, matching
// how the grounding crate treats its cached_head/cached_tail `UnsafeCell`s.
unsafe impl Send for PlainCounter {}
unsafe impl Sync for PlainCounter {}

/// Compiler-reorder-safe via `read_volatile`/`write_volatile`. No cross-core
/// ordering: suitable for ISR-to-task handoff on a single core, not SMP.
pub struct VolatileCounter {
    value: UnsafeCell<u64>,
}

impl Counter for VolatileCounter {
    const IS_ATOMIC: bool = false;

    #[inline]
    fn new(value: u64) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    #[inline]
    fn load(&self) -> u64 {
        // SAFETY: single-writer per role; volatile only prevents compiler reordering.
        unsafe { self.value.get().read_volatile() }
    }

    #[inline]
    fn store(&self, value: u64) {
        // SAFETY: single-writer per role; volatile only prevents compiler reordering.
        unsafe { self.value.get().write_volatile(value) }
    }

    #[inline]
    fn add(&self, delta: u64) -> u64 {
        let old = self.load();
        self.store(old.wrapping_add(delta));
        old
    }
}

unsafe impl Send for VolatileCounter {}
unsafe impl Sync for VolatileCounter {}

/// Selects the memory orderings used by atomic-backed counters. `DefaultOrders`
/// gives the producer/consumer happens-before edge described in the ring core;
/// `RelaxedOrders` drops all ordering (valid only with external synchronization).
pub trait MemoryOrders: Send + Sync + 'static {
    const LOAD: Ordering;
    const STORE: Ordering;
    const RMW: Ordering;
}

/// acquire load / release store / acq_rel read-modify-write.
pub struct DefaultOrders;
impl MemoryOrders for DefaultOrders {
    const LOAD: Ordering = Ordering::Acquire;
    const STORE: Ordering = Ordering::Release;
    const RMW: Ordering = Ordering::AcqRel;
}

/// All relaxed. Voids the cross-thread happens-before edge; only valid when
/// the caller supplies equivalent synchronization some other way.
pub struct RelaxedOrders;
impl MemoryOrders for RelaxedOrders {
    const LOAD: Ordering = Ordering::Relaxed;
    const STORE: Ordering = Ordering::Relaxed;
    const RMW: Ordering = Ordering::Relaxed;
}

/// Full read-modify-write atomic counter: `add` is a real `fetch_add`.
///
/// Used by the RMW-flavored policies (`ARMW`, `AARMW`) for callers who need
/// `fetch_add`-style atomicity on the counter itself, e.g. if it is ever
/// observed by more than the two SPSC roles.
pub struct AtomicCounter<O: MemoryOrders> {
    value: AtomicU64,
    _orders: PhantomData<O>,
}

impl<O: MemoryOrders> Counter for AtomicCounter<O> {
    const IS_ATOMIC: bool = true;

    #[inline]
    fn new(value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
            _orders: PhantomData,
        }
    }

    #[inline]
    fn load(&self) -> u64 {
        self.value.load(O::LOAD)
    }

    #[inline]
    fn store(&self, value: u64) {
        self.value.store(value, O::STORE)
    }

    #[inline]
    fn add(&self, delta: u64) -> u64 {
        self.value.fetch_add(delta, O::RMW)
    }
}

/// Relaxed-load-then-release-store counter: non-RMW, valid because it is only
/// ever advanced by its owning role (producer advances head's *geometry-side*
/// counterpart never applies - this is used for head/tail themselves, where
/// single-writer-per-counter is already guaranteed by the SPSC contract).
pub struct FastAtomicCounter<O: MemoryOrders> {
    value: AtomicU64,
    _orders: PhantomData<O>,
}

impl<O: MemoryOrders> Counter for FastAtomicCounter<O> {
    const IS_ATOMIC: bool = true;

    #[inline]
    fn new(value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
            _orders: PhantomData,
        }
    }

    #[inline]
    fn load(&self) -> u64 {
        self.value.load(O::LOAD)
    }

    #[inline]
    fn store(&self, value: u64) {
        self.value.store(value, O::STORE)
    }

    #[inline]
    fn add(&self, delta: u64) -> u64 {
        // Single-writer owns this counter, so a relaxed load before the
        // release store is equivalent to fetch_add without the RMW cost.
        let old = self.value.load(Ordering::Relaxed);
        self.value.store(old.wrapping_add(delta), O::STORE);
        old
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<C: Counter>() {
        let c = C::new(5);
        assert_eq!(c.load(), 5);
        c.store(10);
        assert_eq!(c.load(), 10);
        let old = c.add(3);
        assert_eq!(old, 10);
        assert_eq!(c.load(), 13);
        assert_eq!(c.inc(), 13);
        assert_eq!(c.load(), 14);
    }

    #[test]
    fn plain_counter_roundtrip() {
        exercise::<PlainCounter>();
    }

    #[test]
    fn volatile_counter_roundtrip() {
        exercise::<VolatileCounter>();
    }

    #[test]
    fn atomic_counter_roundtrip() {
        exercise::<AtomicCounter<DefaultOrders>>();
        exercise::<AtomicCounter<RelaxedOrders>>();
    }

    #[test]
    fn fast_atomic_counter_roundtrip() {
        exercise::<FastAtomicCounter<DefaultOrders>>();
        exercise::<FastAtomicCounter<RelaxedOrders>>();
    }
}
