//! Policy composition: selects `(counter backend for head/tail, counter
//! backend for geometry cells, cache-line padding?)` at instantiation, the
//! way the distilled `Policy<Cnt, Geo>` template does.
//!
//! A concrete [`Policy`] is a zero-sized marker type; containers are generic
//! over `P: Policy` and build their counters as `P::Counter::new(..)` /
//! `P::Geometry::new(..)`.

use crate::cacheline::CachelineCounter;
use crate::counter::{
    AtomicCounter, Counter, DefaultOrders, FastAtomicCounter, MemoryOrders, PlainCounter,
    VolatileCounter,
};

/// A policy fixes the counter backend used for the head/tail sequence
/// counters, the backend used for geometry (capacity/mask) cells, and
/// whether the shadow-index fast path is enabled.
pub trait Policy: Send + Sync + 'static {
    type Counter: Counter;
    type Geometry: Counter;

    /// Shadow indices only pay off (and only stay correct) when the
    /// underlying counter carries cross-thread ordering; Plain/Volatile
    /// policies disable them.
    const SHADOW_CAPABLE: bool = Self::Counter::IS_ATOMIC;
}

/// Plain counters, plain geometry. Fastest; correct only single-threaded or
/// under external synchronization.
pub struct P;
impl Policy for P {
    type Counter = PlainCounter;
    type Geometry = PlainCounter;
}

/// Volatile counters, plain geometry. ISR ↔ task handoff on one core.
pub struct V;
impl Policy for V {
    type Counter = VolatileCounter;
    type Geometry = PlainCounter;
}

/// Volatile counters, volatile geometry. Strict volatile propagation.
pub struct VV;
impl Policy for VV {
    type Counter = VolatileCounter;
    type Geometry = VolatileCounter;
}

/// Fast-atomic counters, plain geometry. Cross-thread hot path; the default.
pub struct A<O: MemoryOrders = DefaultOrders>(std::marker::PhantomData<O>);
impl<O: MemoryOrders> Policy for A<O> {
    type Counter = FastAtomicCounter<O>;
    type Geometry = PlainCounter;
}

/// Alias kept for parity with the distilled source's `FA` name (identical to
/// `A`: both use the non-RMW fast-atomic counter).
pub type FA<O = DefaultOrders> = A<O>;

/// Fast-atomic counters, fast-atomic geometry. Shared/SMP with atomic
/// capacity bookkeeping too.
pub struct AA<O: MemoryOrders = DefaultOrders>(std::marker::PhantomData<O>);
impl<O: MemoryOrders> Policy for AA<O> {
    type Counter = FastAtomicCounter<O>;
    type Geometry = FastAtomicCounter<O>;
}

/// Full-RMW atomic counters, plain geometry. For callers who need
/// `fetch_add`-style atomicity on the head/tail counter itself.
pub struct ARMW<O: MemoryOrders = DefaultOrders>(std::marker::PhantomData<O>);
impl<O: MemoryOrders> Policy for ARMW<O> {
    type Counter = AtomicCounter<O>;
    type Geometry = PlainCounter;
}

/// Full-RMW atomic counters, full-RMW atomic geometry.
pub struct AARMW<O: MemoryOrders = DefaultOrders>(std::marker::PhantomData<O>);
impl<O: MemoryOrders> Policy for AARMW<O> {
    type Counter = AtomicCounter<O>;
    type Geometry = AtomicCounter<O>;
}

/// Wraps a base policy's counter and geometry backends in 128-byte cache-line
/// padding, preventing false sharing between head and tail.
pub struct CacheAligned<Base: Policy>(std::marker::PhantomData<Base>);
impl<Base: Policy> Policy for CacheAligned<Base> {
    type Counter = CachelineCounter<Base::Counter>;
    type Geometry = CachelineCounter<Base::Geometry>;
    const SHADOW_CAPABLE: bool = Base::SHADOW_CAPABLE;
}

pub type CP = CacheAligned<P>;
pub type CV = CacheAligned<V>;
pub type CVV = CacheAligned<VV>;
pub type CA<O = DefaultOrders> = CacheAligned<A<O>>;
pub type CFA<O = DefaultOrders> = CacheAligned<FA<O>>;
pub type CAA<O = DefaultOrders> = CacheAligned<AA<O>>;

/// Fast-atomic counters, plain geometry, default orderings - matches the
/// grounding crate's atomic-by-default stance for a cross-thread channel.
pub type DefaultPolicy = A<DefaultOrders>;

#[cfg(test)]
mod tests {
    use super::*;

    fn shadow_capable<P: Policy>() -> bool {
        P::SHADOW_CAPABLE
    }

    #[test]
    fn plain_family_disables_shadows() {
        assert!(!shadow_capable::<P>());
        assert!(!shadow_capable::<V>());
        assert!(!shadow_capable::<VV>());
    }

    #[test]
    fn atomic_family_enables_shadows() {
        assert!(shadow_capable::<A>());
        assert!(shadow_capable::<AA>());
        assert!(shadow_capable::<ARMW>());
        assert!(shadow_capable::<AARMW>());
        assert!(shadow_capable::<DefaultPolicy>());
    }

    #[test]
    fn cache_aligned_preserves_shadow_capability() {
        assert!(!shadow_capable::<CP>());
        assert!(shadow_capable::<CA>());
        assert!(shadow_capable::<CAA>());
    }
}
