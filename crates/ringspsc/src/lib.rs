//! Lock-free single-producer/single-consumer ring containers.
//!
//! Three container shapes share one index core ([`index_core::IndexCore`]):
//!
//! - [`queue::Queue`] / [`queue::StaticQueue`] - FIFO byte/object queue.
//! - [`pool::TypedPool`] / [`pool::StaticTypedPool`] - a ring of pointers
//!   into persistent per-slot storages; publishing rebinds a storage to a
//!   new object instead of moving bytes, so storage addresses are stable
//!   across cycles.
//! - [`latest::Latest`] / [`latest::StaticLatest`] / [`latest::RawLatest`] -
//!   publish-overwrite semantics where the consumer only ever observes the
//!   newest value, with a sticky snapshot so a `front`/`pop` pair never
//!   drops an update published in between.
//!
//! Every container is generic over a [`policy::Policy`], which fixes the
//! counter backend (plain, volatile, or atomic - see [`counter`]) used for
//! the head/tail sequence counters and whether the shadow-index fast path
//! ([`index_core::IndexCore::producer_can_write`],
//! [`index_core::IndexCore::consumer_can_read`]) is enabled.
//! [`policy::DefaultPolicy`] is the cross-thread default.

pub mod alloc;
pub mod backoff;
pub mod cacheline;
pub mod counter;
pub mod error;
pub mod geometry;
pub mod index_core;
mod invariants;
pub mod latest;
pub mod policy;
pub mod pool;
pub mod queue;
pub mod snapshot;

pub use alloc::{GlobalAlloc, RawAlloc};
pub use counter::{
    AtomicCounter, Counter, DefaultOrders, FastAtomicCounter, MemoryOrders, PlainCounter,
    RelaxedOrders, VolatileCounter,
};
pub use error::ResizeError;
pub use latest::{Latest, RawLatest, StaticLatest};
pub use policy::{
    CacheAligned, CA, CAA, CFA, CP, CV, CVV, DefaultPolicy, Policy, A, AA, AARMW, ARMW, FA, P, V,
    VV,
};
pub use pool::{StaticTypedPool, TypedPool};
pub use queue::{
    Iter, Queue, ReadGuard, StaticQueue, StaticReadGuard, StaticWriteGuard, WriteGuard,
};
pub use snapshot::Snapshot;
