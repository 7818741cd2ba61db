//! Debug assertion macros for ring buffer invariants.
//!
//! These provide runtime checks for the core SPSC invariants (bounded count,
//! monotonic sequence progress, initialized-range reads, shadow-cache
//! consistency). Only active in debug builds (`#[cfg(debug_assertions)]`), so
//! there is zero overhead in release builds.
//!
//! Shared by the ring core and every container built on it.

/// Assert that occupancy does not exceed capacity.
///
/// Invariant: `0 <= (head - tail) <= capacity`.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded-count violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that tail does not advance past head.
///
/// Invariant: `tail <= head` (after advance).
macro_rules! debug_assert_head_not_past_tail {
    ($new_tail:expr, $head:expr) => {
        debug_assert!(
            $new_tail <= $head,
            "advancing tail {} beyond head {}",
            $new_tail,
            $head
        )
    };
}

/// Assert that a sequence number only increases (monotonic progress), under
/// wrapping comparison.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "monotonic-progress violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Detects a sequence jump that looks like an actual counter wraparound
/// rather than ordinary modular arithmetic (should never happen in practice
/// at realistic message rates; catches bugs where a sequence jumps
/// backwards unexpectedly).
macro_rules! debug_assert_no_wrap {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new > $old || $old.wrapping_sub($new) > (1u64 << 32),
            "potential wraparound: {} went from {} to {} (delta {})",
            $name,
            $old,
            $new,
            $new.wrapping_sub($old)
        )
    };
}

/// Assert that a read falls within the currently-initialized `[tail, head)`
/// range.
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $tail:expr, $head:expr) => {
        debug_assert!(
            $pos >= $tail && $pos < $head,
            "reading slot at seq {} outside initialized range [{}, {})",
            $pos,
            $tail,
            $head
        )
    };
}

/// Assert a raw storage/ring pointer captured for later use is non-null.
macro_rules! debug_assert_valid_ring_ptr {
    ($ptr:expr) => {
        debug_assert!(!$ptr.is_null(), "null ring pointer")
    };
}

/// Assert monotonic per-producer consumption count, used where a single ring
/// core backs more than one conceptual FIFO lane.
macro_rules! debug_assert_fifo_count {
    ($lane:expr, $old_count:expr, $new_count:expr) => {
        debug_assert!(
            $new_count >= $old_count,
            "lane {} consumption count went from {} to {}",
            $lane,
            $old_count,
            $new_count
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_fifo_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_no_wrap;
pub(crate) use debug_assert_valid_ring_ptr;
