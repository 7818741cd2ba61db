//! Error types for the non-hot-path, non-concurrent operations (resize,
//! init, destroy). Producer/consumer hot-path operations never return
//! `Result` - they report refusal via `bool`/`Option` so failure stays a
//! branch, never an allocation or an unwind.

use thiserror::Error;

/// Failure modes for dynamic-container `init`/`resize`/`reserve`.
#[derive(Debug, Error)]
pub enum ResizeError {
    /// The allocator could not satisfy the request for `requested` slots.
    #[error("allocation failed for {requested} slots ({layout_bytes} bytes)")]
    Alloc {
        requested: usize,
        layout_bytes: usize,
    },
    /// Requested capacity shrinks a container that is not being destroyed
    /// (depth = 0 is the only accepted "shrink", and it destroys instead).
    #[error("cannot shrink ring from {current} to {requested}; only growth is supported")]
    ShrinkNotSupported { current: usize, requested: usize },
}
