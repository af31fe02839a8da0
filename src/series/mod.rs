//! Numeric series transforms
//!
//! - `repair` - bounded-lookahead interpolation over missing samples
//! - `delta` - cumulative counter to non-negative daily deltas
//!
//! Both are pure functions over plain slices: callers rebind the
//! result instead of observing in-place mutation through aliases.

pub mod delta;
pub mod repair;

pub use delta::derive_deltas;
pub use repair::{repair, to_counts};
