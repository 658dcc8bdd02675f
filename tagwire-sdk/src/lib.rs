//! # tagwire-sdk
//!
//! Runtime plumbing for tagwire: the per-thread "current" tag context and
//! helpers for carrying it across process boundaries.
//!
//! The data model and wire format live in [`tagwire_types`]; this crate
//! adds the two pieces an instrumented application actually calls:
//!
//! - [`current`] / [`attach`]: a thread-scoped current-context slot with
//!   RAII scoping. Each thread has its own slot, so no locking is
//!   involved and threads never observe each other's context.
//! - [`inject_current`] / [`extract_or_default`]: encode the current
//!   context for an outbound call, and decode peer-supplied bytes with a
//!   safe fallback to the empty context on malformed input.
//!
//! ## Quick Start
//!
//! ```rust
//! use tagwire_sdk::{attach, current, extract_or_default, inject_current, TagContext};
//!
//! // Scope a context to a region of code.
//! let context = TagContext::builder().insert("service", "checkout").build();
//! let guard = attach(context.clone());
//! assert_eq!(current(), context);
//!
//! // Before an outbound call: serialize whatever is in scope.
//! let header = inject_current().unwrap();
//!
//! // On the receiving side: decode, falling back to "no tags" on garbage.
//! let peer_context = extract_or_default(&header);
//! assert_eq!(peer_context, context);
//!
//! drop(guard);
//! assert_eq!(current(), TagContext::empty());
//! ```

mod propagation;
mod scope;

pub use propagation::{extract, extract_or_default, inject, inject_current};
pub use scope::{attach, current, ScopeGuard};

// Re-export types for convenience
pub use tagwire_types::{
    wire, Aggregation, DecodeError, DistributionAggregation, EncodeError, IntervalAggregation,
    Microseconds, TagContext, TagContextBuilder,
};
