//! # tagwire-types
//!
//! Core types for stats context propagation. This crate defines how
//! aggregations over raw measurements are described, and the binary wire
//! contract for carrying a tag context across process and thread
//! boundaries.
//!
//! Two independent pieces live here:
//!
//! - [`Aggregation`]: a closed description of how a stream of numeric
//!   measurements collapses into summary statistics - by value
//!   distribution (optionally with a histogram) or by time interval
//!   (optionally windowed).
//! - [`TagContext`] and the [`wire`] codec: an immutable set of tag
//!   key/value pairs plus the length-prefixed binary format used to ship
//!   it to a peer. Decoding is defensive: corrupt bytes are reported as
//!   an error value and never produce a partial context.
//!
//! ## Design Goals
//!
//! - **Zero required runtime dependencies**: the model works without any
//!   serialization framework; `thiserror` is the only mandatory dependency
//! - **Optional serde**: enable the `serde` feature to embed the model
//!   types in JSON snapshots or config files
//! - **Immutable by construction**: descriptors and contexts are
//!   defensively copied once and never mutated afterwards, so they can be
//!   shared across threads without synchronization
//! - **Canonical encoding**: equal contexts always encode to identical
//!   bytes, so transports may cache or compare encodings
//!
//! ## Features
//!
//! - `std` (default): standard library support
//! - `serde`: serialization of the model types via serde
//!
//! ## Example
//!
//! ```rust
//! use tagwire_types::{Aggregation, DistributionAggregation, TagContext, wire};
//!
//! // Describe a histogram with four buckets: [-inf,1), [1,5), [5,10), [10,+inf)
//! let agg = Aggregation::Distribution(DistributionAggregation::with_bucket_boundaries([
//!     1.0, 5.0, 10.0,
//! ]));
//! assert_eq!(agg.fold(|d| d.bucket_count(), |_| None), Some(4));
//!
//! // Carry a tag context over the wire and back.
//! let context = TagContext::builder()
//!     .insert("service", "checkout")
//!     .insert("region", "eu-west-1")
//!     .build();
//! let bytes = wire::encode(&context).unwrap();
//! assert_eq!(wire::decode(&bytes).unwrap(), context);
//! ```
//!
//! ## Wire Version
//!
//! The current wire format version is **0**. The version is the first byte
//! of every encoded context so receivers can reject formats they do not
//! understand instead of misreading them.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod aggregation;
mod duration;
mod tags;
pub mod wire;

pub use aggregation::*;
pub use duration::*;
pub use tags::*;
pub use wire::{DecodeError, EncodeError, MAX_WIRE_SIZE, WIRE_VERSION};
