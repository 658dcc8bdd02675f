//! Aggregation descriptors - how raw measurements collapse into summary
//! statistics.
//!
//! A descriptor only *describes* the bucketing; it never computes
//! statistics itself. Descriptors are built once at view-definition time,
//! defensively copied, and shared read-only for the lifetime of the view.

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::Microseconds;

/// Describes how a series of individual measurements is aggregated.
///
/// This is a closed union: exactly two kinds of aggregation exist, and
/// consumers handle both explicitly, either through a `match` or through
/// [`Aggregation::fold`]. There is no downcasting API.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Aggregation {
    /// Aggregate by the distribution of measured values.
    Distribution(DistributionAggregation),
    /// Aggregate over time intervals.
    Interval(IntervalAggregation),
}

impl Aggregation {
    /// Apply exactly one of the two handlers, depending on the variant.
    ///
    /// The handler matching this descriptor's variant is invoked exactly
    /// once with the variant's own value; the other handler is never
    /// called.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tagwire_types::{Aggregation, IntervalAggregation};
    ///
    /// let agg = Aggregation::Interval(IntervalAggregation::new());
    /// let kind = agg.fold(|_| "distribution", |_| "interval");
    /// assert_eq!(kind, "interval");
    /// ```
    pub fn fold<T, D, I>(&self, on_distribution: D, on_interval: I) -> T
    where
        D: FnOnce(&DistributionAggregation) -> T,
        I: FnOnce(&IntervalAggregation) -> T,
    {
        match self {
            Aggregation::Distribution(d) => on_distribution(d),
            Aggregation::Interval(i) => on_interval(i),
        }
    }
}

impl From<DistributionAggregation> for Aggregation {
    fn from(d: DistributionAggregation) -> Self {
        Aggregation::Distribution(d)
    }
}

impl From<IntervalAggregation> for Aggregation {
    fn from(i: IntervalAggregation) -> Self {
        Aggregation::Interval(i)
    }
}

/// An aggregation based on the distribution of measured values.
///
/// A distribution aggregation may optionally carry a histogram of the
/// values in the population. With boundaries `bounds` of length B, the
/// histogram has B + 1 buckets:
///
/// - `[-inf, bounds[0])` - the underflow bucket
/// - `[bounds[i-1], bounds[i])` - B - 1 finite buckets
/// - `[bounds[B-1], +inf)` - the overflow bucket
///
/// Lower bounds are inclusive, upper bounds exclusive. With zero
/// boundaries there is a single bucket spanning everything, which is both
/// underflow and overflow. Without boundaries (`None`) no histogram is
/// requested and only summary statistics are computed.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionAggregation {
    #[cfg_attr(
        feature = "serde",
        serde(
            with = "opt_boundaries",
            default,
            skip_serializing_if = "Option::is_none"
        )
    )]
    bucket_boundaries: Option<Arc<[f64]>>,
}

impl DistributionAggregation {
    /// Create a distribution aggregation without a histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a distribution aggregation with the given histogram bucket
    /// boundaries.
    ///
    /// The boundaries are copied into shared immutable storage; later
    /// changes to the source collection cannot affect the descriptor.
    ///
    /// # Panics
    ///
    /// Panics if any boundary is non-finite or the sequence is not
    /// strictly increasing. A malformed boundary list is a bug in the
    /// caller, not a runtime condition to recover from.
    pub fn with_bucket_boundaries(boundaries: impl IntoIterator<Item = f64>) -> Self {
        let boundaries: Vec<f64> = boundaries.into_iter().collect();
        if let Err(violation) = validate_bucket_boundaries(&boundaries) {
            panic!("{violation}");
        }
        Self {
            bucket_boundaries: Some(boundaries.into()),
        }
    }

    /// The histogram bucket boundaries, or `None` if no histogram was
    /// requested.
    pub fn bucket_boundaries(&self) -> Option<&[f64]> {
        self.bucket_boundaries.as_deref()
    }

    /// Number of histogram buckets, or `None` if no histogram was
    /// requested.
    ///
    /// B boundaries define B + 1 buckets; zero boundaries define the
    /// single bucket spanning `(-inf, +inf)`.
    pub fn bucket_count(&self) -> Option<usize> {
        self.bucket_boundaries.as_ref().map(|b| b.len() + 1)
    }

    /// Index of the histogram bucket that `value` falls into, or `None`
    /// if no histogram was requested.
    ///
    /// NaN compares below every boundary and lands in the underflow
    /// bucket.
    pub fn bucket_index(&self, value: f64) -> Option<usize> {
        self.bucket_boundaries
            .as_ref()
            .map(|bounds| bounds.partition_point(|&b| b <= value))
    }
}

/// The bucket-boundary invariant, shared by every path that can build a
/// [`DistributionAggregation`]: the constructor panics on violation, the
/// serde path reports it as a deserialization error.
fn validate_bucket_boundaries(boundaries: &[f64]) -> Result<(), String> {
    for (i, bound) in boundaries.iter().enumerate() {
        if !bound.is_finite() {
            return Err(format!(
                "bucket boundary at index {i} is not finite: {bound}"
            ));
        }
        if i > 0 && boundaries[i - 1] >= *bound {
            return Err(format!(
                "bucket boundaries must be strictly increasing: \
                 bounds[{}] = {} >= bounds[{i}] = {bound}",
                i - 1,
                boundaries[i - 1],
            ));
        }
    }
    Ok(())
}

/// An aggregation over time intervals.
///
/// May optionally carry the sizes of the time windows to aggregate over;
/// without sizes (`None`) the aggregation is cumulative over the whole
/// lifetime of the view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalAggregation {
    #[cfg_attr(
        feature = "serde",
        serde(
            with = "opt_arc_slice",
            default,
            skip_serializing_if = "Option::is_none"
        )
    )]
    interval_sizes: Option<Arc<[Microseconds]>>,
}

impl IntervalAggregation {
    /// Create a cumulative (non-windowed) interval aggregation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interval aggregation with the given window sizes.
    ///
    /// Accepts anything convertible to [`Microseconds`], including
    /// `core::time::Duration`. The sizes are copied into shared immutable
    /// storage.
    pub fn with_interval_sizes<I, D>(sizes: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Microseconds>,
    {
        let sizes: Vec<Microseconds> = sizes.into_iter().map(Into::into).collect();
        Self {
            interval_sizes: Some(sizes.into()),
        }
    }

    /// The interval window sizes, or `None` for cumulative aggregation.
    pub fn interval_sizes(&self) -> Option<&[Microseconds]> {
        self.interval_sizes.as_deref()
    }

    /// Whether this aggregation is cumulative (no windows requested).
    pub fn is_cumulative(&self) -> bool {
        self.interval_sizes.is_none()
    }
}

/// Serde adapter for `Option<Arc<[T]>>` fields.
///
/// serde only supports `Arc` directly behind its `rc` feature; encoding
/// through a plain sequence keeps the wire shape independent of the
/// in-memory sharing.
#[cfg(feature = "serde")]
mod opt_arc_slice {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Arc<[T]>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(items) => serializer.serialize_some(&items[..]),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Arc<[T]>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.map(Arc::from))
    }
}

/// Serde adapter for the bucket-boundaries field.
///
/// Same encoding as [`opt_arc_slice`], plus the boundary invariant:
/// deserialized input is untrusted, so non-finite or non-increasing
/// sequences become a deserialization error instead of a descriptor that
/// misplaces every measurement.
#[cfg(feature = "serde")]
mod opt_boundaries {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use serde::{Deserialize, Deserializer};

    use super::validate_bucket_boundaries;

    pub use super::opt_arc_slice::serialize;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Arc<[f64]>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let boundaries = Option::<Vec<f64>>::deserialize(deserializer)?;
        if let Some(boundaries) = &boundaries {
            validate_bucket_boundaries(boundaries).map_err(serde::de::Error::custom)?;
        }
        Ok(boundaries.map(Arc::from))
    }
}
