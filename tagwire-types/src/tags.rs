//! Tag context - the ambient set of tag key/value pairs in scope for
//! measurements.
//!
//! A [`TagContext`] is immutable after construction. Internally the tag
//! map sits behind an `Arc`, so cloning a context (for example to snapshot
//! the current one) is cheap and sharing across threads needs no locking.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;

/// An immutable set of tag key/value pairs.
///
/// Tags describe the scope measurements are recorded in ("service",
/// "region", ...). Contexts compare by their logical tag set, and because
/// the map is ordered, two equal contexts always [`encode`](crate::wire::encode)
/// to identical bytes.
///
/// # Example
///
/// ```rust
/// use tagwire_types::TagContext;
///
/// let context = TagContext::builder()
///     .insert("service", "checkout")
///     .insert("region", "eu-west-1")
///     .build();
///
/// assert_eq!(context.get("service"), Some("checkout"));
/// assert_eq!(context.len(), 2);
///
/// // Deriving a context leaves the original untouched.
/// let wider = context.with_tag("tier", "canary");
/// assert_eq!(context.len(), 2);
/// assert_eq!(wider.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagContext {
    tags: Arc<BTreeMap<String, String>>,
}

impl TagContext {
    /// The empty context - "no tags set".
    ///
    /// All empty contexts are equal; with `std` the backing allocation is
    /// created once per process and shared.
    #[cfg(feature = "std")]
    pub fn empty() -> Self {
        use std::sync::OnceLock;

        static EMPTY: OnceLock<Arc<BTreeMap<String, String>>> = OnceLock::new();
        Self {
            tags: EMPTY.get_or_init(|| Arc::new(BTreeMap::new())).clone(),
        }
    }

    /// The empty context - "no tags set".
    ///
    /// All empty contexts are equal. Without `std` there is no
    /// process-wide slot to share one allocation from, so each call
    /// allocates its own (still equal) empty map.
    #[cfg(not(feature = "std"))]
    pub fn empty() -> Self {
        Self {
            tags: Arc::new(BTreeMap::new()),
        }
    }

    /// Create a builder for constructing a context tag by tag.
    pub fn builder() -> TagContextBuilder {
        TagContextBuilder::new()
    }

    pub(crate) fn from_map(tags: BTreeMap<String, String>) -> Self {
        if tags.is_empty() {
            return Self::empty();
        }
        Self {
            tags: Arc::new(tags),
        }
    }

    /// Derive a new context with one tag added or replaced.
    ///
    /// Copy-on-write: the receiver is never modified.
    pub fn with_tag(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut tags = (*self.tags).clone();
        tags.insert(key.into(), value.into());
        Self::from_map(tags)
    }

    /// Derive a new context with one tag removed.
    ///
    /// Returns a context equal to the receiver if the key was absent.
    pub fn without_tag(&self, key: &str) -> Self {
        if !self.tags.contains_key(key) {
            return self.clone();
        }
        let mut tags = (*self.tags).clone();
        tags.remove(key);
        Self::from_map(tags)
    }

    /// Look up the value for a tag key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Number of tags in the context.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the context carries no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate over tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for TagContext {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TagContext {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tags.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TagContext {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::deserialize(deserializer).map(Self::from_map)
    }
}

/// Builder for [`TagContext`].
#[derive(Debug, Default)]
pub struct TagContextBuilder {
    tags: BTreeMap<String, String>,
}

impl TagContextBuilder {
    /// Create a new builder with no tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the tags of an existing context.
    pub fn from_context(context: &TagContext) -> Self {
        Self {
            tags: (*context.tags).clone(),
        }
    }

    /// Add or replace a tag.
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Remove a tag if present.
    pub fn remove(mut self, key: &str) -> Self {
        self.tags.remove(key);
        self
    }

    /// Build the immutable context.
    pub fn build(self) -> TagContext {
        TagContext::from_map(self.tags)
    }
}
