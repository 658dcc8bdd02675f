//! Transport-facing propagation helpers.
//!
//! Thin glue between the [`wire`] codec and the current-context slot:
//! inject on the way out, extract on the way in. Extraction treats
//! malformed peer input as "no context" rather than an error the caller
//! has to handle on every request path; the discarded input is recorded
//! at debug level.

use tagwire_types::{wire, DecodeError, EncodeError, TagContext};
use tracing::debug;

use crate::scope;

/// Encode a context for an outbound call.
///
/// Same contract as [`wire::encode`]; provided here so transports only
/// need this module.
pub fn inject(context: &TagContext) -> Result<Vec<u8>, EncodeError> {
    wire::encode(context)
}

/// Encode the calling thread's current context for an outbound call.
pub fn inject_current() -> Result<Vec<u8>, EncodeError> {
    wire::encode(&scope::current())
}

/// Decode peer-supplied bytes into a context.
///
/// Same contract as [`wire::decode`]: empty input is the empty context,
/// malformed input is an error value.
pub fn extract(bytes: &[u8]) -> Result<TagContext, DecodeError> {
    wire::decode(bytes)
}

/// Decode peer-supplied bytes, falling back to the empty context.
///
/// Malformed input from a peer is expected operational reality (older
/// versions, proxies mangling headers, outright garbage), so this variant
/// logs the failure at debug level and carries on with "no tags". The
/// calling thread's current context is never touched.
pub fn extract_or_default(bytes: &[u8]) -> TagContext {
    match wire::decode(bytes) {
        Ok(context) => context,
        Err(error) => {
            debug!(%error, len = bytes.len(), "discarding malformed tag context");
            TagContext::empty()
        }
    }
}
