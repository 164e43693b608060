//! Error types shared by both realms

use crate::message::RequestId;
use dom3d_core::LocallyUniqueId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure kinds surfaced on `MutationResponse.error` and as ticket rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum MutationError {
    /// ID not present in the current correlated graph
    #[error("element is not part of the current model")]
    UnknownElement,

    /// Property name or value shape not valid for the element's kind
    #[error("mutation is not supported for this element")]
    UnsupportedMutation,

    /// Applied to some but not all native objects of a correlated group
    #[error("mutation reached only part of the correlated group")]
    PartialApplication,

    /// The kernel or graft was torn down while the request was outstanding
    #[error("model was deactivated")]
    Deactivated,

    /// Transport ended before a response arrived
    #[error("channel closed before a response arrived")]
    ChannelClosed,
}

/// Errors raised while decoding a snapshot
#[derive(Debug, Error)]
pub enum CodecError {
    /// Snapshot JSON could not be parsed
    #[error("Malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// Two records share one ID
    #[error("Duplicate element id {0}")]
    DuplicateId(LocallyUniqueId),

    /// A record references an ID that is absent or of the wrong kind
    #[error("Element {element} references missing {expected} {target}")]
    DanglingReference {
        /// Referencing record
        element: LocallyUniqueId,
        /// Referenced ID
        target: LocallyUniqueId,
        /// Kind the reference should resolve to
        expected: &'static str,
    },
}

/// Errors raised by a channel endpoint
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The peer (or this endpoint) has closed the channel
    #[error("Channel closed")]
    Closed,

    /// A message could not be encoded
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A frame could not be decoded into a wire message
    #[error("Failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),

    /// A request frame failed to decode but still names its request ID
    ///
    /// The sender is waiting on `request_id`, so the frame must be answered
    /// with `rejection` rather than dropped.
    #[error("Malformed request {request_id}: {source}")]
    MalformedRequest {
        request_id: RequestId,
        rejection: MutationError,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for snapshot decoding
pub type CodecResult<T> = std::result::Result<T, CodecError>;
