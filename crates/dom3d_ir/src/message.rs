//! Wire messages exchanged between a kernel and a graft
//!
//! Every frame is a JSON object tagged by `type`:
//!
//! ```text
//! kernel ── MutationRequest ──────────► graft
//! kernel ◄── MutationResponse ───────── graft   (exactly one per request)
//! kernel ◄── ChangeNotification ─────── graft   (fire-and-forget)
//! ```

use crate::error::MutationError;
use crate::property::{Mutation, Property};
use crate::value::Value;
use dom3d_core::LocallyUniqueId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlates a response with the request that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// Kernel → graft: apply `value` to `property` of element `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRequest {
    pub request_id: RequestId,
    pub id: LocallyUniqueId,
    pub property: String,
    pub value: Value,
}

impl MutationRequest {
    /// Recover the request ID from a request frame that failed to decode
    ///
    /// Returns the ID together with the rejection to answer it with:
    /// [`MutationError::UnknownElement`] when `id` is not a valid element ID,
    /// [`MutationError::UnsupportedMutation`] otherwise. Frames that are not
    /// requests, or whose `requestId` is unreadable, yield `None`.
    pub fn salvage(frame: &str) -> Option<(RequestId, MutationError)> {
        let raw: serde_json::Value = serde_json::from_str(frame).ok()?;
        let fields = raw.as_object()?;
        if fields.get("type")?.as_str()? != "MutationRequest" {
            return None;
        }
        let request_id = RequestId::new(fields.get("requestId")?.as_u64()?);
        let rejection = match fields.get("id").and_then(serde_json::Value::as_u64) {
            Some(_) => MutationError::UnsupportedMutation,
            None => MutationError::UnknownElement,
        };
        Some((request_id, rejection))
    }
}

/// Graft → kernel: outcome of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub request_id: RequestId,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MutationError>,
}

impl MutationResponse {
    /// A successful response
    pub fn success(request_id: RequestId) -> Self {
        Self {
            request_id,
            ok: true,
            error: None,
        }
    }

    /// A failed response
    pub fn failure(request_id: RequestId, error: MutationError) -> Self {
        Self {
            request_id,
            ok: false,
            error: Some(error),
        }
    }

    /// Build a response from an apply result
    pub fn from_result(request_id: RequestId, result: Result<(), MutationError>) -> Self {
        match result {
            Ok(()) => Self::success(request_id),
            Err(error) => Self::failure(request_id, error),
        }
    }

    /// Convert back into a result
    ///
    /// A failed response without an error kind is treated as unsupported.
    pub fn into_result(self) -> Result<(), MutationError> {
        if self.ok {
            Ok(())
        } else {
            Err(self.error.unwrap_or(MutationError::UnsupportedMutation))
        }
    }
}

/// Graft → every attached kernel: a property changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    pub id: LocallyUniqueId,
    pub property: Property,
    pub value: Value,
}

impl ChangeNotification {
    /// Notification for a mutation applied to `id`
    pub fn new(id: LocallyUniqueId, mutation: &Mutation) -> Self {
        Self {
            id,
            property: mutation.property(),
            value: mutation.to_value(),
        }
    }

    /// Recover the typed mutation
    pub fn mutation(&self) -> Option<Mutation> {
        Mutation::from_value(self.property, &self.value)
    }
}

/// Any frame on the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    MutationRequest(MutationRequest),
    MutationResponse(MutationResponse),
    ChangeNotification(ChangeNotification),
}

impl WireMessage {
    /// Encode as a JSON frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode a JSON frame
    pub fn from_json(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }
}

impl From<MutationRequest> for WireMessage {
    fn from(msg: MutationRequest) -> Self {
        Self::MutationRequest(msg)
    }
}

impl From<MutationResponse> for WireMessage {
    fn from(msg: MutationResponse) -> Self {
        Self::MutationResponse(msg)
    }
}

impl From<ChangeNotification> for WireMessage {
    fn from(msg: ChangeNotification) -> Self {
        Self::ChangeNotification(msg)
    }
}
