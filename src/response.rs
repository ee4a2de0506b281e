use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonRpcErrorObject;
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response. Carries `result`, never `error`.
///
/// `id` serializes as JSON `null` when the request id could not be
/// determined; it is never omitted. Field order is fixed so that repeated
/// emissions of logically identical responses are byte-identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc", default = "JsonRpcVersion::v1")]
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn new(version: JsonRpcVersion, id: Option<RequestId>, result: Value) -> Self {
        Self { version, id, result }
    }

    pub fn success(id: RequestId, result: Value) -> Self {
        Self::new(JsonRpcVersion::V2, Some(id), result)
    }
}

/// An error JSON-RPC response. Carries `error`, never `result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc", default = "JsonRpcVersion::v1")]
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcError {
    pub fn new(version: JsonRpcVersion, id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self { version, id, error }
    }

    pub fn parse_error() -> Self {
        Self::new(JsonRpcVersion::V2, None, JsonRpcErrorObject::parse_error(None))
    }

    pub fn invalid_request(id: Option<RequestId>, detail: Option<String>) -> Self {
        Self::new(
            JsonRpcVersion::V2,
            id,
            JsonRpcErrorObject::invalid_request(detail.map(Value::String)),
        )
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "JSON-RPC error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Union of the two response shapes. `result` and `error` are mutually
/// exclusive by construction; the absent member is omitted on the wire.
///
/// The error variant is tried first when deserializing: legacy V1 servers
/// send both members with one null, and such a reply must read as an error
/// whenever `error` is non-null.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Error(JsonRpcError),
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    pub fn success(version: JsonRpcVersion, id: Option<RequestId>, result: Value) -> Self {
        Self::Response(JsonRpcResponse::new(version, id, result))
    }

    pub fn error(version: JsonRpcVersion, id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self::Error(JsonRpcError::new(version, id, error))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// Get the request id echoed by this message, if it could be determined.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Response(resp) => resp.id.as_ref(),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}
