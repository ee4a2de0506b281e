use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{JsonRpcVersion, RequestId};

/// Parameters for a JSON-RPC request. A single call is homogeneous in shape:
/// all-positional (array) or all-named (object, V2 only).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object (JSON-RPC 2.0 only)
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Get a parameter by name (for object params)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (for array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Array(vec) => vec.len(),
            RequestParams::Object(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_named(&self) -> bool {
        matches!(self, RequestParams::Object(_))
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

/// A JSON-RPC request. A request without an `id` is a notification under
/// JSON-RPC 2.0 and is never answered, even on error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc", default = "JsonRpcVersion::v1")]
    pub version: JsonRpcVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
}

impl JsonRpcRequest {
    pub fn new(
        version: JsonRpcVersion,
        id: Option<RequestId>,
        method: impl Into<String>,
        params: Option<RequestParams>,
    ) -> Self {
        Self {
            version,
            id,
            method: method.into(),
            params,
        }
    }

    /// Create a V2 request with positional parameters. Trailing JSON `null`s
    /// are stripped so that server-side defaults apply for those positions.
    pub fn with_positional(
        id: RequestId,
        method: impl Into<String>,
        params: Vec<Value>,
    ) -> Self {
        let params = remove_trailing_nulls(params);
        let params = if params.is_empty() {
            None
        } else {
            Some(RequestParams::Array(params))
        };
        Self::new(JsonRpcVersion::V2, Some(id), method, params)
    }

    /// Create a V2 request with named parameters.
    pub fn with_named(id: RequestId, method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self::new(
            JsonRpcVersion::V2,
            Some(id),
            method,
            Some(RequestParams::Object(params)),
        )
    }

    /// Create a V2 notification (no id, never answered).
    pub fn notification(method: impl Into<String>, params: Vec<Value>) -> Self {
        let params = remove_trailing_nulls(params);
        let params = if params.is_empty() {
            None
        } else {
            Some(RequestParams::Array(params))
        };
        Self::new(JsonRpcVersion::V2, None, method, params)
    }

    /// True when this request must not be answered. V1 has no notification
    /// concept, so an absent id only marks a notification under V2.
    pub fn is_notification(&self) -> bool {
        self.version == JsonRpcVersion::V2 && self.id.is_none()
    }

    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }

    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.as_ref()?.get_index(index)
    }
}

/// Strip trailing `null`s so that those positions fall back to server-side
/// defaults. `null`s before the last non-null parameter are kept.
pub(crate) fn remove_trailing_nulls(mut params: Vec<Value>) -> Vec<Value> {
    while matches!(params.last(), Some(Value::Null)) {
        params.pop();
    }
    params
}

/// The wire payload was not a well-formed JSON-RPC envelope. The server
/// adapter converts this into a ParseError response with a null id.
#[derive(Debug, Error)]
#[error("malformed JSON-RPC envelope: {0}")]
pub struct MalformedEnvelope(pub String);

/// A parsed wire payload: one request object, or a batch array (V2 only).
///
/// Batch elements are kept as raw values; an element that fails to parse as a
/// request becomes a per-element InvalidRequest response during dispatch,
/// not a batch-wide failure.
#[derive(Debug)]
pub enum Envelope {
    Single(Value),
    Batch(Vec<Value>),
}

impl Envelope {
    pub fn parse(payload: &[u8]) -> Result<Self, MalformedEnvelope> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| MalformedEnvelope(e.to_string()))?;
        match value {
            Value::Object(_) => Ok(Envelope::Single(value)),
            Value::Array(elements) => Ok(Envelope::Batch(elements)),
            other => Err(MalformedEnvelope(format!(
                "expected object or array, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
