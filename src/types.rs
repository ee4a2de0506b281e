use std::fmt;

use serde::{Deserialize, Serialize};

/// A uniquely identifying ID for a JSON-RPC request.
/// Can be a string or a number. A request without an id is a notification
/// (JSON-RPC 2.0) and is represented as `Option<RequestId>::None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl RequestId {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RequestId::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// JSON-RPC protocol version.
///
/// The version governs three behaviors:
/// - V2 messages carry `"jsonrpc":"2.0"` (V1 messages carry `"1.0"`),
/// - named (object) parameters are permitted under V2 only,
/// - batch requests and true notifications exist under V2 only. V1 has no
///   notification concept: every V1 request gets a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcVersion {
    V1,
    V2,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V1 => "1.0",
            JsonRpcVersion::V2 => "2.0",
        }
    }

    /// Deserialization default: a payload with no `jsonrpc` member is V1.
    pub(crate) fn v1() -> Self {
        JsonRpcVersion::V1
    }
}

impl Default for JsonRpcVersion {
    fn default() -> Self {
        JsonRpcVersion::V2
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "1.0" => Ok(JsonRpcVersion::V1),
            "2.0" => Ok(JsonRpcVersion::V2),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: {}",
                s
            ))),
        }
    }
}
