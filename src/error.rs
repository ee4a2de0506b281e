use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Reserved protocol-level JSON-RPC error codes plus the server-error range.
/// Application/handler errors use codes outside the reserved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Implementation-defined server errors: -32099 to -32000
    ServerError(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => -32700,
            JsonRpcErrorCode::InvalidRequest => -32600,
            JsonRpcErrorCode::MethodNotFound => -32601,
            JsonRpcErrorCode::InvalidParams => -32602,
            JsonRpcErrorCode::InternalError => -32603,
            JsonRpcErrorCode::ServerError(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// The `error` member of a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method '{}' not found", method)),
            None,
        )
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            Some(message.to_string()),
            None,
        )
    }

    /// Fixed generic message: internal detail never reaches the wire.
    pub fn internal_error() -> Self {
        Self::new(JsonRpcErrorCode::InternalError, None, None)
    }

    pub fn server_error(code: i64, message: &str, data: Option<Value>) -> Self {
        debug_assert!(
            (-32099..=-32000).contains(&code),
            "server error code must be in range -32099 to -32000"
        );
        Self::new(
            JsonRpcErrorCode::ServerError(code),
            Some(message.to_string()),
            data,
        )
    }

    /// True for codes in the range reserved by the JSON-RPC 2.0 specification.
    pub fn is_reserved_code(code: i64) -> bool {
        (-32768..=-32000).contains(&code)
    }
}

impl fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// A handler's intentional domain failure. Surfaced verbatim on the wire:
/// the handler controls code, message, and data. Codes should sit outside
/// the reserved range (`JsonRpcErrorObject::is_reserved_code`); the engine
/// does not remap them.
#[derive(Debug, Clone, Error)]
#[error("{message} (code {code})")]
pub struct HandlerError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl HandlerError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn into_error_object(self) -> JsonRpcErrorObject {
        JsonRpcErrorObject {
            code: self.code,
            message: self.message,
            data: self.data,
        }
    }
}

/// Registration-time failures. Registration fails fast; the registry is
/// immutable once built.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("method '{0}' is already registered")]
    DuplicateMethod(String),
}

/// The transport collaborator could not deliver bytes.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reply was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport closed unexpectedly")]
    Closed,

    #[error("transport failure: {0}")]
    Failed(String),
}

/// One CLI/client argument that failed coercion. Carries the offending
/// position and raw text; never reaches the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentError {
    pub position: usize,
    pub raw: String,
    pub reason: String,
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "argument {} ({:?}): {}",
            self.position, self.raw, self.reason
        )
    }
}

/// All failing positions of one coercion pass, reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidArgument {
    pub failures: Vec<ArgumentError>,
}

impl std::error::Error for InvalidArgument {}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid argument(s): ")?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

/// Client-side failure taxonomy. These never reach the wire; they are raised
/// to calling code as typed failures so callers can branch on cause.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No reply within the caller-specified bound. The pending entry is
    /// removed on expiry; a late reply is discarded, not resurrected.
    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// CLI/client-side coercion failure; no request is ever sent.
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    /// The server returned an error object (protocol-reserved or
    /// handler-chosen code).
    #[error("server returned error: {0}")]
    Rpc(JsonRpcErrorObject),

    /// The reply was not a valid response envelope, or the call was used in
    /// a way the negotiated protocol version does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Get the JSON-RPC error code if the server returned an error object.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            ClientError::Rpc(obj) => Some(obj.code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_codes() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert!(JsonRpcErrorObject::is_reserved_code(-32602));
        assert!(!JsonRpcErrorObject::is_reserved_code(-5));
    }

    #[test]
    fn test_error_object_serialization() {
        let obj = JsonRpcErrorObject::method_not_found("nope");
        let text = serde_json::to_string(&obj).unwrap();
        assert_eq!(text, r#"{"code":-32601,"message":"Method 'nope' not found"}"#);
    }

    #[test]
    fn test_handler_error_passes_through() {
        let obj = HandlerError::new(-8, "Invalid amount")
            .with_data(serde_json::json!({"amount": -1}))
            .into_error_object();
        assert_eq!(obj.code, -8);
        assert_eq!(obj.message, "Invalid amount");
        assert!(obj.data.is_some());
    }

    #[test]
    fn test_invalid_argument_lists_all_positions() {
        let err = InvalidArgument {
            failures: vec![
                ArgumentError {
                    position: 0,
                    raw: "maybe".into(),
                    reason: "expected true or false".into(),
                },
                ArgumentError {
                    position: 2,
                    raw: "3.5".into(),
                    reason: "not an integer".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("argument 0"));
        assert!(text.contains("argument 2"));
    }
}
