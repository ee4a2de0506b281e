//! # wirecall
//!
//! A transport-agnostic JSON-RPC 1.0/2.0 request/response runtime.
//! A client sends typed method calls over a pluggable byte transport and
//! receives typed results or structured errors; a server exposes explicitly
//! registered handlers as JSON-RPC methods without per-method boilerplate.
//!
//! ## Features
//! - JSON-RPC 2.0 requests, notifications, and batches; JSON-RPC 1.0
//!   requests (positional params, every request answered)
//! - Explicit method registration with declared signatures, plus delegating
//!   composition of several services under one dispatch surface
//! - One coercion policy for CLI strings and wire JSON parameters
//! - Async invocation with handler failures kept distinct from internal
//!   faults
//! - Client-side id matching, timeouts, and late-reply discard

pub mod cli;
pub mod client;
pub mod coerce;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

pub mod prelude;

// Re-export main types
pub use client::{CallHandle, ClientConfig, JsonRpcClient};
pub use coerce::{coerce_cli_args, coerce_params, ParamSpec, ParamsError, TargetType};
pub use dispatch::RpcServer;
pub use error::{
    ArgumentError, ClientError, HandlerError, InvalidArgument, JsonRpcErrorCode,
    JsonRpcErrorObject, RegistryError, TransportError,
};
pub use registry::{
    DelegatingRegistry, HandlerDescriptor, InvocationMode, MethodRegistry, ParamDecl, ParamType,
    RpcHandler, ServiceRegistry,
};
pub use request::{Envelope, JsonRpcRequest, MalformedEnvelope, RequestParams};
pub use response::{JsonRpcError, JsonRpcMessage, JsonRpcResponse};
pub use transport::{HttpTransport, LocalTransport, Transport};
pub use types::{JsonRpcVersion, RequestId};

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
