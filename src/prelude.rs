//! Convenient re-exports of the most commonly used types.
//!
//! ```rust
//! use wirecall::prelude::*;
//! ```

pub use crate::client::{CallHandle, ClientConfig, JsonRpcClient};
pub use crate::coerce::{ParamSpec, TargetType};
pub use crate::dispatch::RpcServer;
pub use crate::error::{
    ClientError, HandlerError, InvalidArgument, JsonRpcErrorCode, JsonRpcErrorObject,
    RegistryError, TransportError,
};
pub use crate::registry::{
    DelegatingRegistry, HandlerDescriptor, InvocationMode, MethodRegistry, ParamDecl, ParamType,
    RpcHandler, ServiceRegistry,
};
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcError, JsonRpcMessage, JsonRpcResponse};
pub use crate::transport::{HttpTransport, LocalTransport, Transport};
pub use crate::types::{JsonRpcVersion, RequestId};

// Standard error codes
pub use crate::error_codes::*;
