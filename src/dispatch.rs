//! Invocation engine and the transport-facing server adapter.
//!
//! The adapter's surface is bytes in, optional bytes out: a transport
//! collaborator hands it a payload and forwards whatever reply it returns.
//! Per call the engine resolves the method, coerces parameters against the
//! declared signature, runs the handler on its own task, and folds the
//! outcome into a response. Notifications (V2, no id) are never answered,
//! even on failure; under V1 every request is answered.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::coerce::coerce_params;
use crate::error::JsonRpcErrorObject;
use crate::registry::MethodRegistry;
use crate::request::{Envelope, JsonRpcRequest};
use crate::response::{JsonRpcError, JsonRpcMessage};
use crate::types::{JsonRpcVersion, RequestId};

/// Dispatches parsed requests against an immutable method registry.
///
/// Cloning is cheap (the registry is shared); batch elements run on their
/// own tasks, so concurrent dispatch needs no locking here.
#[derive(Clone)]
pub struct RpcServer {
    registry: Arc<dyn MethodRegistry>,
}

impl RpcServer {
    pub fn new(registry: Arc<dyn MethodRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn MethodRegistry> {
        &self.registry
    }

    /// The `serve(handler: bytes -> optional bytes)` contract: feed this to
    /// any transport collaborator. `None` means no reply is sent (the
    /// payload was a notification, or a batch of notifications).
    pub async fn handle_payload(&self, payload: &[u8]) -> Option<Vec<u8>> {
        match Envelope::parse(payload) {
            Err(malformed) => {
                debug!(error = %malformed, "rejecting malformed envelope");
                encode(&JsonRpcMessage::Error(JsonRpcError::parse_error()))
            }
            Ok(Envelope::Single(value)) => {
                let reply = self.dispatch_value(value, false).await?;
                encode(&reply)
            }
            Ok(Envelope::Batch(elements)) => {
                if elements.is_empty() {
                    // An empty batch draws a single error object, not an array
                    return encode(&JsonRpcMessage::Error(JsonRpcError::invalid_request(
                        None,
                        Some("empty batch".to_string()),
                    )));
                }
                let replies = self.dispatch_batch(elements).await?;
                match serde_json::to_vec(&replies) {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        error!(error = %e, "failed to serialize batch reply");
                        None
                    }
                }
            }
        }
    }

    /// Dispatch batch elements independently and concurrently. The reply
    /// array is completion-ordered; ids disambiguate. Notification elements
    /// are omitted, and an all-notification batch produces no reply at all.
    async fn dispatch_batch(&self, elements: Vec<Value>) -> Option<Vec<JsonRpcMessage>> {
        let tasks: Vec<_> = elements
            .into_iter()
            .map(|element| {
                let server = self.clone();
                tokio::spawn(async move { server.dispatch_value(element, true).await })
            })
            .collect();

        let mut replies = Vec::new();
        for joined in join_all(tasks).await {
            match joined {
                Ok(Some(message)) => replies.push(message),
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "batch dispatch task failed");
                    replies.push(JsonRpcMessage::error(
                        JsonRpcVersion::V2,
                        None,
                        JsonRpcErrorObject::internal_error(),
                    ));
                }
            }
        }

        if replies.is_empty() {
            None
        } else {
            Some(replies)
        }
    }

    /// Dispatch one raw envelope element. Protocol-shape failures become
    /// InvalidRequest responses with whatever id could be recovered.
    async fn dispatch_value(&self, value: Value, in_batch: bool) -> Option<JsonRpcMessage> {
        let recovered_id = extract_id(&value);
        let recovered_version = extract_version(&value);

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcMessage::error(
                    recovered_version,
                    recovered_id,
                    JsonRpcErrorObject::invalid_request(Some(Value::String(e.to_string()))),
                ));
            }
        };
        if in_batch && request.version == JsonRpcVersion::V1 {
            return Some(JsonRpcMessage::error(
                request.version,
                request.id,
                JsonRpcErrorObject::invalid_request(Some(Value::String(
                    "batch requests require JSON-RPC 2.0".to_string(),
                ))),
            ));
        }
        self.handle_request(request).await
    }

    /// Typed dispatch surface. Returns `None` exactly when the request is a
    /// notification; a request with a present id always yields one message.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcMessage> {
        let version = request.version;
        let id = request.id.clone();
        let is_notification = request.is_notification();

        let outcome = self.validate_and_invoke(request).await;

        if is_notification {
            if let Err(error) = outcome {
                // Never answered, not even on failure
                debug!(code = error.code, message = %error.message, "notification failed, reply suppressed");
            }
            return None;
        }

        Some(match outcome {
            Ok(result) => JsonRpcMessage::success(version, id, result),
            Err(error) => JsonRpcMessage::error(version, id, error),
        })
    }

    async fn validate_and_invoke(
        &self,
        request: JsonRpcRequest,
    ) -> Result<Value, JsonRpcErrorObject> {
        if request.method.is_empty() {
            return Err(JsonRpcErrorObject::invalid_request(Some(Value::String(
                "missing method name".to_string(),
            ))));
        }
        if request.version == JsonRpcVersion::V1 {
            if let Some(params) = &request.params {
                if params.is_named() {
                    return Err(JsonRpcErrorObject::invalid_request(Some(Value::String(
                        "named parameters require JSON-RPC 2.0".to_string(),
                    ))));
                }
            }
        }
        self.invoke(&request).await
    }

    /// Received -> Resolved -> Coerced -> Invoking -> Completed/HandlerFailed.
    /// All parameter positions are checked before the handler runs; a failure
    /// on any position aborts the call with no partial invocation.
    async fn invoke(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcErrorObject> {
        debug!(method = %request.method, "dispatching request");

        let method = match self.registry.lookup(&request.method) {
            Some(method) => method,
            None => {
                warn!(method = %request.method, "no such method");
                return Err(JsonRpcErrorObject::method_not_found(&request.method));
            }
        };

        let args = coerce_params(&method.descriptor.params, request.params.as_ref())
            .map_err(|e| JsonRpcErrorObject::invalid_params(&e.to_string()))?;

        // The handler runs on its own task and may complete on any thread;
        // the join handle delivers its outcome at most once. A panicking
        // handler surfaces as a join error, never as a torn response.
        let handler = Arc::clone(&method.handler);
        let joined = tokio::spawn(async move { handler.call(args).await }).await;

        match joined {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(handler_error)) => Err(handler_error.into_error_object()),
            Err(e) => {
                error!(method = %request.method, error = %e, "handler task failed");
                Err(JsonRpcErrorObject::internal_error())
            }
        }
    }
}

fn encode(message: &JsonRpcMessage) -> Option<Vec<u8>> {
    match serde_json::to_vec(message) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!(error = %e, "failed to serialize reply");
            None
        }
    }
}

fn extract_id(value: &Value) -> Option<RequestId> {
    match value.get("id") {
        Some(Value::String(s)) => Some(RequestId::String(s.clone())),
        Some(Value::Number(n)) => n.as_i64().map(RequestId::Number),
        _ => None,
    }
}

fn extract_version(value: &Value) -> JsonRpcVersion {
    match value.get("jsonrpc").and_then(Value::as_str) {
        Some("1.0") | None => JsonRpcVersion::V1,
        _ => JsonRpcVersion::V2,
    }
}
