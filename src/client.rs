//! Client adapter: builds requests from already-typed parameters, assigns
//! fresh ids, and matches replies to awaiting calls.
//!
//! The outstanding-call table is the one piece of shared mutable state:
//! entries are inserted before send and removed on the matching reply or on
//! timeout. A reply whose id matches no outstanding call is discarded with a
//! logged anomaly, never treated as fatal; a late reply arriving after a
//! timeout removal hits the same discard path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{ClientError, TransportError};
use crate::request::{remove_trailing_nulls, JsonRpcRequest, RequestParams};
use crate::response::JsonRpcMessage;
use crate::transport::Transport;
use crate::types::{JsonRpcVersion, RequestId};

/// Client configuration. The version governs what the client may send: V1
/// never uses named parameters or notifications.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub version: JsonRpcVersion,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: JsonRpcVersion::V2,
            request_timeout: Duration::from_secs(30),
        }
    }
}

type CallOutcome = Result<JsonRpcMessage, ClientError>;
type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<CallOutcome>>>>;

/// A JSON-RPC client over a pluggable byte transport.
pub struct JsonRpcClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    next_id: AtomicI64,
    pending: PendingMap,
}

impl JsonRpcClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            next_id: AtomicI64::new(0),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of calls awaiting a reply. Entries disappear on reply or
    /// timeout, so this returns to zero when the client is idle.
    pub fn outstanding_calls(&self) -> usize {
        self.pending.lock().len()
    }

    /// Fresh id, unique for the lifetime of in-flight calls on this client.
    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn build_request(&self, id: RequestId, method: &str, params: Vec<Value>) -> JsonRpcRequest {
        match self.config.version {
            JsonRpcVersion::V2 => JsonRpcRequest::with_positional(id, method, params),
            JsonRpcVersion::V1 => {
                let params = remove_trailing_nulls(params);
                let params = if params.is_empty() {
                    None
                } else {
                    Some(RequestParams::Array(params))
                };
                JsonRpcRequest::new(JsonRpcVersion::V1, Some(id), method, params)
            }
        }
    }

    /// Issue a call and block until the reply arrives or the configured
    /// timeout expires.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ClientError> {
        self.call_with_timeout(method, params, self.config.request_timeout)
            .await
    }

    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        self.call_async(method, params)?.wait_timeout(timeout).await
    }

    /// Issue a call asynchronously: returns a pending handle immediately.
    /// Both this and the blocking path share the same id-matching logic.
    pub fn call_async(&self, method: &str, params: Vec<Value>) -> Result<CallHandle, ClientError> {
        let id = self.next_request_id();
        let request = self.build_request(id.clone(), method, params);
        self.send_request(id, request)
    }

    /// Issue a call with named parameters (JSON-RPC 2.0 only).
    pub fn call_named_async(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<CallHandle, ClientError> {
        if self.config.version == JsonRpcVersion::V1 {
            return Err(ClientError::Protocol(
                "named parameters require JSON-RPC 2.0".to_string(),
            ));
        }
        let id = self.next_request_id();
        let request = JsonRpcRequest::with_named(id.clone(), method, params);
        self.send_request(id, request)
    }

    /// Send a notification: no id, no reply ever, not even on server error.
    pub async fn notify(&self, method: &str, params: Vec<Value>) -> Result<(), ClientError> {
        if self.config.version == JsonRpcVersion::V1 {
            return Err(ClientError::Protocol(
                "JSON-RPC 1.0 has no notifications".to_string(),
            ));
        }
        let request = JsonRpcRequest::notification(method, params);
        let bytes = serde_json::to_vec(&request).map_err(TransportError::Json)?;
        match self.transport.exchange(bytes).await {
            Ok(None) => Ok(()),
            Ok(Some(_)) => {
                warn!(method, "discarding unexpected reply to a notification");
                Ok(())
            }
            Err(e) => Err(ClientError::Transport(e)),
        }
    }

    fn send_request(&self, id: RequestId, request: JsonRpcRequest) -> Result<CallHandle, ClientError> {
        let bytes = serde_json::to_vec(&request).map_err(TransportError::Json)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);
        debug!(id = %id, method = %request.method, "sending request");

        let transport = Arc::clone(&self.transport);
        let pending = Arc::clone(&self.pending);
        let own_id = id.clone();
        tokio::spawn(async move {
            match transport.exchange(bytes).await {
                Ok(Some(reply)) => route_reply(&pending, &own_id, &reply),
                Ok(None) => deliver(
                    &pending,
                    &own_id,
                    Err(ClientError::Protocol("no reply received".to_string())),
                ),
                Err(e) => deliver(&pending, &own_id, Err(ClientError::Transport(e))),
            }
        });

        Ok(CallHandle {
            id,
            rx,
            pending: Arc::clone(&self.pending),
        })
    }
}

/// Match a reply to the awaiting call by its echoed id. A null-id reply
/// (the server could not determine the id) is attributed to the call whose
/// exchange produced it.
fn route_reply(pending: &PendingMap, own_id: &RequestId, reply: &[u8]) {
    let message: JsonRpcMessage = match serde_json::from_slice(reply) {
        Ok(message) => message,
        Err(e) => {
            deliver(
                pending,
                own_id,
                Err(ClientError::Protocol(format!(
                    "reply was not a valid response envelope: {}",
                    e
                ))),
            );
            return;
        }
    };
    match message.id().cloned() {
        Some(reply_id) => deliver(pending, &reply_id, Ok(message)),
        None => deliver(pending, own_id, Ok(message)),
    }
}

/// At-most-once delivery: the first removal of the pending entry wins; any
/// later reply for the same id finds no entry and is discarded.
fn deliver(pending: &PendingMap, id: &RequestId, outcome: CallOutcome) {
    let entry = pending.lock().remove(id);
    match entry {
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => warn!(id = %id, "discarding reply matching no outstanding call"),
    }
}

/// A pending call. Await it with [`CallHandle::wait`] or
/// [`CallHandle::wait_timeout`]; dropping it abandons the call.
pub struct CallHandle {
    id: RequestId,
    rx: oneshot::Receiver<CallOutcome>,
    pending: PendingMap,
}

impl CallHandle {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub async fn wait(self) -> Result<Value, ClientError> {
        match self.rx.await {
            Ok(outcome) => interpret(outcome?),
            Err(_) => Err(ClientError::Protocol("call abandoned".to_string())),
        }
    }

    /// Wait with a bound. On expiry the pending entry is removed so a late
    /// reply is discarded, not resurrected.
    pub async fn wait_timeout(self, timeout: Duration) -> Result<Value, ClientError> {
        let CallHandle { id, rx, pending } = self;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => interpret(outcome?),
            Ok(Err(_)) => Err(ClientError::Protocol("call abandoned".to_string())),
            Err(_) => {
                pending.lock().remove(&id);
                debug!(id = %id, "call timed out, pending entry removed");
                Err(ClientError::Timeout)
            }
        }
    }
}

fn interpret(message: JsonRpcMessage) -> Result<Value, ClientError> {
    match message {
        JsonRpcMessage::Response(response) => Ok(response.result),
        JsonRpcMessage::Error(error) => Err(ClientError::Rpc(error.error)),
    }
}
