//! Transport collaborator seam.
//!
//! The runtime depends only on byte-array request/reply exchange, never on a
//! specific connection mechanism. `HttpTransport` is the stock client-side
//! implementation; `LocalTransport` wires a client straight into an
//! in-process server (used by the tests and by embedders that host both
//! ends).

use async_trait::async_trait;

use crate::dispatch::RpcServer;
use crate::error::TransportError;

/// Client-side collaborator contract: deliver a serialized request, return
/// the reply bytes. `None` means the peer sent no reply (the payload was a
/// notification).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, payload: Vec<u8>) -> Result<Option<Vec<u8>>, TransportError>;
}

/// HTTP POST transport. Connection handling and TLS trust live entirely in
/// `reqwest`; this type only moves bytes.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, payload: Vec<u8>) -> Result<Option<Vec<u8>>, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;
        let body = response.bytes().await?;
        if body.is_empty() {
            Ok(None)
        } else {
            Ok(Some(body.to_vec()))
        }
    }
}

/// In-process loopback: hands the payload directly to an `RpcServer`.
pub struct LocalTransport {
    server: RpcServer,
}

impl LocalTransport {
    pub fn new(server: RpcServer) -> Self {
        Self { server }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn exchange(&self, payload: Vec<u8>) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.server.handle_payload(&payload).await)
    }
}
