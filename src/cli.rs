//! Client-tool surface: `wirecall <method> [arg...]`.
//!
//! Arguments are coerced to typed JSON values before any request is built;
//! a conversion failure is reported locally with exit code 1 and no request
//! is ever sent. Exit code 0 means the result was printed to stdout; any
//! JSON-RPC error, transport failure, or timeout exits 1 with a message on
//! stderr. Option tokenizing and help text belong to clap, not to the
//! runtime.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;

use crate::client::{ClientConfig, JsonRpcClient};
use crate::coerce::{coerce_cli_args, ParamSpec, TargetType};
use crate::error::InvalidArgument;
use crate::transport::HttpTransport;
use crate::types::JsonRpcVersion;

/// Command-line options for the `wirecall` binary.
#[derive(Parser, Debug)]
#[command(name = "wirecall", about = "Send a JSON-RPC request to a server")]
pub struct Cli {
    /// Server endpoint URL
    #[arg(long, default_value = "http://127.0.0.1:8332/")]
    pub url: String,

    /// JSON-RPC protocol version (1 or 2)
    #[arg(long = "rpc-version", default_value_t = 2)]
    pub rpc_version: u8,

    /// Per-call timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Comma-separated per-position type tags (str, bool, int, float, json)
    #[arg(long, value_delimiter = ',')]
    pub types: Vec<String>,

    /// JSON-RPC method name
    pub method: String,

    /// Method arguments, coerced per the type tags
    pub args: Vec<String>,
}

/// Argument-conversion and call-execution surface behind the binary.
///
/// An embedder may pre-register per-method signatures so that callers don't
/// need `--types` for known methods; positions without a tag pass through as
/// strings.
#[derive(Default)]
pub struct CliTool {
    signatures: HashMap<String, Vec<TargetType>>,
}

impl CliTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the positional type tags for a method.
    pub fn with_signature(mut self, method: impl Into<String>, types: Vec<TargetType>) -> Self {
        self.signatures.insert(method.into(), types);
        self
    }

    /// Coerce raw arguments for `method`. Explicit tags win over a
    /// registered signature; unspecified positions pass the raw string
    /// through. All failing positions are reported together and no request
    /// is built on failure.
    pub fn build_params(
        &self,
        method: &str,
        overrides: &[TargetType],
        raw_args: &[String],
    ) -> Result<Vec<Value>, InvalidArgument> {
        let tags: &[TargetType] = if !overrides.is_empty() {
            overrides
        } else {
            self.signatures.get(method).map(Vec::as_slice).unwrap_or(&[])
        };
        let specs: Vec<ParamSpec> = tags
            .iter()
            .enumerate()
            .map(|(position, target)| ParamSpec::new(position, *target))
            .collect();
        coerce_cli_args(&specs, raw_args)
    }

    /// Full tool entry point: build the HTTP client from the options and
    /// execute the call.
    pub async fn run(&self, cli: Cli) -> i32 {
        let version = match cli.rpc_version {
            1 => JsonRpcVersion::V1,
            2 => JsonRpcVersion::V2,
            other => {
                eprintln!("wirecall: unsupported JSON-RPC version '{}'", other);
                return 1;
            }
        };

        let mut overrides = Vec::with_capacity(cli.types.len());
        for tag in &cli.types {
            match TargetType::from_str(tag) {
                Ok(target) => overrides.push(target),
                Err(e) => {
                    eprintln!("wirecall: {}", e);
                    return 1;
                }
            }
        }

        let config = ClientConfig {
            version,
            request_timeout: Duration::from_secs(cli.timeout),
        };
        let transport = Arc::new(HttpTransport::new(cli.url));
        let client = JsonRpcClient::with_config(transport, config);

        self.run_with_client(&client, &cli.method, &overrides, &cli.args)
            .await
    }

    /// Execute one call against an already-built client. Returns the process
    /// exit code.
    pub async fn run_with_client(
        &self,
        client: &JsonRpcClient,
        method: &str,
        overrides: &[TargetType],
        raw_args: &[String],
    ) -> i32 {
        let params = match self.build_params(method, overrides, raw_args) {
            Ok(params) => params,
            Err(e) => {
                eprintln!("wirecall: {}", e);
                return 1;
            }
        };

        match client.call(method, params).await {
            Ok(result) => {
                println!("{}", render_result(&result));
                0
            }
            Err(e) => {
                eprintln!("wirecall: {}", e);
                1
            }
        }
    }
}

/// Strings print bare (no quotes), everything else as pretty JSON.
fn render_result(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::dispatch::RpcServer;
    use crate::registry::{ParamDecl, ParamType, ServiceRegistry};
    use crate::transport::LocalTransport;
    use serde_json::json;

    fn generate_tool() -> CliTool {
        CliTool::new().with_signature("setgenerate", vec![TargetType::Bool])
    }

    fn client_with_counter() -> (JsonRpcClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = ServiceRegistry::new();
        registry
            .register_sync(
                "setgenerate",
                vec![ParamDecl::new("generate", ParamType::Bool)],
                ParamType::Value,
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(null))
                },
            )
            .unwrap();
        let server = RpcServer::new(Arc::new(registry));
        (
            JsonRpcClient::new(Arc::new(LocalTransport::new(server))),
            calls,
        )
    }

    #[test]
    fn test_setgenerate_true_converts_to_boolean() {
        let params = generate_tool()
            .build_params("setgenerate", &[], &["true".to_string()])
            .unwrap();
        assert_eq!(params, vec![json!(true)]);
    }

    #[test]
    fn test_untagged_method_passes_strings_through() {
        let params = generate_tool()
            .build_params("getblockhash", &[], &["300000".to_string()])
            .unwrap();
        assert_eq!(params, vec![json!("300000")]);
    }

    #[test]
    fn test_explicit_tags_override_signature() {
        let params = generate_tool()
            .build_params("getblockhash", &[TargetType::Int], &["300000".to_string()])
            .unwrap();
        assert_eq!(params, vec![json!(300000)]);
    }

    #[tokio::test]
    async fn test_setgenerate_scenario_exit_codes() {
        let tool = generate_tool();
        let (client, calls) = client_with_counter();

        let ok = tool
            .run_with_client(&client, "setgenerate", &[], &["true".to_string()])
            .await;
        assert_eq!(ok, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Conversion fails locally: exit 1, no request ever sent
        let failed = tool
            .run_with_client(&client, "setgenerate", &[], &["maybe".to_string()])
            .await;
        assert_eq!(failed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rpc_error_exits_one() {
        let tool = CliTool::new();
        let (client, _) = client_with_counter();
        let code = tool.run_with_client(&client, "nope", &[], &[]).await;
        assert_eq!(code, 1);
    }

    #[test]
    fn test_render_result() {
        assert_eq!(render_result(&json!("plain")), "plain");
        assert_eq!(render_result(&json!(42)), "42");
    }
}
