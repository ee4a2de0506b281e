//! Client-to-server integration over the in-process loopback transport.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wirecall::prelude::*;

fn math_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry
        .register_sync(
            "echo",
            vec![ParamDecl::new("message", ParamType::String)],
            ParamType::String,
            |mut args| Ok(args.remove(0)),
        )
        .unwrap();
    registry
        .register_sync(
            "add",
            vec![
                ParamDecl::new("left", ParamType::Int),
                ParamDecl::new("right", ParamType::Int),
            ],
            ParamType::Int,
            |args| {
                let left = args[0].as_i64().unwrap_or(0);
                let right = args[1].as_i64().unwrap_or(0);
                Ok(json!(left + right))
            },
        )
        .unwrap();
    registry
        .register_async(
            "slowecho",
            vec![ParamDecl::new("message", ParamType::String)],
            ParamType::String,
            |mut args| {
                Box::pin(async move {
                    // Completes on a timer task, not the invoking thread
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(args.remove(0))
                })
            },
        )
        .unwrap();
    registry
}

fn wallet_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry
        .register_sync("getbalance", vec![], ParamType::Float, |_| Ok(json!(50.0)))
        .unwrap();
    registry
        .register_sync("unlock", vec![], ParamType::Value, |_| {
            Err(HandlerError::new(-14, "wrong passphrase"))
        })
        .unwrap();
    registry
}

fn client_for(registry: ServiceRegistry) -> JsonRpcClient {
    let server = RpcServer::new(Arc::new(registry));
    JsonRpcClient::new(Arc::new(LocalTransport::new(server)))
}

#[tokio::test]
async fn call_round_trip() {
    let client = client_for(math_registry());
    assert_eq!(
        client.call("echo", vec![json!("hi")]).await.unwrap(),
        json!("hi")
    );
    assert_eq!(
        client.call("add", vec![json!(2), json!(3)]).await.unwrap(),
        json!(5)
    );
}

#[tokio::test]
async fn async_handler_completes_off_thread() {
    let client = client_for(math_registry());
    let result = client.call("slowecho", vec![json!("later")]).await.unwrap();
    assert_eq!(result, json!("later"));
}

#[tokio::test]
async fn named_params_resolve_against_signature() {
    let client = client_for(math_registry());
    let mut params = serde_json::Map::new();
    params.insert("right".to_string(), json!(4));
    params.insert("left".to_string(), json!(6));
    let result = client
        .call_named_async("add", params)
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(result, json!(10));
}

#[tokio::test]
async fn delegating_registry_serves_both_services() {
    let composed = DelegatingRegistry::new(vec![
        Arc::new(math_registry()),
        Arc::new(wallet_registry()),
    ])
    .unwrap();
    let server = RpcServer::new(Arc::new(composed));
    let client = JsonRpcClient::new(Arc::new(LocalTransport::new(server)));

    assert_eq!(
        client.call("echo", vec![json!("x")]).await.unwrap(),
        json!("x")
    );
    assert_eq!(client.call("getbalance", vec![]).await.unwrap(), json!(50.0));

    // Handler-chosen error code survives the full round trip
    let err = client.call("unlock", vec![]).await.unwrap_err();
    assert_eq!(err.error_code(), Some(-14));
}

#[tokio::test]
async fn concurrent_calls_each_get_their_own_reply() {
    let client = Arc::new(client_for(math_registry()));

    let mut tasks = Vec::new();
    for n in 0..32i64 {
        let client = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            let result = client
                .call("add", vec![json!(n), json!(1000)])
                .await
                .unwrap();
            (n, result)
        }));
    }
    for task in tasks {
        let (n, result) = task.await.unwrap();
        assert_eq!(result, json!(n + 1000));
    }
    assert_eq!(client.outstanding_calls(), 0);
}

#[tokio::test]
async fn invalid_params_reported_before_dispatch() {
    let client = client_for(math_registry());
    let err = client
        .call("add", vec![json!("two"), json!(3.5)])
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), Some(-32602));
    match err {
        ClientError::Rpc(obj) => {
            assert!(obj.message.contains("position 0"));
            assert!(obj.message.contains("position 1"));
        }
        other => panic!("expected rpc error, got {:?}", other),
    }
}

#[tokio::test]
async fn server_reply_bytes_are_stable_across_identical_calls() {
    let server = RpcServer::new(Arc::new(math_registry()));
    let payload: &[u8] = br#"{"jsonrpc":"2.0","id":1,"method":"echo","params":["hi"]}"#;
    let first = server.handle_payload(payload).await.unwrap();
    let second = server.handle_payload(payload).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        String::from_utf8(first).unwrap(),
        r#"{"jsonrpc":"2.0","id":1,"result":"hi"}"#
    );
}

#[tokio::test]
async fn batch_end_to_end() {
    let server = RpcServer::new(Arc::new(math_registry()));
    let payload = br#"[
        {"jsonrpc":"2.0","id":"a","method":"add","params":[1,2]},
        {"jsonrpc":"2.0","method":"echo","params":["quiet"]},
        {"jsonrpc":"2.0","id":"b","method":"slowecho","params":["deferred"]}
    ]"#;
    let reply = server.handle_payload(payload).await.unwrap();
    let messages: Vec<JsonRpcMessage> = serde_json::from_slice(&reply).unwrap();
    assert_eq!(messages.len(), 2);

    let find = |id: &str| {
        messages
            .iter()
            .find(|m| m.id() == Some(&RequestId::String(id.to_string())))
            .unwrap()
    };
    match find("a") {
        JsonRpcMessage::Response(r) => assert_eq!(r.result, json!(3)),
        other => panic!("expected response, got {:?}", other),
    }
    match find("b") {
        JsonRpcMessage::Response(r) => assert_eq!(r.result, json!("deferred")),
        other => panic!("expected response, got {:?}", other),
    }
}

#[tokio::test]
async fn v1_end_to_end() {
    let server = RpcServer::new(Arc::new(math_registry()));
    let client = JsonRpcClient::with_config(
        Arc::new(LocalTransport::new(server)),
        ClientConfig {
            version: JsonRpcVersion::V1,
            ..ClientConfig::default()
        },
    );
    assert_eq!(
        client.call("echo", vec![json!("v1")]).await.unwrap(),
        json!("v1")
    );
}

#[tokio::test]
async fn notification_end_to_end_produces_nothing() {
    let client = client_for(math_registry());
    client.notify("echo", vec![json!("fire and forget")]).await.unwrap();
    // Even a failing notification is silent
    client.notify("no_such_method", vec![]).await.unwrap();
}

#[tokio::test]
async fn result_value_is_passed_through_unchanged() {
    let mut registry = ServiceRegistry::new();
    registry
        .register_sync("getinfo", vec![], ParamType::Value, |_| {
            Ok(json!({"version": 210000, "connections": 8, "testnet": false}))
        })
        .unwrap();
    let client = client_for(registry);

    let info: Value = client.call("getinfo", vec![]).await.unwrap();
    assert_eq!(info["connections"], json!(8));
    assert_eq!(info["testnet"], json!(false));
}
