//! Method registries: explicit registration of handlers with declared
//! signatures, plus composition of several registries under one dispatch
//! surface.
//!
//! Registration is an explicit step supplying name, parameter declarations,
//! and result type; there is no runtime inspection of the service object.
//! Registries are built once at startup, then shared behind `Arc` for
//! concurrent lookup by in-flight calls.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{HandlerError, RegistryError};

/// Declared JSON type of a parameter or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Bool,
    Int,
    Float,
    /// Arbitrary JSON; any shape passes coercion.
    Value,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Bool => "boolean",
            ParamType::Int => "integer",
            ParamType::Float => "float",
            ParamType::Value => "json",
        };
        write!(f, "{}", name)
    }
}

/// One declared positional parameter. The name lets V2 named params map onto
/// the positional signature.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub ty: ParamType,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Whether the handler completes inline or on another task/thread. Purely
/// descriptive; both modes share one invocation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    Sync,
    Async,
}

/// Immutable description of one registered method: name, positional
/// parameter signature, result type, invocation mode. Fixed at registration
/// time; dispatch never mutates it.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub result: ParamType,
    pub mode: InvocationMode,
}

impl HandlerDescriptor {
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParamDecl>,
        result: ParamType,
        mode: InvocationMode,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            result,
            mode,
        }
    }
}

/// The service-side unit of executable logic bound to a method name.
///
/// Arguments arrive already coerced against the descriptor's signature, in
/// positional order. An `Err` is the handler's intentional domain failure
/// and is surfaced verbatim; a panic becomes an InternalError.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn call(&self, args: Vec<Value>) -> Result<Value, HandlerError>;
}

/// Adapter for a plain synchronous closure.
pub struct SyncHandler<F>
where
    F: Fn(Vec<Value>) -> Result<Value, HandlerError> + Send + Sync,
{
    func: F,
}

impl<F> SyncHandler<F>
where
    F: Fn(Vec<Value>) -> Result<Value, HandlerError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> RpcHandler for SyncHandler<F>
where
    F: Fn(Vec<Value>) -> Result<Value, HandlerError> + Send + Sync,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, HandlerError> {
        (self.func)(args)
    }
}

/// Adapter for an asynchronous closure returning a boxed future.
pub struct AsyncHandler<F>
where
    F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync,
{
    func: F,
}

impl<F> AsyncHandler<F>
where
    F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> RpcHandler for AsyncHandler<F>
where
    F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, HandlerError> {
        (self.func)(args).await
    }
}

/// A handler paired with its descriptor.
pub struct RegisteredMethod {
    pub descriptor: HandlerDescriptor,
    pub handler: Arc<dyn RpcHandler>,
}

/// Case-sensitive, O(1) method lookup, safe for concurrent reads.
pub trait MethodRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<&RegisteredMethod>;

    /// All registered method names (used by help/introspection surfaces).
    fn method_names(&self) -> Vec<String>;
}

/// A registry backed by a single service object's own methods.
///
/// Built once at startup; wrap the finished registry in an `Arc` before
/// dispatch begins. Two handlers may not share a name.
#[derive(Default)]
pub struct ServiceRegistry {
    methods: HashMap<String, RegisteredMethod>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its descriptor's name. Fails fast on a
    /// duplicate name.
    pub fn register<H>(&mut self, descriptor: HandlerDescriptor, handler: H) -> Result<(), RegistryError>
    where
        H: RpcHandler + 'static,
    {
        self.register_arc(descriptor, Arc::new(handler))
    }

    pub fn register_arc(
        &mut self,
        descriptor: HandlerDescriptor,
        handler: Arc<dyn RpcHandler>,
    ) -> Result<(), RegistryError> {
        let name = descriptor.name.clone();
        if self.methods.contains_key(&name) {
            return Err(RegistryError::DuplicateMethod(name));
        }
        self.methods.insert(name, RegisteredMethod { descriptor, handler });
        Ok(())
    }

    /// Convenience: register a synchronous closure.
    pub fn register_sync<F>(
        &mut self,
        name: &str,
        params: Vec<ParamDecl>,
        result: ParamType,
        func: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Vec<Value>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        let descriptor = HandlerDescriptor::new(name, params, result, InvocationMode::Sync);
        self.register(descriptor, SyncHandler::new(func))
    }

    /// Convenience: register an asynchronous closure.
    pub fn register_async<F>(
        &mut self,
        name: &str,
        params: Vec<ParamDecl>,
        result: ParamType,
        func: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync + 'static,
    {
        let descriptor = HandlerDescriptor::new(name, params, result, InvocationMode::Async);
        self.register(descriptor, AsyncHandler::new(func))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl MethodRegistry for ServiceRegistry {
    fn lookup(&self, name: &str) -> Option<&RegisteredMethod> {
        self.methods.get(name)
    }

    fn method_names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }
}

/// A registry that forwards lookups to an ordered list of inner registries,
/// composing several services under one dispatch surface without owning
/// their handlers. Name spaces are merged at construction time; a collision
/// across inner registries fails fast.
pub struct DelegatingRegistry {
    inner: Vec<Arc<dyn MethodRegistry>>,
    routes: HashMap<String, usize>,
}

impl DelegatingRegistry {
    pub fn new(inner: Vec<Arc<dyn MethodRegistry>>) -> Result<Self, RegistryError> {
        let mut routes = HashMap::new();
        for (index, registry) in inner.iter().enumerate() {
            for name in registry.method_names() {
                if routes.contains_key(&name) {
                    return Err(RegistryError::DuplicateMethod(name));
                }
                routes.insert(name, index);
            }
        }
        Ok(Self { inner, routes })
    }
}

impl MethodRegistry for DelegatingRegistry {
    fn lookup(&self, name: &str) -> Option<&RegisteredMethod> {
        let index = *self.routes.get(name)?;
        self.inner[index].lookup(name)
    }

    fn method_names(&self) -> Vec<String> {
        self.routes.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_registry() -> ServiceRegistry {
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
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = echo_registry();
        let result = registry.register_sync(
            "echo",
            vec![ParamDecl::new("message", ParamType::String)],
            ParamType::String,
            |mut args| Ok(args.remove(0)),
        );
        assert_eq!(result, Err(RegistryError::DuplicateMethod("echo".to_string())));
        // Original handler survives
        assert!(registry.lookup("echo").is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = echo_registry();
        assert!(registry.lookup("echo").is_some());
        assert!(registry.lookup("Echo").is_none());
    }

    #[test]
    fn test_delegating_registry_composes_disjoint_services() {
        let mut wallet = ServiceRegistry::new();
        wallet
            .register_sync("getbalance", vec![], ParamType::Float, |_| Ok(json!(0.0)))
            .unwrap();
        let composed = DelegatingRegistry::new(vec![
            Arc::new(echo_registry()),
            Arc::new(wallet),
        ])
        .unwrap();

        assert!(composed.lookup("echo").is_some());
        assert!(composed.lookup("getbalance").is_some());
        assert!(composed.lookup("nope").is_none());

        let mut names = composed.method_names();
        names.sort();
        assert_eq!(names, vec!["echo", "getbalance"]);
    }

    #[test]
    fn test_delegating_registry_rejects_collisions() {
        let result = DelegatingRegistry::new(vec![
            Arc::new(echo_registry()),
            Arc::new(echo_registry()),
        ]);
        assert!(matches!(result, Err(RegistryError::DuplicateMethod(name)) if name == "echo"));
    }

    #[tokio::test]
    async fn test_async_handler_adapter() {
        let mut registry = ServiceRegistry::new();
        registry
            .register_async("defer", vec![], ParamType::Int, |_| {
                Box::pin(async { Ok(json!(7)) })
            })
            .unwrap();

        let method = registry.lookup("defer").unwrap();
        assert_eq!(method.descriptor.mode, InvocationMode::Async);
        let result = method.handler.call(vec![]).await.unwrap();
        assert_eq!(result, json!(7));
    }
}
