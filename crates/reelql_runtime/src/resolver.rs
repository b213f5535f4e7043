//! Field resolvers and the resolver table.
//!
//! Resolvers are keyed by `(type name, field name)`. A field without a
//! registered resolver falls back to [`DefaultResolver`], which reads the
//! same-named property off the parent value.

use crate::pubsub::Subscriber;
use crate::schema::RegistryError;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Coerced arguments passed to a resolver.
#[derive(Debug, Clone, Default)]
pub struct ResolverArgs {
    args: HashMap<String, Value>,
}

impl ResolverArgs {
    /// Creates an empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an argument by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Gets an argument deserialized to a specific type.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.args
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Gets a required argument, failing if absent or of the wrong shape.
    pub fn require<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, ResolverError> {
        self.args
            .get(name)
            .ok_or_else(|| ResolverError::MissingArgument(name.to_string()))
            .and_then(|v| {
                serde_json::from_value(v.clone()).map_err(|e| ResolverError::ArgumentParse {
                    name: name.to_string(),
                    message: e.to_string(),
                })
            })
    }

    /// Returns true if no arguments were provided.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Sets an argument.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.args.insert(name.into(), value);
    }
}

/// Info about the field being resolved.
#[derive(Debug, Clone)]
pub struct ResolverInfo {
    /// The field name being resolved.
    pub field_name: String,
    /// The parent type name.
    pub parent_type: String,
    /// Response path to this field.
    pub path: Vec<crate::executor::PathSegment>,
}

impl ResolverInfo {
    /// Creates new resolver info.
    pub fn new(field_name: impl Into<String>, parent_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            parent_type: parent_type.into(),
            path: Vec::new(),
        }
    }

    /// Sets the path.
    pub fn with_path(mut self, path: Vec<crate::executor::PathSegment>) -> Self {
        self.path = path;
        self
    }
}

/// Request-scoped context shared by every resolver of one request.
#[derive(Debug, Clone, Default)]
pub struct Context {
    data: HashMap<String, Value>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value in the context.
    pub fn set<T: serde::Serialize>(&mut self, key: impl Into<String>, value: T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.data.insert(key.into(), v);
        }
    }

    /// Gets a value from the context.
    pub fn get<T: for<'de> serde::Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Error raised by a resolver. The executor isolates it to the failing
/// field: siblings keep resolving and the message lands in the response's
/// `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    #[error("missing required argument `{0}`")]
    MissingArgument(String),

    #[error("failed to parse argument `{name}`: {message}")]
    ArgumentParse { name: String, message: String },

    #[error("cannot read field `{0}` from a non-object parent")]
    InvalidParent(String),

    #[error("{0}")]
    Custom(String),
}

impl ResolverError {
    /// Creates a custom error from any message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Result type for resolvers.
pub type ResolverResult = Result<Value, ResolverError>;

/// Future type for resolvers.
pub type ResolverFuture<'a> = Pin<Box<dyn Future<Output = ResolverResult> + Send + 'a>>;

/// Trait for field resolvers.
pub trait Resolver: Send + Sync {
    /// Resolves a field value from its parent.
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a>;
}

/// A boxed resolver.
pub type BoxedResolver = Box<dyn Resolver>;

/// A wrapper for synchronous resolver functions.
pub struct FnResolver {
    func: Arc<dyn Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult + Send + Sync>,
}

impl FnResolver {
    /// Creates a new function resolver.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult
            + Send
            + Sync
            + 'static,
    {
        Self { func: Arc::new(f) }
    }
}

impl Resolver for FnResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let result = (self.func)(parent, args, ctx, info);
        Box::pin(async move { result })
    }
}

type AsyncResolverFn =
    Arc<dyn Fn(Value, ResolverArgs, Context, ResolverInfo) -> ResolverFuture<'static> + Send + Sync>;

/// A wrapper for asynchronous resolver functions.
pub struct AsyncFnResolver {
    func: AsyncResolverFn,
}

impl AsyncFnResolver {
    /// Creates a new async function resolver.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, ResolverArgs, Context, ResolverInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self {
            func: Arc::new(move |parent, args, ctx, info| Box::pin(f(parent, args, ctx, info))),
        }
    }
}

impl Resolver for AsyncFnResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let parent = parent.clone();
        let args = args.clone();
        let ctx = ctx.clone();
        let info = info.clone();
        let func = Arc::clone(&self.func);
        Box::pin(async move { func(parent, args, ctx, info).await })
    }
}

/// Fallback resolver: reads the same-named property off the parent object.
/// A missing property and a null parent both resolve to null.
#[derive(Default)]
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        _args: &'a ResolverArgs,
        _ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let result = match parent {
            Value::Object(map) => Ok(map.get(&info.field_name).cloned().unwrap_or(Value::Null)),
            Value::Null => Ok(Value::Null),
            _ => Err(ResolverError::InvalidParent(info.field_name.clone())),
        };
        Box::pin(async move { result })
    }
}

/// Future type for subscription sources.
pub type SourceFuture<'a> = Pin<Box<dyn Future<Output = Result<Subscriber, ResolverError>> + Send + 'a>>;

/// Produces the event sequence backing one subscription field.
///
/// Invoked once per subscribe call; the returned [`Subscriber`] feeds the
/// subscription's per-event execution until it is cancelled.
pub trait SubscriptionSource: Send + Sync {
    fn subscribe<'a>(&'a self, args: &'a ResolverArgs, ctx: &'a Context) -> SourceFuture<'a>;
}

type SourceFn = Arc<dyn Fn(ResolverArgs, Context) -> SourceFuture<'static> + Send + Sync>;

/// A wrapper for subscription source closures.
pub struct FnSource {
    func: SourceFn,
}

impl FnSource {
    /// Creates a new source from an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolverArgs, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Subscriber, ResolverError>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |args, ctx| Box::pin(f(args, ctx))),
        }
    }
}

impl SubscriptionSource for FnSource {
    fn subscribe<'a>(&'a self, args: &'a ResolverArgs, ctx: &'a Context) -> SourceFuture<'a> {
        let args = args.clone();
        let ctx = ctx.clone();
        let func = Arc::clone(&self.func);
        Box::pin(async move { func(args, ctx).await })
    }
}

/// Storage for resolvers and subscription sources.
///
/// Immutable once the executor is built; re-registering a key is rejected.
#[derive(Default)]
pub struct ResolverTable {
    resolvers: FxHashMap<(String, String), BoxedResolver>,
    sources: FxHashMap<String, Box<dyn SubscriptionSource>>,
    default_resolver: DefaultResolver,
}

impl ResolverTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver for a type's field.
    pub fn register<R: Resolver + 'static>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: R,
    ) -> Result<(), RegistryError> {
        let key = (type_name.into(), field_name.into());
        if self.resolvers.contains_key(&key) {
            return Err(RegistryError::DuplicateResolver {
                type_name: key.0,
                field: key.1,
            });
        }
        self.resolvers.insert(key, Box::new(resolver));
        Ok(())
    }

    /// Registers a sync function as a resolver.
    pub fn register_fn<F>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        f: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult
            + Send
            + Sync
            + 'static,
    {
        self.register(type_name, field_name, FnResolver::new(f))
    }

    /// Registers an async function as a resolver.
    pub fn register_async<F, Fut>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        f: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Value, ResolverArgs, Context, ResolverInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        self.register(type_name, field_name, AsyncFnResolver::new(f))
    }

    /// Registers the event source for a subscription field.
    pub fn register_source<S: SubscriptionSource + 'static>(
        &mut self,
        field_name: impl Into<String>,
        source: S,
    ) -> Result<(), RegistryError> {
        let field = field_name.into();
        if self.sources.contains_key(&field) {
            return Err(RegistryError::DuplicateSource(field));
        }
        self.sources.insert(field, Box::new(source));
        Ok(())
    }

    /// Looks up the resolver for a field, falling back to the default.
    pub fn lookup(&self, type_name: &str, field_name: &str) -> &dyn Resolver {
        self.resolvers
            .get(&(type_name.to_string(), field_name.to_string()))
            .map_or(&self.default_resolver as &dyn Resolver, |r| r.as_ref())
    }

    /// Returns true if a dedicated (non-default) resolver exists for a field.
    pub fn has_resolver(&self, type_name: &str, field_name: &str) -> bool {
        self.resolvers
            .contains_key(&(type_name.to_string(), field_name.to_string()))
    }

    /// Gets the source for a subscription field.
    pub fn source(&self, field_name: &str) -> Option<&dyn SubscriptionSource> {
        self.sources.get(field_name).map(AsRef::as_ref)
    }

    /// Iterates registered resolver keys.
    pub fn resolver_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.resolvers.keys().map(|(t, f)| (t.as_str(), f.as_str()))
    }

    /// Iterates registered subscription source field names.
    pub fn source_fields(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

impl Debug for ResolverTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverTable")
            .field("resolver_count", &self.resolvers.len())
            .field("source_count", &self.sources.len())
            .finish()
    }
}
