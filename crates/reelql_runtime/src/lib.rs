//! GraphQL-style execution engine.
//!
//! This crate owns the algorithmic core of a query server and nothing else:
//! it consumes an already-parsed schema and operation IR, resolves fields
//! against a root value, and hands a finished response tree back to whatever
//! transport delivers it.
//!
//! - `schema`: type definitions and the type registry
//! - `scalar`: scalar codecs (serialize / parse-value / parse-literal)
//! - `resolver`: resolver table with default property resolution
//! - `selection`: pre-parsed operation IR
//! - `validate`: whole-request validation against the registry
//! - `executor`: field resolution, null bubbling, response assembly
//! - `pubsub`: in-process event channel for subscriptions
//! - `subscription`: per-event subscription execution

pub mod executor;
pub mod pubsub;
pub mod resolver;
pub mod scalar;
pub mod schema;
pub mod selection;
pub mod subscription;
pub mod validate;

pub use executor::{ExecutionResult, Executor, PathSegment, ResponseError};
pub use pubsub::{EventChannel, Subscriber};
pub use resolver::{
    AsyncFnResolver, Context, DefaultResolver, FnResolver, FnSource, Resolver, ResolverArgs,
    ResolverError, ResolverInfo, ResolverTable, SubscriptionSource,
};
pub use scalar::{
    BooleanCodec, CodecSet, DateCodec, FloatCodec, IdCodec, IntCodec, ScalarCodec, ScalarError,
    StringCodec,
};
pub use schema::{
    ArgumentDef, EnumDef, FieldDef, ObjectDef, RegistryError, ScalarDef, TypeDef, TypeRegistry,
};
pub use selection::{Operation, OperationKind, SelectionNode};
pub use subscription::{SubscribeError, SubscriptionStream};
pub use validate::validate_operation;
