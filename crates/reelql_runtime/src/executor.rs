//! Query and mutation execution.
//!
//! The executor walks a validated selection against a root value, invoking
//! resolvers, coercing leaf values through scalar codecs, and enforcing the
//! nullability flags of every field. Sibling fields of one object resolve
//! concurrently and settle together before the parent assembles; output and
//! error order always follow the selection text, not completion order.

use crate::resolver::{Context, ResolverArgs, ResolverInfo, ResolverTable};
use crate::scalar::{json_kind, CodecSet};
use crate::schema::{ArgumentDef, FieldDef, RegistryError, TypeDef, TypeRegistry};
use crate::selection::{Operation, OperationKind, SelectionNode};
use crate::validate::validate_operation;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// A segment of the response path attached to an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Field(s.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(s: String) -> Self {
        Self::Field(s)
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// An entry in a response's `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// The error message.
    pub message: String,
    /// Path to the originating field. Empty for request-level errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
}

impl ResponseError {
    /// Creates a request-level error with no path.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    /// Attaches the originating path.
    pub fn at(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }
}

/// The outcome of executing one operation.
///
/// `data` is `null` only when the root selection itself null-bubbled or the
/// request failed validation. `errors` is omitted from the wire form when
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
}

impl ExecutionResult {
    /// Creates a successful result.
    pub fn new(data: Value) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    /// Creates a failed result with `data: null`.
    pub fn request_errors(errors: Vec<ResponseError>) -> Self {
        Self {
            data: Value::Null,
            errors,
        }
    }

    /// Returns true if any error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// The execution engine.
///
/// Holds the frozen registries: construction cross-validates them and
/// nothing mutates them afterwards, so no registration error can occur
/// mid-request.
pub struct Executor {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) codecs: Arc<CodecSet>,
    pub(crate) resolvers: Arc<ResolverTable>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("resolvers", &self.resolvers)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Creates an executor, verifying that every type reference resolves,
    /// every declared scalar has a codec, and every resolver and
    /// subscription source names a known field.
    pub fn new(
        registry: TypeRegistry,
        codecs: CodecSet,
        resolvers: ResolverTable,
    ) -> Result<Self, RegistryError> {
        startup_check(&registry, &codecs, &resolvers)?;
        Ok(Self {
            registry: Arc::new(registry),
            codecs: Arc::new(codecs),
            resolvers: Arc::new(resolvers),
        })
    }

    /// The executor's type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub(crate) fn exec_ctx(&self, ctx: &Context) -> ExecCtx {
        ExecCtx {
            registry: Arc::clone(&self.registry),
            codecs: Arc::clone(&self.codecs),
            resolvers: Arc::clone(&self.resolvers),
            request: ctx.clone(),
        }
    }

    /// Executes a query or mutation against a root value.
    ///
    /// Always returns a well-formed result; failures surface as entries in
    /// `errors`, never as a panic or an `Err`.
    pub async fn execute(
        &self,
        operation: &Operation,
        root_value: Value,
        ctx: &Context,
    ) -> ExecutionResult {
        if operation.kind == OperationKind::Subscription {
            return ExecutionResult::request_errors(vec![ResponseError::new(
                "subscription operations must be started with `subscribe`",
            )]);
        }
        if let Err(errors) = validate_operation(&self.registry, operation) {
            return ExecutionResult::request_errors(errors);
        }
        let Some(root_type) = self.registry.root_type(operation.kind) else {
            return ExecutionResult::request_errors(vec![ResponseError::new(format!(
                "schema does not define a {} root type",
                operation.kind
            ))]);
        };
        let root_type = root_type.to_string();
        debug!(kind = %operation.kind, root = %root_type, "executing operation");

        // Mutation roots run strictly in text order; everything below the
        // top level resolves like a query.
        let mode = if operation.kind == OperationKind::Mutation {
            SiblingMode::Sequential
        } else {
            SiblingMode::Concurrent
        };

        let (completed, errors) = execute_selection_set(
            self.exec_ctx(ctx),
            root_type,
            operation.selections.clone(),
            root_value,
            Vec::new(),
            mode,
        )
        .await;

        let data = match completed {
            Completed::Value(value) => value,
            Completed::Bubbled => Value::Null,
        };
        ExecutionResult { data, errors }
    }
}

fn startup_check(
    registry: &TypeRegistry,
    codecs: &CodecSet,
    resolvers: &ResolverTable,
) -> Result<(), RegistryError> {
    for (_, def) in registry.types() {
        match def {
            TypeDef::Scalar(scalar) => {
                if !codecs.contains(&scalar.name) {
                    return Err(RegistryError::MissingCodec(scalar.name.clone()));
                }
            }
            TypeDef::Object(object) => {
                for field in object.fields.values() {
                    if registry.type_def(&field.ty).is_none() {
                        return Err(RegistryError::UnresolvedFieldType {
                            type_name: object.name.clone(),
                            field: field.name.clone(),
                            referenced: field.ty.clone(),
                        });
                    }
                    for argument in field.arguments.values() {
                        match registry.type_def(&argument.ty) {
                            Some(TypeDef::Scalar(_) | TypeDef::Enum(_)) => {}
                            Some(TypeDef::Object(_)) => {
                                return Err(RegistryError::InvalidArgumentType {
                                    type_name: object.name.clone(),
                                    field: field.name.clone(),
                                    argument: argument.name.clone(),
                                    referenced: argument.ty.clone(),
                                });
                            }
                            None => {
                                return Err(RegistryError::UnknownType(argument.ty.clone()));
                            }
                        }
                    }
                }
            }
            TypeDef::Enum(_) => {}
        }
    }

    for (type_name, field_name) in resolvers.resolver_keys() {
        registry.field(type_name, field_name)?;
    }
    let subscription_type = registry.root_type(OperationKind::Subscription);
    for field_name in resolvers.source_fields() {
        match subscription_type {
            Some(type_name) => {
                registry.field(type_name, field_name)?;
            }
            None => {
                return Err(RegistryError::SourceWithoutSubscriptionType(
                    field_name.to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Shared, read-only state of one in-flight request.
#[derive(Clone)]
pub(crate) struct ExecCtx {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) codecs: Arc<CodecSet>,
    pub(crate) resolvers: Arc<ResolverTable>,
    pub(crate) request: Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SiblingMode {
    Concurrent,
    Sequential,
}

/// Completion outcome of a field or selection set. `Bubbled` means a
/// disallowed null is propagating: the nearest nullable ancestor absorbs it.
#[derive(Debug)]
pub(crate) enum Completed {
    Value(Value),
    Bubbled,
}

type SetFuture = Pin<Box<dyn Future<Output = (Completed, Vec<ResponseError>)> + Send>>;

pub(crate) fn execute_selection_set(
    ecx: ExecCtx,
    type_name: String,
    selections: Vec<SelectionNode>,
    parent: Value,
    path: Vec<PathSegment>,
    mode: SiblingMode,
) -> SetFuture {
    Box::pin(async move {
        let mut object = serde_json::Map::new();
        let mut errors = Vec::new();
        let mut bubbled = false;

        match mode {
            SiblingMode::Concurrent => {
                let mut handles = Vec::with_capacity(selections.len());
                for selection in &selections {
                    handles.push(tokio::spawn(execute_field(
                        ecx.clone(),
                        type_name.clone(),
                        selection.clone(),
                        parent.clone(),
                        path.clone(),
                    )));
                }
                // Fan-in barrier: every sibling settles before the parent
                // assembles. Joining in selection order keeps output and
                // error order textual regardless of completion order.
                for (selection, handle) in selections.iter().zip(handles) {
                    match handle.await {
                        Ok((completed, field_errors)) => {
                            errors.extend(field_errors);
                            match completed {
                                Completed::Value(value) => {
                                    object.insert(selection.name.clone(), value);
                                }
                                Completed::Bubbled => bubbled = true,
                            }
                        }
                        Err(join_error) => {
                            let mut field_path = path.clone();
                            field_path.push(PathSegment::Field(selection.name.clone()));
                            errors.push(
                                ResponseError::new(format!(
                                    "field `{}` aborted: {join_error}",
                                    selection.name
                                ))
                                .at(field_path),
                            );
                            match ecx.registry.field(&type_name, &selection.name) {
                                Ok(field) if field.nullable => {
                                    object.insert(selection.name.clone(), Value::Null);
                                }
                                _ => bubbled = true,
                            }
                        }
                    }
                }
            }
            SiblingMode::Sequential => {
                for selection in &selections {
                    let (completed, field_errors) = execute_field(
                        ecx.clone(),
                        type_name.clone(),
                        selection.clone(),
                        parent.clone(),
                        path.clone(),
                    )
                    .await;
                    errors.extend(field_errors);
                    match completed {
                        Completed::Value(value) => {
                            object.insert(selection.name.clone(), value);
                        }
                        Completed::Bubbled => bubbled = true,
                    }
                }
            }
        }

        if bubbled {
            (Completed::Bubbled, errors)
        } else {
            (Completed::Value(Value::Object(object)), errors)
        }
    })
}

async fn execute_field(
    ecx: ExecCtx,
    parent_type: String,
    selection: SelectionNode,
    parent: Value,
    mut path: Vec<PathSegment>,
) -> (Completed, Vec<ResponseError>) {
    let field = match ecx.registry.field(&parent_type, &selection.name) {
        Ok(field) => field.clone(),
        Err(e) => {
            // Validation rules this out before execution starts; answer with
            // a field error so a malformed call still gets a response.
            return (
                Completed::Value(Value::Null),
                vec![ResponseError::new(e.to_string())],
            );
        }
    };
    path.push(PathSegment::Field(selection.name.clone()));

    let args = match coerce_arguments(&ecx, &parent_type, &field, &selection.arguments) {
        Ok(args) => args,
        Err(message) => {
            let errors = vec![ResponseError::new(message).at(path)];
            return null_or_bubble(field.nullable, errors);
        }
    };

    let info = ResolverInfo::new(&selection.name, &parent_type).with_path(path.clone());
    let resolver = ecx.resolvers.lookup(&parent_type, &selection.name);
    let value = match resolver.resolve(&parent, &args, &ecx.request, &info).await {
        Ok(value) => value,
        Err(e) => {
            debug!(field = %selection.name, parent = %parent_type, error = %e, "resolver failed");
            let errors = vec![ResponseError::new(e.to_string()).at(path)];
            return null_or_bubble(field.nullable, errors);
        }
    };

    complete_field_value(ecx, field, selection, value, path).await
}

/// Completes a resolved value against its field's modifiers: list traversal
/// with per-element nullability, then named-type completion.
pub(crate) async fn complete_field_value(
    ecx: ExecCtx,
    field: FieldDef,
    selection: SelectionNode,
    value: Value,
    path: Vec<PathSegment>,
) -> (Completed, Vec<ResponseError>) {
    if !field.is_list {
        return complete_value(ecx, &field, &selection, value, path, field.nullable).await;
    }

    match value {
        Value::Null => {
            if field.nullable {
                (Completed::Value(Value::Null), Vec::new())
            } else {
                (
                    Completed::Bubbled,
                    vec![ResponseError::new(format!(
                        "non-nullable field `{}` resolved to null",
                        field.name
                    ))
                    .at(path)],
                )
            }
        }
        Value::Array(items) => {
            let mut completed_items = Vec::with_capacity(items.len());
            let mut errors = Vec::new();
            let mut element_bubbled = false;
            for (index, item) in items.into_iter().enumerate() {
                let mut item_path = path.clone();
                item_path.push(PathSegment::Index(index));
                let (completed, item_errors) = complete_value(
                    ecx.clone(),
                    &field,
                    &selection,
                    item,
                    item_path,
                    field.element_nullable,
                )
                .await;
                errors.extend(item_errors);
                match completed {
                    Completed::Value(value) => completed_items.push(value),
                    Completed::Bubbled => element_bubbled = true,
                }
            }
            if element_bubbled {
                // A disallowed null element nulls the enclosing list, which
                // may bubble further per the field's own nullability.
                null_or_bubble(field.nullable, errors)
            } else {
                (Completed::Value(Value::Array(completed_items)), errors)
            }
        }
        other => {
            let errors = vec![ResponseError::new(format!(
                "field `{}` expected a list, got {}",
                field.name,
                json_kind(&other)
            ))
            .at(path)];
            null_or_bubble(field.nullable, errors)
        }
    }
}

async fn complete_value(
    ecx: ExecCtx,
    field: &FieldDef,
    selection: &SelectionNode,
    value: Value,
    path: Vec<PathSegment>,
    nullable: bool,
) -> (Completed, Vec<ResponseError>) {
    if value.is_null() {
        if nullable {
            return (Completed::Value(Value::Null), Vec::new());
        }
        return (
            Completed::Bubbled,
            vec![ResponseError::new(format!(
                "non-nullable field `{}` resolved to null",
                field.name
            ))
            .at(path)],
        );
    }

    match ecx.registry.type_def(&field.ty) {
        Some(TypeDef::Scalar(scalar)) => {
            let Some(codec) = ecx.codecs.get(&scalar.name) else {
                let errors = vec![ResponseError::new(format!(
                    "scalar `{}` has no registered codec",
                    scalar.name
                ))
                .at(path)];
                return null_or_bubble(nullable, errors);
            };
            match codec.serialize(&value) {
                Ok(wire) => (Completed::Value(wire), Vec::new()),
                Err(e) => {
                    let errors = vec![ResponseError::new(e.to_string()).at(path)];
                    null_or_bubble(nullable, errors)
                }
            }
        }
        Some(TypeDef::Enum(enum_def)) => {
            let valid = value
                .as_str()
                .is_some_and(|name| enum_def.has_value(name));
            if valid {
                (Completed::Value(value), Vec::new())
            } else {
                let errors = vec![ResponseError::new(format!(
                    "{value} is not a value of enum `{}`",
                    enum_def.name
                ))
                .at(path)];
                null_or_bubble(nullable, errors)
            }
        }
        Some(TypeDef::Object(object)) => {
            let (completed, errors) = execute_selection_set(
                ecx.clone(),
                object.name.clone(),
                selection.selections.clone(),
                value,
                path,
                SiblingMode::Concurrent,
            )
            .await;
            match completed {
                Completed::Value(v) => (Completed::Value(v), errors),
                Completed::Bubbled => null_or_bubble(nullable, errors),
            }
        }
        None => {
            let errors = vec![ResponseError::new(format!(
                "field `{}` references unknown type `{}`",
                field.name, field.ty
            ))
            .at(path)];
            null_or_bubble(nullable, errors)
        }
    }
}

fn null_or_bubble(
    nullable: bool,
    errors: Vec<ResponseError>,
) -> (Completed, Vec<ResponseError>) {
    if nullable {
        (Completed::Value(Value::Null), errors)
    } else {
        (Completed::Bubbled, errors)
    }
}

/// Coerces the selection's literal arguments through the matching codecs
/// before they reach the resolver.
pub(crate) fn coerce_arguments(
    ecx: &ExecCtx,
    parent_type: &str,
    field: &FieldDef,
    provided: &IndexMap<String, Value>,
) -> Result<ResolverArgs, String> {
    let mut args = ResolverArgs::new();
    for (name, raw) in provided {
        let Some(argument) = field.arguments.get(name) else {
            return Err(format!(
                "unknown argument `{name}` on field `{parent_type}.{}`",
                field.name
            ));
        };
        let coerced = coerce_argument(ecx, argument, raw)?;
        args.set(name.clone(), coerced);
    }
    Ok(args)
}

fn coerce_argument(ecx: &ExecCtx, argument: &ArgumentDef, raw: &Value) -> Result<Value, String> {
    if raw.is_null() {
        if argument.nullable {
            return Ok(Value::Null);
        }
        return Err(format!("argument `{}` must not be null", argument.name));
    }
    match ecx.registry.type_def(&argument.ty) {
        Some(TypeDef::Scalar(scalar)) => match ecx.codecs.get(&scalar.name) {
            Some(codec) => codec
                .parse_literal(raw)
                .map_err(|e| format!("argument `{}`: {e}", argument.name)),
            None => Err(format!("scalar `{}` has no registered codec", scalar.name)),
        },
        Some(TypeDef::Enum(enum_def)) => match raw.as_str() {
            Some(name) if enum_def.has_value(name) => Ok(raw.clone()),
            _ => Err(format!(
                "argument `{}`: {raw} is not a value of enum `{}`",
                argument.name, enum_def.name
            )),
        },
        Some(TypeDef::Object(_)) | None => Err(format!(
            "argument `{}` has unsupported type `{}`",
            argument.name, argument.ty
        )),
    }
}
