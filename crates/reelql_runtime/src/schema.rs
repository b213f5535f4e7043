//! Type definitions and the type registry.

use crate::selection::OperationKind;
use indexmap::IndexMap;
use thiserror::Error;

/// Errors raised while assembling a registry or wiring an executor.
///
/// All of these are startup failures: once an [`Executor`](crate::Executor)
/// has been constructed, none of them can occur mid-request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    #[error("type `{type_name}` declares field `{field}` more than once")]
    DuplicateField { type_name: String, field: String },

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("type `{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("field `{type_name}.{field}` references undeclared type `{referenced}`")]
    UnresolvedFieldType {
        type_name: String,
        field: String,
        referenced: String,
    },

    #[error("argument `{argument}` of `{type_name}.{field}` must be a scalar or enum, not `{referenced}`")]
    InvalidArgumentType {
        type_name: String,
        field: String,
        argument: String,
        referenced: String,
    },

    #[error("scalar `{0}` has no registered codec")]
    MissingCodec(String),

    #[error("codec for scalar `{0}` is already registered")]
    DuplicateCodec(String),

    #[error("resolver for `{type_name}.{field}` is already registered")]
    DuplicateResolver { type_name: String, field: String },

    #[error("subscription source for `{0}` is already registered")]
    DuplicateSource(String),

    #[error("subscription source `{0}` registered but the schema has no subscription root type")]
    SourceWithoutSubscriptionType(String),
}

/// A type definition held by the registry.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Scalar(ScalarDef),
    Object(ObjectDef),
    Enum(EnumDef),
}

impl TypeDef {
    /// Returns the type's name.
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Scalar(s) => &s.name,
            TypeDef::Object(o) => &o.name,
            TypeDef::Enum(e) => &e.name,
        }
    }
}

/// Scalar type definition. The coercion behavior lives in the matching
/// [`ScalarCodec`](crate::ScalarCodec), registered separately.
#[derive(Debug, Clone)]
pub struct ScalarDef {
    pub name: String,
    pub description: Option<String>,
}

impl ScalarDef {
    /// Creates a new scalar definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Object type definition.
#[derive(Debug, Clone)]
pub struct ObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    duplicates: Vec<String>,
}

impl ObjectDef {
    /// Creates a new object definition with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a field. A repeated field name is remembered and rejected when
    /// the object is registered.
    pub fn field(mut self, field: FieldDef) -> Self {
        if self.fields.contains_key(&field.name) {
            self.duplicates.push(field.name.clone());
        }
        self.fields.insert(field.name.clone(), field);
        self
    }
}

/// Enum type definition.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<String>,
}

impl EnumDef {
    /// Creates a new enum definition with no values.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            values: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a value.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Returns true if `value` is one of the declared values.
    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// Field definition.
///
/// The three modifier flags are fixed at registration and enforced by the
/// executor on every resolution: `nullable` for the field itself, `is_list`
/// for list shape, and `element_nullable` for each list element.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    /// Name of the field's named type (object, scalar, or enum).
    pub ty: String,
    pub nullable: bool,
    pub is_list: bool,
    pub element_nullable: bool,
    pub arguments: IndexMap<String, ArgumentDef>,
}

impl FieldDef {
    /// Creates a nullable, non-list field of the named type.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            nullable: true,
            is_list: false,
            element_nullable: true,
            arguments: IndexMap::new(),
        }
    }

    /// Marks the field itself non-nullable.
    pub fn non_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the field as a list of its named type.
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Marks each list element non-nullable.
    pub fn element_non_null(mut self) -> Self {
        self.element_nullable = false;
        self
    }

    /// Adds an argument.
    pub fn argument(mut self, argument: ArgumentDef) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }
}

/// Argument definition. Arguments are always scalar- or enum-typed.
#[derive(Debug, Clone)]
pub struct ArgumentDef {
    pub name: String,
    pub ty: String,
    pub nullable: bool,
}

impl ArgumentDef {
    /// Creates a nullable argument of the named type.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            nullable: true,
        }
    }

    /// Marks the argument required.
    pub fn non_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// The process-wide table of type definitions.
///
/// Built once at startup, then frozen behind an `Arc` by the executor.
/// The built-in scalars (`Int`, `Float`, `String`, `Boolean`, `ID`) are
/// pre-registered.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDef>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry holding only the built-in scalars.
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        for name in ["Int", "Float", "String", "Boolean", "ID"] {
            types.insert(
                name.to_string(),
                TypeDef::Scalar(ScalarDef {
                    name: name.to_string(),
                    description: Some(format!("Built-in {name} scalar")),
                }),
            );
        }
        Self {
            types,
            query_type: None,
            mutation_type: None,
            subscription_type: None,
        }
    }

    /// Registers a type definition.
    pub fn register(&mut self, def: TypeDef) -> Result<(), RegistryError> {
        if let TypeDef::Object(obj) = &def {
            if let Some(field) = obj.duplicates.first() {
                return Err(RegistryError::DuplicateField {
                    type_name: obj.name.clone(),
                    field: field.clone(),
                });
            }
        }
        let name = def.name().to_string();
        if self.types.contains_key(&name) {
            return Err(RegistryError::DuplicateType(name));
        }
        self.types.insert(name, def);
        Ok(())
    }

    /// Names the object type serving `query` operations.
    pub fn set_query_type(&mut self, name: impl Into<String>) {
        self.query_type = Some(name.into());
    }

    /// Names the object type serving `mutation` operations.
    pub fn set_mutation_type(&mut self, name: impl Into<String>) {
        self.mutation_type = Some(name.into());
    }

    /// Names the object type serving `subscription` operations.
    pub fn set_subscription_type(&mut self, name: impl Into<String>) {
        self.subscription_type = Some(name.into());
    }

    /// Returns the root type name for an operation kind, if declared.
    pub fn root_type(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => self.query_type.as_deref(),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        }
    }

    /// Gets a type definition by name.
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Looks up a field definition on an object type.
    pub fn field(&self, type_name: &str, field_name: &str) -> Result<&FieldDef, RegistryError> {
        match self.types.get(type_name) {
            Some(TypeDef::Object(obj)) => {
                obj.fields
                    .get(field_name)
                    .ok_or_else(|| RegistryError::UnknownField {
                        type_name: type_name.to_string(),
                        field: field_name.to_string(),
                    })
            }
            Some(_) => Err(RegistryError::UnknownField {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            }),
            None => Err(RegistryError::UnknownType(type_name.to_string())),
        }
    }

    /// Iterates all registered types in registration order.
    pub fn types(&self) -> impl Iterator<Item = (&String, &TypeDef)> {
        self.types.iter()
    }
}
