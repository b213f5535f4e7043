//! The movie schema expressed as registry and codec assemblies.

use reelql_runtime::{
    ArgumentDef, CodecSet, DateCodec, EnumDef, FieldDef, ObjectDef, RegistryError, ScalarDef,
    TypeDef, TypeRegistry,
};

/// Builds the catalog's type registry.
pub fn registry() -> Result<TypeRegistry, RegistryError> {
    let mut registry = TypeRegistry::new();

    registry.register(TypeDef::Scalar(
        ScalarDef::new("Date").description("Epoch milliseconds"),
    ))?;
    registry.register(TypeDef::Enum(
        EnumDef::new("Status")
            .value("WATCHED")
            .value("INTERESTED")
            .value("NOT_INTERESTED")
            .value("UNKNOWN"),
    ))?;
    registry.register(TypeDef::Object(
        ObjectDef::new("Actor")
            .field(FieldDef::new("id", "ID").non_null())
            .field(FieldDef::new("name", "String").non_null()),
    ))?;
    registry.register(TypeDef::Object(
        ObjectDef::new("Movie")
            .field(FieldDef::new("id", "ID").non_null())
            .field(FieldDef::new("title", "String").non_null())
            .field(FieldDef::new("releaseDate", "Date"))
            .field(FieldDef::new("rating", "Int"))
            .field(FieldDef::new("status", "Status"))
            // Null, an empty list, and populated entries are all valid.
            .field(FieldDef::new("actor", "Actor").list()),
    ))?;
    registry.register(TypeDef::Object(
        ObjectDef::new("Query")
            .field(FieldDef::new("movies", "Movie").list())
            .field(FieldDef::new("movie", "Movie").argument(ArgumentDef::new("id", "ID"))),
    ))?;
    registry.register(TypeDef::Object(
        ObjectDef::new("Mutation").field(
            FieldDef::new("addMovie", "Movie")
                .argument(ArgumentDef::new("title", "String").non_null())
                .argument(ArgumentDef::new("releaseDate", "Date"))
                .argument(ArgumentDef::new("rating", "Int"))
                .argument(ArgumentDef::new("status", "Status")),
        ),
    ))?;
    registry.register(TypeDef::Object(
        ObjectDef::new("Subscription").field(FieldDef::new("movieAdded", "Movie").non_null()),
    ))?;

    registry.set_query_type("Query");
    registry.set_mutation_type("Mutation");
    registry.set_subscription_type("Subscription");
    Ok(registry)
}

/// Builds the codec set: built-ins plus the `Date` scalar.
pub fn codecs() -> Result<CodecSet, RegistryError> {
    let mut codecs = CodecSet::new();
    codecs.register(DateCodec)?;
    Ok(codecs)
}
