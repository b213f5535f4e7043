//! Whole-request validation.
//!
//! Runs in full before any resolver is invoked. Any violation fails the
//! request: the caller gets `data: null` plus one error entry per finding,
//! and execution never starts.

use crate::executor::ResponseError;
use crate::schema::{TypeDef, TypeRegistry};
use crate::selection::{Operation, SelectionNode};
use serde_json::Value;

/// Validates an operation against the registry, collecting every violation.
pub fn validate_operation(
    registry: &TypeRegistry,
    operation: &Operation,
) -> Result<(), Vec<ResponseError>> {
    let Some(root) = registry.root_type(operation.kind) else {
        return Err(vec![ResponseError::new(format!(
            "schema does not define a {} root type",
            operation.kind
        ))]);
    };

    let mut errors = Vec::new();
    if operation.selections.is_empty() {
        errors.push(ResponseError::new(format!(
            "{} operation must select at least one field",
            operation.kind
        )));
    }
    let root = root.to_string();
    for selection in &operation.selections {
        check_selection(registry, &root, selection, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_selection(
    registry: &TypeRegistry,
    parent_type: &str,
    selection: &SelectionNode,
    errors: &mut Vec<ResponseError>,
) {
    let field = match registry.field(parent_type, &selection.name) {
        Ok(field) => field,
        Err(e) => {
            errors.push(ResponseError::new(e.to_string()));
            return;
        }
    };

    for name in selection.arguments.keys() {
        if !field.arguments.contains_key(name) {
            errors.push(ResponseError::new(format!(
                "unknown argument `{name}` on field `{parent_type}.{}`",
                selection.name
            )));
        }
    }
    for (name, argument) in &field.arguments {
        let provided = selection.arguments.get(name);
        if !argument.nullable && provided.map_or(true, Value::is_null) {
            errors.push(ResponseError::new(format!(
                "missing required argument `{name}` on field `{parent_type}.{}`",
                selection.name
            )));
        }
    }

    match registry.type_def(&field.ty) {
        Some(TypeDef::Object(object)) => {
            if selection.selections.is_empty() {
                errors.push(ResponseError::new(format!(
                    "field `{parent_type}.{}` of type `{}` requires a sub-selection",
                    selection.name, field.ty
                )));
            } else {
                let object_name = object.name.clone();
                for child in &selection.selections {
                    check_selection(registry, &object_name, child, errors);
                }
            }
        }
        Some(TypeDef::Scalar(_) | TypeDef::Enum(_)) => {
            if !selection.selections.is_empty() {
                errors.push(ResponseError::new(format!(
                    "field `{parent_type}.{}` of type `{}` cannot have a sub-selection",
                    selection.name, field.ty
                )));
            }
        }
        None => {
            errors.push(ResponseError::new(format!(
                "field `{parent_type}.{}` references unknown type `{}`",
                selection.name, field.ty
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ArgumentDef, FieldDef, ObjectDef, TypeDef};
    use crate::selection::SelectionNode;
    use serde_json::json;

    fn movie_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(TypeDef::Object(
                ObjectDef::new("Movie")
                    .field(FieldDef::new("id", "ID").non_null())
                    .field(FieldDef::new("title", "String").non_null()),
            ))
            .unwrap();
        registry
            .register(TypeDef::Object(
                ObjectDef::new("Query")
                    .field(FieldDef::new("movies", "Movie").list())
                    .field(
                        FieldDef::new("movie", "Movie")
                            .argument(ArgumentDef::new("id", "ID").non_null()),
                    ),
            ))
            .unwrap();
        registry.set_query_type("Query");
        registry
    }

    #[test]
    fn test_valid_operation() {
        let registry = movie_registry();
        let operation = Operation::query([SelectionNode::field("movie")
            .argument("id", json!("321"))
            .select([SelectionNode::field("id"), SelectionNode::field("title")])]);

        assert!(validate_operation(&registry, &operation).is_ok());
    }

    #[test]
    fn test_unknown_field() {
        let registry = movie_registry();
        let operation = Operation::query([SelectionNode::field("movies")
            .select([SelectionNode::field("id"), SelectionNode::field("director")])]);

        let errors = validate_operation(&registry, &operation).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("director"));
    }

    #[test]
    fn test_unknown_argument() {
        let registry = movie_registry();
        let operation = Operation::query([SelectionNode::field("movie")
            .argument("id", json!("321"))
            .argument("year", json!(1983))
            .select([SelectionNode::field("id")])]);

        let errors = validate_operation(&registry, &operation).unwrap_err();
        assert!(errors[0].message.contains("unknown argument `year`"));
    }

    #[test]
    fn test_missing_required_argument() {
        let registry = movie_registry();
        let operation =
            Operation::query([SelectionNode::field("movie").select([SelectionNode::field("id")])]);

        let errors = validate_operation(&registry, &operation).unwrap_err();
        assert!(errors[0].message.contains("missing required argument `id`"));
    }

    #[test]
    fn test_selection_shape() {
        let registry = movie_registry();

        // Object field without a sub-selection.
        let operation = Operation::query([SelectionNode::field("movies")]);
        let errors = validate_operation(&registry, &operation).unwrap_err();
        assert!(errors[0].message.contains("requires a sub-selection"));

        // Leaf field with a sub-selection.
        let operation = Operation::query([SelectionNode::field("movies")
            .select([SelectionNode::field("id").select([SelectionNode::field("nope")])])]);
        let errors = validate_operation(&registry, &operation).unwrap_err();
        assert!(errors[0].message.contains("cannot have a sub-selection"));
    }

    #[test]
    fn test_missing_root_type() {
        let registry = movie_registry();
        let operation = Operation::mutation([SelectionNode::field("addMovie")]);

        let errors = validate_operation(&registry, &operation).unwrap_err();
        assert!(errors[0].message.contains("mutation root type"));
    }

    #[test]
    fn test_collects_multiple_violations() {
        let registry = movie_registry();
        let operation = Operation::query([
            SelectionNode::field("series"),
            SelectionNode::field("movie").select([SelectionNode::field("id")]),
        ]);

        let errors = validate_operation(&registry, &operation).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
