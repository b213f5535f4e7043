//! Pre-parsed operation IR.
//!
//! The engine never sees query text. A transport or test harness hands it an
//! [`Operation`] whose selections were already parsed elsewhere.

use indexmap::IndexMap;
use serde_json::Value;

/// The kind of operation a document requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
            OperationKind::Subscription => write!(f, "subscription"),
        }
    }
}

/// One requested field: its name, literal arguments, and child selections.
#[derive(Debug, Clone)]
pub struct SelectionNode {
    pub name: String,
    /// Literal argument values in document order.
    pub arguments: IndexMap<String, Value>,
    /// Child selections in document order. Empty for leaf fields.
    pub selections: Vec<SelectionNode>,
}

impl SelectionNode {
    /// Creates a leaf selection of the named field.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
            selections: Vec::new(),
        }
    }

    /// Adds a literal argument.
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Adds child selections.
    pub fn select(mut self, children: impl IntoIterator<Item = SelectionNode>) -> Self {
        self.selections.extend(children);
        self
    }

    /// Returns true if the selection has no children.
    pub fn is_leaf(&self) -> bool {
        self.selections.is_empty()
    }
}

/// A full operation: kind plus root selections.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    pub selections: Vec<SelectionNode>,
}

impl Operation {
    /// Creates a query operation.
    pub fn query(selections: impl IntoIterator<Item = SelectionNode>) -> Self {
        Self {
            kind: OperationKind::Query,
            selections: selections.into_iter().collect(),
        }
    }

    /// Creates a mutation operation.
    pub fn mutation(selections: impl IntoIterator<Item = SelectionNode>) -> Self {
        Self {
            kind: OperationKind::Mutation,
            selections: selections.into_iter().collect(),
        }
    }

    /// Creates a subscription operation.
    pub fn subscription(selections: impl IntoIterator<Item = SelectionNode>) -> Self {
        Self {
            kind: OperationKind::Subscription,
            selections: selections.into_iter().collect(),
        }
    }
}
