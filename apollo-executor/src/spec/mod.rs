//! GraphQL type system and selection trees.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

mod field_type;
mod schema;
mod sdl;
mod selection;

use std::fmt;

pub use field_type::FieldType;
pub use schema::ArgumentDescriptor;
pub use schema::FieldDescriptor;
pub use schema::InputObjectType;
pub use schema::InterfaceType;
pub use schema::ObjectType;
pub use schema::ScalarType;
pub use schema::Schema;
pub use schema::TypeDescriptor;
pub use schema::TypePredicate;
pub use schema::TypeResolver;
pub use sdl::Resolvers;
pub use selection::Field;
pub use selection::InlineFragment;
pub use selection::InputValue;
pub use selection::Selection;
pub(crate) use selection::selection_set_depth;
use serde::Deserialize;
use serde::Serialize;

/// The `__typename` meta field.
pub const TYPENAME: &str = "__typename";

/// The kind of a GraphQL operation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
}

impl OperationKind {
    pub(crate) const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        }
    }

    /// Only for use by the schema builders when no `schema` definition says otherwise.
    pub(crate) const fn default_type_name(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
