use apollo_parser::cst;
use serde::Deserialize;
use serde::Serialize;

use crate::error::SchemaError;

// Primitives are taken from scalars: https://spec.graphql.org/draft/#sec-Scalars
/// A reference to a type, as found on fields, arguments and input fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Named type {0}
    Named(String),
    /// List type {0}
    List(Box<FieldType>),
    /// Non null type {0}
    NonNull(Box<FieldType>),
    /// String
    String,
    /// Int
    Int,
    /// Float
    Float,
    /// Id
    Id,
    /// Boolean
    Boolean,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Named(ty) => write!(f, "{ty}"),
            FieldType::List(ty) => write!(f, "[{ty}]"),
            FieldType::NonNull(ty) => write!(f, "{ty}!"),
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Id => write!(f, "ID"),
            FieldType::Boolean => write!(f, "Boolean"),
        }
    }
}

impl FieldType {
    /// A named type, mapping the built-in scalar names to their variants.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.as_str() {
            "String" => Self::String,
            "Int" => Self::Int,
            "Float" => Self::Float,
            "ID" => Self::Id,
            "Boolean" => Self::Boolean,
            _ => Self::Named(name),
        }
    }

    pub fn list(inner: FieldType) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn non_null(inner: FieldType) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Checks that no wrapper type directly wraps a wrapper of the same kind.
    pub(crate) fn validate(&self) -> Result<(), SchemaError> {
        match self {
            FieldType::NonNull(inner) if inner.is_non_null() => {
                Err(SchemaError::NestedWrapper(self.to_string()))
            }
            FieldType::List(inner) if matches!(**inner, FieldType::List(_)) => {
                Err(SchemaError::NestedWrapper(self.to_string()))
            }
            FieldType::NonNull(inner) | FieldType::List(inner) => inner.validate(),
            _ => Ok(()),
        }
    }

    /// return the name of the type at the bottom of the wrappers
    ///
    /// Example if we get the field `list: [User!]!`, it will return "User"
    pub fn inner_type_name(&self) -> &str {
        match self {
            FieldType::Named(name) => name.as_str(),
            FieldType::List(inner) | FieldType::NonNull(inner) => inner.inner_type_name(),
            FieldType::String => "String",
            FieldType::Int => "Int",
            FieldType::Float => "Float",
            FieldType::Id => "ID",
            FieldType::Boolean => "Boolean",
        }
    }

    pub fn is_builtin_scalar(&self) -> bool {
        match self {
            FieldType::Named(_) | FieldType::List(_) | FieldType::NonNull(_) => false,
            FieldType::String
            | FieldType::Int
            | FieldType::Float
            | FieldType::Id
            | FieldType::Boolean => true,
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, FieldType::NonNull(_))
    }
}

impl TryFrom<cst::Type> for FieldType {
    type Error = SchemaError;
    // Spec: https://spec.graphql.org/draft/#sec-Type-References
    fn try_from(ty: cst::Type) -> Result<Self, Self::Error> {
        match ty {
            cst::Type::NamedType(named) => named.try_into(),
            cst::Type::ListType(list) => list.try_into(),
            cst::Type::NonNullType(non_null) => non_null.try_into(),
        }
    }
}

impl TryFrom<cst::NamedType> for FieldType {
    type Error = SchemaError;
    // Spec: https://spec.graphql.org/draft/#NamedType
    fn try_from(named: cst::NamedType) -> Result<Self, Self::Error> {
        let name = named
            .name()
            .ok_or_else(|| SchemaError::Parse("the node Name is not optional in the spec".into()))?
            .text()
            .to_string();
        Ok(Self::named(name))
    }
}

impl TryFrom<cst::ListType> for FieldType {
    type Error = SchemaError;

    // Spec: https://spec.graphql.org/draft/#ListType
    fn try_from(list: cst::ListType) -> Result<Self, Self::Error> {
        Ok(Self::list(
            list.ty()
                .ok_or_else(|| SchemaError::Parse("node Type is not optional in the spec".into()))?
                .try_into()?,
        ))
    }
}

impl TryFrom<cst::NonNullType> for FieldType {
    type Error = SchemaError;

    // Spec: https://spec.graphql.org/draft/#NonNullType
    fn try_from(non_null: cst::NonNullType) -> Result<Self, Self::Error> {
        if let Some(list) = non_null.list_type() {
            Ok(Self::non_null(list.try_into()?))
        } else if let Some(named) = non_null.named_type() {
            Ok(Self::non_null(named.try_into()?))
        } else {
            Err(SchemaError::Parse(
                "either the NamedType node is provided, either the ListType node".to_string(),
            ))
        }
    }
}
