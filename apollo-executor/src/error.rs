//! Executor errors.
use displaydoc::Display;
use thiserror::Error;

pub use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::OperationKind;

/// Error in the schema.
///
/// These are raised while registering types and are never recovered from.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum SchemaError {
    /// type '{0}' is already registered
    DuplicateType(String),
    /// unknown type '{0}'
    UnknownType(String),
    /// field '{type_name}.{field}' is declared more than once
    DuplicateField { type_name: String, field: String },
    /// type '{object}' cannot implement '{interface}': {reason}
    InvalidImplementation {
        object: String,
        interface: String,
        reason: String,
    },
    /// invalid type reference {0}: a wrapper type cannot directly wrap itself
    NestedWrapper(String),
    /// field '{coordinate}' has type '{type_name}' which is not an {expected} type
    InvalidFieldType {
        coordinate: String,
        type_name: String,
        expected: &'static str,
    },
    /// invalid default value for '{coordinate}': {reason}
    InvalidDefaultValue { coordinate: String, reason: String },
    /// no field '{0}' to bind a resolver to
    UnknownResolverBinding(String),
    /// parsing error(s): {0}
    Parse(String),
}

/// An argument or variable is missing or not allowed.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    /// missing required argument {0}
    MissingArgument(String),
    /// unknown argument '{argument}' on field '{field}'
    UnknownArgument { argument: String, field: String },
}

/// A raw value cannot be converted to the declared input type.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum CoercionError {
    /// invalid value for argument {path}: expected type '{expected}', got {found}
    InvalidValue {
        path: String,
        expected: String,
        found: String,
    },
    /// argument {path} has type '{type_name}' which is not an input type
    NotAnInputType { path: String, type_name: String },
}

/// Failure to prepare the arguments of a field.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ArgumentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

/// cannot resolve concrete type for interface {interface}
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
pub struct TypeResolutionError {
    /// The interface the value was declared as.
    pub interface: String,
}

/// no {collection} record with id '{id}'
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
pub struct NotFoundError {
    /// The collection that was searched.
    pub collection: String,
    /// The missing id.
    pub id: String,
}

/// A resolver failed.
///
/// This is what resolvers return to signal a field error. The message and
/// extensions are reported as-is in the response, at the path of the field.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("{message}")]
pub struct ResolverError {
    message: String,
    extensions: Object,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: Object::new(),
        }
    }

    /// Adds an entry to the GraphQL extensions of the error.
    pub fn with_extension(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extensions.insert(key, value.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::new(format!("resolver panicked: {reason}")).with_extension("code", "RESOLVER_PANIC")
    }
}

impl From<NotFoundError> for ResolverError {
    fn from(err: NotFoundError) -> Self {
        ResolverError::new(err.to_string()).with_extension("code", err.extension_code())
    }
}

impl From<ArgumentError> for ResolverError {
    fn from(err: ArgumentError) -> Self {
        ResolverError::new(err.to_string()).with_extension("code", err.extension_code())
    }
}

/// A resolved value does not match the type declared for its field.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum CompletionError {
    /// Cannot return null for non-nullable field {parent_type}.{field}
    NullForNonNullField { parent_type: String, field: String },
    /// Cannot return null for non-nullable array element of type {element_type} at index {index}
    NullForNonNullElement { element_type: String, index: usize },
    /// {type_name} cannot represent value: {value}
    InvalidLeafValue { type_name: String, value: String },
    /// expected a list for field {field}, got {found}
    ExpectedList { field: String, found: String },
    /// expected an object of type {type_name}, got {found}
    ExpectedObject { type_name: String, found: String },
    /// type '{0}' is not an output type
    InvalidOutputType(String),
}

/// Request level errors. The response carries `data: null` when one of those happens.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ExecutionError {
    /// request exceeded its deadline of {0}
    DeadlineExceeded(String),
    /// the schema has no root type for {0} operations
    MissingRootType(OperationKind),
    /// selection depth exceeds the limit of {0}
    MaxDepthExceeded(usize),
}

impl ErrorExtension for SchemaError {
    fn extension_code(&self) -> String {
        match self {
            SchemaError::Parse(_) => "SCHEMA_PARSING_ERROR",
            _ => "INVALID_SCHEMA",
        }
        .to_string()
    }
}

impl ErrorExtension for ValidationError {
    fn extension_code(&self) -> String {
        "GRAPHQL_VALIDATION_FAILED".to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        match self {
            ValidationError::MissingArgument(path) => {
                obj.insert("argument", path.clone().into());
            }
            ValidationError::UnknownArgument { argument, field } => {
                obj.insert("argument", argument.clone().into());
                obj.insert("field", field.clone().into());
            }
        }
        Some(obj)
    }
}

impl ErrorExtension for CoercionError {
    fn extension_code(&self) -> String {
        "BAD_USER_INPUT".to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        match self {
            CoercionError::InvalidValue { path, expected, .. } => {
                obj.insert("argument", path.clone().into());
                obj.insert("type", expected.clone().into());
            }
            CoercionError::NotAnInputType { path, type_name } => {
                obj.insert("argument", path.clone().into());
                obj.insert("type", type_name.clone().into());
            }
        }
        Some(obj)
    }
}

impl ErrorExtension for ArgumentError {
    fn extension_code(&self) -> String {
        match self {
            ArgumentError::Validation(err) => err.extension_code(),
            ArgumentError::Coercion(err) => err.extension_code(),
        }
    }

    fn custom_extension_details(&self) -> Option<Object> {
        match self {
            ArgumentError::Validation(err) => err.custom_extension_details(),
            ArgumentError::Coercion(err) => err.custom_extension_details(),
        }
    }
}

impl ErrorExtension for TypeResolutionError {
    fn extension_code(&self) -> String {
        "TYPE_RESOLUTION_FAILED".to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        obj.insert("interface", self.interface.clone().into());
        Some(obj)
    }
}

impl ErrorExtension for NotFoundError {
    fn extension_code(&self) -> String {
        "NOT_FOUND".to_string()
    }
}

impl ErrorExtension for ResolverError {
    fn extension_code(&self) -> String {
        self.extensions
            .get("code")
            .and_then(|code| code.as_str())
            .unwrap_or("RESOLVER_ERROR")
            .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        (!self.extensions.is_empty()).then(|| self.extensions.clone())
    }
}

impl ErrorExtension for CompletionError {
    fn extension_code(&self) -> String {
        match self {
            CompletionError::NullForNonNullField { .. }
            | CompletionError::NullForNonNullElement { .. } => "NON_NULL_VIOLATION",
            CompletionError::InvalidLeafValue { .. } => "INVALID_LEAF_VALUE",
            CompletionError::ExpectedList { .. } => "EXPECTED_LIST",
            CompletionError::ExpectedObject { .. } => "EXPECTED_OBJECT",
            CompletionError::InvalidOutputType(_) => "INVALID_OUTPUT_TYPE",
        }
        .to_string()
    }
}

impl ErrorExtension for ExecutionError {
    fn extension_code(&self) -> String {
        match self {
            ExecutionError::DeadlineExceeded(_) => "EXECUTION_DEADLINE_EXCEEDED",
            ExecutionError::MissingRootType(_) => "GRAPHQL_VALIDATION_FAILED",
            ExecutionError::MaxDepthExceeded(_) => "MAX_DEPTH_LIMIT",
        }
        .to_string()
    }
}
