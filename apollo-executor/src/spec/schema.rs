//! GraphQL schema.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::FieldType;
use super::OperationKind;
use crate::error::SchemaError;
use crate::execution::Resolver;
use crate::execution::coerce_input_value;
use crate::json_ext::Value;

/// Decides whether a value belongs to an object type.
#[derive(Clone)]
pub struct TypePredicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl TypePredicate {
    pub fn new(predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    pub(crate) fn matches(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for TypePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypePredicate(..)")
    }
}

impl PartialEq for TypePredicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Explicit concrete type selection for an interface.
///
/// Returning `None`, or a type that does not implement the interface, defers to
/// the `is_type_of` predicates of the implementors.
#[derive(Clone)]
pub struct TypeResolver(Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>);

impl TypeResolver {
    pub fn new(resolver: impl Fn(&Value) -> Option<String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(resolver))
    }

    pub(crate) fn resolve(&self, value: &Value) -> Option<String> {
        (self.0)(value)
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeResolver(..)")
    }
}

impl PartialEq for TypeResolver {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// An argument of a field, or a field of an input object.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub ty: FieldType,
    pub default_value: Option<Value>,
}

impl ArgumentDescriptor {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// A field of an object or interface type.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: FieldType,
    pub arguments: Vec<ArgumentDescriptor>,
    pub resolver: Option<Resolver>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: Vec::new(),
            resolver: None,
        }
    }

    pub fn argument(mut self, argument: ArgumentDescriptor) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScalarType {
    pub name: String,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub interfaces: Vec<String>,
    pub is_type_of: Option<TypePredicate>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            interfaces: Vec::new(),
            is_type_of: None,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn is_type_of(mut self, predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.is_type_of = Some(TypePredicate::new(predicate));
        self
    }

    pub(crate) fn set_is_type_of(&mut self, predicate: TypePredicate) {
        self.is_type_of = Some(predicate);
    }

    /// Whether `value` belongs to this type.
    ///
    /// Without a predicate, the value must carry a `__typename` equal to the type name.
    pub(crate) fn accepts(&self, value: &Value) -> bool {
        match &self.is_type_of {
            Some(predicate) => predicate.matches(value),
            None => value
                .as_object()
                .and_then(|object| object.get(super::TYPENAME))
                .and_then(|typename| typename.as_str())
                == Some(self.name.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceType {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub resolve_type: Option<TypeResolver>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            resolve_type: None,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn resolve_type(
        mut self,
        resolver: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(TypeResolver::new(resolver));
        self
    }

    pub(crate) fn set_resolve_type(&mut self, resolver: TypeResolver) {
        self.resolve_type = Some(resolver);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputObjectType {
    pub name: String,
    pub fields: Vec<ArgumentDescriptor>,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: ArgumentDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// A named type of the schema.
///
/// Lists and non null wrappers are type references ([`FieldType`]), they are never registered.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDescriptor {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    InputObject(InputObjectType),
}

impl TypeDescriptor {
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Scalar(ty) => &ty.name,
            TypeDescriptor::Object(ty) => &ty.name,
            TypeDescriptor::Interface(ty) => &ty.name,
            TypeDescriptor::InputObject(ty) => &ty.name,
        }
    }

    /// The output fields of an object or interface type.
    pub fn fields(&self) -> &[FieldDescriptor] {
        match self {
            TypeDescriptor::Object(ty) => &ty.fields,
            TypeDescriptor::Interface(ty) => &ty.fields,
            TypeDescriptor::Scalar(_) | TypeDescriptor::InputObject(_) => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().iter().find(|field| field.name == name)
    }

    pub(crate) fn is_input_type(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Scalar(_) | TypeDescriptor::InputObject(_)
        )
    }

    pub(crate) fn is_output_type(&self) -> bool {
        !matches!(self, TypeDescriptor::InputObject(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            TypeDescriptor::Scalar(_) => "scalar",
            TypeDescriptor::Object(_) => "object",
            TypeDescriptor::Interface(_) => "interface",
            TypeDescriptor::InputObject(_) => "input object",
        }
    }
}

impl From<ScalarType> for TypeDescriptor {
    fn from(ty: ScalarType) -> Self {
        TypeDescriptor::Scalar(ty)
    }
}

impl From<ObjectType> for TypeDescriptor {
    fn from(ty: ObjectType) -> Self {
        TypeDescriptor::Object(ty)
    }
}

impl From<InterfaceType> for TypeDescriptor {
    fn from(ty: InterfaceType) -> Self {
        TypeDescriptor::Interface(ty)
    }
}

impl From<InputObjectType> for TypeDescriptor {
    fn from(ty: InputObjectType) -> Self {
        TypeDescriptor::InputObject(ty)
    }
}

pub(super) const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "ID", "Boolean"];

/// A GraphQL schema.
///
/// Types are registered one by one and checked as they come in. An object type
/// can only implement interfaces that were registered before it, and the order
/// in which implementors are registered is the order in which their predicates
/// are tried when resolving an interface value.
#[derive(Clone, Debug)]
pub struct Schema {
    types: IndexMap<String, TypeDescriptor>,
    implementors: HashMap<String, Vec<String>>,
    resolvers: HashMap<String, HashMap<String, Resolver>>,
    query_type: String,
    mutation_type: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// A schema holding only the built-in scalars.
    pub fn new() -> Self {
        let types = BUILTIN_SCALARS
            .iter()
            .map(|name| (name.to_string(), ScalarType::new(*name).into()))
            .collect();
        Self {
            types,
            implementors: HashMap::new(),
            resolvers: HashMap::new(),
            query_type: OperationKind::Query.default_type_name().to_string(),
            mutation_type: OperationKind::Mutation.default_type_name().to_string(),
        }
    }

    /// Adds a type to the schema.
    pub fn register(&mut self, descriptor: impl Into<TypeDescriptor>) -> Result<(), SchemaError> {
        let descriptor = descriptor.into();
        let name = descriptor.name().to_string();
        if self.types.contains_key(&name) {
            return Err(SchemaError::DuplicateType(name));
        }

        match &descriptor {
            TypeDescriptor::Scalar(_) => {}
            TypeDescriptor::Object(object) => {
                check_fields(&name, &object.fields)?;
                for interface in &object.interfaces {
                    self.check_implementation(object, interface)?;
                }
            }
            TypeDescriptor::Interface(interface) => check_fields(&name, &interface.fields)?,
            TypeDescriptor::InputObject(input) => {
                check_unique(&name, input.fields.iter().map(|field| field.name.as_str()))?;
                for field in &input.fields {
                    field.ty.validate()?;
                }
            }
        }

        if let TypeDescriptor::Object(object) = &descriptor {
            for interface in &object.interfaces {
                self.implementors
                    .entry(interface.clone())
                    .or_default()
                    .push(name.clone());
            }
            for field in &object.fields {
                if let Some(resolver) = &field.resolver {
                    self.resolvers
                        .entry(name.clone())
                        .or_default()
                        .insert(field.name.clone(), resolver.clone());
                }
            }
        }

        tracing::trace!(type_name = %name, kind = descriptor.kind(), "registered type");
        self.types.insert(name, descriptor);
        Ok(())
    }

    fn check_implementation(&self, object: &ObjectType, interface: &str) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidImplementation {
            object: object.name.clone(),
            interface: interface.to_string(),
            reason,
        };
        let fields = match self.types.get(interface) {
            Some(TypeDescriptor::Interface(ty)) => &ty.fields,
            Some(other) => return Err(invalid(format!("'{interface}' is a {}", other.kind()))),
            None => return Err(invalid(format!("'{interface}' is not registered"))),
        };
        for expected in fields {
            match object.fields.iter().find(|field| field.name == expected.name) {
                None => return Err(invalid(format!("missing field '{}'", expected.name))),
                Some(field) if field.ty != expected.ty => {
                    return Err(invalid(format!(
                        "field '{}' has type '{}' instead of '{}'",
                        expected.name, field.ty, expected.ty
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Checks that every type reference points at a registered type of the right kind,
    /// and that default values match their declared types.
    ///
    /// Types may refer to types registered after them, so this runs once the schema is complete.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for descriptor in self.types.values() {
            let type_name = descriptor.name();
            for field in descriptor.fields() {
                let coordinate = format!("{type_name}.{}", field.name);
                let target = self.lookup(field.ty.inner_type_name())?;
                if !target.is_output_type() {
                    return Err(SchemaError::InvalidFieldType {
                        coordinate,
                        type_name: field.ty.to_string(),
                        expected: "output",
                    });
                }
                for argument in &field.arguments {
                    self.validate_input(&format!("{coordinate}({}:)", argument.name), argument)?;
                }
            }
            if let TypeDescriptor::InputObject(input) = descriptor {
                for field in &input.fields {
                    self.validate_input(&format!("{type_name}.{}", field.name), field)?;
                }
            }
        }
        Ok(())
    }

    fn validate_input(
        &self,
        coordinate: &str,
        argument: &ArgumentDescriptor,
    ) -> Result<(), SchemaError> {
        if !self.lookup(argument.ty.inner_type_name())?.is_input_type() {
            return Err(SchemaError::InvalidFieldType {
                coordinate: coordinate.to_string(),
                type_name: argument.ty.to_string(),
                expected: "input",
            });
        }
        if let Some(default) = &argument.default_value {
            coerce_input_value(self, &argument.ty, default, coordinate).map_err(|err| {
                SchemaError::InvalidDefaultValue {
                    coordinate: coordinate.to_string(),
                    reason: err.to_string(),
                }
            })?;
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&TypeDescriptor, SchemaError> {
        self.types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// The object types implementing `interface`, in registration order.
    pub fn implementors(&self, interface: &str) -> &[String] {
        self.implementors
            .get(interface)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether a value of the object type `concrete` is also a `type_condition`.
    pub(crate) fn is_subtype(&self, type_condition: &str, concrete: &str) -> bool {
        type_condition == concrete
            || self
                .implementors(type_condition)
                .iter()
                .any(|implementor| implementor == concrete)
    }

    /// The resolver bound to a field of an object type.
    pub(crate) fn resolver(&self, type_name: &str, field: &str) -> Option<&Resolver> {
        self.resolvers.get(type_name)?.get(field)
    }

    pub(crate) fn set_root_type(&mut self, kind: OperationKind, name: impl Into<String>) {
        match kind {
            OperationKind::Query => self.query_type = name.into(),
            OperationKind::Mutation => self.mutation_type = name.into(),
        }
    }

    pub fn root_type_name(&self, kind: OperationKind) -> &str {
        match kind {
            OperationKind::Query => &self.query_type,
            OperationKind::Mutation => &self.mutation_type,
        }
    }

    /// The object type operations of this kind start from.
    pub(crate) fn root_type(&self, kind: OperationKind) -> Option<&ObjectType> {
        match self.types.get(self.root_type_name(kind)) {
            Some(TypeDescriptor::Object(object)) => Some(object),
            _ => None,
        }
    }
}

fn check_fields(type_name: &str, fields: &[FieldDescriptor]) -> Result<(), SchemaError> {
    check_unique(type_name, fields.iter().map(|field| field.name.as_str()))?;
    for field in fields {
        field.ty.validate()?;
        check_unique(
            &format!("{type_name}.{}", field.name),
            field.arguments.iter().map(|argument| argument.name.as_str()),
        )?;
        for argument in &field.arguments {
            argument.ty.validate()?;
        }
    }
    Ok(())
}

fn check_unique<'a>(
    type_name: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), SchemaError> {
    let mut seen = Vec::new();
    for name in names {
        if seen.contains(&name) {
            return Err(SchemaError::DuplicateField {
                type_name: type_name.to_string(),
                field: name.to_string(),
            });
        }
        seen.push(name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    fn content() -> InterfaceType {
        InterfaceType::new("Content")
            .field(FieldDescriptor::new("id", FieldType::non_null(FieldType::Id)))
            .field(FieldDescriptor::new("title", FieldType::String))
    }

    fn article() -> ObjectType {
        ObjectType::new("Article")
            .implements("Content")
            .field(FieldDescriptor::new("id", FieldType::non_null(FieldType::Id)))
            .field(FieldDescriptor::new("title", FieldType::String))
            .field(FieldDescriptor::new("bodyText", FieldType::String))
    }

    #[test]
    fn lookup_returns_registered_descriptor() {
        let mut schema = Schema::new();
        let die = ObjectType::new("RandomDie")
            .field(FieldDescriptor::new("numSides", FieldType::non_null(FieldType::Int)))
            .field(
                FieldDescriptor::new("roll", FieldType::list(FieldType::Int)).argument(
                    ArgumentDescriptor::new("numRolls", FieldType::non_null(FieldType::Int)),
                ),
            );
        schema.register(die.clone()).unwrap();
        assert_eq!(
            schema.lookup("RandomDie").unwrap(),
            &TypeDescriptor::Object(die)
        );
        assert_eq!(
            schema.lookup("Int").unwrap(),
            &TypeDescriptor::Scalar(ScalarType::new("Int"))
        );
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut schema = Schema::new();
        schema.register(ObjectType::new("Message")).unwrap();
        assert_eq!(
            schema.register(ObjectType::new("Message")),
            Err(SchemaError::DuplicateType("Message".to_string()))
        );
        assert_eq!(
            schema.register(ScalarType::new("String")),
            Err(SchemaError::DuplicateType("String".to_string()))
        );
    }

    #[test]
    fn unknown_type() {
        let schema = Schema::new();
        let err = schema.lookup("Nope").unwrap_err();
        assert_eq!(err, SchemaError::UnknownType("Nope".to_string()));
        assert_eq!(err.to_string(), "unknown type 'Nope'");
    }

    #[test]
    fn implementation_must_cover_interface_fields() {
        let mut schema = Schema::new();
        schema.register(content()).unwrap();

        let missing_title = ObjectType::new("Podcast")
            .implements("Content")
            .field(FieldDescriptor::new("id", FieldType::non_null(FieldType::Id)));
        assert!(matches!(
            schema.register(missing_title),
            Err(SchemaError::InvalidImplementation { ref reason, .. }) if reason == "missing field 'title'"
        ));

        let wrong_type = ObjectType::new("Podcast")
            .implements("Content")
            .field(FieldDescriptor::new("id", FieldType::Id))
            .field(FieldDescriptor::new("title", FieldType::String));
        assert!(matches!(
            schema.register(wrong_type),
            Err(SchemaError::InvalidImplementation { .. })
        ));

        let unknown_interface = ObjectType::new("Video").implements("Media");
        assert!(schema.register(unknown_interface).is_err());

        schema.register(article()).unwrap();
        assert_eq!(schema.implementors("Content"), ["Article".to_string()]);
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let mut schema = Schema::new();
        let message = ObjectType::new("Message")
            .field(FieldDescriptor::new("id", FieldType::Id))
            .field(FieldDescriptor::new("id", FieldType::String));
        assert_eq!(
            schema.register(message),
            Err(SchemaError::DuplicateField {
                type_name: "Message".to_string(),
                field: "id".to_string(),
            })
        );
    }

    #[test]
    fn nested_non_null_is_rejected() {
        let mut schema = Schema::new();
        let ty = ObjectType::new("Query").field(FieldDescriptor::new(
            "random",
            FieldType::non_null(FieldType::non_null(FieldType::Float)),
        ));
        assert!(matches!(
            schema.register(ty),
            Err(SchemaError::NestedWrapper(_))
        ));
    }

    #[test]
    fn validate_checks_references_and_defaults() {
        let mut schema = Schema::new();
        schema
            .register(ObjectType::new("Query").field(FieldDescriptor::new(
                "getMessage",
                FieldType::named("Message"),
            )))
            .unwrap();
        assert_eq!(
            schema.validate(),
            Err(SchemaError::UnknownType("Message".to_string()))
        );

        let mut schema = Schema::new();
        schema
            .register(
                ObjectType::new("Query").field(
                    FieldDescriptor::new("rollDice", FieldType::list(FieldType::Int)).argument(
                        ArgumentDescriptor::new("numSides", FieldType::Int)
                            .default_value(json!("six")),
                    ),
                ),
            )
            .unwrap();
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::InvalidDefaultValue { .. })
        ));
    }

    #[test]
    fn input_objects_are_not_output_types() {
        let mut schema = Schema::new();
        schema
            .register(
                InputObjectType::new("MessageInput")
                    .field(ArgumentDescriptor::new("content", FieldType::String)),
            )
            .unwrap();
        schema
            .register(ObjectType::new("Query").field(FieldDescriptor::new(
                "echo",
                FieldType::named("MessageInput"),
            )))
            .unwrap();
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::InvalidFieldType {
                expected: "output",
                ..
            })
        ));
    }

    #[test]
    fn object_without_predicate_matches_typename() {
        let object = article();
        assert!(object.accepts(&json!({ "__typename": "Article" })));
        assert!(!object.accepts(&json!({ "bodyText": "hope" })));
        let object = article().is_type_of(|value| {
            value
                .as_object()
                .is_some_and(|object| object.contains_key("bodyText"))
        });
        assert!(object.accepts(&json!({ "bodyText": "hope" })));
    }

    #[test]
    fn resolvers_are_bound_per_type_and_field() {
        let mut schema = Schema::new();
        let hello = Resolver::sync(|_| Ok(json!("hello")));
        schema
            .register(
                ObjectType::new("Query")
                    .field(FieldDescriptor::new("hello", FieldType::String).resolver(hello.clone()))
                    .field(FieldDescriptor::new("title", FieldType::String)),
            )
            .unwrap();
        schema.register(content()).unwrap();
        schema.register(article()).unwrap();

        assert_eq!(schema.resolver("Query", "hello"), Some(&hello));
        assert_eq!(schema.resolver("Query", "title"), None);
        assert_eq!(schema.resolver("Article", "hello"), None);
        assert_eq!(schema.resolver("Article", "title"), None);
        assert_eq!(schema.resolver("Nope", "hello"), None);
    }
}
