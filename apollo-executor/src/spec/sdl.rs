//! Schema definition language front-end.

use std::fmt;

use apollo_parser::cst;
use apollo_parser::cst::CstNode;
use indexmap::IndexMap;

use super::ArgumentDescriptor;
use super::FieldDescriptor;
use super::FieldType;
use super::InputObjectType;
use super::InterfaceType;
use super::ObjectType;
use super::OperationKind;
use super::ScalarType;
use super::Schema;
use super::TypeDescriptor;
use super::TypePredicate;
use super::TypeResolver;
use super::schema::BUILTIN_SCALARS;
use crate::error::SchemaError;
use crate::execution::Resolver;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// Runtime behavior bound to a schema definition.
///
/// Type definitions only describe shapes; resolvers, `is_type_of` predicates and
/// `resolve_type` functions are attached here and bound while registering.
#[derive(Clone, Debug, Default)]
pub struct Resolvers {
    fields: IndexMap<(String, String), Resolver>,
    is_type_of: IndexMap<String, TypePredicate>,
    resolve_type: IndexMap<String, TypeResolver>,
}

impl Resolvers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a resolver to `type_name.field`.
    pub fn field(
        mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        resolver: Resolver,
    ) -> Self {
        self.fields.insert((type_name.into(), field.into()), resolver);
        self
    }

    pub fn is_type_of(
        mut self,
        type_name: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_type_of
            .insert(type_name.into(), TypePredicate::new(predicate));
        self
    }

    pub fn resolve_type(
        mut self,
        interface: impl Into<String>,
        resolver: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type
            .insert(interface.into(), TypeResolver::new(resolver));
        self
    }
}

impl Schema {
    /// Builds a schema from its SDL definition.
    ///
    /// Scalars are registered first, then interfaces, input objects and object types,
    /// each group in document order. The document order of the implementors of an
    /// interface is therefore their resolution precedence.
    pub fn parse(sdl: &str, resolvers: Resolvers) -> Result<Self, SchemaError> {
        let parser = apollo_parser::Parser::new(sdl);
        let tree = parser.parse();

        let errors = tree
            .errors()
            .map(|err| err.message().to_string())
            .collect::<Vec<_>>();
        if !errors.is_empty() {
            return Err(SchemaError::Parse(errors.join(", ")));
        }

        let document = tree.document();
        let mut scalars = Vec::new();
        let mut interfaces = Vec::new();
        let mut inputs = Vec::new();
        let mut objects = Vec::new();
        let mut roots = Vec::new();

        for definition in document.definitions() {
            match definition {
                // Spec: https://spec.graphql.org/draft/#ScalarTypeDefinition
                cst::Definition::ScalarTypeDefinition(scalar) => {
                    scalars.push(ScalarType::new(name(scalar.name())?));
                }
                // Spec: https://spec.graphql.org/draft/#InterfaceTypeDefinition
                cst::Definition::InterfaceTypeDefinition(interface) => {
                    let mut ty = InterfaceType::new(name(interface.name())?);
                    ty.fields = fields(interface.fields_definition())?;
                    interfaces.push(ty);
                }
                // Spec: https://spec.graphql.org/draft/#InputObjectTypeDefinition
                cst::Definition::InputObjectTypeDefinition(input) => {
                    let mut ty = InputObjectType::new(name(input.name())?);
                    if let Some(definition) = input.input_fields_definition() {
                        ty.fields = definition
                            .input_value_definitions()
                            .map(argument)
                            .collect::<Result<_, _>>()?;
                    }
                    inputs.push(ty);
                }
                // Spec: https://spec.graphql.org/draft/#ObjectTypeDefinition
                cst::Definition::ObjectTypeDefinition(object) => {
                    let mut ty = ObjectType::new(name(object.name())?);
                    ty.fields = fields(object.fields_definition())?;
                    if let Some(implements) = object.implements_interfaces() {
                        for named in implements.named_types() {
                            ty.interfaces.push(name(named.name())?);
                        }
                    }
                    objects.push(ty);
                }
                // Spec: https://spec.graphql.org/draft/#SchemaDefinition
                cst::Definition::SchemaDefinition(schema) => {
                    for root in schema.root_operation_type_definitions() {
                        let kind = match root.operation_type() {
                            Some(ty) if ty.query_token().is_some() => OperationKind::Query,
                            Some(ty) if ty.mutation_token().is_some() => OperationKind::Mutation,
                            _ => {
                                return Err(SchemaError::Parse(format!(
                                    "unsupported root operation '{}'",
                                    root.source_string().trim()
                                )));
                            }
                        };
                        let named = root.named_type().ok_or_else(|| {
                            SchemaError::Parse("root operation type has no name".to_string())
                        })?;
                        roots.push((kind, name(named.name())?));
                    }
                }
                cst::Definition::DirectiveDefinition(_) => {}
                other => {
                    return Err(SchemaError::Parse(format!(
                        "unsupported definition '{}'",
                        other.source_string().trim()
                    )));
                }
            }
        }

        let Resolvers {
            mut fields,
            mut is_type_of,
            mut resolve_type,
        } = resolvers;

        for interface in &mut interfaces {
            if let Some(resolver) = resolve_type.shift_remove(&interface.name) {
                interface.set_resolve_type(resolver);
            }
        }
        for object in &mut objects {
            if let Some(predicate) = is_type_of.shift_remove(&object.name) {
                object.set_is_type_of(predicate);
            }
            for field in &mut object.fields {
                if let Some(resolver) =
                    fields.shift_remove(&(object.name.clone(), field.name.clone()))
                {
                    field.resolver = Some(resolver);
                }
            }
        }
        if let Some((type_name, field)) = fields.keys().next() {
            return Err(SchemaError::UnknownResolverBinding(format!(
                "{type_name}.{field}"
            )));
        }
        if let Some(type_name) = is_type_of.keys().chain(resolve_type.keys()).next() {
            return Err(SchemaError::UnknownResolverBinding(type_name.clone()));
        }

        let mut schema = Schema::new();
        let descriptors = scalars
            .into_iter()
            .map(TypeDescriptor::from)
            .chain(interfaces.into_iter().map(TypeDescriptor::from))
            .chain(inputs.into_iter().map(TypeDescriptor::from))
            .chain(objects.into_iter().map(TypeDescriptor::from));
        for descriptor in descriptors {
            schema.register(descriptor)?;
        }
        for (kind, type_name) in roots {
            schema.set_root_type(kind, type_name);
        }
        schema.validate()?;
        Ok(schema)
    }
}

/// Prints the schema as SDL, types in registration order.
///
/// Parsing the output yields the same type descriptors, without runtime bindings.
impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roots = [OperationKind::Query, OperationKind::Mutation]
            .into_iter()
            .filter(|kind| self.root_type_name(*kind) != kind.default_type_name())
            .collect::<Vec<_>>();
        let mut separate = !roots.is_empty();
        if separate {
            writeln!(f, "schema {{")?;
            for kind in roots {
                writeln!(f, "  {kind}: {}", self.root_type_name(kind))?;
            }
            writeln!(f, "}}")?;
        }

        let descriptors = self
            .types()
            .filter(|descriptor| !BUILTIN_SCALARS.contains(&descriptor.name()));
        for descriptor in descriptors {
            if separate {
                writeln!(f)?;
            }
            separate = true;
            match descriptor {
                TypeDescriptor::Scalar(scalar) => writeln!(f, "scalar {}", scalar.name)?,
                TypeDescriptor::Interface(interface) => {
                    write!(f, "interface {}", interface.name)?;
                    write_fields(f, &interface.fields)?;
                }
                TypeDescriptor::Object(object) => {
                    write!(f, "type {}", object.name)?;
                    if !object.interfaces.is_empty() {
                        write!(f, " implements {}", object.interfaces.join(" & "))?;
                    }
                    write_fields(f, &object.fields)?;
                }
                TypeDescriptor::InputObject(input) => {
                    writeln!(f, "input {} {{", input.name)?;
                    for field in &input.fields {
                        write!(f, "  ")?;
                        write_argument(f, field)?;
                        writeln!(f)?;
                    }
                    writeln!(f, "}}")?;
                }
            }
        }
        Ok(())
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[FieldDescriptor]) -> fmt::Result {
    writeln!(f, " {{")?;
    for field in fields {
        write!(f, "  {}", field.name)?;
        if !field.arguments.is_empty() {
            write!(f, "(")?;
            for (i, argument) in field.arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_argument(f, argument)?;
            }
            write!(f, ")")?;
        }
        writeln!(f, ": {}", field.ty)?;
    }
    writeln!(f, "}}")
}

fn write_argument(f: &mut fmt::Formatter<'_>, argument: &ArgumentDescriptor) -> fmt::Result {
    write!(f, "{}: {}", argument.name, argument.ty)?;
    if let Some(default) = &argument.default_value {
        write!(f, " = ")?;
        write_value(f, default)?;
    }
    Ok(())
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => write!(f, "null"),
        Value::Bool(boolean) => write!(f, "{boolean}"),
        Value::Number(number) => write!(f, "{number}"),
        Value::String(string) => {
            let quoted = serde_json::to_string(string.as_str()).map_err(|_| fmt::Error)?;
            write!(f, "{quoted}")
        }
        Value::Array(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_value(f, item)?;
            }
            write!(f, "]")
        }
        Value::Object(object) => {
            write!(f, "{{")?;
            for (i, (key, value)) in object.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: ", key.as_str())?;
                write_value(f, value)?;
            }
            write!(f, "}}")
        }
    }
}

fn name(name: Option<cst::Name>) -> Result<String, SchemaError> {
    Ok(name
        .ok_or_else(|| SchemaError::Parse("the node Name is not optional in the spec".to_string()))?
        .text()
        .to_string())
}

fn fields(definition: Option<cst::FieldsDefinition>) -> Result<Vec<FieldDescriptor>, SchemaError> {
    let Some(definition) = definition else {
        return Ok(Vec::new());
    };
    definition
        .field_definitions()
        .map(|field| {
            let mut descriptor = FieldDescriptor::new(name(field.name())?, ty(field.ty())?);
            if let Some(arguments) = field.arguments_definition() {
                descriptor.arguments = arguments
                    .input_value_definitions()
                    .map(argument)
                    .collect::<Result<_, _>>()?;
            }
            Ok(descriptor)
        })
        .collect()
}

// Spec: https://spec.graphql.org/draft/#InputValueDefinition
fn argument(definition: cst::InputValueDefinition) -> Result<ArgumentDescriptor, SchemaError> {
    let mut argument = ArgumentDescriptor::new(name(definition.name())?, ty(definition.ty())?);
    if let Some(value) = definition.default_value().and_then(|default| default.value()) {
        argument.default_value = Some(value_from_cst(value)?);
    }
    Ok(argument)
}

fn ty(ty: Option<cst::Type>) -> Result<FieldType, SchemaError> {
    ty.ok_or_else(|| SchemaError::Parse("the node Type is not optional in the spec".to_string()))?
        .try_into()
}

// Spec: https://spec.graphql.org/draft/#sec-Input-Values
fn value_from_cst(value: cst::Value) -> Result<Value, SchemaError> {
    let invalid = |source: String| {
        SchemaError::Parse(format!("invalid default value '{}'", source.trim()))
    };
    Ok(match value {
        cst::Value::Variable(variable) => {
            return Err(SchemaError::Parse(format!(
                "default values cannot use variable '{}'",
                variable.source_string().trim()
            )));
        }
        cst::Value::StringValue(string) => unquote(string.source_string().trim()).into(),
        cst::Value::IntValue(int) => int
            .source_string()
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(int.source_string()))?
            .into(),
        cst::Value::FloatValue(float) => float
            .source_string()
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(float.source_string()))?
            .into(),
        cst::Value::BooleanValue(boolean) => boolean.true_token().is_some().into(),
        cst::Value::NullValue(_) => Value::Null,
        cst::Value::EnumValue(value) => value.source_string().trim().into(),
        cst::Value::ListValue(list) => Value::Array(
            list.values()
                .map(value_from_cst)
                .collect::<Result<_, _>>()?,
        ),
        cst::Value::ObjectValue(object) => {
            let mut map = Object::new();
            for field in object.object_fields() {
                let key = name(field.name())?;
                let value = field
                    .value()
                    .ok_or_else(|| invalid(field.source_string()))
                    .and_then(value_from_cst)?;
                map.insert(key, value);
            }
            Value::Object(map)
        }
    })
}

/// Removes the quotes of a string literal and resolves its escape sequences.
fn unquote(literal: &str) -> String {
    if let Some(block) = literal
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
    {
        return block.replace("\\\"\"\"", "\"\"\"").trim().to_string();
    }
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    let mut unescaped = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some('b') => unescaped.push('\u{8}'),
            Some('f') => unescaped.push('\u{c}'),
            Some('u') => {
                let code: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(c) => unescaped.push(c),
                    None => {
                        unescaped.push_str("\\u");
                        unescaped.push_str(&code);
                    }
                }
            }
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    const SDL: &str = r#"
        interface Content {
          id: ID!
          title: String
        }

        type Article implements Content {
          id: ID!
          title: String
          bodyText: String
        }

        input ArticleInput {
          title: String
          bodyText: String = "tbd"
        }

        type Query {
          rollDice(numDice: Int!, numSides: Int = 6): [Int]
          feed: [Content]
        }

        type Mutation {
          createArticle(input: ArticleInput!): Article
        }
    "#;

    #[test]
    fn parsed_schema_matches_builder() {
        let roll = Resolver::sync(|_| Ok(json!([1, 2, 3])));
        let schema = Schema::parse(
            SDL,
            Resolvers::new().field("Query", "rollDice", roll.clone()),
        )
        .unwrap();

        let query = ObjectType::new("Query")
            .field(
                FieldDescriptor::new("rollDice", FieldType::list(FieldType::Int))
                    .argument(ArgumentDescriptor::new(
                        "numDice",
                        FieldType::non_null(FieldType::Int),
                    ))
                    .argument(ArgumentDescriptor::new("numSides", FieldType::Int).default_value(6))
                    .resolver(roll),
            )
            .field(FieldDescriptor::new(
                "feed",
                FieldType::list(FieldType::named("Content")),
            ));
        assert_eq!(schema.lookup("Query").unwrap(), &TypeDescriptor::Object(query));

        let input = InputObjectType::new("ArticleInput")
            .field(ArgumentDescriptor::new("title", FieldType::String))
            .field(ArgumentDescriptor::new("bodyText", FieldType::String).default_value("tbd"));
        assert_eq!(
            schema.lookup("ArticleInput").unwrap(),
            &TypeDescriptor::InputObject(input)
        );
        assert_eq!(schema.implementors("Content"), ["Article".to_string()]);
        assert!(schema.resolver("Query", "rollDice").is_some());
        assert!(schema.resolver("Query", "feed").is_none());
    }

    #[test]
    fn schema_definition_sets_root_types() {
        let schema = Schema::parse(
            "schema { query: Root } type Root { hello: String }",
            Resolvers::new(),
        )
        .unwrap();
        assert_eq!(schema.root_type_name(OperationKind::Query), "Root");
        assert!(schema.root_type(OperationKind::Query).is_some());
        assert!(schema.root_type(OperationKind::Mutation).is_none());
    }

    #[test]
    fn parse_errors_are_reported() {
        let err = Schema::parse("type Query { hello: }", Resolvers::new()).unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));
    }

    #[test]
    fn bindings_must_target_declared_fields() {
        let err = Schema::parse(
            "type Query { hello: String }",
            Resolvers::new().field("Query", "goodbye", Resolver::sync(|_| Ok(Value::Null))),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownResolverBinding("Query.goodbye".to_string())
        );
    }

    #[test]
    fn object_values_in_defaults() {
        let schema = Schema::parse(
            r#"
            input Point { x: Int y: Int }
            type Query { distance(from: Point = { x: 1, y: -2 }, label: String = "a\"b"): Float }
            "#,
            Resolvers::new(),
        )
        .unwrap();
        let field = schema.lookup("Query").unwrap().field("distance").unwrap();
        assert_eq!(
            field.arguments[0].default_value,
            Some(json!({ "x": 1, "y": -2 }))
        );
        assert_eq!(field.arguments[1].default_value, Some(json!("a\"b")));
    }

    #[test]
    fn schema_prints_as_sdl() {
        let schema = Schema::parse(
            r#"
            schema { query: Root }
            type Root implements Node {
              id: ID!
              dice(count: Int = 2, tags: [String] = ["a"], at: Point = { x: 1 }): [Int]!
            }
            input Point { x: Int }
            interface Node { id: ID! }
            "#,
            Resolvers::new(),
        )
        .unwrap();
        assert_eq!(
            schema.to_string(),
            r#"schema {
  query: Root
}

interface Node {
  id: ID!
}

input Point {
  x: Int
}

type Root implements Node {
  id: ID!
  dice(count: Int = 2, tags: [String] = ["a"], at: Point = {x: 1}): [Int]!
}
"#
        );
    }

    #[test]
    fn printed_schema_parses_back() {
        let schema = Schema::parse(crate::demo::SCHEMA, Resolvers::new()).unwrap();
        let printed = Schema::parse(&schema.to_string(), Resolvers::new()).unwrap();
        assert_eq!(
            printed.types().collect::<Vec<_>>(),
            schema.types().collect::<Vec<_>>()
        );
    }

    #[test]
    fn unquote_literals() {
        assert_eq!(unquote(r#""hello""#), "hello");
        assert_eq!(unquote(r#""tab\there""#), "tab\there");
        assert_eq!(unquote(r#""é""#), "é");
        assert_eq!(unquote("\"\"\"  block \"\"\""), "block");
    }
}
