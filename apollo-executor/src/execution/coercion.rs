//! Input coercion of field arguments.
//!
//! Spec: https://spec.graphql.org/draft/#sec-Coercing-Field-Arguments

use indexmap::IndexMap;

use crate::error::ArgumentError;
use crate::error::CoercionError;
use crate::error::ValidationError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::spec::ArgumentDescriptor;
use crate::spec::FieldType;
use crate::spec::InputObjectType;
use crate::spec::InputValue;
use crate::spec::Schema;
use crate::spec::TypeDescriptor;

/// Coerces the arguments given to `field` into the values its resolver receives.
///
/// Variables are substituted first; an unset variable counts as an absent argument.
/// Nullable arguments that are absent and have no default are left out of the result.
pub fn coerce_arguments(
    schema: &Schema,
    arguments: &[ArgumentDescriptor],
    raw: &IndexMap<String, InputValue>,
    variables: &Object,
    field: &str,
) -> Result<Object, ArgumentError> {
    if let Some(unknown) = raw
        .keys()
        .find(|name| !arguments.iter().any(|argument| &argument.name == *name))
    {
        return Err(ValidationError::UnknownArgument {
            argument: unknown.clone(),
            field: field.to_string(),
        }
        .into());
    }

    let mut coerced = Object::new();
    for argument in arguments {
        let path = format!("{field}.{}", argument.name);
        let value = raw
            .get(&argument.name)
            .and_then(|value| substitute_variables(value, variables));
        if let Some(value) = coerce_field(schema, argument, value, &path)? {
            coerced.insert(argument.name.clone(), value);
        }
    }
    Ok(coerced)
}

fn substitute_variables(value: &InputValue, variables: &Object) -> Option<Value> {
    match value {
        InputValue::Variable(name) => variables.get(name.as_str()).cloned(),
        InputValue::Value(value) => Some(value.clone()),
        InputValue::List(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| substitute_variables(item, variables).unwrap_or_default())
                .collect(),
        )),
        InputValue::Object(fields) => {
            let mut object = Object::new();
            for (key, value) in fields {
                if let Some(value) = substitute_variables(value, variables) {
                    object.insert(key.clone(), value);
                }
            }
            Some(Value::Object(object))
        }
    }
}

/// Applies the default value and nullability rules to a possibly absent value.
fn coerce_field(
    schema: &Schema,
    descriptor: &ArgumentDescriptor,
    value: Option<Value>,
    path: &str,
) -> Result<Option<Value>, ArgumentError> {
    match value {
        Some(Value::Null) if !descriptor.ty.is_non_null() => Ok(Some(Value::Null)),
        Some(value) if !value.is_null() => {
            coerce_input_value(schema, &descriptor.ty, &value, path).map(Some)
        }
        _ => match &descriptor.default_value {
            Some(default) => coerce_input_value(schema, &descriptor.ty, default, path).map(Some),
            None if descriptor.ty.is_non_null() => {
                Err(ValidationError::MissingArgument(path.to_string()).into())
            }
            None => Ok(None),
        },
    }
}

/// Coerces one input value to `ty`. `path` names the value in error messages.
pub fn coerce_input_value(
    schema: &Schema,
    ty: &FieldType,
    value: &Value,
    path: &str,
) -> Result<Value, ArgumentError> {
    match (ty, value) {
        (FieldType::NonNull(inner), value) => {
            if value.is_null() {
                Err(ValidationError::MissingArgument(path.to_string()).into())
            } else {
                coerce_input_value(schema, inner, value, path)
            }
        }
        // NOTE: graphql's types are all optional by default
        (_, Value::Null) => Ok(Value::Null),
        // lists are strict, a single value is not wrapped
        (FieldType::List(inner), Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| coerce_input_value(schema, inner, item, &format!("{path}[{index}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (FieldType::String, Value::String(_)) => Ok(value.clone()),
        (FieldType::Id, Value::String(_)) => Ok(value.clone()),
        // Spec: https://spec.graphql.org/draft/#sec-ID.Input-Coercion
        (FieldType::Id, Value::Number(number)) if number.is_i64() || number.is_u64() => {
            Ok(Value::String(number.to_string().into()))
        }
        // Spec: https://spec.graphql.org/June2018/#sec-Int
        (FieldType::Int, value) if value.is_valid_int_input() => match value {
            Value::String(s) => s
                .as_str()
                .trim()
                .parse::<i32>()
                .map(Value::from)
                .map_err(|_| invalid_value(ty, value, path)),
            _ => Ok(value.clone()),
        },
        // Spec: https://spec.graphql.org/draft/#sec-Float.Input-Coercion
        (FieldType::Float, value) if value.is_valid_float_input() => match value {
            Value::String(s) => s
                .as_str()
                .trim()
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| invalid_value(ty, value, path)),
            Value::Number(number) => number
                .as_f64()
                .map(Value::from)
                .ok_or_else(|| invalid_value(ty, value, path)),
            _ => Err(invalid_value(ty, value, path)),
        },
        (FieldType::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (FieldType::Boolean, Value::String(s)) if matches!(s.as_str(), "true" | "false") => {
            Ok(Value::Bool(s.as_str() == "true"))
        }
        (FieldType::Named(name), value) => match schema.lookup(name) {
            // we cannot know about the expected format of custom scalars
            Ok(TypeDescriptor::Scalar(_)) => Ok(value.clone()),
            Ok(TypeDescriptor::InputObject(input)) => match value.as_object() {
                Some(object) => coerce_input_object(schema, input, object, path),
                None => Err(invalid_value(ty, value, path)),
            },
            _ => Err(CoercionError::NotAnInputType {
                path: path.to_string(),
                type_name: name.clone(),
            }
            .into()),
        },
        _ => Err(invalid_value(ty, value, path)),
    }
}

// Spec: https://spec.graphql.org/draft/#sec-Input-Objects.Input-Coercion
fn coerce_input_object(
    schema: &Schema,
    input: &InputObjectType,
    object: &Object,
    path: &str,
) -> Result<Value, ArgumentError> {
    // keys without a matching input field are ignored
    let mut coerced = Object::new();
    for field in &input.fields {
        let field_path = format!("{path}.{}", field.name);
        let value = object.get(field.name.as_str()).cloned();
        if let Some(value) = coerce_field(schema, field, value, &field_path)? {
            coerced.insert(field.name.clone(), value);
        }
    }
    Ok(Value::Object(coerced))
}

fn invalid_value(ty: &FieldType, value: &Value, path: &str) -> ArgumentError {
    CoercionError::InvalidValue {
        path: path.to_string(),
        expected: ty.to_string(),
        found: value.to_json_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json_bytes::json;

    use super::*;
    use crate::spec::ObjectType;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .register(
                InputObjectType::new("ArticleInput")
                    .field(ArgumentDescriptor::new(
                        "title",
                        FieldType::non_null(FieldType::String),
                    ))
                    .field(ArgumentDescriptor::new("bodyText", FieldType::String))
                    .field(
                        ArgumentDescriptor::new("draft", FieldType::Boolean).default_value(false),
                    ),
            )
            .unwrap();
        schema.register(ObjectType::new("Article")).unwrap();
        schema
    }

    fn dice() -> Vec<ArgumentDescriptor> {
        vec![
            ArgumentDescriptor::new("numDice", FieldType::non_null(FieldType::Int)),
            ArgumentDescriptor::new("numSides", FieldType::Int).default_value(6),
        ]
    }

    fn raw(entries: &[(&str, InputValue)]) -> IndexMap<String, InputValue> {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[rstest]
    #[case::string(FieldType::String, json!("hope"), Some(json!("hope")))]
    #[case::string_rejects_number(FieldType::String, json!(3), None)]
    #[case::id_from_string(FieldType::Id, json!("1"), Some(json!("1")))]
    #[case::id_from_int(FieldType::Id, json!(7), Some(json!("7")))]
    #[case::int(FieldType::Int, json!(3), Some(json!(3)))]
    #[case::int_from_numeric_string(FieldType::Int, json!("12"), Some(json!(12)))]
    #[case::int_rejects_fraction(FieldType::Int, json!(1.5), None)]
    #[case::int_rejects_overflow(FieldType::Int, json!(4_294_967_296_i64), None)]
    #[case::float_from_int(FieldType::Float, json!(2), Some(json!(2.0)))]
    #[case::float_rejects_bool(FieldType::Float, json!(true), None)]
    #[case::boolean(FieldType::Boolean, json!(false), Some(json!(false)))]
    #[case::boolean_from_string(FieldType::Boolean, json!("true"), Some(json!(true)))]
    #[case::boolean_rejects_number(FieldType::Boolean, json!(1), None)]
    #[case::list(FieldType::list(FieldType::Int), json!([1, "2"]), Some(json!([1, 2])))]
    #[case::list_is_strict(FieldType::list(FieldType::Int), json!(1), None)]
    #[case::nullable_null(FieldType::Int, json!(null), Some(json!(null)))]
    fn scalar_coercion(#[case] ty: FieldType, #[case] input: Value, #[case] expected: Option<Value>) {
        let result = coerce_input_value(&schema(), &ty, &input, "arg");
        assert_eq!(result.ok(), expected);
    }

    #[test]
    fn mismatch_names_the_argument_path() {
        let err = coerce_arguments(
            &schema(),
            &dice(),
            &raw(&[("numDice", InputValue::value("three"))]),
            &Object::new(),
            "rollDice",
        )
        .unwrap_err();
        assert_eq!(
            err,
            ArgumentError::Coercion(CoercionError::InvalidValue {
                path: "rollDice.numDice".to_string(),
                expected: "Int".to_string(),
                found: "\"three\"".to_string(),
            })
        );
    }

    #[test]
    fn defaults_fill_absent_arguments() {
        let coerced = coerce_arguments(
            &schema(),
            &dice(),
            &raw(&[("numDice", InputValue::value(3))]),
            &Object::new(),
            "rollDice",
        )
        .unwrap();
        assert_eq!(Value::Object(coerced), json!({ "numDice": 3, "numSides": 6 }));
    }

    #[test]
    fn missing_required_argument() {
        let err = coerce_arguments(&schema(), &dice(), &raw(&[]), &Object::new(), "rollDice")
            .unwrap_err();
        assert_eq!(err.to_string(), "missing required argument rollDice.numDice");

        // an explicit null is as good as nothing
        let err = coerce_arguments(
            &schema(),
            &dice(),
            &raw(&[("numDice", InputValue::value(Value::Null))]),
            &Object::new(),
            "rollDice",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ArgumentError::Validation(ValidationError::MissingArgument(_))
        ));
    }

    #[test]
    fn non_null_with_default_substitutes_null() {
        let arguments = vec![
            ArgumentDescriptor::new("numSides", FieldType::non_null(FieldType::Int))
                .default_value(6),
        ];
        let coerced = coerce_arguments(
            &schema(),
            &arguments,
            &raw(&[("numSides", InputValue::value(Value::Null))]),
            &Object::new(),
            "getDie",
        )
        .unwrap();
        assert_eq!(Value::Object(coerced), json!({ "numSides": 6 }));
    }

    #[test]
    fn input_objects_recurse_and_ignore_extra_keys() {
        let arguments = vec![ArgumentDescriptor::new(
            "input",
            FieldType::non_null(FieldType::named("ArticleInput")),
        )];
        let variables = json!({
            "input": { "title": "Hope...", "bodyText": "...is a good thing", "rating": 5 }
        });
        let coerced = coerce_arguments(
            &schema(),
            &arguments,
            &raw(&[("input", InputValue::variable("input"))]),
            variables.as_object().unwrap(),
            "createArticle",
        )
        .unwrap();
        assert_eq!(
            Value::Object(coerced),
            json!({
                "input": { "title": "Hope...", "bodyText": "...is a good thing", "draft": false }
            })
        );

        let err = coerce_arguments(
            &schema(),
            &arguments,
            &raw(&[("input", InputValue::value(json!({ "bodyText": "untitled" })))]),
            &Object::new(),
            "createArticle",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required argument createArticle.input.title"
        );
    }

    #[test]
    fn unset_variables_are_absent() {
        let coerced = coerce_arguments(
            &schema(),
            &dice(),
            &raw(&[
                ("numDice", InputValue::value(2)),
                ("numSides", InputValue::variable("sides")),
            ]),
            &Object::new(),
            "rollDice",
        )
        .unwrap();
        assert_eq!(Value::Object(coerced), json!({ "numDice": 2, "numSides": 6 }));
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        let err = coerce_arguments(
            &schema(),
            &dice(),
            &raw(&[
                ("numDice", InputValue::value(2)),
                ("numFaces", InputValue::value(8)),
            ]),
            &Object::new(),
            "rollDice",
        )
        .unwrap_err();
        assert_eq!(
            err,
            ArgumentError::Validation(ValidationError::UnknownArgument {
                argument: "numFaces".to_string(),
                field: "rollDice".to_string(),
            })
        );
    }

    #[test]
    fn output_types_are_not_inputs() {
        let err = coerce_input_value(
            &schema(),
            &FieldType::named("Article"),
            &json!({}),
            "getArticle.article",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ArgumentError::Coercion(CoercionError::NotAnInputType { .. })
        ));
    }
}
