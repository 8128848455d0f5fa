use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::json_ext::Object;
use crate::spec::OperationKind;
use crate::spec::Selection;

/// A GraphQL `Request`, as handed over by the transport once the operation has been parsed.
///
/// The operation is carried as a selection tree rather than as a query string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Request {
    /// The kind of operation, `query` when not specified.
    #[serde(default)]
    pub operation: OperationKind,

    /// The (optional) GraphQL operation name, only used for logging.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub operation_name: Option<String>,

    /// The top level selection set of the operation.
    #[serde(default)]
    pub selection_set: Vec<Selection>,

    /// The (optional) GraphQL variables in the form of a JSON object.
    ///
    /// Arguments refer to them with `{"variable": "name"}` input values.
    #[serde(
        skip_serializing_if = "Object::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub variables: Object,
}

// NOTE: this deserialize helper is used to transform `null` to Default::default()
fn deserialize_null_default<'de, D, T: Default + Deserialize<'de>>(
    deserializer: D,
) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Option<T>>::deserialize(deserializer).map(|x| x.unwrap_or_default())
}

#[buildstructor::buildstructor]
impl Request {
    #[builder(visibility = "pub")]
    /// This is the constructor (or builder) to use when constructing a GraphQL
    /// `Request`.
    fn new(
        operation: Option<OperationKind>,
        operation_name: Option<String>,
        selections: Vec<Selection>,
        // Skip the `Object` type alias in order to use buildstructor’s map special-casing
        variables: JsonMap<ByteString, Value>,
    ) -> Self {
        Self {
            operation: operation.unwrap_or_default(),
            operation_name,
            selection_set: selections,
            variables,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::spec::Field;
    use crate::spec::InputValue;

    #[test]
    fn deserialize_request_with_variables() {
        let request: Request = serde_json_bytes::from_value(json!({
            "operation": "mutation",
            "operationName": "CreateMessage",
            "selectionSet": [{
                "field": {
                    "name": "createMessage",
                    "arguments": { "input": { "variable": "input" } },
                    "selectionSet": [{ "field": { "name": "id" } }]
                }
            }],
            "variables": { "input": { "author": "andy", "content": "hope is a good thing" } }
        }))
        .unwrap();

        let expected = Request::builder()
            .operation(OperationKind::Mutation)
            .operation_name("CreateMessage")
            .selection(
                Field::new("createMessage")
                    .argument("input", InputValue::variable("input"))
                    .select(Field::new("id")),
            )
            .variables(
                json!({ "input": { "author": "andy", "content": "hope is a good thing" } })
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .build();
        assert_eq!(request, expected);
    }

    #[test]
    fn null_variables_are_empty() {
        let request: Request = serde_json_bytes::from_value(json!({
            "selectionSet": [{ "field": { "name": "hello" } }],
            "variables": null
        }))
        .unwrap();
        assert!(request.variables.is_empty());
        assert_eq!(request.operation, OperationKind::Query);
    }
}
