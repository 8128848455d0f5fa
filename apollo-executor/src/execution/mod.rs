//! Execution of selection trees against a [`Schema`].
//!
//! Spec: https://spec.graphql.org/draft/#sec-Execution

mod coercion;
mod dispatch;
mod interface;

use std::sync::Arc;

pub use coercion::coerce_arguments;
pub use coercion::coerce_input_value;
pub use dispatch::FieldResult;
pub use dispatch::ResolveInfo;
pub use dispatch::Resolved;
pub use dispatch::Resolver;
pub use dispatch::dispatch;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::join_all;
use indexmap::IndexMap;
pub use interface::resolve_concrete_type;
use tracing::Instrument;

use crate::Context;
use crate::configuration::Configuration;
use crate::configuration::Execution;
use crate::error::CompletionError;
use crate::error::Error;
use crate::error::ExecutionError;
use crate::graphql::ErrorExtension;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::spec::Field;
use crate::spec::FieldDescriptor;
use crate::spec::FieldType;
use crate::spec::ObjectType;
use crate::spec::OperationKind;
use crate::spec::Schema;
use crate::spec::Selection;
use crate::spec::TYPENAME;
use crate::spec::TypeDescriptor;
use crate::spec::selection_set_depth;

/// A value that could not be completed.
///
/// The error has already been recorded when this is returned; the nearest
/// nullable position above it becomes `null`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct InvalidValue;

struct ExecutionParameters<'a> {
    schema: &'a Schema,
    variables: &'a Object,
    context: &'a Context,
    parallel: bool,
}

/// The field a value is being completed for, for error messages.
#[derive(Clone, Copy)]
struct FieldRef<'a> {
    parent_type: &'a str,
    name: &'a str,
}

/// Executes requests against a schema with a given configuration.
#[derive(Clone, Debug)]
pub struct Executor {
    schema: Arc<Schema>,
    configuration: Arc<Configuration>,
}

#[buildstructor::buildstructor]
impl Executor {
    #[builder(visibility = "pub")]
    fn new(schema: Arc<Schema>, configuration: Option<Arc<Configuration>>) -> Self {
        Self {
            schema,
            configuration: configuration.unwrap_or_default(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Executes `request`, starting from an empty root object.
    pub async fn execute(&self, request: &Request, context: &Context) -> Response {
        self.execute_with_root(request, &Value::Object(Object::new()), context)
            .await
    }

    /// Executes `request`; root fields without a resolver read `root_value`.
    pub async fn execute_with_root(
        &self,
        request: &Request,
        root_value: &Value,
        context: &Context,
    ) -> Response {
        execute_operation(
            &self.schema,
            self.configuration.execution(),
            request,
            root_value,
            context,
        )
        .await
    }
}

/// Executes `request` with the default execution settings.
pub async fn execute(
    schema: &Schema,
    request: &Request,
    root_value: &Value,
    context: &Context,
) -> Response {
    execute_operation(schema, &Execution::default(), request, root_value, context).await
}

async fn execute_operation(
    schema: &Schema,
    execution: &Execution,
    request: &Request,
    root_value: &Value,
    context: &Context,
) -> Response {
    let span = tracing::info_span!(
        "execute",
        "graphql.operation.kind" = %request.operation,
        "graphql.operation.name" = request.operation_name.as_deref().unwrap_or_default(),
    );
    run_operation(schema, execution, request, root_value, context)
        .instrument(span)
        .await
}

async fn run_operation(
    schema: &Schema,
    execution: &Execution,
    request: &Request,
    root_value: &Value,
    context: &Context,
) -> Response {
    let kind = request.operation;
    let Some(root_type) = schema.root_type(kind) else {
        return Response::from_errors(vec![
            ExecutionError::MissingRootType(kind).to_graphql_error(None),
        ]);
    };
    if selection_set_depth(&request.selection_set) > execution.max_depth() {
        return Response::from_errors(vec![
            ExecutionError::MaxDepthExceeded(execution.max_depth()).to_graphql_error(None),
        ]);
    }

    if let Err(error) = validate_root_arguments(
        schema,
        root_type,
        &request.selection_set,
        &request.variables,
    ) {
        return Response::from_errors(vec![error]);
    }

    let parameters = ExecutionParameters {
        schema,
        variables: &request.variables,
        context,
        parallel: execution.parallel_fields(),
    };
    let selection_sets = [request.selection_set.as_slice()];
    let path = Path::empty();
    let mut errors = Vec::new();
    let data = execute_selection_set(
        &parameters,
        root_type,
        &selection_sets,
        root_value,
        &path,
        &mut errors,
        kind == OperationKind::Mutation,
    );
    let data = match execution.deadline() {
        Some(deadline) => match tokio::time::timeout(deadline, data).await {
            Ok(data) => data,
            Err(_) => {
                tracing::warn!(?deadline, "request exceeded its deadline");
                return Response::from_errors(vec![
                    ExecutionError::DeadlineExceeded(format!("{deadline:?}"))
                        .to_graphql_error(None),
                ]);
            }
        },
        None => data.await,
    };

    Response::builder()
        .data(match data {
            Ok(data) => Value::Object(data),
            Err(InvalidValue) => Value::Null,
        })
        .errors(errors)
        .build()
}

/// Coerces the arguments of the root fields before anything runs.
///
/// Argument failures below the root only null out their field, at the root they fail
/// the whole request.
fn validate_root_arguments(
    schema: &Schema,
    root_type: &ObjectType,
    selection_set: &[Selection],
    variables: &Object,
) -> Result<(), Error> {
    let mut grouped = IndexMap::new();
    collect_fields(schema, root_type, selection_set, &mut grouped);
    for (response_key, fields) in &grouped {
        for field in fields {
            let Some(definition) = field_definition(root_type, &field.name) else {
                continue;
            };
            coerce_arguments(
                schema,
                &definition.arguments,
                &field.arguments,
                variables,
                &field.name,
            )
            .map_err(|err| {
                tracing::debug!(field = %field.name, error = %err, "invalid root field arguments");
                err.to_graphql_error(Some(Path::empty().join(*response_key)))
            })?;
        }
    }
    Ok(())
}

/// Groups the fields selected on `object_type` by response key.
///
/// Fragments whose type condition does not apply and fields the type does not
/// declare are skipped.
fn collect_fields<'a>(
    schema: &Schema,
    object_type: &ObjectType,
    selection_set: &'a [Selection],
    fields: &mut IndexMap<&'a str, Vec<&'a Field>>,
) {
    for selection in selection_set {
        match selection {
            Selection::Field(field) => {
                if field.name != TYPENAME && field_definition(object_type, &field.name).is_none()
                {
                    continue;
                }
                fields.entry(field.response_key()).or_default().push(field);
            }
            Selection::InlineFragment(fragment) => {
                if fragment
                    .type_condition
                    .as_deref()
                    .is_none_or(|condition| schema.is_subtype(condition, &object_type.name))
                {
                    collect_fields(schema, object_type, &fragment.selection_set, fields);
                }
            }
        }
    }
}

fn field_definition<'a>(object_type: &'a ObjectType, name: &str) -> Option<&'a FieldDescriptor> {
    object_type.fields.iter().find(|field| field.name == name)
}

fn execute_selection_set<'a>(
    parameters: &'a ExecutionParameters<'a>,
    object_type: &'a ObjectType,
    selection_sets: &'a [&'a [Selection]],
    parent: &'a Value,
    path: &'a Path,
    errors: &'a mut Vec<Error>,
    serial: bool,
) -> BoxFuture<'a, Result<Object, InvalidValue>> {
    async move {
        let mut grouped = IndexMap::new();
        for selection_set in selection_sets {
            collect_fields(parameters.schema, object_type, selection_set, &mut grouped);
        }

        let results = if serial || !parameters.parallel {
            let mut results = Vec::with_capacity(grouped.len());
            for (response_key, fields) in &grouped {
                results.push(
                    execute_field(
                        parameters,
                        object_type,
                        response_key,
                        fields,
                        parent,
                        path,
                        errors,
                    )
                    .await,
                );
            }
            results
        } else {
            let mut field_errors = grouped.iter().map(|_| Vec::new()).collect::<Vec<_>>();
            let results = join_all(grouped.iter().zip(field_errors.iter_mut()).map(
                |((response_key, fields), errors)| {
                    execute_field(
                        parameters,
                        object_type,
                        response_key,
                        fields,
                        parent,
                        path,
                        errors,
                    )
                },
            ))
            .await;
            errors.extend(field_errors.into_iter().flatten());
            results
        };

        let mut data = Object::new();
        let mut invalid = false;
        for (response_key, result) in grouped.keys().zip(results) {
            match result {
                Ok(value) => {
                    data.insert(*response_key, value);
                }
                Err(InvalidValue) => invalid = true,
            }
        }
        if invalid { Err(InvalidValue) } else { Ok(data) }
    }
    .boxed()
}

async fn execute_field<'a>(
    parameters: &'a ExecutionParameters<'a>,
    object_type: &'a ObjectType,
    response_key: &'a str,
    fields: &'a [&'a Field],
    parent: &'a Value,
    path: &'a Path,
    errors: &'a mut Vec<Error>,
) -> Result<Value, InvalidValue> {
    let Some(field) = fields.first() else {
        return Ok(Value::Null);
    };
    if field.name == TYPENAME {
        return Ok(Value::String(object_type.name.as_str().into()));
    }
    let Some(definition) = field_definition(object_type, &field.name) else {
        return Ok(Value::Null);
    };
    let path = path.join(response_key);

    let arguments = match coerce_arguments(
        parameters.schema,
        &definition.arguments,
        &field.arguments,
        parameters.variables,
        &field.name,
    ) {
        Ok(arguments) => arguments,
        Err(err) => {
            errors.push(err.to_graphql_error(Some(path)));
            return field_failure(&definition.ty);
        }
    };

    let value = match dispatch(
        parameters.schema,
        &object_type.name,
        definition,
        parent,
        &arguments,
        parameters.context,
        &path,
    )
    .await
    {
        Ok(value) => value,
        Err(err) => {
            errors.push(err.to_graphql_error(Some(path)));
            return field_failure(&definition.ty);
        }
    };

    let selection_sets = fields
        .iter()
        .map(|field| field.selection_set.as_slice())
        .collect::<Vec<_>>();
    let field_ref = FieldRef {
        parent_type: &object_type.name,
        name: &definition.name,
    };
    complete_value(
        parameters,
        field_ref,
        &definition.ty,
        &selection_sets,
        value,
        &path,
        errors,
    )
    .await
}

/// The value of a field whose arguments or resolver failed.
fn field_failure(ty: &FieldType) -> Result<Value, InvalidValue> {
    if ty.is_non_null() {
        Err(InvalidValue)
    } else {
        Ok(Value::Null)
    }
}

/// Completes `value` as `ty`.
///
/// Nullable positions absorb the failures below them and become `null`.
fn complete_value<'a>(
    parameters: &'a ExecutionParameters<'a>,
    field: FieldRef<'a>,
    ty: &'a FieldType,
    selection_sets: &'a [&'a [Selection]],
    value: Value,
    path: &'a Path,
    errors: &'a mut Vec<Error>,
) -> BoxFuture<'a, Result<Value, InvalidValue>> {
    async move {
        let FieldType::NonNull(inner) = ty else {
            return Ok(
                complete_inner(parameters, field, ty, selection_sets, value, path, errors)
                    .await
                    .unwrap_or_default(),
            );
        };

        let completed =
            complete_inner(parameters, field, inner, selection_sets, value, path, errors).await?;
        if !completed.is_null() {
            return Ok(completed);
        }
        let error = match path.last() {
            Some(PathElement::Index(index)) => CompletionError::NullForNonNullElement {
                element_type: inner.to_string(),
                index: *index,
            },
            _ => CompletionError::NullForNonNullField {
                parent_type: field.parent_type.to_string(),
                field: field.name.to_string(),
            },
        };
        errors.push(error.to_graphql_error(Some(path.clone())));
        Err(InvalidValue)
    }
    .boxed()
}

async fn complete_inner<'a>(
    parameters: &'a ExecutionParameters<'a>,
    field: FieldRef<'a>,
    ty: &'a FieldType,
    selection_sets: &'a [&'a [Selection]],
    value: Value,
    path: &'a Path,
    errors: &'a mut Vec<Error>,
) -> Result<Value, InvalidValue> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match ty {
        FieldType::NonNull(_) => {
            complete_value(parameters, field, ty, selection_sets, value, path, errors).await
        }
        FieldType::List(inner) => {
            let items = match value {
                Value::Array(items) => items,
                other => {
                    errors.push(
                        CompletionError::ExpectedList {
                            field: format!("{}.{}", field.parent_type, field.name),
                            found: other.json_type_name().to_string(),
                        }
                        .to_graphql_error(Some(path.clone())),
                    );
                    return Err(InvalidValue);
                }
            };
            complete_list(parameters, field, inner, selection_sets, items, path, errors).await
        }
        FieldType::Named(name) => match parameters.schema.lookup(name) {
            Ok(TypeDescriptor::Scalar(_)) => Ok(value),
            Ok(TypeDescriptor::Object(object_type)) => {
                complete_object(parameters, object_type, selection_sets, value, path, errors).await
            }
            Ok(TypeDescriptor::Interface(interface)) => {
                let object_type = resolve_concrete_type(parameters.schema, interface, &value)
                    .map_err(|err| err.to_graphql_error(Some(path.clone())))
                    .and_then(|concrete| match parameters.schema.lookup(concrete) {
                        Ok(TypeDescriptor::Object(object_type)) => Ok(object_type),
                        _ => Err(CompletionError::InvalidOutputType(concrete.to_string())
                            .to_graphql_error(Some(path.clone()))),
                    });
                match object_type {
                    Ok(object_type) => {
                        complete_object(parameters, object_type, selection_sets, value, path, errors)
                            .await
                    }
                    Err(error) => {
                        errors.push(error);
                        Err(InvalidValue)
                    }
                }
            }
            Ok(TypeDescriptor::InputObject(_)) | Err(_) => {
                failfast_error!(type_name = %name, "field type cannot be completed as an output type");
                errors.push(
                    CompletionError::InvalidOutputType(name.clone())
                        .to_graphql_error(Some(path.clone())),
                );
                Err(InvalidValue)
            }
        },
        leaf => match complete_leaf(leaf, &value) {
            Some(value) => Ok(value),
            None => {
                errors.push(
                    CompletionError::InvalidLeafValue {
                        type_name: leaf.to_string(),
                        value: value.to_json_string(),
                    }
                    .to_graphql_error(Some(path.clone())),
                );
                Err(InvalidValue)
            }
        },
    }
}

async fn complete_list<'a>(
    parameters: &'a ExecutionParameters<'a>,
    field: FieldRef<'a>,
    item_type: &'a FieldType,
    selection_sets: &'a [&'a [Selection]],
    items: Vec<Value>,
    path: &'a Path,
    errors: &'a mut Vec<Error>,
) -> Result<Value, InvalidValue> {
    let paths = (0..items.len())
        .map(|index| path.join(index))
        .collect::<Vec<_>>();
    let mut item_errors = paths.iter().map(|_| Vec::new()).collect::<Vec<_>>();

    let completed = if parameters.parallel {
        join_all(items.into_iter().zip(&paths).zip(item_errors.iter_mut()).map(
            |((item, path), errors)| {
                complete_value(parameters, field, item_type, selection_sets, item, path, errors)
            },
        ))
        .await
    } else {
        let mut completed = Vec::with_capacity(paths.len());
        for ((item, path), errors) in items.into_iter().zip(&paths).zip(item_errors.iter_mut()) {
            completed.push(
                complete_value(parameters, field, item_type, selection_sets, item, path, errors)
                    .await,
            );
        }
        completed
    };
    errors.extend(item_errors.into_iter().flatten());

    completed
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

async fn complete_object<'a>(
    parameters: &'a ExecutionParameters<'a>,
    object_type: &'a ObjectType,
    selection_sets: &'a [&'a [Selection]],
    value: Value,
    path: &'a Path,
    errors: &'a mut Vec<Error>,
) -> Result<Value, InvalidValue> {
    if !value.is_object() {
        errors.push(
            CompletionError::ExpectedObject {
                type_name: object_type.name.clone(),
                found: value.json_type_name().to_string(),
            }
            .to_graphql_error(Some(path.clone())),
        );
        return Err(InvalidValue);
    }
    execute_selection_set(
        parameters,
        object_type,
        selection_sets,
        &value,
        path,
        errors,
        false,
    )
    .await
    .map(Value::Object)
}

/// Checks a leaf value against its built-in scalar type.
fn complete_leaf(ty: &FieldType, value: &Value) -> Option<Value> {
    match (ty, value) {
        (FieldType::String, Value::String(_)) | (FieldType::Boolean, Value::Bool(_)) => {
            Some(value.clone())
        }
        (FieldType::Int, Value::Number(number)) => number
            .as_i64()
            .and_then(|int| i32::try_from(int).ok())
            .map(Value::from),
        (FieldType::Float, Value::Number(number)) => number.as_f64().map(Value::from),
        (FieldType::Id, Value::String(_)) => Some(value.clone()),
        (FieldType::Id, Value::Number(number)) if number.is_i64() || number.is_u64() => {
            Some(Value::String(number.to_string().into()))
        }
        _ => None,
    }
}
