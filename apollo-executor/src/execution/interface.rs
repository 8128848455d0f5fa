use crate::error::TypeResolutionError;
use crate::json_ext::Value;
use crate::spec::InterfaceType;
use crate::spec::Schema;
use crate::spec::TypeDescriptor;

/// Picks the object type a value of type `interface` is an instance of.
///
/// The interface's own `resolve_type` function is asked first and wins if it names
/// one of the implementors. Otherwise the implementors are tried in registration
/// order and the first one whose `is_type_of` predicate accepts the value is used,
/// which makes the registration order the tie-break between overlapping predicates.
pub fn resolve_concrete_type<'a>(
    schema: &'a Schema,
    interface: &InterfaceType,
    value: &Value,
) -> Result<&'a str, TypeResolutionError> {
    let implementors = schema.implementors(&interface.name);

    if let Some(resolved) = interface
        .resolve_type
        .as_ref()
        .and_then(|resolver| resolver.resolve(value))
    {
        if let Some(implementor) = implementors.iter().find(|name| **name == resolved) {
            return Ok(implementor.as_str());
        }
        tracing::debug!(
            interface = %interface.name,
            %resolved,
            "resolve_type returned a type that does not implement the interface"
        );
    }

    implementors
        .iter()
        .find(|name| match schema.lookup(name) {
            Ok(TypeDescriptor::Object(object)) => object.accepts(value),
            _ => false,
        })
        .map(String::as_str)
        .ok_or_else(|| TypeResolutionError {
            interface: interface.name.clone(),
        })
}
