use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;

use crate::Context;
use crate::error::ResolverError;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::spec::FieldDescriptor;
use crate::spec::Schema;

/// The outcome of a resolver.
pub type FieldResult = Result<Value, ResolverError>;

/// What a resolver hands back: a value right away, or a future producing it.
pub enum Resolved {
    Ready(FieldResult),
    Deferred(BoxFuture<'static, FieldResult>),
}

impl From<FieldResult> for Resolved {
    fn from(result: FieldResult) -> Self {
        Resolved::Ready(result)
    }
}

/// Everything a resolver gets to compute the value of a field.
#[derive(Clone, Copy, Debug)]
pub struct ResolveInfo<'a> {
    /// The value of the object the field is selected on.
    pub parent: &'a Value,
    /// Coerced arguments.
    pub arguments: &'a Object,
    pub context: &'a Context,
    /// Where the field lands in the response.
    pub path: &'a Path,
    pub parent_type: &'a str,
    pub field: &'a str,
}

impl ResolveInfo<'_> {
    /// Deserializes the argument `name`. Absent arguments deserialize from `null`.
    pub fn arg<T: DeserializeOwned>(&self, name: &str) -> Result<T, ResolverError> {
        let value = self.arguments.get(name).cloned().unwrap_or_default();
        serde_json_bytes::from_value(value)
            .map_err(|err| ResolverError::new(format!("invalid argument '{name}': {err}")))
    }
}

/// A field resolver.
#[derive(Clone)]
pub struct Resolver(Arc<dyn Fn(ResolveInfo<'_>) -> Resolved + Send + Sync>);

impl Resolver {
    pub fn new(resolver: impl Fn(ResolveInfo<'_>) -> Resolved + Send + Sync + 'static) -> Self {
        Self(Arc::new(resolver))
    }

    /// A resolver computing its value immediately.
    pub fn sync(resolver: impl Fn(ResolveInfo<'_>) -> FieldResult + Send + Sync + 'static) -> Self {
        Self::new(move |info| Resolved::Ready(resolver(info)))
    }

    /// A resolver returning a future.
    ///
    /// The future cannot borrow from the [`ResolveInfo`]: clone what it needs first.
    pub fn deferred<F, Fut>(resolver: F) -> Self
    where
        F: Fn(ResolveInfo<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FieldResult> + Send + 'static,
    {
        Self::new(move |info| Resolved::Deferred(resolver(info).boxed()))
    }

    fn call(&self, info: ResolveInfo<'_>) -> Resolved {
        (self.0)(info)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver(..)")
    }
}

impl PartialEq for Resolver {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Produces the value of `field` on an object of type `parent_type`.
///
/// Fields without a resolver read the property of the same name on the parent.
/// Panics in resolvers, synchronous or not, are reported as a [`ResolverError`].
pub async fn dispatch(
    schema: &Schema,
    parent_type: &str,
    field: &FieldDescriptor,
    parent: &Value,
    arguments: &Object,
    context: &Context,
    path: &Path,
) -> FieldResult {
    let Some(resolver) = schema.resolver(parent_type, &field.name) else {
        return Ok(default_resolver(parent, &field.name));
    };
    tracing::trace!(%path, %parent_type, field = %field.name, "dispatching resolver");

    let info = ResolveInfo {
        parent,
        arguments,
        context,
        path,
        parent_type,
        field: &field.name,
    };
    let resolved = match std::panic::catch_unwind(AssertUnwindSafe(|| resolver.call(info))) {
        Ok(resolved) => resolved,
        Err(payload) => return Err(ResolverError::panicked(&*payload)),
    };
    let result = match resolved {
        Resolved::Ready(result) => result,
        Resolved::Deferred(future) => AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ResolverError::panicked(&*payload))),
    };
    if let Err(err) = &result {
        failfast_debug!(%path, error = %err, "resolver failed");
    }
    result
}

fn default_resolver(parent: &Value, field: &str) -> Value {
    parent
        .as_object()
        .and_then(|object| object.get(field))
        .cloned()
        .unwrap_or_default()
}
