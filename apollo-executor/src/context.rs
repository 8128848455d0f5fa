//! Provide a [`Context`] for resolvers.
//!
//! The context hands the [`Store`] over to every resolver of a request.

use std::sync::Arc;

use crate::store::Store;

/// Context for a request.
///
/// Cloning is cheap: clones share the store.
#[derive(Clone, Debug)]
pub struct Context {
    store: Arc<Store>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A context over a fresh, empty store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(Store::new()))
    }

    /// A context over a store shared with other requests.
    pub fn with_store(store: Arc<Store>) -> Self {
        Context { store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn clones_share_the_store() {
        let c = Context::new();
        let clone = c.clone();
        c.store().collection("messages").create(Default::default());
        assert_eq!(clone.store().collection("messages").len(), 1);
    }

    #[test]
    fn contexts_over_one_store_see_each_other() {
        let store = Arc::new(Store::new());
        let first = Context::with_store(store.clone());
        let second = Context::with_store(store);
        let record = first.store().collection("content").create(Default::default());
        assert_eq!(
            second.store().collection("content").get("1"),
            Some(record)
        );
    }
}
