//! Volatile record collections backing the resolvers.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::NotFoundError;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// A stored entity: field names to values, always carrying an `id`.
pub type Record = Object;

/// Named collections of records, created on first use.
///
/// The store lives as long as the process and is handed to resolvers through the
/// [`Context`](crate::Context). Nothing is persisted.
#[derive(Debug, Default)]
pub struct Store {
    collections: DashMap<String, Arc<Collection>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collection called `name`, creating it empty if needed.
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        if let Some(collection) = self.collections.get(name) {
            return collection.clone();
        }
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name)))
            .clone()
    }

    /// Drops every collection. Handles on previous collections keep their records.
    pub fn reset(&self) {
        self.collections.clear();
    }
}

/// Records keyed by id, listed in insertion order.
///
/// Writes take the collection lock exclusively and are applied in one critical
/// section, so readers never observe a partially applied write.
#[derive(Debug)]
pub struct Collection {
    name: String,
    inner: RwLock<Records>,
}

#[derive(Debug, Default)]
struct Records {
    // never decremented, ids are not reused
    last_id: u64,
    records: IndexMap<String, Record>,
}

impl Collection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: RwLock::new(Records::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores `input` under a fresh id and returns the stored record.
    ///
    /// An `id` in the input is replaced by the allocated one.
    pub fn create(&self, input: Object) -> Record {
        let mut inner = self.inner.write();
        inner.last_id += 1;
        let id = inner.last_id.to_string();

        let mut record = Record::new();
        record.insert("id", Value::String(id.clone().into()));
        for (key, value) in input {
            if key.as_str() != "id" {
                record.insert(key, value);
            }
        }
        inner.records.insert(id.clone(), record.clone());
        tracing::trace!(collection = %self.name, %id, "created record");
        record
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        self.inner.read().records.get(id).cloned()
    }

    /// Merges the fields of `patch` into an existing record.
    ///
    /// The `id` of a record cannot be changed.
    pub fn update(&self, id: &str, patch: Object) -> Result<Record, NotFoundError> {
        let mut inner = self.inner.write();
        let record = inner.records.get_mut(id).ok_or_else(|| NotFoundError {
            collection: self.name.clone(),
            id: id.to_string(),
        })?;
        for (key, value) in patch {
            if key.as_str() != "id" {
                record.insert(key, value);
            }
        }
        Ok(record.clone())
    }

    /// All records, in insertion order.
    pub fn list(&self) -> Vec<Record> {
        self.inner.read().records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
