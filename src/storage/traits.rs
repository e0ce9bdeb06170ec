//! Storage trait definitions and filter types.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::Result;

/// Filter operations for querying records.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Field equals value
    Eq,
    /// Field does not equal value
    Ne,
}

/// A filter on one field of a stored record.
///
/// `field` may be a dotted path into nested objects, e.g. `state.phase`.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Serialize) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Serialize) -> Self {
        Self::new(field, FilterOp::Ne, value)
    }

    fn new(field: impl Into<String>, op: FilterOp, value: impl Serialize) -> Self {
        Self {
            field: field.into(),
            op,
            value: serde_json::to_value(value).unwrap_or(Value::Null),
        }
    }

    fn lookup<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.field.split('.').try_fold(record, |value, key| value.get(key))
    }

    /// Check if a record matches this filter. A missing field compares as null.
    pub fn matches(&self, record: &Value) -> bool {
        let field_value = self.lookup(record).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => *field_value == self.value,
            FilterOp::Ne => *field_value != self.value,
        }
    }
}

/// Trait for records that have an ID field.
pub trait HasId {
    fn id(&self) -> &str;
}

/// Keyed record storage.
pub trait Storage: Send + Sync {
    /// Insert a record, or replace the one with the same id.
    fn put<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()>;

    /// Get a record by ID.
    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>>;

    /// Delete a record by ID. Returns false if there was none.
    fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Records matching every filter, in insertion order.
    fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>>;

    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        self.query(collection, &[])
    }
}
