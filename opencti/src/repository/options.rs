//! Typed options of the repository operations.

use crate::{
    registry::FieldSpec,
    repository::filters::Filter,
    types::OrderMode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

/// Options of a listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Restrict a polymorphic listing to some concrete types
    pub types: Option<Vec<String>>,
    pub filters: Option<Vec<Filter>>,
    pub search: Option<String>,
    /// Number of objects per page. Defaults to the page size of the kind.
    pub page_size: Option<u32>,
    /// Cursor after which the page starts
    pub after: Option<String>,
    pub order_by: Option<String>,
    pub order_mode: Option<OrderMode>,
    /// Projection overriding the default fields of the kind
    pub field_spec: Option<FieldSpec>,
    /// Follow every page and return them concatenated, using the page size of the kind
    pub fetch_all: bool,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(mut self, types: &[&str]) -> Self {
        self.types = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.get_or_insert_with(Vec::new).push(filter);
        self
    }

    pub fn filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string());
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn after(mut self, cursor: &str) -> Self {
        self.after = Some(cursor.to_string());
        self
    }

    pub fn order_by(mut self, field: &str, mode: OrderMode) -> Self {
        self.order_by = Some(field.to_string());
        self.order_mode = Some(mode);
        self
    }

    pub fn field_spec(mut self, field_spec: FieldSpec) -> Self {
        self.field_spec = Some(field_spec);
        self
    }

    pub fn fetch_all(mut self) -> Self {
        self.fetch_all = true;
        self
    }
}

/// Options of a read. An `id` takes precedence over `filters` when both are set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub id: Option<String>,
    pub types: Option<Vec<String>>,
    pub filters: Option<Vec<Filter>>,
    pub field_spec: Option<FieldSpec>,
}

impl ReadOptions {
    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn by_filters(filters: Vec<Filter>) -> Self {
        Self {
            filters: Some(filters),
            ..Self::default()
        }
    }

    pub fn types(mut self, types: &[&str]) -> Self {
        self.types = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn field_spec(mut self, field_spec: FieldSpec) -> Self {
        self.field_spec = Some(field_spec);
        self
    }
}

/// The attributes of an object to create.
///
/// Attributes are named as in the GraphQL creation input, e.g. `name`, `createdBy`, `objectMarking`.
/// Null attributes count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateInput {
    pub attributes: Map<String, Value>,
    /// Ask the remote store to update an existing object with the same identity instead of failing
    pub update: bool,
}

impl CreateInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, builder style
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// Get a present, non-null attribute
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|value| !value.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }
}

/// How an edit applies its values
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOperation {
    Add,
    Replace,
    Remove,
}

/// One edit of a field patch
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEdit {
    pub key: String,
    pub value: Vec<Value>,
    pub operation: Option<EditOperation>,
}

impl FieldEdit {
    /// Replace the value of a field
    pub fn replace(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            value: vec![value.into()],
            operation: None,
        }
    }

    /// Apply several values to a multi-valued field with a given operation
    pub fn values<V: Into<Value>>(key: &str, values: impl IntoIterator<Item = V>, operation: EditOperation) -> Self {
        Self {
            key: key.to_string(),
            value: values.into_iter().map(Into::into).collect(),
            operation: Some(operation),
        }
    }
}
