//! The Filter struct narrows listings and reads on the remote store.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

/// A condition applied to a listing: the value of `key` is compared with each of `values`
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub key: String,
    pub values: Vec<Value>,
    pub operator: Option<FilterOp>,
    /// How the values are combined
    pub filter_mode: Option<FilterMode>,
}

impl Filter {
    /// An equality filter on a single value
    pub fn eq(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            values: vec![value.into()],
            operator: None,
            filter_mode: None,
        }
    }

    /// A filter matching any of several values
    pub fn any_of<V: Into<Value>>(key: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            key: key.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            operator: None,
            filter_mode: Some(FilterMode::Or),
        }
    }

    pub fn operator(mut self, operator: FilterOp) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn filter_mode(mut self, filter_mode: FilterMode) -> Self {
        self.filter_mode = Some(filter_mode);
        self
    }
}

/// The FilterOp enum represents the comparison operators understood by the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Match,
    Wildcard,
}

/// How the values of a filter are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    And,
    Or,
}
