//! The normalized records returned by the client.

use crate::{error::ClientError as Error, json::get_str, types::EdgeType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An object read from the knowledge base.
///
/// An `Entity` is the JSON object returned by the remote store, reshaped so that it is convenient to use:
/// every GraphQL connection `{ "edges": [{ "node": {..} }] }` is replaced by the plain list of its nodes, with a
/// sibling `<field>Ids` list holding the node ids, and a `createdBy` object gains a sibling `createdById`.
/// Normalization is applied recursively, so embedded objects are reshaped too.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Normalize a raw GraphQL object
    pub fn from_graphql(value: Value) -> Result<Self, Error> {
        match normalize(value) {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::UnexpectedResponse(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Normalize a raw GraphQL object that may be null
    pub fn from_optional(value: Value) -> Result<Option<Self>, Error> {
        match value {
            Value::Null => Ok(None),
            value => Entity::from_graphql(value).map(Some),
        }
    }

    /// Wrap an already normalized object
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn standard_id(&self) -> Option<&str> {
        self.get_str("standard_id")
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.get_str("entity_type")
    }

    pub fn parent_types(&self) -> Vec<&str> {
        match self.0.get("parent_types") {
            Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        get_str(&self.0, key)
    }

    /// Get a present, non-null value
    pub fn non_null(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    /// The objects at the end of an edge: the author for `created-by`, the node list for the others
    pub fn edge_targets(&self, edge: EdgeType) -> Vec<Entity> {
        match self.0.get(edge.field_name()) {
            Some(Value::Object(target)) => vec![Entity(target.clone())],
            Some(Value::Array(targets)) => targets
                .iter()
                .filter_map(|target| target.as_object().cloned().map(Entity))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The ids of the objects at the end of an edge
    pub fn edge_ids(&self, edge: EdgeType) -> Vec<String> {
        self.edge_targets(edge)
            .iter()
            .filter_map(|target| target.id().map(str::to_string))
            .collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

fn is_connection(map: &Map<String, Value>) -> bool {
    matches!(map.get("edges"), Some(Value::Array(_)))
}

/// Recursively reshape a GraphQL value
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut normalized = Map::new();
            for (key, value) in map {
                match value {
                    Value::Object(inner) if is_connection(&inner) => {
                        let nodes = connection_nodes(inner);
                        let ids: Vec<Value> = nodes
                            .iter()
                            .filter_map(|node| node.get("id").cloned())
                            .collect();
                        normalized.insert(format!("{key}Ids"), Value::Array(ids));
                        normalized.insert(key, Value::Array(nodes));
                    }
                    value if key == "createdBy" => {
                        let value = normalize(value);
                        let id = value.get("id").cloned().unwrap_or(Value::Null);
                        normalized.insert("createdById".to_string(), id);
                        normalized.insert(key, value);
                    }
                    value => {
                        normalized.insert(key, normalize(value));
                    }
                }
            }
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        value => value,
    }
}

fn connection_nodes(mut connection: Map<String, Value>) -> Vec<Value> {
    match connection.remove("edges") {
        Some(Value::Array(edges)) => edges
            .into_iter()
            .filter_map(|edge| match edge {
                Value::Object(mut edge) => edge.remove("node"),
                _ => None,
            })
            .map(normalize)
            .collect(),
        _ => Vec::new(),
    }
}

/// Cursor information of a listing page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
    pub global_count: Option<u64>,
}

/// One page of a listing, or every page concatenated when fetching everything
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub entities: Vec<Entity>,
    pub page_info: PageInfo,
}

impl Page {
    /// Normalize a raw GraphQL connection
    pub fn from_graphql(value: Value) -> Result<Self, Error> {
        let Value::Object(mut connection) = value else {
            return Err(Error::UnexpectedResponse(format!(
                "expected a connection, got {value}"
            )));
        };
        let page_info = match connection.remove("pageInfo") {
            Some(Value::Null) | None => PageInfo::default(),
            Some(info) => serde_json::from_value(info)
                .map_err(|e| Error::DeserializationError(e.to_string()))?,
        };
        let entities = connection_nodes(connection)
            .into_iter()
            .map(Entity::from_graphql)
            .collect::<Result<Vec<Entity>, Error>>()?;
        Ok(Self {
            entities,
            page_info,
        })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn first(&self) -> Option<&Entity> {
        self.entities.first()
    }
}

impl IntoIterator for Page {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

/// Metadata of a file attached to an object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedFile {
    pub id: String,
    pub name: String,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub version: Option<String>,
}

impl ImportedFile {
    /// Read file metadata from a normalized `importFiles` node
    pub fn from_node(node: &Value) -> Result<Self, Error> {
        let missing = |field: &str| Error::UnexpectedResponse(format!("file without {field}: {node}"));
        let metadata = node.get("metaData");
        Ok(Self {
            id: node
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| missing("id"))?
                .to_string(),
            name: node
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| missing("name"))?
                .to_string(),
            size: node.get("size").and_then(Value::as_u64),
            mime_type: metadata
                .and_then(|metadata| metadata.get("mimetype"))
                .and_then(Value::as_str)
                .map(str::to_string),
            version: metadata
                .and_then(|metadata| metadata.get("version"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
