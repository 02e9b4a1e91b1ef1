//! Transports standing in for a remote store in unit tests.

use crate::{
    error::ClientError as Error,
    transport::{GraphqlRequest, Transport},
};
use serde_json::{json, Map, Value};
use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
    io::Read,
    sync::atomic::{AtomicBool, Ordering},
    sync::Arc,
};

/// What a test transport saw of a request
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub query: String,
    pub variables: Map<String, Value>,
    /// File name and mime type of the upload, if any
    pub upload: Option<(String, String)>,
}

impl RecordedRequest {
    fn record(request: &GraphqlRequest) -> Self {
        Self {
            query: request.query.clone(),
            variables: request.variables.clone(),
            upload: request
                .upload
                .as_ref()
                .map(|upload| (upload.file_name.clone(), upload.mime_type.clone())),
        }
    }

    pub fn variable(&self, name: &str) -> &Value {
        self.variables.get(name).unwrap_or(&Value::Null)
    }

    pub fn is_mutation(&self) -> bool {
        self.query.trim_start().starts_with("mutation")
    }
}

/// Replays a scripted sequence of responses and records every request it receives
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<Value, Error>>>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response, given as the `data` object
    pub fn respond(self, data: Value) -> Self {
        self.responses.borrow_mut().push_back(Ok(data));
        self
    }

    /// Queue a failure
    pub fn fail(self, error: Error) -> Self {
        self.responses.borrow_mut().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last(&self) -> RecordedRequest {
        self.requests
            .borrow()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: GraphqlRequest) -> Result<Value, Error> {
        self.requests
            .borrow_mut()
            .push(RecordedRequest::record(&request));
        self.responses.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(Error::UnexpectedResponse(
                "no scripted response left".to_string(),
            ))
        })
    }
}

/// Serves a fixed list of objects through a paginated listing, using the position in the list as cursor.
///
/// The store may cap the page size on its own, whatever the client asks for.
pub struct PagedTransport {
    list_query: String,
    items: Vec<Value>,
    max_page_size: Option<usize>,
    requested_sizes: RefCell<Vec<u64>>,
}

impl PagedTransport {
    pub fn new(list_query: &str, items: Vec<Value>, max_page_size: Option<usize>) -> Self {
        Self {
            list_query: list_query.to_string(),
            items,
            max_page_size,
            requested_sizes: RefCell::new(Vec::new()),
        }
    }

    /// The `first` argument of every request received
    pub fn requested_sizes(&self) -> Vec<u64> {
        self.requested_sizes.borrow().clone()
    }
}

impl Transport for PagedTransport {
    fn execute(&self, request: GraphqlRequest) -> Result<Value, Error> {
        let first = request
            .variables
            .get("first")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::RemoteQuery("missing first".to_string()))?;
        self.requested_sizes.borrow_mut().push(first);

        let start = match request.variables.get("after") {
            Some(Value::String(cursor)) => cursor
                .parse::<usize>()
                .map_err(|_| Error::RemoteQuery(format!("bad cursor {cursor}")))?,
            _ => 0,
        };
        let size = self
            .max_page_size
            .map_or(first as usize, |max| max.min(first as usize));
        let end = (start + size).min(self.items.len());
        let edges: Vec<Value> = self.items[start..end]
            .iter()
            .map(|node| json!({"node": node}))
            .collect();

        Ok(json!({
            self.list_query.clone(): {
                "edges": edges,
                "pageInfo": {
                    "startCursor": start.to_string(),
                    "endCursor": end.to_string(),
                    "hasNextPage": end < self.items.len(),
                    "hasPreviousPage": start > 0,
                    "globalCount": self.items.len(),
                }
            }
        }))
    }
}

/// One object held by an [`EdgeStore`]
#[derive(Clone, Debug, Default)]
pub struct StoredObject {
    pub entity_type: String,
    /// Edge field name to target ids
    pub edges: BTreeMap<String, Vec<String>>,
}

/// A small in-memory store understanding the reads, label lookups and relation mutations of the relationship editor
#[derive(Default)]
pub struct EdgeStore {
    objects: RefCell<BTreeMap<String, StoredObject>>,
    labels: RefCell<Vec<(String, String)>>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl EdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, id: &str, entity_type: &str) -> Self {
        self.objects.borrow_mut().insert(
            id.to_string(),
            StoredObject {
                entity_type: entity_type.to_string(),
                edges: BTreeMap::new(),
            },
        );
        self
    }

    pub fn with_edge(self, id: &str, field: &str, target: &str) -> Self {
        if let Some(object) = self.objects.borrow_mut().get_mut(id) {
            object
                .edges
                .entry(field.to_string())
                .or_default()
                .push(target.to_string());
        }
        self
    }

    pub fn with_label(self, id: &str, value: &str) -> Self {
        self.labels
            .borrow_mut()
            .push((id.to_string(), value.to_string()));
        self
    }

    pub fn targets(&self, id: &str, field: &str) -> Vec<String> {
        self.objects
            .borrow()
            .get(id)
            .and_then(|object| object.edges.get(field).cloned())
            .unwrap_or_default()
    }

    pub fn labels(&self) -> Vec<(String, String)> {
        self.labels.borrow().clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn mutations(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(RecordedRequest::is_mutation)
            .collect()
    }

    fn read(&self, field: &str, id: &str) -> Value {
        let objects = self.objects.borrow();
        let Some(object) = objects.get(id) else {
            return json!({ field: null });
        };
        let mut node = Map::new();
        node.insert("id".to_string(), json!(id));
        node.insert("entity_type".to_string(), json!(object.entity_type));
        node.insert("createdBy".to_string(), Value::Null);
        for (edge_field, targets) in &object.edges {
            let value = if edge_field == "createdBy" {
                targets.first().map_or(Value::Null, |target| json!({"id": target}))
            } else {
                let edges: Vec<Value> = targets
                    .iter()
                    .map(|target| json!({"node": {"id": target}}))
                    .collect();
                json!({ "edges": edges })
            };
            node.insert(edge_field.clone(), value);
        }
        json!({ field: node })
    }

    fn edge_field(relationship_type: &str) -> &'static str {
        match relationship_type {
            "created-by" => "createdBy",
            "object-marking" => "objectMarking",
            "object-label" => "objectLabel",
            "external-reference" => "externalReferences",
            _ => "killChainPhases",
        }
    }
}

/// The name of the root field of a document, e.g. `malware` in `query Malware($id: String!) { malware(id: $id) { .. } }`
pub fn root_field(query: &str) -> String {
    let body = query.split_once('{').map_or("", |(_, body)| body);
    body.trim_start()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .unwrap_or_default()
        .to_string()
}

impl Transport for EdgeStore {
    fn execute(&self, request: GraphqlRequest) -> Result<Value, Error> {
        let recorded = RecordedRequest::record(&request);
        self.requests.borrow_mut().push(recorded.clone());
        let field = root_field(&request.query);
        let text = |name: &str| recorded.variable(name).as_str().unwrap_or_default().to_string();

        if request.query.contains("relationAdd") {
            let input = recorded.variable("input");
            let target = input["toId"].as_str().unwrap_or_default().to_string();
            let edge = EdgeStore::edge_field(input["relationship_type"].as_str().unwrap_or_default());
            let mut objects = self.objects.borrow_mut();
            let object = objects
                .get_mut(&text("id"))
                .ok_or_else(|| Error::RemoteQuery("source not found".to_string()))?;
            object.edges.entry(edge.to_string()).or_default().push(target);
            return Ok(json!({ field: {"relationAdd": {"id": "relation"}} }));
        }

        if request.query.contains("relationDelete") {
            let edge = EdgeStore::edge_field(&text("relationship_type"));
            let target = text("toId");
            if let Some(object) = self.objects.borrow_mut().get_mut(&text("id")) {
                if let Some(targets) = object.edges.get_mut(edge) {
                    targets.retain(|existing| existing != &target);
                }
            }
            return Ok(json!({ field: {"relationDelete": {"id": "relation"}} }));
        }

        if field == "labels" {
            let value = recorded.variable("filters")[0]["values"][0]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let edges: Vec<Value> = self
                .labels
                .borrow()
                .iter()
                .filter(|(_, label)| label == &value)
                .map(|(id, label)| json!({"node": {"id": id, "value": label}}))
                .collect();
            return Ok(json!({"labels": {"edges": edges, "pageInfo": {"hasNextPage": false}}}));
        }

        if field == "labelAdd" {
            let value = recorded.variable("input")["value"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let id = format!("label--{}", self.labels.borrow().len() + 1);
            self.labels.borrow_mut().push((id.clone(), value.clone()));
            return Ok(json!({"labelAdd": {"id": id, "value": value, "entity_type": "Label"}}));
        }

        Ok(self.read(&field, &text("id")))
    }
}

/// A reader recording whether it has been dropped
pub struct DropFlagReader {
    data: std::io::Cursor<Vec<u8>>,
    dropped: Arc<AtomicBool>,
}

impl DropFlagReader {
    pub fn new(data: &[u8]) -> (Self, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        (
            Self {
                data: std::io::Cursor::new(data.to_vec()),
                dropped: dropped.clone(),
            },
            dropped,
        )
    }
}

impl Read for DropFlagReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.data.read(buf)
    }
}

impl Drop for DropFlagReader {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}
