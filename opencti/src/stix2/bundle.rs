//! STIX bundles wrapping exported objects.

use crate::{
    error::ClientError as Error,
    stix2::export::StixExport,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::{uuid, Uuid};

/// Namespace of the UUIDv5 identifiers derived by the client
const NAMESPACE: Uuid = uuid!("00abedb4-aa42-466c-9c01-fed23315a9b7");

/// A collection of STIX objects exported together.
///
/// A bundle has no semantic meaning of its own. Its id is derived from the id of the exported object, so that the
/// bundle of an object is always the same.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Always `bundle`
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
    pub objects: Vec<Value>,
}

impl Bundle {
    /// A bundle identified by a name, starting with an initial object (lists in STIX 2.1 cannot be empty)
    pub fn new(name: &str, object: Value) -> Self {
        Self {
            object_type: "bundle".to_string(),
            id: format!("bundle--{}", Uuid::new_v5(&NAMESPACE, name.as_bytes())),
            objects: vec![object],
        }
    }

    /// Add an object, unless an object with the same id is already bundled
    pub fn add(&mut self, object: Value) {
        let id = object.get("id");
        if id.is_some() && self.objects.iter().any(|bundled| bundled.get("id") == id) {
            return;
        }
        self.objects.push(object);
    }

    pub fn to_value(&self) -> Result<Value, Error> {
        serde_json::to_value(self).map_err(|e| Error::SerializationError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::SerializationError(e.to_string()))
    }
}

impl StixExport {
    /// Wrap the exported object and its related objects in a bundle
    pub fn to_bundle(&self) -> Bundle {
        let mut bundle = Bundle::new(self.id(), self.object.clone());
        for related in &self.related {
            bundle.add(related.clone());
        }
        bundle
    }
}
