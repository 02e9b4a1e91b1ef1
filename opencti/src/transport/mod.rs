//! The seam between the client and the remote GraphQL endpoint.
//!
//! Everything above this module builds a [`GraphqlRequest`] and hands it to a [`Transport`], which returns the `data`
//! object of the response. [`HttpTransport`] talks to a real platform; tests substitute scripted transports.

mod http;

pub use http::HttpTransport;

use crate::error::ClientError as Error;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fmt,
    fs::File,
    io::{Cursor, Read},
    path::Path,
    sync::Arc,
};

/// Mime type used for uploads of files with a `.json` extension
pub const JSON_MIME_TYPE: &str = "application/json";
/// Mime type used for uploads when none is given
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// A GraphQL document with its variables and an optional file upload.
#[derive(Debug, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Map<String, Value>,
    /// Bound to the `$file` variable of the document when present
    #[serde(skip)]
    pub upload: Option<Upload>,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            upload: None,
        }
    }

    /// Set a variable of the request
    pub fn variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    /// Attach a file, bound to the `$file` variable
    pub fn upload(mut self, upload: Upload) -> Self {
        self.upload = Some(upload);
        self
    }
}

/// A file to push to the remote store. The payload is owned by the upload and released when it is dropped.
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Box<dyn Read + Send>,
}

impl Upload {
    /// Create an upload from any reader
    pub fn new(file_name: &str, data: impl Read + Send + 'static, mime_type: Option<&str>) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime_type: mime_type_for(file_name, mime_type),
            data: Box::new(data),
        }
    }

    /// Create an upload from in-memory bytes
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>, mime_type: Option<&str>) -> Self {
        Upload::new(file_name, Cursor::new(bytes), mime_type)
    }

    /// Open a file for upload. The uploaded file name is the base name of the path.
    pub fn from_path(path: impl AsRef<Path>, mime_type: Option<&str>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidParameter(format!("no file name in {}", path.display())))?;
        let file = File::open(path).map_err(|e| Error::IoError(format!("{}: {e}", path.display())))?;
        Ok(Upload::new(file_name, file, mime_type))
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// JSON files are always sent as `application/json`; other files use the given mime type or `text/plain`
fn mime_type_for(file_name: &str, mime_type: Option<&str>) -> String {
    if file_name.to_lowercase().ends_with(".json") {
        JSON_MIME_TYPE.to_string()
    } else {
        mime_type.unwrap_or(DEFAULT_MIME_TYPE).to_string()
    }
}

/// Executes GraphQL requests against a remote store.
pub trait Transport {
    /// Send a request and return the `data` object of the response.
    ///
    /// Transport failures, non-success statuses and top-level GraphQL `errors` all fail with `RemoteQuery`.
    fn execute(&self, request: GraphqlRequest) -> Result<Value, Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: GraphqlRequest) -> Result<Value, Error> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: GraphqlRequest) -> Result<Value, Error> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: GraphqlRequest) -> Result<Value, Error> {
        (**self).execute(request)
    }
}
