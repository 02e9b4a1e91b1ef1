//! Blocking HTTP transport for a real OpenCTI platform.

use crate::{
    config::ClientConfig,
    error::ClientError as Error,
    json::check_response,
    transport::{GraphqlRequest, Transport},
};
use reqwest::{
    blocking::{
        multipart::{Form, Part},
        Client,
    },
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
};
use serde_json::{json, Value};
use url::Url;

/// Sends GraphQL requests over HTTP(S), authenticated with a Bearer token.
///
/// Requests carrying an upload are sent as multipart forms following the GraphQL multipart request convention: an
/// `operations` part holding the document with the `file` variable set to null, a `map` part binding part `0` to
/// `variables.file`, and the file itself as part `0`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let endpoint = config.graphql_endpoint()?;

        let mut headers = HeaderMap::new();
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| Error::ConfigError(format!("invalid API token: {e}")))?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .map_err(|e| Error::ConfigError(format!("could not build HTTP client: {e}")))?;

        if !config.ssl_verify {
            log::warn!("TLS certificate verification is disabled for {endpoint}");
        }

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: GraphqlRequest) -> Result<Value, Error> {
        log::debug!("Sending GraphQL document: {}", request.query);
        let builder = self.client.post(self.endpoint.clone());

        let builder = match request.upload {
            None => builder.json(&json!({
                "query": request.query,
                "variables": request.variables,
            })),
            Some(upload) => {
                let mut variables = request.variables;
                variables.insert("file".to_string(), Value::Null);
                let operations = json!({"query": request.query, "variables": variables});
                let file = Part::reader(upload.data)
                    .file_name(upload.file_name)
                    .mime_str(&upload.mime_type)
                    .map_err(|e| Error::InvalidParameter(format!("mime type: {e}")))?;
                let form = Form::new()
                    .text("operations", operations.to_string())
                    .text("map", json!({"0": ["variables.file"]}).to_string())
                    .part("0", file);
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .map_err(|e| Error::RemoteQuery(format!("request to {} failed: {e}", self.endpoint)))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::RemoteQuery(format!("could not read response: {e}")))?;

        if !status.is_success() {
            // GraphQL servers often explain a rejected request in an `errors` list
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| check_response(value).err())
                .map(|e| e.to_string())
                .unwrap_or(body);
            return Err(Error::RemoteQuery(format!("HTTP {status}: {detail}")));
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| Error::DeserializationError(e.to_string()))?;
        check_response(value)
    }
}
