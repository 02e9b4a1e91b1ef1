//! Helpers for reading GraphQL responses and reshaping JSON values.

use crate::error::ClientError as Error;
use serde_json::{Map, Value};

/// Check a raw GraphQL response, returning its `data` object.
///
/// A response with a non-empty top-level `errors` list is turned into a `RemoteQuery` error carrying the remote messages.
pub fn check_response(response: Value) -> Result<Value, Error> {
    let Value::Object(mut response) = response else {
        return Err(Error::UnexpectedResponse(
            "GraphQL response is not a JSON object".to_string(),
        ));
    };

    if let Some(Value::Array(errors)) = response.get("errors") {
        if !errors.is_empty() {
            let messages: Vec<String> = errors
                .iter()
                .map(|error| match error.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    _ => error.to_string(),
                })
                .collect();
            return Err(Error::RemoteQuery(messages.join("; ")));
        }
    }

    match response.remove("data") {
        Some(data) => Ok(data),
        None => Err(Error::UnexpectedResponse(
            "GraphQL response has neither `data` nor `errors`".to_string(),
        )),
    }
}

/// Get the value stored under `key` in a `data` object, failing if the key is absent.
///
/// A present `null` is returned as is: absence of an object is data, not an error.
pub fn take_field(data: Value, key: &str) -> Result<Value, Error> {
    match data {
        Value::Object(mut map) => map
            .remove(key)
            .ok_or_else(|| Error::UnexpectedResponse(format!("missing `{key}` in response data"))),
        _ => Err(Error::UnexpectedResponse(format!(
            "expected an object holding `{key}`"
        ))),
    }
}

/// Get a string field of a JSON object
pub fn get_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// Whether a value should be treated as absent: null, an empty string or an empty list
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
