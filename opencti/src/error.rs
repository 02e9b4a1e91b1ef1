//! A custom client Error type, with its associated functions.
use thiserror::Error;

use crate::types::EntityKind;

/// Custom Error type for the OpenCTI client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    // For returning multiple errors at once, e.g. during input validation
    #[error("Multiple errors: {0:?}")]
    MultipleErrors(Vec<ClientError>),
    // Caller-side errors, detected before anything is sent to the remote store
    #[error("[{operation}] Missing parameters: {parameters}")]
    MissingParameter {
        operation: String,
        parameters: String,
    },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{operation} is not supported for entities of kind {kind}")]
    UnsupportedOperation { kind: EntityKind, operation: String },
    // Remote store errors, carrying the message returned by the transport or the GraphQL API
    #[error("Remote query error: {0}")]
    RemoteQuery(String),
    #[error("Unexpected response from the remote store: {0}")]
    UnexpectedResponse(String),
    // `serde_json:Error`s are converted to Strings during error mapping because that Error type does not `impl Clone`
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("File I/O error: {0}")]
    IoError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ClientError {
    /// Build a `MissingParameter` error and log it at error level
    ///
    /// Every client-side validation failure goes through here so that the log keeps a trace of calls that never reached the remote store.
    pub fn missing(operation: &str, parameters: &str) -> Self {
        log::error!("[{operation}] Missing parameters: {parameters}");
        ClientError::MissingParameter {
            operation: operation.to_string(),
            parameters: parameters.to_string(),
        }
    }

    /// Build an `UnsupportedOperation` error for a given kind
    pub fn unsupported(kind: EntityKind, operation: &str) -> Self {
        ClientError::UnsupportedOperation {
            kind,
            operation: operation.to_string(),
        }
    }

    /// Whether this error was raised before any remote call was made
    pub fn is_client_side(&self) -> bool {
        match self {
            ClientError::MissingParameter { .. }
            | ClientError::InvalidParameter(_)
            | ClientError::UnsupportedOperation { .. } => true,
            ClientError::MultipleErrors(errors) => errors.iter().all(|e| e.is_client_side()),
            _ => false,
        }
    }
}

/// Checks a Result to see if it is an Error. If it is, add that Error to a Vec of ClientErrors
pub fn add_error<T>(errors: &mut Vec<ClientError>, possible_error: Result<T, ClientError>) {
    if let Err(error) = possible_error {
        errors.push(error)
    };
}

/// Return a Vec of ClientErrors as a single Error, unless the Vec is empty
///
/// This is useful when checking multiple possible sources of error, such as during input validation
pub fn return_multiple_errors(errors: Vec<ClientError>) -> Result<(), ClientError> {
    if errors.is_empty() {
        return Ok(());
    }
    // If there is only one Error in the Vec, return it as itself
    if errors.len() == 1 {
        return Err(errors[0].clone());
    }
    Err(ClientError::MultipleErrors(errors))
}

#[cfg(test)]
mod test {
    use crate::{error::*, types::EntityKind};
    use test_log::test;

    #[test]
    fn missing_parameter_display() {
        let error = ClientError::missing("opencti_marking_definition", "definition and definition_type");
        assert_eq!(
            error.to_string(),
            "[opencti_marking_definition] Missing parameters: definition and definition_type"
        );
        assert!(error.is_client_side());
    }

    #[test]
    fn remote_errors_are_not_client_side() {
        let error = ClientError::RemoteQuery("Unknown field".to_string());
        assert!(!error.is_client_side());

        let mixed = ClientError::MultipleErrors(vec![
            ClientError::unsupported(EntityKind::Label, "merge"),
            error,
        ]);
        assert!(!mixed.is_client_side());
    }

    #[test]
    fn single_error_is_not_wrapped() {
        let errors = vec![ClientError::InvalidParameter("page_size".to_string())];
        assert_eq!(
            return_multiple_errors(errors),
            Err(ClientError::InvalidParameter("page_size".to_string()))
        );
        assert_eq!(return_multiple_errors(Vec::new()), Ok(()));
    }
}
