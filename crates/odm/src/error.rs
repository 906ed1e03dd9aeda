//! Error types for the object-document mapper.
//!
//! Errors are grouped by the layer that raises them: model lifecycle, scope
//! registration, query construction and the transport collaborator. All of
//! them convert into the top-level [`OdmError`].

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all mapper operations.
#[derive(Error, Debug)]
pub enum OdmError {
    /// Model state and lifecycle errors
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Scope registration and lookup errors
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Query construction errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Errors raised by the transport collaborator
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl OdmError {
    /// Returns true if this error signals a missing document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OdmError::Model(ModelError::NotFound { .. }))
    }
}

/// Errors related to model state.
#[derive(Error, Debug)]
pub enum ModelError {
    /// No document matched a lookup that required one.
    #[error("no query results for model [{model_type}]{}", format_ids(.ids))]
    NotFound {
        model_type: String,
        ids: Vec<String>,
        filters: Vec<String>,
    },

    /// A mass-assigned key is not allow-listed while the model is totally guarded.
    #[error("add [{key}] to fillable property to allow mass assignment on [{model_type}]")]
    MassAssignment { model_type: String, key: String },

    /// The operation needs a document id, but the model has none.
    #[error("cannot {operation} model [{model_type}] without an id")]
    MissingIdentifier {
        model_type: String,
        operation: String,
    },

    /// A lifecycle listener halted a save that had to succeed.
    #[error("saving model [{model_type}] was halted by a listener")]
    SaveHalted { model_type: String },

    /// Attributes could not be converted to or from a typed value.
    #[error("failed to convert model [{model_type}]: {message}")]
    Hydration { model_type: String, message: String },
}

fn format_ids(ids: &[String]) -> String {
    if ids.is_empty() {
        String::new()
    } else {
        format!(" {}", ids.join(", "))
    }
}

/// Errors related to global and named scopes.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// A global scope was registered with an unsupported shape.
    #[error("invalid global scope for [{model_type}]: {message}")]
    InvalidRegistration { model_type: String, message: String },

    /// A named scope was invoked that the model does not define.
    #[error("call to undefined scope [{name}] on model [{model_type}]")]
    UnknownScope { model_type: String, name: String },
}

/// Errors related to query construction.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The operation requires a target index.
    #[error("no index selected for {operation}")]
    MissingIndex { operation: String },

    /// The operation requires a target document id.
    #[error("no document id selected for {operation}")]
    MissingIdentifier { operation: String },

    /// An argument was outside the accepted domain.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

/// Errors originating from the transport collaborator.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The client could not be built or could not reach the cluster.
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The cluster rejected or failed a request.
    #[error("{operation} request failed{}: {message}", format_status(.status))]
    Request {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    /// The cluster returned a body that could not be interpreted.
    #[error("malformed {operation} response: {message}")]
    MalformedResponse { operation: String, message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

fn format_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

/// Result type alias for mapper operations.
pub type OdmResult<T> = Result<T, OdmError>;

impl From<serde_json::Error> for OdmError {
    fn from(err: serde_json::Error) -> Self {
        OdmError::Transport(TransportError::Serialization {
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = OdmError::Model(ModelError::NotFound {
            model_type: "Post".to_string(),
            ids: vec!["42".to_string()],
            filters: vec![],
        });
        assert_eq!(err.to_string(), "no query results for model [Post] 42");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_not_found_without_ids() {
        let err = ModelError::NotFound {
            model_type: "Post".to_string(),
            ids: vec![],
            filters: vec!["status".to_string()],
        };
        assert_eq!(err.to_string(), "no query results for model [Post]");
    }

    #[test]
    fn test_mass_assignment_display() {
        let err = ModelError::MassAssignment {
            model_type: "Post".to_string(),
            key: "secret".to_string(),
        };
        assert!(err.to_string().contains("[secret]"));
        assert!(err.to_string().contains("[Post]"));
    }

    #[test]
    fn test_request_error_display() {
        let err = TransportError::Request {
            operation: "search".to_string(),
            status: Some(404),
            message: "index_not_found_exception".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "search request failed (status 404): index_not_found_exception"
        );

        let err = TransportError::Request {
            operation: "bulk".to_string(),
            status: None,
            message: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "bulk request failed: timeout");
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: OdmError = parse_err.into();
        assert!(matches!(
            err,
            OdmError::Transport(TransportError::Serialization { .. })
        ));
    }
}
