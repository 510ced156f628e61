//! Error types for resource operations
//!
//! Every CRUD operation returns [`Result`], keeping three outcomes apart:
//! a precondition failure raised before any request is sent, a transport
//! failure, and a response with a status the operation did not expect.

use thiserror::Error;

/// Boxed source error carried by transport failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while talking to the configuration API
#[derive(Debug, Error)]
pub enum Error {
    /// The object lacks the identifier an operation needs
    #[error("{required} value is required to {operation} an object at {endpoint}")]
    MissingIdentifier {
        operation: &'static str,
        required: &'static str,
        endpoint: &'static str,
    },

    /// The request never produced a response
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The server answered with a status the operation does not accept
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// A lookup by name returned an empty result set
    #[error("no object named {name:?} at {endpoint}")]
    NotFound { name: String, endpoint: &'static str },

    /// The response body could not be decoded
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Local attributes could not be serialized into a JSON object
    #[error("failed to encode attributes for {endpoint}: {source}")]
    Encode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The token endpoint rejected the credentials or was unreachable
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Missing or invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for panapi operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if the operation was rejected before any request was sent
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::MissingIdentifier { .. })
    }

    /// Returns true if no response was received
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Returns the HTTP status for non-success responses
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the server answered with an unexpected status
    #[must_use]
    pub fn is_status(&self) -> bool {
        self.status().is_some()
    }

    /// Returns true if the object does not exist on the server
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. }) || self.status() == Some(404)
    }
}
