//! Error types for the ArcGIS client.

/// Errors that can occur when using the ArcGIS client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error (connection, DNS, TLS, body decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote answered with a non-success status
    #[error("Request to {url} failed with HTTP status {status}")]
    Status {
        /// URL of the failed request
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Remote answered 200 with an `{"error": {...}}` body
    #[error("Request to {url} failed with error {code}: {message}")]
    Api {
        /// URL of the failed request
        url: String,
        /// Error code reported by the server
        code: i64,
        /// Error message reported by the server
        message: String,
    },

    /// Name or id lookup missed in a discovered collection
    #[error("{0} not found")]
    NotFound(String),

    /// Operation attempted on a service type the client does not implement
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// Conflicting or invalid call arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation that exists in the API surface but is not implemented
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A string that is not a member of a closed vocabulary
    #[error("'{value}' is not a valid {kind}")]
    InvalidVariant {
        /// Name of the vocabulary (e.g. "service type")
        kind: &'static str,
        /// The rejected value
        value: String,
    },

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A record carried a key outside the result set's field list
    #[error("Record contains field '{0}' which is not in the field list")]
    UnknownField(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File output error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the HTTP status if the remote rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            Error::Api { code, .. } => u16::try_from(*code).ok(),
            _ => None,
        }
    }

    /// Returns true if this error is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_extraction() {
        let error = Error::Status {
            url: "https://example.com/arcgis/rest/services".to_string(),
            status: 404,
        };
        assert_eq!(error.status(), Some(404));

        let api = Error::Api {
            url: "https://example.com/arcgis/rest/services/x/FeatureServer/0/query".to_string(),
            code: 400,
            message: "Invalid query parameters".to_string(),
        };
        assert_eq!(api.status(), Some(400));

        let not_found = Error::NotFound("Folder AGP".to_string());
        assert_eq!(not_found.status(), None);
    }

    #[test]
    fn test_messages_name_the_entity() {
        let not_found = Error::NotFound("Folder AGP".to_string());
        assert_eq!(not_found.to_string(), "Folder AGP not found");
        assert!(not_found.is_not_found());

        let invalid = Error::InvalidVariant {
            kind: "service type",
            value: "WarpServer".to_string(),
        };
        assert_eq!(invalid.to_string(), "'WarpServer' is not a valid service type");
        assert!(!invalid.is_not_found());
    }
}
