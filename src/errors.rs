//! # Error Handling for CRM Searches
//!
//! The query compiler never rejects a condition: incomplete conditions and columns are skipped
//! and reported as diagnostics. Writing the FetchXML document, reading configuration files and
//! talking to the metadata repository return a [`SearchError`].
//!
//! ## Logging
//!
//! Internal error details are logged through the `tracing` crate at the point where the error
//! is raised. Nothing is printed unless the application installs a subscriber:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt()
//!     .with_target(false)
//!     .compact()
//!     .init();
//! ```

use std::fmt;

/// Error raised while loading configuration or talking to the CRM.
#[derive(Debug)]
pub enum SearchError {
    /// A metadata record or entity the caller asked for does not exist
    NotFound {
        /// Resource type (e.g., "entity", "attribute")
        resource: String,
        /// Logical name that wasn't found
        id: Option<String>,
    },

    /// The search configuration is unusable
    Config {
        /// User-facing error message
        message: String,
    },

    /// A configuration or fixture file could not be read
    Io {
        /// Path of the file being read
        path: String,
        /// Underlying IO error (logged)
        internal: std::io::Error,
    },

    /// A payload could not be (de)serialized
    Json {
        /// What was being parsed
        message: String,
        /// Underlying serde error (logged)
        internal: serde_json::Error,
    },

    /// A FetchXML document could not be written
    Xml {
        /// What was being written
        message: String,
        /// Underlying writer error (logged)
        internal: quick_xml::Error,
    },

    /// The HTTP request itself failed (connection, TLS, timeout, body decoding)
    #[cfg(feature = "web-api")]
    Http {
        /// Name of the repository operation
        message: String,
        /// Underlying transport error (logged)
        internal: reqwest::Error,
    },

    /// The CRM answered with a non-success status code
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
        /// Truncated response body (logged, not part of the display message)
        body: String,
    },
}

impl SearchError {
    // ============================================================================
    // Constructors
    // ============================================================================

    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an IO error for the given path and log it
    pub fn io(path: impl Into<String>, internal: std::io::Error) -> Self {
        let error = Self::Io {
            path: path.into(),
            internal,
        };
        error.log_internal();
        error
    }

    /// Create a JSON error and log it
    pub fn json(message: impl Into<String>, internal: serde_json::Error) -> Self {
        let error = Self::Json {
            message: message.into(),
            internal,
        };
        error.log_internal();
        error
    }

    /// Create an XML writer error and log it
    pub fn xml(message: impl Into<String>, internal: quick_xml::Error) -> Self {
        let error = Self::Xml {
            message: message.into(),
            internal,
        };
        error.log_internal();
        error
    }

    /// Create a transport error and log it
    #[cfg(feature = "web-api")]
    pub fn http(message: impl Into<String>, internal: reqwest::Error) -> Self {
        let error = Self::Http {
            message: message.into(),
            internal,
        };
        error.log_internal();
        error
    }

    /// Create an unexpected-status error and log it
    pub fn status(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        let body: String = body.into();
        let error = Self::Status {
            status,
            url: url.into(),
            body: body.chars().take(200).collect(),
        };
        error.log_internal();
        error
    }

    // ============================================================================
    // Internal helpers
    // ============================================================================

    /// Short message safe to show in a result grid
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::Config { message } => message.clone(),
            Self::Io { path, .. } => format!("Could not read '{path}'"),
            Self::Json { message, .. } => format!("Invalid data: {message}"),
            Self::Xml { message, .. } => format!("Could not build query: {message}"),
            #[cfg(feature = "web-api")]
            Self::Http { message, .. } => format!("Request failed: {message}"),
            Self::Status { status, .. } => format!("The CRM returned status {status}"),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Io { path, internal } => {
                tracing::error!(path = %path, error = %internal, "failed to read file");
            }
            Self::Json { message, internal } => {
                tracing::error!(error = %internal, "{message}");
            }
            Self::Xml { message, internal } => {
                tracing::error!(error = %internal, "{message}");
            }
            #[cfg(feature = "web-api")]
            Self::Http { message, internal } => {
                tracing::error!(error = %internal, "CrmRepository.{message}");
            }
            Self::Status { status, url, body } => {
                tracing::error!(status = *status, url = %url, body = %body, "unexpected CRM response");
            }
            Self::NotFound { .. } | Self::Config { .. } => {
                tracing::debug!("{}", self.user_message());
            }
        }
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { internal, .. } => Some(internal),
            Self::Json { internal, .. } => Some(internal),
            Self::Xml { internal, .. } => Some(internal),
            #[cfg(feature = "web-api")]
            Self::Http { internal, .. } => Some(internal),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::json("failed to parse JSON", err)
    }
}

#[cfg(feature = "web-api")]
impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        Self::http("request", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_not_found_with_id() {
        let error = SearchError::not_found("entity", Some("account".to_string()));
        assert_eq!(error.to_string(), "entity 'account' not found");
    }

    #[test]
    fn test_not_found_without_id() {
        let error = SearchError::not_found("entity", None);
        assert_eq!(error.to_string(), "entity not found");
    }

    #[test]
    fn test_config_message_is_shown_verbatim() {
        let error = SearchError::config("SearchScheme is missing");
        assert_eq!(error.user_message(), "SearchScheme is missing");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_json_error_keeps_source() {
        let internal = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = SearchError::json("config", internal);
        assert_eq!(error.to_string(), "Invalid data: config");
        assert!(error.source().is_some());
    }

    #[test]
    fn test_status_body_is_truncated() {
        let error = SearchError::status(500, "https://crm/api", "x".repeat(1_000));
        match error {
            SearchError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 200);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
