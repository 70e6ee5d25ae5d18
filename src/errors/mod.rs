//! # Error Handling
//!
//! Error types for the oasproxy compiler and its collaborators, defined with
//! `thiserror`. Import and endpoint resolution failures carry enough context
//! (document title/version or the offending URL) to locate the bad input.

/// Custom result type for oasproxy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for oasproxy
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The API description could not be read or lacks its identity fields
    #[error("Import error for '{document}': {message}")]
    Import { document: String, message: String },

    /// A declared server URL could not be turned into an endpoint
    #[error("Endpoint resolution error for URL '{url}': {message}")]
    EndpointResolution { url: String, message: String },

    /// Vendor extensions could not round-trip through the JSON interchange form
    #[error("Extension decode error ({context}): {source}")]
    ExtensionDecode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A sub-message could not be encoded into Envoy's typed configuration envelope
    #[error("Config encode error: {0}")]
    ConfigEncode(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors for request payloads and manifests
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller-supplied JSON could not be read
    #[error("Invalid payload: {context}")]
    Deserialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Generated output could not be serialized
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network transport errors (HTTP control server)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new import error for the named document
    pub fn import<D: Into<String>, M: Into<String>>(document: D, message: M) -> Self {
        Self::Import { document: document.into(), message: message.into() }
    }

    /// Create a new endpoint resolution error for a raw URL
    pub fn endpoint_resolution<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::EndpointResolution { url: url.into(), message: message.into() }
    }

    /// Create a new config encode error
    pub fn config_encode<S: Into<String>>(message: S) -> Self {
        Self::ConfigEncode(message.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Import { .. } => 400,
            Error::EndpointResolution { .. } => 400,
            Error::ExtensionDecode { .. } => 400,
            Error::Validation(_) => 400,
            Error::Deserialization { .. } => 400,
            Error::Serialization { .. } => 500,
            Error::ConfigEncode(_) => 500,
            Error::Config(_) => 500,
            Error::Io(_) => 500,
            Error::Transport(_) => 500,
            Error::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        // Only I/O failures can come from writing; everything else is bad input.
        if error.is_io() {
            Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
        } else {
            Self::Deserialization { source: error, context: "JSON payload is invalid".to_string() }
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::config(format!("Configuration loading failed: {}", error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
