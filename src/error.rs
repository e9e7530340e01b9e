//! Error types for neglb.
//!
//! Every failure in a provisioning run is fatal, so the variants here exist to
//! carry enough context for the operator to see which call failed and why.

use std::path::PathBuf;
use thiserror::Error;

use crate::steps::Step;

/// Result type alias for neglb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for neglb.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Error reading the configuration file.
    #[error("Failed to read config '{path}': {source}")]
    ConfigRead {
        /// Path to the config file
        path: PathBuf,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    /// Error parsing the configuration file.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path to the config file
        path: PathBuf,
        /// Parser error message
        message: String,
    },

    /// A configuration value is missing or invalid.
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    // ========================================================================
    // Authentication Errors
    // ========================================================================
    /// No access token could be obtained, or the API rejected it.
    #[error("Authentication failed: {0}")]
    Auth(String),

    // ========================================================================
    // API Errors
    // ========================================================================
    /// The API answered with a non-success status.
    #[error("{operation} failed with HTTP {status}: {message}")]
    Api {
        /// What was being attempted, e.g. "insert healthChecks"
        operation: String,
        /// HTTP status code
        status: u16,
        /// Message decoded from the Google error body
        message: String,
    },

    /// A long-running operation reported an error.
    #[error("Operation '{name}' failed: {message}")]
    Operation {
        /// Operation name
        name: String,
        /// Joined error messages
        message: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A provider response could not be decoded into the expected resource.
    #[error("Failed to decode {what}: {source}")]
    Decode {
        /// What was being decoded
        what: String,
        /// Source error
        #[source]
        source: serde_json::Error,
    },

    /// A resource that was just created could not be found again.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Resource collection
        kind: String,
        /// Resource name
        name: String,
    },

    /// A resource returned by the API lacks a field a later step needs.
    #[error("{kind} '{name}' has no {field}")]
    MissingField {
        /// Resource collection
        kind: String,
        /// Resource name
        name: String,
        /// Missing field
        field: &'static str,
    },

    // ========================================================================
    // Provisioning Errors
    // ========================================================================
    /// The URL map has to be created by hand before the run can continue.
    #[error("URL map '{name}' must be created manually; run: {command}")]
    ManualStepRequired {
        /// URL map name
        name: String,
        /// Equivalent gcloud command
        command: String,
    },

    /// A provisioning step failed.
    #[error("Step '{step}' failed: {source}")]
    Step {
        /// The failing step
        step: Step,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Creates a new API error.
    pub fn api(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a new decode error.
    pub fn decode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            what: what.into(),
            source,
        }
    }

    /// Wraps this error with the step it happened in.
    pub fn in_step(self, step: Step) -> Self {
        match self {
            already @ Error::Step { .. } => already,
            other => Error::Step {
                step,
                source: Box::new(other),
            },
        }
    }

    /// Returns the step this error was raised in, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Returns the underlying error, looking through step wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Step { source, .. } => source.exit_code(),
            Error::ConfigRead { .. } | Error::ConfigParse { .. } | Error::ConfigValidation(_) => 4,
            Error::Auth(_) => 3,
            Error::ManualStepRequired { .. } => 5,
            Error::Api { .. }
            | Error::Operation { .. }
            | Error::Http(_)
            | Error::Decode { .. }
            | Error::NotFound { .. }
            | Error::MissingField { .. } => 2,
        }
    }
}
