//! Result and error types for jsonwright.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for jsonwright operations
pub type JsonwrightResult<T> = Result<T, JsonwrightError>;

/// Resolution stage that failed to find its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// An operation target (click, type, expect, ...)
    Target,
    /// The `root` context narrowing
    Root,
    /// The `parent` context anchor
    Parent,
    /// The `within` context narrowing
    Within,
    /// The item set of a `forEach`
    Items,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Target => "target",
            Self::Root => "root",
            Self::Parent => "parent",
            Self::Within => "within",
            Self::Items => "forEach items",
        };
        f.write_str(label)
    }
}

/// Errors that can occur while loading or executing specifications
#[derive(Debug, Error)]
pub enum JsonwrightError {
    /// Generic configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// `nth` combined with `first` or `last`
    #[error("Invalid index config: 'nth' cannot be combined with 'first' or 'last'")]
    InvalidIndex,

    /// An operation that needs an explicit target did not get one
    #[error("{operation} requires a target: {message}")]
    MissingTarget {
        /// Operation key
        operation: String,
        /// Error message
        message: String,
    },

    /// `run` used without a loadable function bag
    #[error("Function bag unavailable: {message}")]
    FunctionBag {
        /// Error message
        message: String,
    },

    /// `run` names a method the function bag does not expose
    #[error("Function bag does not have a method named '{name}'")]
    UnknownFunction {
        /// Method name
        name: String,
    },

    /// Dynamic call names a path outside the provider table
    #[error("Invalid dynamic function path: {path}")]
    InvalidDynamicPath {
        /// Offending call expression
        path: String,
    },

    /// A `before` chain references itself transitively
    #[error("Cycle detected in 'before': {}", path.display())]
    BeforeCycle {
        /// Document that closed the cycle
        path: PathBuf,
    },

    /// A `before` reference points at a missing document
    #[error("'before' file not found: {}", path.display())]
    BeforeNotFound {
        /// Missing document
        path: PathBuf,
    },

    /// Specification document without a recognizable shape
    #[error("Invalid specification document {}: {message}", path.display())]
    InvalidDocument {
        /// Document path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Required specification directory does not exist
    #[error("Specification directory not found: {}", path.display())]
    MissingDirectory {
        /// Directory path
        path: PathBuf,
    },

    /// Specification directory holds no documents
    #[error("No specification documents found in {}", path.display())]
    NoSpecFiles {
        /// Directory path
        path: PathBuf,
    },

    /// Empty case URL with no base to fall back on
    #[error("No baseURL to open when url is empty in \"{title}\"")]
    NoBaseUrl {
        /// Case title
        title: String,
    },

    /// URL that cannot be resolved against the base
    #[error("Invalid URL '{url}' in \"{title}\": {message}")]
    InvalidUrl {
        /// Case title
        title: String,
        /// Raw URL
        url: String,
        /// Error message
        message: String,
    },

    /// Mandatory target resolved to zero elements
    #[error("{stage} not found: \"{target}\"{context}")]
    NotFound {
        /// Resolution stage
        stage: Stage,
        /// Raw target string
        target: String,
        /// Rendered context annotations
        context: String,
    },

    /// Upload file missing on disk
    #[error("Upload file not found: {}", path.display())]
    UploadFileMissing {
        /// Resolved path
        path: PathBuf,
    },

    /// Upload post-condition failed
    #[error("Upload mismatch on \"{target}\": expected {expected} file(s), input holds {actual}")]
    UploadMismatch {
        /// Raw target string
        target: String,
        /// Files requested
        expected: usize,
        /// Files reported by the input
        actual: usize,
    },

    /// Upload target is not a file input
    #[error("Upload target \"{target}\" is not an input[type=file]")]
    UploadTarget {
        /// Raw target string
        target: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was awaited
        what: String,
    },

    /// Capability layer failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation failure
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JsonwrightError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a capability layer error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a missing-target error for an operation
    #[must_use]
    pub fn missing_target(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MissingTarget {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration class
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::InvalidIndex
                | Self::MissingTarget { .. }
                | Self::FunctionBag { .. }
                | Self::UnknownFunction { .. }
                | Self::InvalidDynamicPath { .. }
                | Self::BeforeCycle { .. }
                | Self::BeforeNotFound { .. }
                | Self::InvalidDocument { .. }
                | Self::MissingDirectory { .. }
                | Self::NoSpecFiles { .. }
                | Self::NoBaseUrl { .. }
                | Self::InvalidUrl { .. }
        )
    }
}
