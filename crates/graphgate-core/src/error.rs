//! Error types for graphgate operations.
//!
//! Every failure carries a structured error code and, where one exists, a
//! suggestion for resolving it.

use thiserror::Error;

/// Result type alias for graphgate operations.
pub type GraphResult<T> = Result<T, GraphGateError>;

/// Main error type for all graphgate operations.
#[derive(Error, Debug)]
pub enum GraphGateError {
    /// Settings are missing, malformed, or name an unsupported backend.
    #[error("Configuration error: {message}")]
    Configuration { message: String, code: ErrorCode },

    /// The selected backend was not compiled into this build.
    #[error("{backend} dependencies not found, rebuild with `cargo build --features {feature}`")]
    DependencyMissing {
        backend: String,
        feature: String,
    },

    /// A feature was used in a state that does not support it.
    #[error("{0}")]
    State(String),

    /// Graph store operation failed.
    #[error("Graph store error: {message}")]
    GraphStore {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration (CFG_xxx)
    CfgInvalid,
    CfgMissingBackend,
    CfgDependencyMissing,

    // State (STATE_xxx)
    StateNotConfigured,

    // Graph (GRP_xxx)
    GrpConnectionFailed,
    GrpOperationFailed,
    GrpClosed,

    // LLM (LLM_xxx)
    LlmGenerationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::CfgMissingBackend => "CFG_002",
            ErrorCode::CfgDependencyMissing => "CFG_003",
            ErrorCode::StateNotConfigured => "STATE_001",
            ErrorCode::GrpConnectionFailed => "GRP_001",
            ErrorCode::GrpOperationFailed => "GRP_002",
            ErrorCode::GrpClosed => "GRP_003",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl GraphGateError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            code: ErrorCode::CfgInvalid,
        }
    }

    /// Create an error for a selected backend whose settings block is absent.
    pub fn missing_backend_settings(backend: impl std::fmt::Display) -> Self {
        Self::Configuration {
            message: format!("{} settings not found. Please provide settings.", backend),
            code: ErrorCode::CfgMissingBackend,
        }
    }

    /// Create a missing-dependency error for a backend compiled out of this build.
    pub fn dependency_missing(backend: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::DependencyMissing {
            backend: backend.into(),
            feature: feature.into(),
        }
    }

    /// Create a state error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create a graph store error.
    pub fn graph_store(message: impl Into<String>) -> Self {
        Self::GraphStore {
            message: message.into(),
            code: ErrorCode::GrpOperationFailed,
            source: None,
        }
    }

    /// Create a graph store connection error, keeping the client error as source.
    pub fn graph_connection<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::GraphStore {
            message: message.into(),
            code: ErrorCode::GrpConnectionFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create an error for an operation attempted on a closed graph store.
    pub fn graph_closed(backend: impl std::fmt::Display) -> Self {
        Self::GraphStore {
            message: format!("{} connection is closed", backend),
            code: ErrorCode::GrpClosed,
            source: None,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration { code, .. } => *code,
            Self::DependencyMissing { .. } => ErrorCode::CfgDependencyMissing,
            Self::State(_) => ErrorCode::StateNotConfigured,
            Self::GraphStore { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Configuration {
                code: ErrorCode::CfgMissingBackend,
                ..
            } => Some("Add a settings block for the backend named in graphstore.database"),
            Self::Configuration { .. } => {
                Some("Check the graphstore, neo4j and falkordb sections of your settings")
            }
            Self::DependencyMissing { .. } => {
                Some("Enable the backend's cargo feature on graphgate-graph-stores")
            }
            Self::State(_) => Some("Set graphstore.database to neo4j or falkordb"),
            Self::GraphStore { .. } => Some("Please check your graph store connection settings"),
            Self::Llm { .. } => Some("Please check your LLM provider configuration"),
            _ => None,
        }
    }

    /// Whether this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Whether this is a missing-dependency error.
    pub fn is_dependency_missing(&self) -> bool {
        matches!(self, Self::DependencyMissing { .. })
    }

    /// Whether this is a state error.
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }
}
