use thiserror::Error;

/// Ways a sandboxed call can fail
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SandboxError {
    #[error("execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("heap limit of {max_heap_bytes} bytes exceeded")]
    MemoryExceeded { max_heap_bytes: usize },

    /// The returned value had more nodes than the extractor copies out.
    #[error("result holds more than {max_nodes} values")]
    ResultTooLarge { max_nodes: usize },

    #[error("access to restricted global '{name}'")]
    CapabilityViolation { name: String },

    /// Bad syntax, missing entry point, non-object return or a thrown exception.
    /// Carries the script-originated text, which must be redacted before it leaves the engine.
    #[error("{message}")]
    SyntaxOrRuntime { message: String },

    #[error("sandbox unavailable: {0}")]
    Unavailable(String),
}

impl SandboxError {
    pub fn runtime(message: impl Into<String>) -> Self {
        SandboxError::SyntaxOrRuntime {
            message: message.into(),
        }
    }
}

/// The raw result did not have the `{ isValid, message }` shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ContractError(pub String);

/// Configuration store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("API configuration '{0}' already exists")]
    AlreadyExists(String),

    #[error("Configuration with name '{0}' not found")]
    NotFound(String),
}

/// Failures surfaced to the calling layer by [`crate::ValidationService`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("API configuration '{name}' not found")]
    NotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("API configuration '{0}' already exists")]
    Conflict(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Invalid custom validation function: {0}. Function must be valid JavaScript starting with \
         \"function customValidation(data) {{ ... }}\" and return an object with \
         {{ isValid: boolean, message: string }}"
    )]
    InvalidScript(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(name) => ServiceError::Conflict(name),
            StoreError::NotFound(name) => ServiceError::NotFound {
                name,
                available: Vec::new(),
            },
        }
    }
}

/// Engine configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type SandboxResult<T> = Result<T, SandboxError>;
