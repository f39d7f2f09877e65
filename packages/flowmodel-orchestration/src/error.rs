use flowmodel_storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeneratorError>;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Query compilation failed: {0}")]
    QueryCompilation(String),

    #[error("Query engine error: {0}")]
    QueryEngine(String),

    #[error("Result decoding failed: {0}")]
    Decode(String),

    #[error("Model generation cancelled")]
    Cancelled,

    #[error("Result sink failed: {0}")]
    Sink(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeneratorError {
    pub fn query_engine<E: std::fmt::Display>(e: E) -> Self {
        Self::QueryEngine(e.to_string())
    }

    pub fn decode<E: std::fmt::Display>(e: E) -> Self {
        Self::Decode(e.to_string())
    }

    pub fn sink<E: std::fmt::Display>(e: E) -> Self {
        Self::Sink(e.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GeneratorError::Cancelled)
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing version field in YAML
    #[error("Missing 'version' field in configuration file. Add 'version: 1' to the top of your YAML file.")]
    MissingVersion,

    /// Unsupported version
    #[error("Unsupported configuration version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    /// Required setting absent from file and flags
    #[error("Missing required setting '{0}'")]
    MissingSetting(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
