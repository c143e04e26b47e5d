use thiserror::Error;

/// Main error type for hierarchy construction
#[derive(Error, Debug)]
pub enum HierarchyError {
    #[error("No process metadata files were supplied")]
    NoFiles,

    #[error("Root process '{requested}' not found in any loaded file (available: {})", available.join(", "))]
    RootNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Refinement error: {0}")]
    Refinement(String),
}

pub type Result<T> = std::result::Result<T, HierarchyError>;
