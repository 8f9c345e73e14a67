use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid parameter assignment: {param}. Expected NAME=VALUE")]
    InvalidAssignment { param: String },

    #[error("Parameters file must hold a JSON object, got: {found}")]
    InvalidParamsFile { found: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Tool(#[from] gridgarage::Error),
}
