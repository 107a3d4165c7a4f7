use std::path::PathBuf;

/// Errors that can occur across the Warden workspace.
///
/// Each variant wraps a specific failure domain. Library crates use this type
/// directly; the binary crate converts to `miette` diagnostics at the boundary.
///
/// # Examples
///
/// ```
/// use warden_core::WardenError;
///
/// let err = WardenError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A persisted repository/workflow setting could not be decoded.
    #[error("settings decode error: {0}")]
    SettingsDecode(String),

    /// A stored glob pattern failed to compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    PatternCompile {
        /// The offending pattern as stored.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// The AI backend call failed or returned a non-success status.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The AI backend did not answer before the deadline.
    #[error("LLM call timed out after {0}s")]
    Timeout(u64),

    /// No usable result could be located in an AI response.
    #[error("response parse error: {0}")]
    ResponseParse(String),

    /// GitHub API failure, including check-run termination.
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
