//! Core types, configuration, and error handling for Warden.
//!
//! This crate provides the shared foundation used by the other Warden crates:
//! - [`WardenError`]: unified error type using `thiserror`
//! - [`WardenConfig`]: configuration loaded from `.warden.toml`
//! - PR event types: [`PullRequestContext`], [`PullRequestDetails`],
//!   [`RepoWorkflowSetting`], [`WorkflowKind`]
//! - Review comments and the library-validation records the AI backend
//!   returns for them: [`ReviewComment`], [`PerCommentResult`]

mod config;
mod error;
mod library;
mod types;

pub use config::{EnhancementConfig, GateConfig, GitHubConfig, LlmConfig, WardenConfig};
pub use error::WardenError;
pub use library::{
    LibraryChangeType, LibraryClassification, LibraryInfo, PerCommentResult, SourceKind,
    ValidationResult, ValidationSource,
};
pub use types::{
    FilterMode, OutputFormat, PrState, PullRequestContext, PullRequestDetails,
    RepoWorkflowSetting, ReviewComment, WorkflowKind,
};

/// A convenience `Result` type for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
