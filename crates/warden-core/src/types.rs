use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of automated workflow a PR event can trigger.
///
/// The set is closed: every kind carries its own typed settings and
/// action rules, so adding one is checked exhaustively at compile time.
///
/// # Examples
///
/// ```
/// use warden_core::WorkflowKind;
///
/// let kind: WorkflowKind = serde_json::from_str("\"CODE_REVIEW\"").unwrap();
/// assert_eq!(kind, WorkflowKind::CodeReview);
/// assert_eq!(kind.to_string(), "CODE_REVIEW");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowKind {
    /// Generate a summary of the pull request.
    PrSummary,
    /// Post an AI code review.
    CodeReview,
    /// Sync reactions on review comments once the PR is closed.
    PrReactionSync,
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowKind::PrSummary => write!(f, "PR_SUMMARY"),
            WorkflowKind::CodeReview => write!(f, "CODE_REVIEW"),
            WorkflowKind::PrReactionSync => write!(f, "PR_REACTION_SYNC"),
        }
    }
}

impl FromStr for WorkflowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "PR_SUMMARY" => Ok(WorkflowKind::PrSummary),
            "CODE_REVIEW" => Ok(WorkflowKind::CodeReview),
            "PR_REACTION_SYNC" => Ok(WorkflowKind::PrReactionSync),
            other => Err(format!("unknown workflow kind: {other}")),
        }
    }
}

/// Identity of one inbound pull request event.
///
/// # Examples
///
/// ```
/// use warden_core::PullRequestContext;
///
/// let ctx = PullRequestContext {
///     owner: "octocat".into(),
///     repo: "hello-world".into(),
///     number: 42,
///     action: "opened".into(),
///     commit_sha: "abc123".into(),
///     installation_id: 7,
/// };
/// assert_eq!(ctx.full_name(), "octocat/hello-world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestContext {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub number: u64,
    /// Webhook action (`opened`, `synchronize`, `closed`, ...).
    pub action: String,
    /// Commit SHA the event was delivered for.
    pub commit_sha: String,
    /// GitHub App installation the event belongs to.
    pub installation_id: u64,
}

impl PullRequestContext {
    /// `owner/repo` form of the repository coordinates.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Live state of a pull request.
///
/// # Examples
///
/// ```
/// use warden_core::PrState;
///
/// let s: PrState = serde_json::from_str("\"closed\"").unwrap();
/// assert_eq!(s, PrState::Closed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    /// Accepting changes.
    Open,
    /// Merged or closed without merge.
    Closed,
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
        }
    }
}

/// Pull request details as fetched from the VCS at decision time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestDetails {
    /// Open or closed.
    pub state: PrState,
    /// Draft flag.
    #[serde(default)]
    pub draft: bool,
    /// Merge timestamp, present only for merged PRs.
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    /// Current head commit.
    pub head_sha: String,
    /// Target branch name.
    pub base_ref: String,
}

impl PullRequestDetails {
    /// `true` when the PR has been merged.
    pub fn is_merged(&self) -> bool {
        self.state == PrState::Closed && self.merged_at.is_some()
    }
}

/// Branch filter mode stored on a repository setting.
///
/// Only `allowlist` and `denylist` are recognized. Any other stored value is
/// kept verbatim as [`FilterMode::Unrecognized`] so that it can be reported.
///
/// # Examples
///
/// ```
/// use warden_core::FilterMode;
///
/// let mode: FilterMode = serde_json::from_str("\"denylist\"").unwrap();
/// assert_eq!(mode, FilterMode::Denylist);
///
/// let odd: FilterMode = serde_json::from_str("\"blocklist\"").unwrap();
/// assert_eq!(odd, FilterMode::Unrecognized("blocklist".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterMode {
    /// Process only branches matching a pattern.
    Allowlist,
    /// Skip branches matching a pattern.
    Denylist,
    /// Anything else found in storage.
    Unrecognized(String),
}

impl From<String> for FilterMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "allowlist" => FilterMode::Allowlist,
            "denylist" => FilterMode::Denylist,
            _ => FilterMode::Unrecognized(value),
        }
    }
}

impl From<FilterMode> for String {
    fn from(mode: FilterMode) -> Self {
        match mode {
            FilterMode::Allowlist => "allowlist".into(),
            FilterMode::Denylist => "denylist".into(),
            FilterMode::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Allowlist => write!(f, "allowlist"),
            FilterMode::Denylist => write!(f, "denylist"),
            FilterMode::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}

/// Persisted per-repository, per-workflow configuration.
///
/// `settings` holds the workflow-specific blob exactly as stored; it is
/// decoded lazily by the workflow kind that owns it. `branch_patterns` is a
/// JSON-encoded array of glob strings.
///
/// # Examples
///
/// ```
/// use warden_core::{FilterMode, RepoWorkflowSetting};
///
/// let setting = RepoWorkflowSetting {
///     branch_targeting_enabled: true,
///     branch_filter_mode: FilterMode::Allowlist,
///     branch_patterns: r#"["main"]"#.into(),
///     ..RepoWorkflowSetting::default()
/// };
/// assert!(setting.branch_targeting_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoWorkflowSetting {
    /// Workflow-specific settings blob.
    #[serde(default)]
    pub settings: serde_json::Value,
    /// Whether branch targeting is enforced.
    #[serde(default)]
    pub branch_targeting_enabled: bool,
    /// How `branch_patterns` is interpreted.
    #[serde(default = "default_filter_mode")]
    pub branch_filter_mode: FilterMode,
    /// JSON array of glob patterns.
    #[serde(default = "default_branch_patterns")]
    pub branch_patterns: String,
}

fn default_filter_mode() -> FilterMode {
    FilterMode::Denylist
}

fn default_branch_patterns() -> String {
    "[]".into()
}

impl Default for RepoWorkflowSetting {
    fn default() -> Self {
        Self {
            settings: serde_json::Value::Null,
            branch_targeting_enabled: false,
            branch_filter_mode: default_filter_mode(),
            branch_patterns: default_branch_patterns(),
        }
    }
}

/// A generated review comment on its way to the user.
///
/// Comments have no persistent identity; inside one enhancement call they
/// are addressed by position.
///
/// # Examples
///
/// ```
/// use warden_core::ReviewComment;
///
/// let comment = ReviewComment {
///     path: "src/app.tsx".into(),
///     line: 12,
///     start_line: None,
///     body: "uses react 17 pattern".into(),
///     kind: "suggestion".into(),
/// };
/// assert_eq!(comment.line, 12);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewComment {
    /// File the comment is attached to.
    pub path: String,
    /// Last (or only) line of the commented range.
    pub line: u32,
    /// First line of a multi-line range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    /// Comment text.
    pub body: String,
    /// Comment category as produced by the generator.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl ReviewComment {
    /// Copy of this comment with a different body.
    pub fn with_body(&self, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..self.clone()
        }
    }
}

/// Output format for CLI subcommands.
///
/// # Examples
///
/// ```
/// use warden_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
