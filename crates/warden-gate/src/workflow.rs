//! Per-workflow settings and action rules.
//!
//! Each [`WorkflowKind`] stores its own settings blob on the repository
//! setting. [`WorkflowSettings`] decodes that blob into the typed variant for
//! the kind and answers the two questions the gate asks of a workflow:
//! whether drafts are processed and whether the event action is relevant.

use serde::{Deserialize, Serialize};
use warden_core::{
    PullRequestContext, PullRequestDetails, RepoWorkflowSetting, WardenError, WorkflowKind,
};

/// Settings for the PR summary workflow.
///
/// # Examples
///
/// ```
/// use warden_gate::workflow::PrSummarySettings;
///
/// let s = PrSummarySettings::default();
/// assert!(!s.process_draft_prs);
/// assert!(!s.update_on_push);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrSummarySettings {
    /// Summarize draft PRs too.
    #[serde(default)]
    pub process_draft_prs: bool,
    /// Refresh the summary on new pushes and description edits.
    #[serde(default)]
    pub update_on_push: bool,
}

/// Settings for the code review workflow.
///
/// # Examples
///
/// ```
/// use warden_gate::workflow::CodeReviewSettings;
///
/// let s = CodeReviewSettings::default();
/// assert!(!s.process_draft_prs);
/// assert!(s.review_on_push);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeReviewSettings {
    /// Review draft PRs too.
    #[serde(default)]
    pub process_draft_prs: bool,
    /// Review again on every push.
    #[serde(default = "default_true")]
    pub review_on_push: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CodeReviewSettings {
    fn default() -> Self {
        Self {
            process_draft_prs: false,
            review_on_push: true,
        }
    }
}

/// Decoded workflow settings, one variant per [`WorkflowKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowSettings {
    /// PR summary.
    PrSummary(PrSummarySettings),
    /// Code review.
    CodeReview(CodeReviewSettings),
    /// Reaction sync has nothing to configure.
    PrReactionSync,
}

impl WorkflowSettings {
    /// Decode the settings blob stored on `setting` for `kind`.
    ///
    /// A missing (`null`) blob decodes to the kind's defaults.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::SettingsDecode`] when the blob does not match the
    /// kind's settings shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_core::{RepoWorkflowSetting, WorkflowKind};
    /// use warden_gate::workflow::WorkflowSettings;
    ///
    /// let setting = RepoWorkflowSetting {
    ///     settings: serde_json::json!({"processDraftPrs": true}),
    ///     ..RepoWorkflowSetting::default()
    /// };
    /// let decoded = WorkflowSettings::decode(WorkflowKind::CodeReview, &setting).unwrap();
    /// assert!(decoded.process_drafts());
    /// ```
    pub fn decode(kind: WorkflowKind, setting: &RepoWorkflowSetting) -> Result<Self, WardenError> {
        if setting.settings.is_null() {
            return Ok(Self::defaults(kind));
        }
        let blob = setting.settings.clone();
        let decoded = match kind {
            WorkflowKind::PrSummary => WorkflowSettings::PrSummary(
                serde_json::from_value(blob).map_err(|e| decode_error(kind, e))?,
            ),
            WorkflowKind::CodeReview => WorkflowSettings::CodeReview(
                serde_json::from_value(blob).map_err(|e| decode_error(kind, e))?,
            ),
            WorkflowKind::PrReactionSync => WorkflowSettings::PrReactionSync,
        };
        Ok(decoded)
    }

    /// Default settings for `kind`.
    pub fn defaults(kind: WorkflowKind) -> Self {
        match kind {
            WorkflowKind::PrSummary => WorkflowSettings::PrSummary(PrSummarySettings::default()),
            WorkflowKind::CodeReview => WorkflowSettings::CodeReview(CodeReviewSettings::default()),
            WorkflowKind::PrReactionSync => WorkflowSettings::PrReactionSync,
        }
    }

    /// The kind these settings belong to.
    pub fn kind(&self) -> WorkflowKind {
        match self {
            WorkflowSettings::PrSummary(_) => WorkflowKind::PrSummary,
            WorkflowSettings::CodeReview(_) => WorkflowKind::CodeReview,
            WorkflowSettings::PrReactionSync => WorkflowKind::PrReactionSync,
        }
    }

    /// Whether draft PRs are processed. Kinds without a flag never do.
    pub fn process_drafts(&self) -> bool {
        match self {
            WorkflowSettings::PrSummary(s) => s.process_draft_prs,
            WorkflowSettings::CodeReview(s) => s.process_draft_prs,
            WorkflowSettings::PrReactionSync => false,
        }
    }

    /// Whether the event's action should trigger this workflow.
    ///
    /// Draft handling is not part of this predicate; the gate applies the
    /// `processDraftPrs` flag before actions are considered.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_core::WorkflowKind;
    /// use warden_gate::workflow::WorkflowSettings;
    /// # use warden_core::{PrState, PullRequestContext, PullRequestDetails};
    /// # let ctx = PullRequestContext {
    /// #     owner: "o".into(), repo: "r".into(), number: 1,
    /// #     action: "synchronize".into(), commit_sha: "a".into(), installation_id: 1,
    /// # };
    /// # let details = PullRequestDetails {
    /// #     state: PrState::Open, draft: false, merged_at: None,
    /// #     head_sha: "a".into(), base_ref: "main".into(),
    /// # };
    ///
    /// let review = WorkflowSettings::defaults(WorkflowKind::CodeReview);
    /// assert!(review.valid_actions(&ctx, &details));
    ///
    /// let summary = WorkflowSettings::defaults(WorkflowKind::PrSummary);
    /// assert!(!summary.valid_actions(&ctx, &details));
    /// ```
    pub fn valid_actions(&self, ctx: &PullRequestContext, _details: &PullRequestDetails) -> bool {
        let action = ctx.action.as_str();
        match self {
            WorkflowSettings::CodeReview(s) => match action {
                "opened" | "reopened" | "ready_for_review" => true,
                "synchronize" => s.review_on_push,
                _ => false,
            },
            WorkflowSettings::PrSummary(s) => match action {
                "opened" | "reopened" | "ready_for_review" => true,
                "synchronize" | "edited" => s.update_on_push,
                _ => false,
            },
            WorkflowSettings::PrReactionSync => action == "closed",
        }
    }
}

fn decode_error(kind: WorkflowKind, e: serde_json::Error) -> WardenError {
    WardenError::SettingsDecode(format!("{kind} settings: {e}"))
}
