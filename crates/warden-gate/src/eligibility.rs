//! Per-event eligibility decision.
//!
//! The gate runs an ordered list of checks against one PR event; the first
//! check that rejects wins. Apart from the detached stale check-run
//! termination it has no side effects and keeps no state between calls.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use warden_core::{
    GateConfig, PrState, PullRequestContext, PullRequestDetails, RepoWorkflowSetting, WorkflowKind,
};

use crate::branch::{BranchDecision, BranchTargetingFilter};
use crate::checkrun::{spawn_detached_termination, CheckRunTerminator, StaleCommit};
use crate::workflow::WorkflowSettings;

/// Why an event was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Draft PR and the workflow does not process drafts.
    Draft,
    /// The workflow needs an open PR.
    NotOpen,
    /// Reaction sync needs a closed PR.
    NotClosed,
    /// The event's commit is no longer the PR head.
    StaleCommit {
        /// SHA carried by the event.
        event_sha: String,
        /// Current head SHA.
        head_sha: String,
    },
    /// The event action does not trigger this workflow.
    InvalidAction(String),
    /// Branch targeting denied the base branch.
    BranchFiltered(BranchDecision),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Draft => write!(f, "draft PR and drafts are not processed"),
            RejectReason::NotOpen => write!(f, "PR is not open"),
            RejectReason::NotClosed => write!(f, "PR is not closed"),
            RejectReason::StaleCommit {
                event_sha,
                head_sha,
            } => write!(f, "commit {event_sha} superseded by {head_sha}"),
            RejectReason::InvalidAction(action) => write!(f, "action '{action}' not handled"),
            RejectReason::BranchFiltered(decision) => write!(f, "{decision}"),
        }
    }
}

/// Structured gate outcome.
///
/// # Examples
///
/// ```
/// use warden_gate::eligibility::{GateVerdict, RejectReason};
///
/// assert!(GateVerdict::Accept.is_accepted());
/// assert!(!GateVerdict::Reject(RejectReason::Draft).is_accepted());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// Run the workflow.
    Accept,
    /// Skip the workflow.
    Reject(RejectReason),
}

impl GateVerdict {
    /// `true` for [`GateVerdict::Accept`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateVerdict::Accept)
    }
}

impl fmt::Display for GateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateVerdict::Accept => write!(f, "accepted"),
            GateVerdict::Reject(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

/// Decides whether a workflow should run for a PR event.
///
/// # Examples
///
/// ```
/// use warden_core::{
///     GateConfig, PrState, PullRequestContext, PullRequestDetails, RepoWorkflowSetting,
///     WorkflowKind,
/// };
/// use warden_gate::eligibility::EligibilityGate;
///
/// let gate = EligibilityGate::new(&GateConfig::default());
/// let ctx = PullRequestContext {
///     owner: "acme".into(),
///     repo: "web".into(),
///     number: 7,
///     action: "opened".into(),
///     commit_sha: "abc".into(),
///     installation_id: 1,
/// };
/// let details = PullRequestDetails {
///     state: PrState::Open,
///     draft: false,
///     merged_at: None,
///     head_sha: "abc".into(),
///     base_ref: "main".into(),
/// };
/// let setting = RepoWorkflowSetting::default();
/// assert!(gate.decide(WorkflowKind::CodeReview, &ctx, &setting, &details));
/// ```
pub struct EligibilityGate {
    terminator: Option<Arc<dyn CheckRunTerminator>>,
    termination_timeout: Duration,
}

impl EligibilityGate {
    /// Create a gate without a check-run terminator.
    pub fn new(config: &GateConfig) -> Self {
        Self {
            terminator: None,
            termination_timeout: config.termination_timeout(),
        }
    }

    /// Attach the capability used to clean up stale code-review check runs.
    pub fn with_terminator(mut self, terminator: Arc<dyn CheckRunTerminator>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    /// Boolean projection of [`EligibilityGate::evaluate`].
    pub fn decide(
        &self,
        kind: WorkflowKind,
        ctx: &PullRequestContext,
        setting: &RepoWorkflowSetting,
        details: &PullRequestDetails,
    ) -> bool {
        self.evaluate(kind, ctx, setting, details).is_accepted()
    }

    /// Run the ordered eligibility checks and report the outcome.
    ///
    /// A stale commit on a code-review event additionally spawns a detached
    /// termination of the old commit's check runs; that task never affects
    /// the returned verdict.
    pub fn evaluate(
        &self,
        kind: WorkflowKind,
        ctx: &PullRequestContext,
        setting: &RepoWorkflowSetting,
        details: &PullRequestDetails,
    ) -> GateVerdict {
        let verdict = self.run_checks(kind, ctx, setting, details);
        match &verdict {
            GateVerdict::Accept => tracing::debug!(
                workflow = %kind,
                repo = %ctx.full_name(),
                pr = ctx.number,
                action = %ctx.action,
                "workflow accepted"
            ),
            GateVerdict::Reject(reason) => tracing::info!(
                workflow = %kind,
                repo = %ctx.full_name(),
                pr = ctx.number,
                action = %ctx.action,
                %reason,
                "workflow skipped"
            ),
        }
        verdict
    }

    fn run_checks(
        &self,
        kind: WorkflowKind,
        ctx: &PullRequestContext,
        setting: &RepoWorkflowSetting,
        details: &PullRequestDetails,
    ) -> GateVerdict {
        let settings = WorkflowSettings::decode(kind, setting).unwrap_or_else(|e| {
            tracing::warn!(workflow = %kind, error = %e, "falling back to default workflow settings");
            WorkflowSettings::defaults(kind)
        });

        if kind != WorkflowKind::PrReactionSync && details.draft && !settings.process_drafts() {
            return GateVerdict::Reject(RejectReason::Draft);
        }

        // Merged and closed-unmerged PRs are treated alike.
        if kind == WorkflowKind::PrReactionSync {
            return if details.state == PrState::Closed {
                GateVerdict::Accept
            } else {
                GateVerdict::Reject(RejectReason::NotClosed)
            };
        }

        if details.state != PrState::Open {
            return GateVerdict::Reject(RejectReason::NotOpen);
        }

        if details.head_sha != ctx.commit_sha {
            if kind == WorkflowKind::CodeReview {
                self.terminate_stale(ctx);
            }
            return GateVerdict::Reject(RejectReason::StaleCommit {
                event_sha: ctx.commit_sha.clone(),
                head_sha: details.head_sha.clone(),
            });
        }

        if !settings.valid_actions(ctx, details) {
            return GateVerdict::Reject(RejectReason::InvalidAction(ctx.action.clone()));
        }

        let branch = BranchTargetingFilter::evaluate(setting, &details.base_ref);
        if !branch.is_allowed() {
            return GateVerdict::Reject(RejectReason::BranchFiltered(branch.decision));
        }

        GateVerdict::Accept
    }

    fn terminate_stale(&self, ctx: &PullRequestContext) {
        let Some(terminator) = &self.terminator else {
            tracing::debug!(sha = %ctx.commit_sha, "no check-run terminator configured");
            return;
        };
        let commit = StaleCommit {
            installation_id: ctx.installation_id,
            owner: ctx.owner.clone(),
            repo: ctx.repo.clone(),
            sha: ctx.commit_sha.clone(),
        };
        // Detached: the handle is dropped, not awaited.
        let _ = spawn_detached_termination(
            Arc::clone(terminator),
            commit,
            self.termination_timeout,
        );
    }
}
