//! Branch targeting: allow/deny a PR by its base branch.
//!
//! Patterns are stored per repository setting as a JSON array of globs and
//! interpreted according to the setting's [`FilterMode`].

use std::fmt;

use warden_core::{FilterMode, RepoWorkflowSetting, WardenError};

/// Outcome of evaluating branch targeting for one target branch.
///
/// # Examples
///
/// ```
/// use warden_gate::branch::BranchDecision;
///
/// assert!(BranchDecision::TargetingDisabled.is_allowed());
/// assert!(!BranchDecision::EmptyAllowlist.is_allowed());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchDecision {
    /// Targeting is off for this setting.
    TargetingDisabled,
    /// Branch matched a pattern in an allowlist.
    MatchedAllowlist,
    /// Branch matched no pattern in a denylist.
    NotInDenylist,
    /// Branch matched a pattern in a denylist.
    MatchedDenylist,
    /// Branch matched no pattern in a non-empty allowlist.
    NotInAllowlist,
    /// The allowlist has no patterns.
    EmptyAllowlist,
    /// The stored pattern list could not be decoded.
    MalformedPatterns(String),
    /// Mode is neither `allowlist` nor `denylist`; nothing denies.
    UnrecognizedMode(String),
}

impl BranchDecision {
    /// Whether processing may continue.
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            BranchDecision::TargetingDisabled
                | BranchDecision::MatchedAllowlist
                | BranchDecision::NotInDenylist
                | BranchDecision::UnrecognizedMode(_)
        )
    }
}

impl fmt::Display for BranchDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchDecision::TargetingDisabled => write!(f, "branch targeting disabled"),
            BranchDecision::MatchedAllowlist => write!(f, "branch matches allowlist"),
            BranchDecision::NotInDenylist => write!(f, "branch not in denylist"),
            BranchDecision::MatchedDenylist => write!(f, "branch matches denylist"),
            BranchDecision::NotInAllowlist => write!(f, "branch not in allowlist"),
            BranchDecision::EmptyAllowlist => write!(f, "allowlist is empty"),
            BranchDecision::MalformedPatterns(e) => write!(f, "malformed branch patterns: {e}"),
            BranchDecision::UnrecognizedMode(m) => write!(f, "unrecognized filter mode '{m}'"),
        }
    }
}

/// Full result of a branch evaluation, including patterns that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchEvaluation {
    /// The decision itself.
    pub decision: BranchDecision,
    /// Patterns that failed to compile and were ignored.
    pub skipped_patterns: Vec<String>,
}

impl BranchEvaluation {
    fn bare(decision: BranchDecision) -> Self {
        Self {
            decision,
            skipped_patterns: Vec::new(),
        }
    }

    /// Shorthand for `self.decision.is_allowed()`.
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}

/// Evaluates a repository's branch targeting configuration.
///
/// Stateless; every call works only on its arguments.
///
/// # Examples
///
/// ```
/// use warden_core::{FilterMode, RepoWorkflowSetting};
/// use warden_gate::branch::BranchTargetingFilter;
///
/// let setting = RepoWorkflowSetting {
///     branch_targeting_enabled: true,
///     branch_filter_mode: FilterMode::Denylist,
///     branch_patterns: r#"["release/*"]"#.into(),
///     ..RepoWorkflowSetting::default()
/// };
/// assert!(!BranchTargetingFilter::allow(&setting, "release/1.2"));
/// assert!(BranchTargetingFilter::allow(&setting, "main"));
/// ```
pub struct BranchTargetingFilter;

impl BranchTargetingFilter {
    /// Whether a PR targeting `target_branch` may be processed.
    pub fn allow(setting: &RepoWorkflowSetting, target_branch: &str) -> bool {
        Self::evaluate(setting, target_branch).is_allowed()
    }

    /// Evaluate branch targeting and report why.
    ///
    /// Undecodable pattern storage fails closed. Patterns that do not compile
    /// are skipped and listed in [`BranchEvaluation::skipped_patterns`].
    pub fn evaluate(setting: &RepoWorkflowSetting, target_branch: &str) -> BranchEvaluation {
        if !setting.branch_targeting_enabled {
            return BranchEvaluation::bare(BranchDecision::TargetingDisabled);
        }

        let patterns = match decode_patterns(&setting.branch_patterns) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(
                    target_branch,
                    error = %e,
                    "branch targeting configuration is unreadable, denying"
                );
                return BranchEvaluation::bare(BranchDecision::MalformedPatterns(e.to_string()));
            }
        };

        let mut matched = false;
        let mut skipped_patterns = Vec::new();
        for raw in &patterns {
            match compile(raw) {
                Ok(pattern) => {
                    if pattern.matches(target_branch) {
                        matched = true;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping invalid branch pattern");
                    skipped_patterns.push(raw.clone());
                }
            }
        }

        let decision = match &setting.branch_filter_mode {
            FilterMode::Denylist if matched => BranchDecision::MatchedDenylist,
            FilterMode::Denylist => BranchDecision::NotInDenylist,
            FilterMode::Allowlist if patterns.is_empty() => BranchDecision::EmptyAllowlist,
            FilterMode::Allowlist if matched => BranchDecision::MatchedAllowlist,
            FilterMode::Allowlist => BranchDecision::NotInAllowlist,
            FilterMode::Unrecognized(mode) => BranchDecision::UnrecognizedMode(mode.clone()),
        };

        tracing::debug!(target_branch, mode = %setting.branch_filter_mode, %decision, "branch targeting evaluated");

        BranchEvaluation {
            decision,
            skipped_patterns,
        }
    }
}

/// Decode the stored JSON array of glob strings.
///
/// # Errors
///
/// Returns [`WardenError::SettingsDecode`] if the value is not a JSON array of
/// strings.
///
/// # Examples
///
/// ```
/// use warden_gate::branch::decode_patterns;
///
/// assert_eq!(decode_patterns(r#"["main","release/*"]"#).unwrap().len(), 2);
/// assert!(decode_patterns("main").is_err());
/// ```
pub fn decode_patterns(stored: &str) -> Result<Vec<String>, WardenError> {
    serde_json::from_str(stored)
        .map_err(|e| WardenError::SettingsDecode(format!("branch patterns: {e}")))
}

fn compile(raw: &str) -> Result<glob::Pattern, WardenError> {
    glob::Pattern::new(raw).map_err(|e| WardenError::PatternCompile {
        pattern: raw.to_string(),
        reason: e.msg.to_string(),
    })
}
