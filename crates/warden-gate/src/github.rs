use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use warden_core::{GateConfig, GitHubConfig, PrState, PullRequestDetails, WardenError};

use crate::checkrun::{CheckRunTerminator, StaleCommit};

const SUPERSEDED_TITLE: &str = "Superseded by a newer commit";
const SUPERSEDED_SUMMARY: &str =
    "A newer commit was pushed to this pull request, so this review was cancelled.";

/// GitHub client for PR details and check-run cleanup.
///
/// # Examples
///
/// ```no_run
/// use warden_core::{GateConfig, GitHubConfig};
/// use warden_gate::github::GitHubClient;
///
/// let github = GitHubConfig {
///     token: Some("ghp_xxxx".into()),
///     ..GitHubConfig::default()
/// };
/// let client = GitHubClient::new(&github, &GateConfig::default()).unwrap();
/// ```
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    check_run_names: Vec<String>,
}

impl GitHubClient {
    /// Create a client from GitHub and gate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::Config`] if no token is configured, or
    /// [`WardenError::GitHub`] if the client cannot be built.
    pub fn new(github: &GitHubConfig, gate: &GateConfig) -> Result<Self, WardenError> {
        let token = github.token.clone().ok_or_else(|| {
            WardenError::Config(
                "GitHub token not set. Add [github] token or set GITHUB_TOKEN".into(),
            )
        })?;

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token)
            .base_uri(github.api_url.as_str())
            .map_err(|e| WardenError::Config(format!("invalid GitHub API URL: {e}")))?
            .build()
            .map_err(|e| WardenError::GitHub(format!("failed to create GitHub client: {e}")))?;

        Ok(Self {
            octocrab,
            check_run_names: gate.check_run_names.clone(),
        })
    }

    /// Fetch the live state of a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::GitHub`] on network or API errors.
    pub async fn pull_request_details(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestDetails, WardenError> {
        let route = format!("/repos/{owner}/{repo}/pulls/{number}");
        let pull: PullPayload = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| WardenError::GitHub(format!("failed to fetch PR details: {e}")))?;
        Ok(pull.into())
    }

    /// Active runs on the commit whose name is one of `check_run_names`.
    ///
    /// Filters by name on the server and follows pagination, so busy commits
    /// with many unrelated CI runs are still covered.
    async fn active_check_runs(&self, commit: &StaleCommit) -> Result<Vec<CheckRun>, WardenError> {
        let route = format!(
            "/repos/{}/{}/commits/{}/check-runs",
            commit.owner, commit.repo, commit.sha
        );

        let mut active = Vec::new();
        for name in &self.check_run_names {
            let mut fetched = 0;
            for page_number in 1.. {
                let page: CheckRunPage = self
                    .octocrab
                    .get(route.as_str(), Some(&check_run_query(name, page_number)))
                    .await
                    .map_err(|e| WardenError::GitHub(format!("failed to list check runs: {e}")))?;

                let page_len = page.check_runs.len();
                fetched += page_len;
                active.extend(
                    page.check_runs
                        .into_iter()
                        .filter(|run| run.is_active() && self.owns(run)),
                );
                if !has_more_pages(page_len, fetched, page.total_count) {
                    break;
                }
            }
        }
        Ok(active)
    }

    fn owns(&self, run: &CheckRun) -> bool {
        self.check_run_names.iter().any(|name| name == &run.name)
    }
}

#[async_trait]
impl CheckRunTerminator for GitHubClient {
    async fn terminate_stale_check_runs(&self, commit: &StaleCommit) -> Result<usize, WardenError> {
        let runs = self.active_check_runs(commit).await?;
        let body = serde_json::json!({
            "status": "completed",
            "conclusion": "cancelled",
            "output": {
                "title": SUPERSEDED_TITLE,
                "summary": SUPERSEDED_SUMMARY,
            },
        });

        let mut terminated = 0;
        for run in &runs {
            let route = format!("/repos/{}/{}/check-runs/{}", commit.owner, commit.repo, run.id);
            let _response: serde_json::Value = self
                .octocrab
                .patch(route, Some(&body))
                .await
                .map_err(|e| {
                    WardenError::GitHub(format!("failed to cancel check run {}: {e}", run.id))
                })?;
            terminated += 1;
        }
        Ok(terminated)
    }
}

#[derive(Deserialize)]
struct PullPayload {
    state: PrState,
    #[serde(default)]
    draft: bool,
    merged_at: Option<DateTime<Utc>>,
    head: RefPayload,
    base: RefPayload,
}

#[derive(Deserialize)]
struct RefPayload {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
}

impl From<PullPayload> for PullRequestDetails {
    fn from(pull: PullPayload) -> Self {
        Self {
            state: pull.state,
            draft: pull.draft,
            merged_at: pull.merged_at,
            head_sha: pull.head.sha,
            base_ref: pull.base.ref_name,
        }
    }
}

const CHECK_RUNS_PER_PAGE: usize = 100;

fn check_run_query(name: &str, page: usize) -> serde_json::Value {
    serde_json::json!({
        "check_name": name,
        "per_page": CHECK_RUNS_PER_PAGE,
        "page": page,
    })
}

fn has_more_pages(page_len: usize, fetched: usize, total_count: usize) -> bool {
    page_len == CHECK_RUNS_PER_PAGE && fetched < total_count
}

#[derive(Deserialize)]
struct CheckRunPage {
    #[serde(default)]
    total_count: usize,
    check_runs: Vec<CheckRun>,
}

#[derive(Deserialize)]
struct CheckRun {
    id: u64,
    name: String,
    status: String,
}

impl CheckRun {
    fn is_active(&self) -> bool {
        self.status != "completed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_token() {
        let result = GitHubClient::new(&GitHubConfig::default(), &GateConfig::default());
        assert!(matches!(result, Err(WardenError::Config(_))));
    }

    #[test]
    fn pull_payload_maps_to_details() {
        let json = r#"{
            "state": "closed",
            "draft": false,
            "merged_at": "2024-05-01T12:00:00Z",
            "head": {"ref": "feature/x", "sha": "abc"},
            "base": {"ref": "main", "sha": "000"}
        }"#;
        let pull: PullPayload = serde_json::from_str(json).unwrap();
        let details = PullRequestDetails::from(pull);
        assert_eq!(details.state, PrState::Closed);
        assert!(details.is_merged());
        assert_eq!(details.head_sha, "abc");
        assert_eq!(details.base_ref, "main");
    }

    #[test]
    fn listing_filters_by_name_on_the_server() {
        let query = check_run_query("AI Code Review", 2);
        assert_eq!(query["check_name"], "AI Code Review");
        assert_eq!(query["per_page"], 100);
        assert_eq!(query["page"], 2);
    }

    #[test]
    fn pagination_continues_until_total_is_reached() {
        assert!(has_more_pages(100, 100, 250));
        assert!(has_more_pages(100, 200, 250));
        assert!(!has_more_pages(50, 250, 250));
        assert!(!has_more_pages(100, 100, 100));
        assert!(!has_more_pages(0, 0, 0));
    }

    #[test]
    fn only_unfinished_runs_are_active() {
        let page: CheckRunPage = serde_json::from_str(
            r#"{"total_count": 3, "check_runs": [
                {"id": 1, "name": "AI Code Review", "status": "in_progress"},
                {"id": 2, "name": "AI Code Review", "status": "completed"},
                {"id": 3, "name": "ci", "status": "queued"}
            ]}"#,
        )
        .unwrap();
        let active: Vec<u64> = page
            .check_runs
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.id)
            .collect();
        assert_eq!(active, vec![1, 3]);
    }
}
