use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Visibility;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub html_url: String,
    pub archived: bool,
    pub visibility: Visibility,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Platform-computed mergeability. Anything not recognized is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mergeable {
    Mergeable,
    Conflicting,
    Unknown,
}

impl Mergeable {
    pub fn from_api(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "MERGEABLE" => Mergeable::Mergeable,
            "CONFLICTING" => Mergeable::Conflicting,
            _ => Mergeable::Unknown,
        }
    }
}

impl fmt::Display for Mergeable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mergeable::Mergeable => write!(f, "MERGEABLE"),
            Mergeable::Conflicting => write!(f, "CONFLICTING"),
            Mergeable::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckState {
    Success,
    Failure,
    Pending,
}

impl CheckState {
    /// Any failure wins, then any pending. No checks at all folds to success.
    pub fn fold<I: IntoIterator<Item = CheckState>>(states: I) -> CheckState {
        let mut folded = CheckState::Success;
        for state in states {
            match state {
                CheckState::Failure => return CheckState::Failure,
                CheckState::Pending => folded = CheckState::Pending,
                CheckState::Success => {}
            }
        }
        folded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCheck {
    pub name: String,
    pub state: CheckState,
}

impl StatusCheck {
    /// GitHub Actions style check run.
    pub fn from_check_run(name: &str, status: &str, conclusion: Option<&str>) -> Self {
        let state = if !status.eq_ignore_ascii_case("COMPLETED") {
            CheckState::Pending
        } else {
            match conclusion.map(str::to_uppercase).as_deref() {
                Some("SUCCESS" | "SKIPPED" | "NEUTRAL") => CheckState::Success,
                Some(
                    "FAILURE" | "CANCELLED" | "TIMED_OUT" | "ACTION_REQUIRED" | "STARTUP_FAILURE"
                    | "STALE",
                ) => CheckState::Failure,
                _ => CheckState::Pending,
            }
        };

        StatusCheck {
            name: name.to_string(),
            state,
        }
    }

    /// Legacy commit status.
    pub fn from_status_context(context: &str, state: &str) -> Self {
        let state = match state.to_uppercase().as_str() {
            "SUCCESS" => CheckState::Success,
            "FAILURE" | "ERROR" => CheckState::Failure,
            _ => CheckState::Pending,
        };

        StatusCheck {
            name: context.to_string(),
            state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub repository: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub files: Vec<String>,
    /// The API returned fewer paths than the PR actually changes.
    pub files_truncated: bool,
    pub mergeable: Mergeable,
    pub checks: Vec<StatusCheck>,
}

impl PullRequest {
    pub fn check_state(&self) -> CheckState {
        CheckState::fold(self.checks.iter().map(|c| c.state))
    }
}

// REST payloads

#[derive(Debug, Deserialize)]
pub(crate) struct RepoResponse {
    pub name: String,
    pub html_url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub private: bool,
    pub visibility: Option<String>,
    pub owner: OwnerResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnerResponse {
    pub login: String,
}

impl RepoResponse {
    /// Unrecognized visibility is treated as private so it never passes a public-only filter.
    pub fn visibility(&self) -> Visibility {
        match &self.visibility {
            Some(v) => v.parse().unwrap_or(Visibility::Private),
            None if self.private => Visibility::Private,
            None => Visibility::Public,
        }
    }

    pub fn into_repository(self) -> Repository {
        let visibility = self.visibility();
        Repository {
            owner: self.owner.login,
            name: self.name,
            html_url: self.html_url,
            archived: self.archived,
            visibility,
        }
    }
}

// GraphQL payloads

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryData {
    pub repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepositoryNode {
    pub pull_requests: PullRequestConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullRequestConnection {
    pub page_info: PageInfo,
    pub nodes: Vec<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullRequestNode {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<ActorNode>,
    pub mergeable: String,
    #[serde(default)]
    pub changed_files: usize,
    pub files: Option<Nodes<FileNode>>,
    pub commits: Nodes<CommitNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Nodes<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorNode {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileNode {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitNode {
    pub commit: CommitDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommitDetails {
    pub status_check_rollup: Option<StatusCheckRollup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusCheckRollup {
    pub contexts: Nodes<CheckContext>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub(crate) enum CheckContext {
    CheckRun {
        name: String,
        status: String,
        conclusion: Option<String>,
    },
    StatusContext {
        context: String,
        state: String,
    },
    #[serde(other)]
    Unrecognized,
}

impl CheckContext {
    fn into_status_check(self) -> StatusCheck {
        match self {
            CheckContext::CheckRun {
                name,
                status,
                conclusion,
            } => StatusCheck::from_check_run(&name, &status, conclusion.as_deref()),
            CheckContext::StatusContext { context, state } => {
                StatusCheck::from_status_context(&context, &state)
            }
            CheckContext::Unrecognized => StatusCheck {
                name: "unknown".to_string(),
                state: CheckState::Pending,
            },
        }
    }
}

impl PullRequestNode {
    pub fn into_pull_request(self, repository: &str) -> PullRequest {
        let files: Vec<String> = self
            .files
            .map(|f| f.nodes.into_iter().map(|n| n.path).collect())
            .unwrap_or_default();
        let files_truncated = self.changed_files > files.len();

        let checks = self
            .commits
            .nodes
            .into_iter()
            .last()
            .and_then(|c| c.commit.status_check_rollup)
            .map(|rollup| {
                rollup
                    .contexts
                    .nodes
                    .into_iter()
                    .map(CheckContext::into_status_check)
                    .collect()
            })
            .unwrap_or_default();

        PullRequest {
            repository: repository.to_string(),
            number: self.number,
            title: self.title,
            url: self.url,
            author: self.author.map(|a| a.login),
            created_at: self.created_at,
            files,
            files_truncated,
            mergeable: Mergeable::from_api(&self.mergeable),
            checks,
        }
    }
}
