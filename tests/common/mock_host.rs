//! Mock code host for scanner tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use org_pr_scanner::config::{MergeMethod, Visibility};
use org_pr_scanner::error::{HostError, HostResult};
use org_pr_scanner::github::{
    CheckState, Mergeable, PullRequest, PullRequestHost, Repository, StatusCheck,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Call record for `merge_pull_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCall {
    pub repo: String,
    pub number: u64,
    pub method: MergeMethod,
}

/// Hand-written host with canned responses, call tracking and error injection.
#[derive(Default)]
pub struct MockHost {
    repositories: Vec<Repository>,
    pull_requests: HashMap<String, Vec<PullRequest>>,
    visibilities: HashMap<String, Visibility>,
    // Error injection
    error_on_list_repos: Option<String>,
    error_on_list_prs: HashSet<String>,
    error_on_merge: HashSet<(String, u64)>,
    // Call tracking
    list_pr_calls: Mutex<Vec<String>>,
    merge_calls: Mutex<Vec<MergeCall>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, name: &str, visibility: Visibility) -> Self {
        self.repositories.push(repo(name, visibility));
        self
    }

    pub fn with_archived_repo(mut self, name: &str) -> Self {
        let mut archived = repo(name, Visibility::Public);
        archived.archived = true;
        self.repositories.push(archived);
        self
    }

    pub fn with_prs(mut self, repo: &str, prs: Vec<PullRequest>) -> Self {
        self.pull_requests.insert(repo.to_string(), prs);
        self
    }

    pub fn with_visibility(mut self, full_name: &str, visibility: Visibility) -> Self {
        self.visibilities.insert(full_name.to_string(), visibility);
        self
    }

    pub fn fail_list_repos(mut self, msg: &str) -> Self {
        self.error_on_list_repos = Some(msg.to_string());
        self
    }

    pub fn fail_list_prs(mut self, repo: &str) -> Self {
        self.error_on_list_prs.insert(repo.to_string());
        self
    }

    pub fn fail_merge(mut self, repo: &str, number: u64) -> Self {
        self.error_on_merge.insert((repo.to_string(), number));
        self
    }

    pub fn list_pr_calls(&self) -> Vec<String> {
        self.list_pr_calls.lock().unwrap().clone()
    }

    pub fn merge_calls(&self) -> Vec<MergeCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    pub fn merged_numbers(&self, repo: &str) -> Vec<u64> {
        self.merge_calls()
            .into_iter()
            .filter(|c| c.repo == repo)
            .map(|c| c.number)
            .collect()
    }
}

#[async_trait]
impl PullRequestHost for MockHost {
    async fn list_repositories(&self, _org: &str) -> HostResult<Vec<Repository>> {
        if let Some(msg) = &self.error_on_list_repos {
            return Err(HostError::Request(msg.clone()));
        }
        Ok(self.repositories.clone())
    }

    async fn list_open_pull_requests(&self, repo: &Repository) -> HostResult<Vec<PullRequest>> {
        self.list_pr_calls.lock().unwrap().push(repo.name.clone());
        if self.error_on_list_prs.contains(&repo.name) {
            return Err(HostError::Request("network error".to_string()));
        }
        Ok(self.pull_requests.get(&repo.name).cloned().unwrap_or_default())
    }

    async fn merge_pull_request(
        &self,
        repo: &Repository,
        number: u64,
        method: MergeMethod,
    ) -> HostResult<()> {
        self.merge_calls.lock().unwrap().push(MergeCall {
            repo: repo.name.clone(),
            number,
            method,
        });
        if self.error_on_merge.contains(&(repo.name.clone(), number)) {
            return Err(HostError::MergeRejected(
                "Base branch was modified. Review and try the merge again.".to_string(),
            ));
        }
        Ok(())
    }

    async fn repository_visibility(&self, full_name: &str) -> HostResult<Visibility> {
        self.visibilities
            .get(full_name)
            .copied()
            .ok_or_else(|| HostError::Request(format!("{} not found", full_name)))
    }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

pub fn repo(name: &str, visibility: Visibility) -> Repository {
    Repository {
        owner: "acme".to_string(),
        name: name.to_string(),
        html_url: format!("https://github.com/acme/{}", name),
        archived: false,
        visibility,
    }
}

/// A Dependabot workflow bump that passes every merge rule.
pub fn bot_pr(repo: &str, number: u64, age_days: i64) -> PullRequest {
    PullRequest {
        repository: repo.to_string(),
        number,
        title: format!("Bump actions/checkout in {} (#{})", repo, number),
        url: format!("https://github.com/acme/{}/pull/{}", repo, number),
        author: Some("dependabot".to_string()),
        created_at: now() - Duration::days(age_days),
        files: vec![".github/workflows/ci.yml".to_string()],
        files_truncated: false,
        mergeable: Mergeable::Mergeable,
        checks: vec![StatusCheck {
            name: "Tests".to_string(),
            state: CheckState::Success,
        }],
    }
}

pub fn human_pr(repo: &str, number: u64, age_days: i64) -> PullRequest {
    PullRequest {
        author: Some("octocat".to_string()),
        title: format!("Fix widget alignment (#{})", number),
        files: vec!["src/widget.rs".to_string()],
        ..bot_pr(repo, number, age_days)
    }
}

pub fn with_check(mut pr: PullRequest, name: &str, state: CheckState) -> PullRequest {
    pr.checks.push(StatusCheck {
        name: name.to_string(),
        state,
    });
    pr
}
