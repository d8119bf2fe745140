pub mod client;
pub mod types;

pub use client::GitHubClient;
pub use types::{CheckState, Mergeable, PullRequest, Repository, StatusCheck};

use async_trait::async_trait;

use crate::config::{MergeMethod, Visibility};
use crate::error::HostResult;

/// Operations the scanner needs from the code host.
///
/// Implemented by [`GitHubClient`] against the real API and by hand-written
/// mocks in the integration tests.
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// All repositories of an organization, archived ones included.
    async fn list_repositories(&self, org: &str) -> HostResult<Vec<Repository>>;

    /// Open pull requests of one repository in creation order.
    async fn list_open_pull_requests(&self, repo: &Repository) -> HostResult<Vec<PullRequest>>;

    async fn merge_pull_request(
        &self,
        repo: &Repository,
        number: u64,
        method: MergeMethod,
    ) -> HostResult<()>;

    /// Visibility of a repository given as `owner/name`.
    async fn repository_visibility(&self, full_name: &str) -> HostResult<Visibility>;
}
