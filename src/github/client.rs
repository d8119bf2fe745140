use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::types::{GraphQlResponse, PullRequest, RepoResponse, Repository, RepositoryData};
use super::PullRequestHost;
use crate::config::{MergeMethod, Visibility};
use crate::error::{HostError, HostResult};

const PAGE_SIZE: u8 = 100;

const OPEN_PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(states: OPEN, first: 50, after: $after, orderBy: {field: CREATED_AT, direction: ASC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        number
        title
        url
        createdAt
        author { login }
        mergeable
        changedFiles
        files(first: 100) { nodes { path } }
        commits(last: 1) {
          nodes {
            commit {
              statusCheckRollup {
                contexts(first: 100) {
                  nodes {
                    __typename
                    ... on CheckRun { name status conclusion }
                    ... on StatusContext { context state }
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Serialize)]
struct ListReposParams {
    #[serde(rename = "type")]
    kind: &'static str,
    per_page: u8,
    page: u32,
}

pub struct GitHubClient {
    client: Octocrab,
}

impl GitHubClient {
    /// `api_url` overrides the API root, for GitHub Enterprise or a local mock server.
    pub fn new(token: String, api_url: Option<&str>) -> HostResult<Self> {
        let mut builder = Octocrab::builder().personal_token(token);
        if let Some(url) = api_url {
            builder = builder.base_uri(url)?;
        }
        let client = builder.build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PullRequestHost for GitHubClient {
    async fn list_repositories(&self, org: &str) -> HostResult<Vec<Repository>> {
        let mut repositories = Vec::new();
        let mut page = 1;

        loop {
            let params = ListReposParams {
                kind: "all",
                per_page: PAGE_SIZE,
                page,
            };
            let batch: Vec<RepoResponse> = self
                .client
                .get(format!("/orgs/{}/repos", org), Some(&params))
                .await?;

            let fetched = batch.len();
            repositories.extend(batch.into_iter().map(RepoResponse::into_repository));

            if fetched < PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        debug!(org, count = repositories.len(), "listed repositories");
        Ok(repositories)
    }

    async fn list_open_pull_requests(&self, repo: &Repository) -> HostResult<Vec<PullRequest>> {
        let mut pull_requests = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let payload = json!({
                "query": OPEN_PULL_REQUESTS_QUERY,
                "variables": {
                    "owner": repo.owner,
                    "name": repo.name,
                    "after": after,
                },
            });
            let response: GraphQlResponse<RepositoryData> = self.client.graphql(&payload).await?;

            if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
                let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
                return Err(HostError::GraphQl(messages.join("; ")));
            }

            let connection = response
                .data
                .and_then(|d| d.repository)
                .map(|r| r.pull_requests)
                .ok_or_else(|| {
                    HostError::GraphQl(format!("repository {} not found", repo.full_name()))
                })?;

            pull_requests.extend(
                connection
                    .nodes
                    .into_iter()
                    .map(|node| node.into_pull_request(&repo.name)),
            );

            match connection.page_info.end_cursor {
                Some(cursor) if connection.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        debug!(repo = %repo.full_name(), count = pull_requests.len(), "listed open pull requests");
        Ok(pull_requests)
    }

    async fn merge_pull_request(
        &self,
        repo: &Repository,
        number: u64,
        method: MergeMethod,
    ) -> HostResult<()> {
        let octocrab_method = match method {
            MergeMethod::Squash => octocrab::params::pulls::MergeMethod::Squash,
            MergeMethod::Merge => octocrab::params::pulls::MergeMethod::Merge,
            MergeMethod::Rebase => octocrab::params::pulls::MergeMethod::Rebase,
        };

        let result = self
            .client
            .pulls(&repo.owner, &repo.name)
            .merge(number)
            .method(octocrab_method)
            .send()
            .await?;

        if !result.merged {
            return Err(HostError::MergeRejected(
                result
                    .message
                    .unwrap_or_else(|| "merge was not performed".to_string()),
            ));
        }

        debug!(repo = %repo.full_name(), pr = number, sha = ?result.sha, "merged");
        Ok(())
    }

    async fn repository_visibility(&self, full_name: &str) -> HostResult<Visibility> {
        let repo: RepoResponse = self
            .client
            .get(format!("/repos/{}", full_name), None::<&()>)
            .await?;
        Ok(repo.visibility())
    }
}
