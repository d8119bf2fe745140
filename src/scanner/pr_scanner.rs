use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::age::{age_days, AgeBucket};
use super::merge_policy::{Eligibility, MergeLedger, MergePolicy};
use crate::config::{Visibility, VisibilityFilter};
use crate::error::HostResult;
use crate::github::{PullRequest, PullRequestHost, Repository};

#[derive(Debug)]
pub struct ScannerConfig {
    pub org: String,
    pub visibility: VisibilityFilter,
    pub merge_enabled: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackedPullRequest {
    #[serde(flatten)]
    pub pr: PullRequest,
    pub bucket: AgeBucket,
    pub age_days: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryPullRequests {
    pub repository: Repository,
    pub pull_requests: Vec<TrackedPullRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryError {
    pub repository: String,
    pub message: String,
}

#[derive(Debug)]
pub struct Enumeration {
    pub repositories: Vec<RepositoryPullRequests>,
    pub errors: Vec<RepositoryError>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub new: usize,
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

impl BucketCounts {
    fn add(&mut self, bucket: AgeBucket) {
        match bucket {
            AgeBucket::New => self.new += 1,
            AgeBucket::Green => self.green += 1,
            AgeBucket::Yellow => self.yellow += 1,
            AgeBucket::Red => self.red += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum MergeDecision {
    Merged,
    WouldMerge,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct BotPullRequestOutcome {
    pub repository: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub decision: MergeDecision,
    /// Only workflow-only PRs count towards the summary totals.
    pub in_scope: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub found: usize,
    pub merged: usize,
    pub would_merge: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct MergeRun {
    pub outcomes: Vec<BotPullRequestOutcome>,
    pub summary: MergeSummary,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub org: String,
    pub visibility: String,
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub repositories_scanned: usize,
    pub total_pull_requests: usize,
    pub buckets: BucketCounts,
    /// Repositories with at least one open PR, sorted by name.
    pub repositories: Vec<RepositoryPullRequests>,
    pub errors: Vec<RepositoryError>,
    pub merges: Option<MergeRun>,
}

pub struct PrScanner<H: PullRequestHost> {
    host: H,
    config: ScannerConfig,
    policy: MergePolicy,
}

impl<H: PullRequestHost> PrScanner<H> {
    pub fn new(host: H, config: ScannerConfig, policy: MergePolicy) -> Self {
        Self {
            host,
            config,
            policy,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Report only, never merges.
    pub async fn list(&self, now: DateTime<Utc>) -> HostResult<ScanReport> {
        let enumeration = self.enumerate(now).await?;
        Ok(self.build_report(enumeration, None, now))
    }

    pub async fn scan(&self, now: DateTime<Utc>) -> HostResult<ScanReport> {
        let enumeration = self.enumerate(now).await?;
        let merges = if self.config.merge_enabled {
            Some(self.process_bot_pull_requests(&enumeration).await)
        } else {
            None
        };
        Ok(self.build_report(enumeration, merges, now))
    }

    /// Only a failure to list the organization itself is returned as an error.
    pub async fn enumerate(&self, now: DateTime<Utc>) -> HostResult<Enumeration> {
        let all = self.host.list_repositories(&self.config.org).await?;
        let scanned: Vec<Repository> = all
            .into_iter()
            .filter(|r| !r.archived && self.config.visibility.allows(r.visibility))
            .collect();

        info!(
            org = %self.config.org,
            visibility = %self.config.visibility.describe(),
            count = scanned.len(),
            "Scanning repositories"
        );

        let mut repositories = Vec::new();
        let mut errors = Vec::new();

        for repo in scanned {
            match self.host.list_open_pull_requests(&repo).await {
                Ok(prs) => {
                    let pull_requests = prs
                        .into_iter()
                        .map(|pr| TrackedPullRequest {
                            bucket: AgeBucket::classify(pr.created_at, now),
                            age_days: age_days(pr.created_at, now),
                            pr,
                        })
                        .collect();
                    repositories.push(RepositoryPullRequests {
                        repository: repo,
                        pull_requests,
                    });
                }
                Err(e) => {
                    warn!(repo = %repo.full_name(), error = %e, "Skipping repository, failed to list pull requests");
                    errors.push(RepositoryError {
                        repository: repo.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(Enumeration {
            repositories,
            errors,
        })
    }

    async fn process_bot_pull_requests(&self, enumeration: &Enumeration) -> MergeRun {
        let mut ledger = MergeLedger::new();
        let mut outcomes = Vec::new();

        for entry in &enumeration.repositories {
            let repo = &entry.repository;
            let bot_prs: Vec<&PullRequest> = entry
                .pull_requests
                .iter()
                .map(|t| &t.pr)
                .filter(|pr| self.policy.is_bot_pr(pr))
                .collect();

            for pr in self.policy.order_candidates(bot_prs) {
                let mut in_scope = true;
                let decision = match self.policy.evaluate(pr, &ledger) {
                    Eligibility::Ineligible(reason) => {
                        in_scope = !reason.is_out_of_scope();
                        MergeDecision::Skipped(reason.to_string())
                    }
                    Eligibility::Eligible if self.config.dry_run => {
                        ledger.record_attempt(&pr.repository);
                        MergeDecision::WouldMerge
                    }
                    Eligibility::Eligible => {
                        ledger.record_attempt(&pr.repository);
                        match self
                            .host
                            .merge_pull_request(repo, pr.number, self.policy.method)
                            .await
                        {
                            Ok(()) => MergeDecision::Merged,
                            Err(e) => {
                                ledger.close(&pr.repository);
                                MergeDecision::Failed(e.to_string())
                            }
                        }
                    }
                };

                log_decision(repo, pr, &decision);
                outcomes.push(BotPullRequestOutcome {
                    repository: repo.full_name(),
                    number: pr.number,
                    title: pr.title.clone(),
                    url: pr.url.clone(),
                    decision,
                    in_scope,
                });
            }
        }

        let mut summary = MergeSummary::default();
        for outcome in outcomes.iter().filter(|o| o.in_scope) {
            summary.found += 1;
            match outcome.decision {
                MergeDecision::Merged => summary.merged += 1,
                MergeDecision::WouldMerge => summary.would_merge += 1,
                MergeDecision::Skipped(_) | MergeDecision::Failed(_) => summary.skipped += 1,
            }
        }

        info!(
            found = summary.found,
            merged = summary.merged,
            would_merge = summary.would_merge,
            skipped = summary.skipped,
            "Bot pull request summary"
        );

        MergeRun { outcomes, summary }
    }

    fn build_report(
        &self,
        enumeration: Enumeration,
        merges: Option<MergeRun>,
        now: DateTime<Utc>,
    ) -> ScanReport {
        let repositories_scanned = enumeration.repositories.len() + enumeration.errors.len();

        let mut repositories: Vec<RepositoryPullRequests> = enumeration
            .repositories
            .into_iter()
            .filter(|r| !r.pull_requests.is_empty())
            .collect();
        repositories.sort_by(|a, b| a.repository.name.cmp(&b.repository.name));

        let mut buckets = BucketCounts::default();
        for tracked in repositories.iter().flat_map(|r| &r.pull_requests) {
            buckets.add(tracked.bucket);
        }
        let total_pull_requests = repositories.iter().map(|r| r.pull_requests.len()).sum();

        ScanReport {
            org: self.config.org.clone(),
            visibility: self.config.visibility.describe(),
            generated_at: now,
            dry_run: self.config.dry_run,
            repositories_scanned,
            total_pull_requests,
            buckets,
            repositories,
            errors: enumeration.errors,
            merges,
        }
    }
}

fn log_decision(repo: &Repository, pr: &PullRequest, decision: &MergeDecision) {
    let full_name = repo.full_name();
    match decision {
        MergeDecision::Merged => info!(
            repo = %full_name,
            pr = pr.number,
            "merged PR #{} in repo {}: all checks passed",
            pr.number,
            full_name
        ),
        MergeDecision::WouldMerge => info!(
            repo = %full_name,
            pr = pr.number,
            "would merge PR #{} in repo {}: dry run",
            pr.number,
            full_name
        ),
        MergeDecision::Skipped(reason) => info!(
            repo = %full_name,
            pr = pr.number,
            reason = %reason,
            "skipped PR #{} in repo {}: {}",
            pr.number,
            full_name,
            reason
        ),
        MergeDecision::Failed(reason) => warn!(
            repo = %full_name,
            pr = pr.number,
            reason = %reason,
            "skipped PR #{} in repo {}: merge failed: {}",
            pr.number,
            full_name,
            reason
        ),
    }
}

/// Visibility of the repository running the scan. Anything that cannot be
/// determined is treated as public, which narrows the scan the most.
pub async fn resolve_caller_visibility<H: PullRequestHost>(
    host: &H,
    explicit: Option<&str>,
    caller_repo: Option<&str>,
) -> Visibility {
    if let Some(value) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return value.parse().unwrap_or_else(|_| {
            warn!(value, "Unrecognized repository visibility, assuming public");
            Visibility::Public
        });
    }

    match caller_repo.map(str::trim).filter(|r| !r.is_empty()) {
        Some(repo) => match host.repository_visibility(repo).await {
            Ok(visibility) => visibility,
            Err(e) => {
                warn!(repo, error = %e, "Could not look up repository visibility, assuming public");
                Visibility::Public
            }
        },
        None => {
            info!("Calling repository unknown, assuming public");
            Visibility::Public
        }
    }
}
