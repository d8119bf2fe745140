use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::{MergeConfig, MergeMethod, MergeOrder};
use crate::error::ConfigError;
use crate::github::{CheckState, Mergeable, PullRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoChangedFiles,
    FileListIncomplete,
    OutsideWorkflowDir { dir: String },
    MergeCapReached,
    EarlierMergeFailed,
    NotMergeable(Mergeable),
    CheckFailed(String),
    CheckPending(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoChangedFiles => write!(f, "no changed files"),
            SkipReason::FileListIncomplete => write!(f, "changed file list incomplete"),
            SkipReason::OutsideWorkflowDir { dir } => write!(f, "changes files outside {}", dir),
            SkipReason::MergeCapReached => write!(f, "merge cap reached"),
            SkipReason::EarlierMergeFailed => {
                write!(f, "earlier merge failed in this repository")
            }
            SkipReason::NotMergeable(state) => write!(f, "not mergeable: {}", state),
            SkipReason::CheckFailed(name) => write!(f, "check failed: {}", name),
            SkipReason::CheckPending(name) => write!(f, "check pending: {}", name),
        }
    }
}

impl SkipReason {
    /// The PR touches more than workflow files, or its file list can't be trusted.
    pub fn is_out_of_scope(&self) -> bool {
        matches!(
            self,
            SkipReason::NoChangedFiles
                | SkipReason::FileListIncomplete
                | SkipReason::OutsideWorkflowDir { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(SkipReason),
}

/// Merge attempts made so far in one run, per repository.
#[derive(Debug, Default)]
pub struct MergeLedger {
    attempts: HashMap<String, usize>,
    closed: HashSet<String>,
}

impl MergeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self, repo: &str) -> usize {
        self.attempts.get(repo).copied().unwrap_or(0)
    }

    pub fn record_attempt(&mut self, repo: &str) {
        *self.attempts.entry(repo.to_string()).or_insert(0) += 1;
    }

    /// No further merges are attempted in `repo` for the rest of the run.
    pub fn close(&mut self, repo: &str) {
        self.closed.insert(repo.to_string());
    }

    pub fn is_closed(&self, repo: &str) -> bool {
        self.closed.contains(repo)
    }
}

pub struct MergePolicy {
    bot_author: Regex,
    workflow_dir: String,
    max_merges_per_repo: usize,
    pub method: MergeMethod,
    pub order: MergeOrder,
}

impl MergePolicy {
    pub fn from_config(config: &MergeConfig) -> Result<Self, ConfigError> {
        let bot_author =
            Regex::new(&config.bot_author_pattern).map_err(|source| ConfigError::BotPattern {
                pattern: config.bot_author_pattern.clone(),
                source,
            })?;
        if config.max_merges_per_repo == 0 {
            return Err(ConfigError::ZeroMergeCap);
        }

        let mut workflow_dir = config.workflow_dir.trim_start_matches("./").to_string();
        if !workflow_dir.ends_with('/') {
            workflow_dir.push('/');
        }

        Ok(Self {
            bot_author,
            workflow_dir,
            max_merges_per_repo: config.max_merges_per_repo,
            method: config.method,
            order: config.order,
        })
    }

    pub fn is_bot_pr(&self, pr: &PullRequest) -> bool {
        pr.author
            .as_deref()
            .is_some_and(|login| self.bot_author.is_match(login))
    }

    /// Sorts a repository's bot PRs into the order they compete for its merge budget.
    pub fn order_candidates<'a>(&self, mut prs: Vec<&'a PullRequest>) -> Vec<&'a PullRequest> {
        if self.order == MergeOrder::Oldest {
            prs.sort_by_key(|pr| pr.created_at);
        }
        prs
    }

    /// Scope, then merge budget, then mergeability, then checks. The first
    /// rule that fails is the reason.
    pub fn evaluate(&self, pr: &PullRequest, ledger: &MergeLedger) -> Eligibility {
        if let Err(reason) = self.check_scope(pr) {
            return Eligibility::Ineligible(reason);
        }

        if ledger.is_closed(&pr.repository) {
            return Eligibility::Ineligible(SkipReason::EarlierMergeFailed);
        }
        if ledger.attempts(&pr.repository) >= self.max_merges_per_repo {
            return Eligibility::Ineligible(SkipReason::MergeCapReached);
        }

        if pr.mergeable != Mergeable::Mergeable {
            return Eligibility::Ineligible(SkipReason::NotMergeable(pr.mergeable));
        }

        match pr.check_state() {
            CheckState::Success => Eligibility::Eligible,
            CheckState::Failure => Eligibility::Ineligible(SkipReason::CheckFailed(
                first_check_named(pr, CheckState::Failure),
            )),
            CheckState::Pending => Eligibility::Ineligible(SkipReason::CheckPending(
                first_check_named(pr, CheckState::Pending),
            )),
        }
    }

    fn check_scope(&self, pr: &PullRequest) -> Result<(), SkipReason> {
        if pr.files.is_empty() {
            return Err(SkipReason::NoChangedFiles);
        }
        if pr.files_truncated {
            return Err(SkipReason::FileListIncomplete);
        }
        if !pr.files.iter().all(|path| path.starts_with(&self.workflow_dir)) {
            return Err(SkipReason::OutsideWorkflowDir {
                dir: self.workflow_dir.clone(),
            });
        }
        Ok(())
    }
}

fn first_check_named(pr: &PullRequest, state: CheckState) -> String {
    pr.checks
        .iter()
        .find(|c| c.state == state)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "unknown".to_string())
}
