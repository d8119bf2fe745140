use std::path::PathBuf;
use thiserror::Error;

/// Setup failures. Any of these aborts the run before the first API call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GitHub token is missing or empty (pass --token or set GITHUB_TOKEN)")]
    MissingToken,

    #[error("invalid visibility value(s): {0} (expected public, private, internal or all)")]
    InvalidVisibility(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid bot author pattern `{pattern}`: {source}")]
    BotPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("max_merges_per_repo must be at least 1")]
    ZeroMergeCap,
}

/// Failures talking to the code host. Always contained to one repository or PR
/// except when listing the organization itself.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("merge rejected: {0}")]
    MergeRejected(String),

    #[error("request failed: {0}")]
    Request(String),
}

pub type HostResult<T> = std::result::Result<T, HostError>;
