use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_ORG: &str = "ultralytics";
pub const DEFAULT_VISIBILITY: &str = "public";
pub const DEFAULT_BOT_AUTHOR_PATTERN: &str = r"^(app/)?dependabot(\[bot\])?$";
pub const DEFAULT_WORKFLOW_DIR: &str = ".github/workflows/";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub merge: MergeConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub org: Option<String>,
    pub visibility: Option<String>,
    pub max_prs_listed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub enabled: bool,
    pub bot_author_pattern: String,
    pub workflow_dir: String,
    pub max_merges_per_repo: usize,
    pub method: MergeMethod,
    pub order: MergeOrder,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            org: None,
            visibility: None,
            max_prs_listed: 30,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            enabled: true,
            bot_author_pattern: DEFAULT_BOT_AUTHOR_PATTERN.to_string(),
            workflow_dir: DEFAULT_WORKFLOW_DIR.to_string(),
            max_merges_per_repo: 1,
            method: MergeMethod::Squash,
            order: MergeOrder::Listed,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    Squash,
    Merge,
    Rebase,
}

impl FromStr for MergeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "squash" => Ok(MergeMethod::Squash),
            "merge" => Ok(MergeMethod::Merge),
            "rebase" => Ok(MergeMethod::Rebase),
            _ => Err(format!("Unknown merge method: {}", s)),
        }
    }
}

/// Order in which a repository's bot PRs compete for its merge budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeOrder {
    /// Order returned by the API (creation order).
    Listed,
    Oldest,
}

impl FromStr for MergeOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "listed" | "api" => Ok(MergeOrder::Listed),
            "oldest" => Ok(MergeOrder::Oldest),
            _ => Err(format!("Unknown merge order: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Internal,
}

impl Visibility {
    pub const ALL: [Visibility; 3] = [Visibility::Public, Visibility::Private, Visibility::Internal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Internal => "internal",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "internal" => Ok(Visibility::Internal),
            _ => Err(format!("Unknown visibility: {}", s)),
        }
    }
}

/// Set of repository visibilities a scan is allowed to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityFilter {
    allowed: BTreeSet<Visibility>,
    all: bool,
}

impl VisibilityFilter {
    pub fn public_only() -> Self {
        VisibilityFilter {
            allowed: BTreeSet::from([Visibility::Public]),
            all: false,
        }
    }

    /// Parses `public`, `private`, `internal`, `all` or a comma-separated mix.
    /// An empty input falls back to public.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let tokens: Vec<String> = input
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let invalid: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| *t != "all" && t.parse::<Visibility>().is_err())
            .collect();
        if !invalid.is_empty() {
            return Err(ConfigError::InvalidVisibility(invalid.join(", ")));
        }

        if tokens.is_empty() {
            warn!("No visibility values given, defaulting to 'public'");
            return Ok(Self::public_only());
        }

        if tokens.iter().any(|t| t == "all") {
            return Ok(VisibilityFilter {
                allowed: Visibility::ALL.into_iter().collect(),
                all: true,
            });
        }

        let allowed = tokens
            .iter()
            .filter_map(|t| t.parse::<Visibility>().ok())
            .collect();
        Ok(VisibilityFilter { allowed, all: false })
    }

    /// A public repository may only ever scan public repositories, whatever was requested.
    pub fn narrow_for_caller(self, caller: Visibility) -> Self {
        if caller == Visibility::Public && self != Self::public_only() {
            warn!(
                requested = %self.describe(),
                "Public repository cannot scan non-public repositories, restricting to public only"
            );
            return Self::public_only();
        }
        self
    }

    pub fn allows(&self, visibility: Visibility) -> bool {
        self.allowed.contains(&visibility)
    }

    pub fn describe(&self) -> String {
        if self.all {
            return "all".to_string();
        }
        let mut names: Vec<&str> = self.allowed.iter().map(Visibility::as_str).collect();
        names.sort_unstable();
        names.join(", ")
    }
}
