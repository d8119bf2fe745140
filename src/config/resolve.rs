use super::types::{
    Config, MergeConfig, MergeMethod, MergeOrder, VisibilityFilter, DEFAULT_ORG,
    DEFAULT_VISIBILITY,
};
use crate::error::ConfigError;

/// Values given on the command line or through the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub org: Option<String>,
    pub visibility: Option<String>,
    pub merge_method: Option<MergeMethod>,
    pub merge_order: Option<MergeOrder>,
    pub no_merge: bool,
}

/// Effective settings for one run.
#[derive(Debug)]
pub struct Settings {
    pub token: String,
    pub org: String,
    pub visibility: VisibilityFilter,
    pub merge: MergeConfig,
    pub max_prs_listed: usize,
}

/// Layers flags and env over the TOML file over built-in defaults.
pub fn resolve(overrides: Overrides, file: Config) -> Result<Settings, ConfigError> {
    let token = overrides
        .token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ConfigError::MissingToken)?;

    let org = overrides
        .org
        .or(file.scan.org)
        .unwrap_or_else(|| DEFAULT_ORG.to_string());

    let visibility_input = overrides
        .visibility
        .or(file.scan.visibility)
        .unwrap_or_else(|| DEFAULT_VISIBILITY.to_string());
    let visibility = VisibilityFilter::parse(&visibility_input)?;

    let mut merge = file.merge;
    if let Some(method) = overrides.merge_method {
        merge.method = method;
    }
    if let Some(order) = overrides.merge_order {
        merge.order = order;
    }
    merge.enabled = merge.enabled && !overrides.no_merge;

    Ok(Settings {
        token,
        org,
        visibility,
        merge,
        max_prs_listed: file.scan.max_prs_listed,
    })
}
