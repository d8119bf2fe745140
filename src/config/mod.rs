pub mod resolve;
pub mod types;

pub use resolve::{resolve, Overrides, Settings};
pub use types::{
    Config, MergeConfig, MergeMethod, MergeOrder, ScanConfig, Visibility, VisibilityFilter,
    DEFAULT_ORG, DEFAULT_VISIBILITY,
};
