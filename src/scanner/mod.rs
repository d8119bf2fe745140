pub mod age;
pub mod merge_policy;
pub mod pr_scanner;
pub mod report_generator;

pub use age::AgeBucket;
pub use merge_policy::{Eligibility, MergeLedger, MergePolicy, SkipReason};
pub use pr_scanner::{
    resolve_caller_visibility, MergeDecision, PrScanner, ScanReport, ScannerConfig,
};
pub use report_generator::{append_step_summary, OutputFormat, ReportGenerator};
