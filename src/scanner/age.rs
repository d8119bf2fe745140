use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Staleness phase of an open pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBucket {
    New,
    Green,
    Yellow,
    Red,
}

impl AgeBucket {
    /// Under one whole day is new. Exactly 7 days is still green and
    /// exactly 30 days still yellow.
    pub fn from_age(age: Duration) -> Self {
        if age < Duration::days(1) {
            AgeBucket::New
        } else if age <= Duration::days(7) {
            AgeBucket::Green
        } else if age <= Duration::days(30) {
            AgeBucket::Yellow
        } else {
            AgeBucket::Red
        }
    }

    pub fn classify(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::from_age(now - created_at)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AgeBucket::New => "🆕",
            AgeBucket::Green => "🟢",
            AgeBucket::Yellow => "🟡",
            AgeBucket::Red => "🔴",
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeBucket::New => write!(f, "New"),
            AgeBucket::Green => write!(f, "≤7d"),
            AgeBucket::Yellow => write!(f, "≤30d"),
            AgeBucket::Red => write!(f, ">30d"),
        }
    }
}

/// Whole days since creation, clamped at zero for timestamps from the future.
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0)
}

/// `NEW` for new pull requests, otherwise the age in whole days.
pub fn age_label(bucket: AgeBucket, days: i64) -> String {
    match bucket {
        AgeBucket::New => "NEW".to_string(),
        _ => format!("{} days", days),
    }
}
