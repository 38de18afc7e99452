use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Which scheduled run (or ad hoc request) produced a briefing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BriefingVariant {
    Morning,
    Evening,
    General,
}

impl BriefingVariant {
    /// Read-side preference order: evening over morning over general.
    pub fn preference_rank(self) -> u8 {
        match self {
            BriefingVariant::Evening => 2,
            BriefingVariant::Morning => 1,
            BriefingVariant::General => 0,
        }
    }
}

impl fmt::Display for BriefingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BriefingVariant::Morning => write!(f, "morning"),
            BriefingVariant::Evening => write!(f, "evening"),
            BriefingVariant::General => write!(f, "general"),
        }
    }
}

impl FromStr for BriefingVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(BriefingVariant::Morning),
            "evening" => Ok(BriefingVariant::Evening),
            "general" => Ok(BriefingVariant::General),
            other => Err(format!("Unknown briefing variant: {}", other)),
        }
    }
}

/// One cached briefing for one user on one calendar day.
///
/// At most one record exists per `(user_id, cache_date, variant)`; a newer
/// fetch for the same triple overwrites content and `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefingRecord {
    pub user_id: String,
    pub content: String,
    pub variant: BriefingVariant,
    /// Calendar date in the service reference timezone (UTC), not a timestamp.
    pub cache_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BriefingRecord {
    /// Creates a record dated today (UTC).
    pub fn new<U: Into<String>, C: Into<String>>(
        user_id: U,
        content: C,
        variant: BriefingVariant,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            content: content.into(),
            variant,
            cache_date: now.date_naive(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the record is dated `today`.
    pub fn is_for(&self, today: NaiveDate) -> bool {
        self.cache_date == today
    }
}

/// Picks the record to serve when multiple variants exist for one day:
/// highest variant preference first, most recently updated as tie-break.
pub fn preferred(mut records: Vec<BriefingRecord>) -> Option<BriefingRecord> {
    records.sort_by(|a, b| {
        b.variant
            .preference_rank()
            .cmp(&a.variant.preference_rank())
            .then(b.updated_at.cmp(&a.updated_at))
    });
    records.into_iter().next()
}
