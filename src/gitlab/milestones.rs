use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Format of `due_date` / `start_date` in tracker responses.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Milestone as returned by `/groups/:id/milestones`.
///
/// Every field falls back to its zero value when the tracker leaves it out.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Milestone {
    pub id: u64,
    pub iid: u64,
    pub group_id: u64,
    pub title: String,
    pub description: Option<String>,
    pub state: MilestoneState,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub due_date: Option<String>,
    pub start_date: Option<String>,
    pub web_url: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String")]
pub enum MilestoneState {
    Active,
    Closed,
    Other(String),
}

impl Default for MilestoneState {
    fn default() -> Self {
        MilestoneState::Other(String::new())
    }
}

impl From<String> for MilestoneState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => MilestoneState::Active,
            "closed" => MilestoneState::Closed,
            _ => MilestoneState::Other(value),
        }
    }
}

impl std::fmt::Display for MilestoneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MilestoneState::Active => f.write_str("active"),
            MilestoneState::Closed => f.write_str("closed"),
            MilestoneState::Other(state) => f.write_str(state),
        }
    }
}

/// Parses a `YYYY-MM-DD` date. Missing or malformed input yields `NaiveDate::MIN`,
/// which is earlier than any real date.
pub fn parse_due_date(raw: Option<&str>) -> NaiveDate {
    raw.and_then(|value| NaiveDate::parse_from_str(value, DATE_FORMAT).ok())
        .unwrap_or(NaiveDate::MIN)
}

impl Milestone {
    pub fn due_date(&self) -> NaiveDate {
        parse_due_date(self.due_date.as_deref())
    }

    /// True once `today` has reached the due date.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        today >= self.due_date()
    }

    pub fn is_closed(&self) -> bool {
        self.state == MilestoneState::Closed
    }
}
