use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Issue {
    pub id: u64,
    pub iid: u64,
    pub project_id: u64,
    pub title: String,
    pub state: IssueState,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<ClosedBy>,
    pub labels: Vec<String>,
    pub user_notes_count: u64,
    pub merge_requests_count: u64,
    pub upvotes: u64,
    pub downvotes: u64,
    pub web_url: String,
    pub time_stats: TimeStats,
}

/// Issue state as reported by the tracker. Only the exact string `closed` counts
/// as closed; anything unrecognised is kept verbatim.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String")]
pub enum IssueState {
    Opened,
    Closed,
    Other(String),
}

impl Default for IssueState {
    fn default() -> Self {
        IssueState::Other(String::new())
    }
}

impl From<String> for IssueState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "opened" => IssueState::Opened,
            "closed" => IssueState::Closed,
            _ => IssueState::Other(value),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TimeStats {
    pub time_estimate: i64,
    pub total_time_spent: i64,
    pub human_time_estimate: Option<String>,
    pub human_total_time_spent: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ClosedBy {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub state: String,
    pub avatar_url: Option<String>,
    pub web_url: String,
}

impl Issue {
    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }
}

/// Share of closed issues as a whole percentage, truncated toward zero.
///
/// Returns `None` for an empty slice: there is no meaningful percentage and
/// treating it as 0 or 100 would both be wrong.
pub fn closed_percentage(issues: &[Issue]) -> Option<u32> {
    if issues.is_empty() {
        return None;
    }

    let closed = issues.iter().filter(|issue| issue.is_closed()).count();
    let percent = (closed as f32 / issues.len() as f32) * 100.0;

    Some(percent as u32)
}
