pub mod client;
pub mod issues;
pub mod milestones;

use crate::error::TrackerError;
use issues::Issue;
use milestones::Milestone;

/// Read/write access to the milestones of one group on the project tracker.
#[allow(async_fn_in_trait)]
pub trait Tracker {
    /// Every milestone of the group whose state is `active`
    async fn active_milestones(&self) -> Result<Vec<Milestone>, TrackerError>;
    /// Every issue assigned to the milestone, possibly none
    async fn milestone_issues(&self, milestone_id: u64) -> Result<Vec<Issue>, TrackerError>;
    /// Requests the close transition and returns the milestone as echoed back
    async fn close_milestone(&self, milestone_id: u64) -> Result<Milestone, TrackerError>;
}
