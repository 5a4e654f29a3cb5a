pub mod auth;
pub mod message;
pub mod rocket;

use crate::error::ChatError;

/// Announces closed milestones somewhere people will see them.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn milestone_closed(&self, title: &str) -> Result<(), ChatError>;
}
