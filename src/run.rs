use crate::chat::Notifier;
use crate::chat::rocket::RocketChatClient;
use crate::config::{Config, FailurePolicy};
use crate::error::TrackerError;
use crate::gitlab::Tracker;
use crate::gitlab::client::GitLabClient;
use crate::gitlab::issues::closed_percentage;
use crate::gitlab::milestones::Milestone;
use crate::output;
use anyhow::Context;
use chrono::NaiveDate;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};

/// What happened to one milestone during a run
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Due date not reached; no requests were made for it
    NotDue,
    /// No issues assigned, so it is never closed
    NoIssues,
    /// Percentage of closed issues, below 100
    Incomplete(u32),
    Closed { notified: bool },
    /// The close request was answered with this state instead of `closed`
    CloseRejected(String),
    /// Tracker error, only recorded under `FailurePolicy::Skip`
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneReport {
    pub id: u64,
    pub title: String,
    pub outcome: Outcome,
}

#[derive(Debug, Default, PartialEq)]
pub struct RunReport {
    pub milestones: Vec<MilestoneReport>,
}

impl RunReport {
    pub fn closed(&self) -> impl Iterator<Item = &MilestoneReport> {
        self.milestones
            .iter()
            .filter(|m| matches!(m.outcome, Outcome::Closed { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &MilestoneReport> {
        self.milestones
            .iter()
            .filter(|m| matches!(m.outcome, Outcome::Failed(_)))
    }
}

/// One full pass: log in to chat, then check and close every due milestone.
pub async fn run(
    config: &Config,
    today: NaiveDate,
    mut stdout_additional: Option<&mut dyn std::io::Write>,
) -> anyhow::Result<RunReport> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .context("Failed to create HTTP client")?;

    let mut chat = RocketChatClient::new(client.clone(), &config.chat);
    if let Err(err) = chat.login(&config.chat.user, &config.chat.password).await {
        tracing::warn!("Rocket login failed: {err}");
    }

    let tracker = GitLabClient::new(client, &config.tracker);
    let report = close_finished_milestones(
        &tracker,
        &chat,
        today,
        config.workers,
        config.failure_policy,
    )
    .await?;

    print_summary(&report, &mut stdout_additional)?;
    Ok(report)
}

/// Lists active milestones and closes the due ones whose issues are all closed.
///
/// At most `workers` milestones are in flight; outcomes are recorded in list
/// order. Failing to list milestones is always an error. A failure on a single
/// milestone either ends the run or is recorded, depending on `policy`. Under
/// `Abort`, milestones already in flight are finished (and announced) before the
/// error is returned; no new ones are started.
pub async fn close_finished_milestones<T: Tracker, N: Notifier>(
    tracker: &T,
    notifier: &N,
    today: NaiveDate,
    workers: usize,
    policy: FailurePolicy,
) -> anyhow::Result<RunReport> {
    let milestones = tracker
        .active_milestones()
        .await
        .context("Failed to list active milestones")?;

    // Set on the first error under `Abort`: milestones not yet started are
    // skipped, those already in flight run to completion.
    let aborted = AtomicBool::new(false);
    let aborted = &aborted;

    let results = futures::stream::iter(milestones)
        .map(move |milestone| async move {
            if aborted.load(Ordering::SeqCst) {
                return (milestone, None);
            }
            let outcome = check_milestone(tracker, notifier, &milestone, today).await;
            (milestone, Some(outcome))
        })
        .buffered(workers.max(1));
    let mut results = std::pin::pin!(results);

    let mut report = RunReport::default();
    let mut abort_error = None;
    while let Some((milestone, outcome)) = results.next().await {
        let Some(outcome) = outcome else {
            continue;
        };
        let outcome = match (outcome, policy) {
            (Ok(outcome), _) => outcome,
            (Err(err), FailurePolicy::Abort) => {
                aborted.store(true, Ordering::SeqCst);
                if abort_error.is_none() {
                    abort_error = Some(anyhow::Error::new(err).context(format!(
                        "Failed to process milestone {} ({})",
                        milestone.id, milestone.title
                    )));
                }
                continue;
            }
            (Err(err), FailurePolicy::Skip) => {
                tracing::error!(
                    milestone = milestone.id,
                    "skipping milestone {}: {err}",
                    milestone.title
                );
                Outcome::Failed(err.to_string())
            }
        };
        report.milestones.push(MilestoneReport {
            id: milestone.id,
            title: milestone.title,
            outcome,
        });
    }

    if let Some(err) = abort_error {
        for milestone in report.closed() {
            tracing::warn!(
                milestone = milestone.id,
                "closed {} before the run was aborted",
                milestone.title
            );
        }
        return Err(err);
    }

    Ok(report)
}

async fn check_milestone<T: Tracker, N: Notifier>(
    tracker: &T,
    notifier: &N,
    milestone: &Milestone,
    today: NaiveDate,
) -> Result<Outcome, TrackerError> {
    if !milestone.is_due(today) {
        tracing::debug!(
            milestone = milestone.id,
            "not due before {}",
            milestone.due_date.as_deref().unwrap_or_default()
        );
        return Ok(Outcome::NotDue);
    }

    tracing::info!(
        milestone = milestone.id,
        "Work with milestone from {} to {}",
        milestone.start_date.as_deref().unwrap_or_default(),
        milestone.due_date.as_deref().unwrap_or_default()
    );

    let issues = tracker.milestone_issues(milestone.id).await?;
    let Some(percent) = closed_percentage(&issues) else {
        return Ok(Outcome::NoIssues);
    };
    tracing::info!(milestone = milestone.id, "{percent}% closed");

    if percent < 100 {
        return Ok(Outcome::Incomplete(percent));
    }

    close_and_notify(tracker, notifier, milestone.id).await
}

/// The close is authoritative: a failed notification is logged, never undone.
async fn close_and_notify<T: Tracker, N: Notifier>(
    tracker: &T,
    notifier: &N,
    milestone_id: u64,
) -> Result<Outcome, TrackerError> {
    let closed = tracker.close_milestone(milestone_id).await?;

    if !closed.is_closed() {
        tracing::warn!(
            milestone = milestone_id,
            "close request answered with state {:?}",
            closed.state.to_string()
        );
        return Ok(Outcome::CloseRejected(closed.state.to_string()));
    }

    tracing::info!(milestone = milestone_id, "Close milestone: {}", closed.title);

    let notified = match notifier.milestone_closed(&closed.title).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(milestone = milestone_id, "Sending message to Rocket.Chat error: {err}");
            false
        }
    };

    Ok(Outcome::Closed { notified })
}

fn print_summary(
    report: &RunReport,
    stdout_additional: &mut Option<&mut dyn std::io::Write>,
) -> std::io::Result<()> {
    for milestone in report.closed() {
        output::println(
            &format!("Closed milestone: {}", milestone.title),
            stdout_additional,
        )?;
    }
    for milestone in report.failed() {
        output::println(
            &format!("Failed milestone: {}", milestone.title),
            stdout_additional,
        )?;
    }
    output::println(
        &format!("{} milestone(s) closed", report.closed().count()),
        stdout_additional,
    )
}
