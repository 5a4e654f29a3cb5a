use crate::config::{ConfigKey, FailurePolicy};
use clap::Parser;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Closes due GitLab milestones whose issues are all closed and announces them
/// in a Rocket.Chat channel.
#[derive(Parser, Debug, Default, PartialEq)]
#[command(name = "milestone-closer", version, long_about = None)]
pub struct Args {
    /// JSON config file; flags and environment variables take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// GitLab URL
    #[arg(long = "gitlaburl", env = "GITLAB_URL")]
    pub gitlab_url: Option<String>,

    /// GitLab Private Token
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitLab Group ID
    #[arg(long, env = "GITLAB_GROUP")]
    pub group: Option<u64>,

    /// RocketChat URL
    #[arg(long = "rocketurl", env = "ROCKET_URL")]
    pub rocket_url: Option<String>,

    /// RocketChat User
    #[arg(long, env = "ROCKET_USER")]
    pub user: Option<String>,

    /// RocketChat Password
    #[arg(long, env = "ROCKET_PASS", hide_env_values = true)]
    pub pass: Option<String>,

    /// RocketChat channel to post
    #[arg(long, env = "ROCKET_CHANNEL")]
    pub channel: Option<String>,

    /// RocketChat message that will be sent to the channel; `%s` is replaced by the milestone title
    #[arg(long, env = "ROCKET_MSG")]
    pub msg: Option<String>,

    /// Number of milestones checked at the same time
    #[arg(long)]
    pub workers: Option<usize>,

    /// What to do when checking or closing one milestone fails
    #[arg(long, value_enum)]
    pub on_error: Option<FailurePolicy>,

    /// Timeout in seconds for every HTTP request
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Emit log lines as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Parse command line arguments (including program name)
pub fn parse_args(args: &[String]) -> Result<Args, clap::Error> {
    Args::try_parse_from(args)
}

impl Args {
    /// Values given on the command line or through the environment, keyed like the config file.
    pub fn config_values(&self) -> HashMap<ConfigKey, Value> {
        let policy = self.on_error.map(|policy| match policy {
            FailurePolicy::Abort => "abort",
            FailurePolicy::Skip => "skip",
        });

        [
            (ConfigKey::GitlabUrl, self.gitlab_url.clone().map(Value::from)),
            (ConfigKey::Token, self.token.clone().map(Value::from)),
            (ConfigKey::Group, self.group.map(Value::from)),
            (ConfigKey::RocketUrl, self.rocket_url.clone().map(Value::from)),
            (ConfigKey::User, self.user.clone().map(Value::from)),
            (ConfigKey::Pass, self.pass.clone().map(Value::from)),
            (ConfigKey::Channel, self.channel.clone().map(Value::from)),
            (ConfigKey::Msg, self.msg.clone().map(Value::from)),
            (ConfigKey::Workers, self.workers.map(Value::from)),
            (ConfigKey::OnError, policy.map(Value::from)),
            (ConfigKey::TimeoutSecs, self.timeout_secs.map(Value::from)),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect()
    }
}
