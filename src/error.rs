use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the project-tracker (GitLab) client.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The request never produced a response (connection refused, timeout, ...)
    #[error("request failed: {method} {url}: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The tracker answered with anything but 200 OK
    #[error("status code error: {status} for {method} {url}")]
    Status {
        method: String,
        url: String,
        status: StatusCode,
    },

    /// The body could not be decoded into the expected shape
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by the chat client. None of these are fatal to a run.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat service answered with status {0}")]
    Status(StatusCode),

    #[error("failed to decode chat response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service acknowledged the call but reported failure
    #[error("chat service rejected the request: {0}")]
    Rejected(String),

    #[error("not logged in to the chat service")]
    NotLoggedIn,
}

/// Missing or invalid configuration values.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
