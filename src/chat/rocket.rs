use crate::chat::Notifier;
use crate::chat::auth::{self, LoginRequest, LoginResponse, LoginResult, Session};
use crate::chat::message::{self, PostMessageRequest, PostMessageResponse};
use crate::config::ChatConfig;
use crate::error::ChatError;
use serde::de::DeserializeOwned;

/// Rocket.Chat REST v1 endpoints
mod endpoints {
    pub fn login(base: &str) -> String {
        format!("{base}/api/v1/login")
    }

    pub fn post_message(base: &str) -> String {
        format!("{base}/api/v1/chat.postMessage")
    }
}

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const USER_ID_HEADER: &str = "X-User-Id";

pub struct RocketChatClient {
    client: reqwest::Client,
    base_url: String,
    channel: String,
    message_template: String,
    session: Option<Session>,
}

impl RocketChatClient {
    pub fn new(client: reqwest::Client, config: &ChatConfig) -> Self {
        RocketChatClient {
            client,
            base_url: config.base_url.clone(),
            channel: config.channel.clone(),
            message_template: config.message_template.clone(),
            session: None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Logs in and keeps the session for later posts.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<(), ChatError> {
        let response = self
            .client
            .post(endpoints::login(&self.base_url))
            .json(&LoginRequest { user, password })
            .send()
            .await?;

        let login: LoginResponse = read_json(response).await?;
        tracing::info!("Rocket login status: {}", login.status);

        match auth::handle_login_response(&login) {
            LoginResult::Success(session) => {
                self.session = Some(session);
                Ok(())
            }
            LoginResult::Error(reason) => {
                tracing::info!("Rocket login response message: {}", reason);
                Err(ChatError::Rejected(reason))
            }
        }
    }

    /// Posts `text` to `channel` with the current session.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), ChatError> {
        let session = self.session.as_ref().ok_or(ChatError::NotLoggedIn)?;

        let response = self
            .client
            .post(endpoints::post_message(&self.base_url))
            .header(AUTH_TOKEN_HEADER, &session.auth_token)
            .header(USER_ID_HEADER, &session.user_id)
            .json(&PostMessageRequest { channel, text })
            .send()
            .await?;

        let ack: PostMessageResponse = read_json(response).await?;
        tracing::info!("PostMessage response status: {}", ack.success);
        message::handle_post_response(&ack)
    }
}

/// Decodes a chat response body. Rocket.Chat reports most failures as JSON with
/// an error status, so the body is tried first and the status only used when
/// the body is not the expected shape.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ChatError> {
    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str(&body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ChatError::Status(status)),
        Err(err) => Err(ChatError::Decode(err)),
    }
}

impl Notifier for RocketChatClient {
    async fn milestone_closed(&self, title: &str) -> Result<(), ChatError> {
        let text = message::render_message(&self.message_template, title);
        self.post_message(&self.channel, &text).await
    }
}
