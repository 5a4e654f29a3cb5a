use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/login`
#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub user: &'a str,
    pub password: &'a str,
}

/// Response from the login endpoint, on success and on failure
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginResponse {
    pub status: String,
    pub message: Option<String>,
    pub error: Option<String>,
    pub data: Option<LoginData>,
}

#[derive(Deserialize, Debug)]
pub struct LoginData {
    #[serde(rename = "authToken")]
    pub auth_token: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Credentials attached to every authenticated chat request
#[derive(Clone, PartialEq)]
pub struct Session {
    pub auth_token: String,
    pub user_id: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("auth_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, PartialEq)]
pub enum LoginResult {
    Success(Session),
    Error(String),
}

/// Turns a login response into a session, or the reason there is none.
pub fn handle_login_response(response: &LoginResponse) -> LoginResult {
    match (response.status.as_str(), &response.data) {
        ("success", Some(data)) => LoginResult::Success(Session {
            auth_token: data.auth_token.clone(),
            user_id: data.user_id.clone(),
        }),
        ("success", None) => {
            LoginResult::Error("Login succeeded but no session was returned".to_string())
        }
        _ => {
            let reason = response
                .message
                .clone()
                .or_else(|| response.error.clone())
                .unwrap_or_else(|| format!("unexpected login status {:?}", response.status));
            LoginResult::Error(reason)
        }
    }
}
