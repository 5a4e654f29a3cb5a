use crate::error::ChatError;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/chat.postMessage`
#[derive(Serialize, Debug, PartialEq)]
pub struct PostMessageRequest<'a> {
    pub channel: &'a str,
    pub text: &'a str,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct PostMessageResponse {
    pub success: bool,
    pub error: Option<String>,
}

/// Substitutes `title` for the first `%s` in `template`, printf style: `%%` is a
/// literal `%`, later `%s` are kept as written.
pub fn render_message(template: &str, title: &str) -> String {
    let mut rendered = String::with_capacity(template.len() + title.len());
    let mut substituted = false;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            rendered.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                chars.next();
                rendered.push('%');
            }
            Some('s') if !substituted => {
                chars.next();
                rendered.push_str(title);
                substituted = true;
            }
            _ => rendered.push('%'),
        }
    }

    rendered
}

/// True when `template` has a `%s` that is not part of an escaped `%%`.
pub fn has_title_placeholder(template: &str) -> bool {
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('s') => return true,
                Some(_) => {}
                None => return false,
            }
        }
    }
    false
}

/// Maps the post acknowledgement onto success or a rejection.
pub fn handle_post_response(response: &PostMessageResponse) -> Result<(), ChatError> {
    if response.success {
        Ok(())
    } else {
        Err(ChatError::Rejected(
            response
                .error
                .clone()
                .unwrap_or_else(|| "success = false".to_string()),
        ))
    }
}
