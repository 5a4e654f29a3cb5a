use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::gitlab::Tracker;
use crate::gitlab::issues::Issue;
use crate::gitlab::milestones::Milestone;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// GitLab REST v4 endpoints, relative to the instance base URL
mod endpoints {
    pub fn group_milestones(base: &str, group: u64) -> String {
        format!("{base}/api/v4/groups/{group}/milestones")
    }

    pub fn group_milestone(base: &str, group: u64, milestone: u64) -> String {
        format!("{base}/api/v4/groups/{group}/milestones/{milestone}")
    }

    pub fn milestone_issues(base: &str, group: u64, milestone: u64) -> String {
        format!("{base}/api/v4/groups/{group}/milestones/{milestone}/issues")
    }
}

const PRIVATE_TOKEN_HEADER: &str = "Private-Token";
const NEXT_PAGE_HEADER: &str = "x-next-page";
const PER_PAGE: u32 = 100;

/// Body of the milestone update that triggers the close transition
#[derive(Serialize, Debug, PartialEq)]
pub struct StateEventRequest {
    pub state_event: &'static str,
}

impl StateEventRequest {
    pub const CLOSE: StateEventRequest = StateEventRequest {
        state_event: "close",
    };
}

pub struct GitLabClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    group_id: u64,
}

impl GitLabClient {
    pub fn new(client: reqwest::Client, config: &TrackerConfig) -> Self {
        GitLabClient {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            group_id: config.group_id,
        }
    }

    /// Sends one request with the tracker headers and fails on anything but 200.
    async fn send_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Response, TrackerError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(PRIVATE_TOKEN_HEADER, &self.token)
            .header(CONTENT_TYPE, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| TrackerError::Transport {
                method: method.to_string(),
                url: url.to_string(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(TrackerError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: response.status(),
            });
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        method: &Method,
        url: &str,
    ) -> Result<T, TrackerError> {
        let body = response
            .text()
            .await
            .map_err(|source| TrackerError::Transport {
                method: method.to_string(),
                url: url.to_string(),
                source,
            })?;
        decode(url, &body)
    }

    /// Fetches every page of a list endpoint, following `X-Next-Page`.
    async fn get_all<T: DeserializeOwned>(
        &self,
        url: &str,
        extra_query: &[(&str, String)],
    ) -> Result<Vec<T>, TrackerError> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let mut query = extra_query.to_vec();
            query.push(("per_page", PER_PAGE.to_string()));
            query.push(("page", page.to_string()));

            let response = self
                .send_request::<()>(Method::GET, url, &query, None)
                .await?;
            let next_page = next_page(&response);
            let batch: Vec<T> = Self::read_json(response, &Method::GET, url).await?;
            items.extend(batch);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(items)
    }
}

fn next_page(response: &reqwest::Response) -> Option<u32> {
    response
        .headers()
        .get(NEXT_PAGE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Decodes a tracker response body, keeping the URL for the error message.
pub fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, TrackerError> {
    serde_json::from_str(body).map_err(|source| TrackerError::Decode {
        url: url.to_string(),
        source,
    })
}

impl Tracker for GitLabClient {
    async fn active_milestones(&self) -> Result<Vec<Milestone>, TrackerError> {
        let url = endpoints::group_milestones(&self.base_url, self.group_id);
        let milestones: Vec<Milestone> = self
            .get_all(&url, &[("state", "active".to_string())])
            .await?;
        tracing::info!(
            group = self.group_id,
            count = milestones.len(),
            "active milestones fetched"
        );
        Ok(milestones)
    }

    async fn milestone_issues(&self, milestone_id: u64) -> Result<Vec<Issue>, TrackerError> {
        let url = endpoints::milestone_issues(&self.base_url, self.group_id, milestone_id);
        let issues: Vec<Issue> = self.get_all(&url, &[]).await?;
        tracing::info!(
            milestone = milestone_id,
            "issues in milestone {} - {} items",
            milestone_id,
            issues.len()
        );
        Ok(issues)
    }

    async fn close_milestone(&self, milestone_id: u64) -> Result<Milestone, TrackerError> {
        let url = endpoints::group_milestone(&self.base_url, self.group_id, milestone_id);
        let response = self
            .send_request(Method::PUT, &url, &[], Some(&StateEventRequest::CLOSE))
            .await?;
        Self::read_json(response, &Method::PUT, &url).await
    }
}
