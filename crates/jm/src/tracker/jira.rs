//! Jira REST (v2) implementation of `IssueTracker`.

use crate::config::JiraSettings;
use crate::domain::{IssueTypeStatuses, Transition, WorklogEntry};
use crate::tracker::{IssueTracker, TrackerError};
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use ureq::http::Response;
use ureq::{Agent, Body};

const API_PREFIX: &str = "/rest/api/2/";

#[derive(Deserialize)]
struct TransitionsPage {
    #[serde(default)]
    transitions: Vec<Transition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    issues: Vec<Value>,
    #[serde(default)]
    total: usize,
}

/// Blocking Jira client. Holds the HTTP agent and credentials; keeps no
/// cache of anything the tracker returns.
pub struct JiraClient {
    agent: Agent,
    base_url: String,
    authorization: String,
    page_size: usize,
}

impl JiraClient {
    /// Build a client from the `[jira]` settings.
    ///
    /// Uses HTTP Basic authentication when a user is configured, otherwise
    /// sends the token as a bearer token (personal access tokens).
    pub fn new(settings: &JiraSettings) -> Result<Self, TrackerError> {
        let url = settings
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(TrackerError::MissingSetting("jira.url"))?;
        let token = settings
            .token
            .as_deref()
            .ok_or(TrackerError::MissingSetting("jira.token"))?;

        let authorization = match settings.user.as_deref() {
            Some(user) => format!("Basic {}", STANDARD.encode(format!("{}:{}", user, token))),
            None => format!("Bearer {}", token),
        };

        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build();

        Ok(Self {
            agent: Agent::new_with_config(config),
            base_url: url.trim_end_matches('/').to_string(),
            authorization,
            page_size: settings.page_size.max(1),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn get(&self, path: &str) -> Result<Value, TrackerError> {
        let url = self.endpoint(path);
        debug!("GET {}", url);
        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("User-Agent", user_agent())
            .call()
            .map_err(|source| TrackerError::Transport {
                method: "GET",
                path: path.to_string(),
                source,
            })?;
        read_json("GET", path, response)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, TrackerError> {
        let url = self.endpoint(path);
        debug!("POST {} {}", url, body);
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("User-Agent", user_agent())
            .send(body.to_string())
            .map_err(|source| TrackerError::Transport {
                method: "POST",
                path: path.to_string(),
                source,
            })?;
        read_json("POST", path, response)
    }

    fn search_page(
        &self,
        jql: &str,
        fields: &[&str],
        start_at: usize,
        max_results: usize,
    ) -> Result<SearchPage, TrackerError> {
        let data = self.post(
            "search",
            &json!({
                "jql": jql,
                "fields": fields,
                "startAt": start_at,
                "maxResults": max_results,
            }),
        )?;
        decode("search", data)
    }
}

fn user_agent() -> String {
    format!("jm/{}", env!("CARGO_PKG_VERSION"))
}

/// Turn a response into JSON, keeping non-success bodies verbatim.
/// Empty bodies (204 No Content) become `null`.
fn read_json(
    method: &'static str,
    path: &str,
    mut response: Response<Body>,
) -> Result<Value, TrackerError> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|source| TrackerError::Transport {
            method,
            path: path.to_string(),
            source,
        })?;

    if status >= 400 {
        return Err(TrackerError::Status {
            method,
            path: path.to_string(),
            status,
            body,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|source| TrackerError::Decode {
        path: path.to_string(),
        source,
    })
}

fn decode<T: serde::de::DeserializeOwned>(path: &str, data: Value) -> Result<T, TrackerError> {
    serde_json::from_value(data).map_err(|source| TrackerError::Decode {
        path: path.to_string(),
        source,
    })
}

impl IssueTracker for JiraClient {
    fn transitions_for(&self, key: &str) -> Result<Vec<Transition>> {
        debug!("Fetching transitions for {}", key);
        let path = format!("issue/{}/transitions", key);
        let page: TransitionsPage = decode(&path, self.get(&path)?)?;
        Ok(page.transitions)
    }

    fn transition(&self, key: &str, transition_id: &str) -> Result<()> {
        debug!("Transitioning key {} to {}", key, transition_id);
        self.post(
            &format!("issue/{}/transitions", key),
            &json!({ "transition": { "id": transition_id } }),
        )?;
        Ok(())
    }

    fn issue(&self, key: &str, fields: &[&str]) -> Result<Value> {
        let path = if fields.is_empty() {
            format!("issue/{}", key)
        } else {
            format!("issue/{}?fields={}", key, fields.join(","))
        };
        Ok(self.get(&path)?)
    }

    fn search(&self, jql: &str, fields: &[&str]) -> Result<Vec<Value>> {
        debug!("Search: {}", jql);
        let mut issues = Vec::new();
        loop {
            let page = self.search_page(jql, fields, issues.len(), self.page_size)?;
            let fetched = page.issues.len();
            issues.extend(page.issues);
            if fetched == 0 || issues.len() >= page.total {
                break;
            }
        }
        Ok(issues)
    }

    fn first_issue(&self, jql: &str, fields: &[&str]) -> Result<Option<Value>> {
        debug!("Search (first): {}", jql);
        let page = self.search_page(jql, fields, 0, 1)?;
        Ok(page.issues.into_iter().next())
    }

    fn log_work(&self, key: &str, entry: &WorklogEntry) -> Result<()> {
        debug!(
            "Logging {}s of work on {} to {}",
            entry.time_spent_seconds,
            entry.started.as_deref().unwrap_or("now"),
            key
        );
        let body = serde_json::to_value(entry)?;
        self.post(&format!("issue/{}/worklog", key), &body)?;
        Ok(())
    }

    fn statuses_for(&self, project: &str) -> Result<Vec<IssueTypeStatuses>> {
        debug!("Fetching statuses for {}", project);
        let path = format!("project/{}/statuses", project);
        Ok(decode(&path, self.get(&path)?)?)
    }
}
