use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::core::error::SyncError;
use crate::core::models::rates::DerivedRates;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Project identifiers probed, in order, when the list endpoint yields
/// nothing. A successful overview response confirms the project exists.
const DISCOVERY_PROBES: &[&str] = &["default"];

/// Session progression. `update_pricing` requires `Ready`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    Ready { project: String },
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct ProjectDescriptor {
    name: Option<String>,
    id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Authenticated session against a Coroot instance.
///
/// The auth token arrives as a cookie on login; the cookie jar replays it
/// on every subsequent call. One session per run, never persisted.
pub struct CorootClient {
    http: reqwest::Client,
    base_url: String,
    state: SessionState,
}

impl CorootClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            state: SessionState::Anonymous,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticate. Non-success is fatal: no retry, no re-prompt.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), SyncError> {
        let response = self
            .http
            .post(self.url("/api/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|err| SyncError::Authentication(anyhow!(err).context("request failed")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Authentication(anyhow!(
                "HTTP {} POST /api/login: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Determine the project that receives the pricing update.
    ///
    /// An explicit name from configuration wins outright. Otherwise the
    /// discovery strategies run in order, each returning an optional
    /// project; the first hit is authoritative.
    pub async fn resolve_project(&mut self, explicit: Option<&str>) -> Result<String, SyncError> {
        if self.state == SessionState::Anonymous {
            return Err(SyncError::AssertionFailure(
                "resolve_project called before login".to_string(),
            ));
        }

        if let Some(name) = explicit {
            self.state = SessionState::Ready {
                project: name.to_string(),
            };
            return Ok(name.to_string());
        }

        let mut discovered = self.discover_from_list().await;
        if discovered.is_none() {
            discovered = self.discover_by_probe().await;
        }

        match discovered {
            Some(project) => {
                self.state = SessionState::Ready {
                    project: project.clone(),
                };
                Ok(project)
            }
            None => Err(SyncError::ProjectDiscovery),
        }
    }

    // Strategy 1: the dedicated list endpoint. The first entry's name is
    // used by convention, falling back to its id.
    async fn discover_from_list(&self) -> Option<String> {
        let response = self.http.get(self.url("/api/projects")).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let projects: Vec<ProjectDescriptor> = response.json().await.ok()?;
        let first = projects.into_iter().next()?;
        Some(
            non_empty(first.name)
                .or_else(|| non_empty(first.id))
                .unwrap_or_else(|| "default".to_string()),
        )
    }

    // Strategy 2: probe well-known project identifiers via their overview
    // endpoint; any non-error response confirms the project exists.
    async fn discover_by_probe(&self) -> Option<String> {
        for candidate in DISCOVERY_PROBES {
            let url = self.url(&format!("/api/project/{}/overview", candidate));
            if let Ok(response) = self.http.get(url).send().await {
                if response.status().is_success() {
                    return Some(candidate.to_string());
                }
            }
        }
        None
    }

    /// Post the derived rates to the resolved project. A single atomic
    /// request; applying the same rates twice leaves Coroot unchanged.
    pub async fn update_pricing(&self, rates: &DerivedRates) -> Result<(), SyncError> {
        let project = match &self.state {
            SessionState::Ready { project } => project,
            _ => {
                return Err(SyncError::AssertionFailure(
                    "update_pricing called before project resolution".to_string(),
                ))
            }
        };

        let endpoint = format!("/api/project/{}/custom_cloud_pricing", project);
        let response = self
            .http
            .post(self.url(&endpoint))
            .json(rates)
            .send()
            .await
            .map_err(|err| SyncError::UpdateRejected {
                status: 0,
                body: format!("request failed: {err}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::UpdateRejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rates() -> DerivedRates {
        DerivedRates {
            per_cpu_core: 0.04296875,
            per_memory_gb: 0.0048828125,
        }
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "coroot_session=tok123; Path=/"),
            )
            .mount(server)
            .await;
    }

    async fn logged_in(server: &MockServer) -> CorootClient {
        mount_login(server).await;
        let mut client = CorootClient::new(&server.uri());
        client.login("admin@example.com", "hunter2").await.unwrap();
        client
    }

    #[tokio::test]
    async fn login_success_transitions_to_authenticated() {
        let server = MockServer::start().await;
        let client = logged_in(&server).await;
        assert_eq!(*client.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn login_failure_is_fatal_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let mut client = CorootClient::new(&server.uri());
        let err = client.login("admin@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, SyncError::Authentication(_)));
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid credentials"));
        assert_eq!(*client.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn session_cookie_is_replayed_on_update() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;
        client.resolve_project(Some("prod")).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/api/project/prod/custom_cloud_pricing"))
            .and(header("cookie", "coroot_session=tok123"))
            .and(body_json(serde_json::json!({
                "per_cpu_core": 0.04296875,
                "per_memory_gb": 0.0048828125
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client.update_pricing(&rates()).await.unwrap();
    }

    #[tokio::test]
    async fn explicit_project_skips_discovery() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let project = client.resolve_project(Some("staging")).await.unwrap();
        assert_eq!(project, "staging");
        assert_eq!(
            *client.state(),
            SessionState::Ready {
                project: "staging".to_string()
            }
        );
    }

    #[tokio::test]
    async fn discovery_uses_first_listed_project_name() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "p1", "name": "alpha" },
                { "id": "p2", "name": "beta" }
            ])))
            .mount(&server)
            .await;

        let project = client.resolve_project(None).await.unwrap();
        assert_eq!(project, "alpha");
    }

    #[tokio::test]
    async fn discovery_falls_back_to_project_id_without_name() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "id": "p1" }])),
            )
            .mount(&server)
            .await;

        let project = client.resolve_project(None).await.unwrap();
        assert_eq!(project, "p1");
    }

    #[tokio::test]
    async fn discovery_treats_empty_name_as_absent() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "p1", "name": "" }
            ])))
            .mount(&server)
            .await;

        let project = client.resolve_project(None).await.unwrap();
        assert_eq!(project, "p1");
    }

    #[tokio::test]
    async fn discovery_empty_list_probes_default_overview() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/project/default/overview"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let project = client.resolve_project(None).await.unwrap();
        assert_eq!(project, "default");
    }

    #[tokio::test]
    async fn discovery_list_failure_probes_default_overview() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/project/default/overview"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let project = client.resolve_project(None).await.unwrap();
        assert_eq!(project, "default");
    }

    #[tokio::test]
    async fn discovery_exhausted_is_fatal() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/project/default/overview"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client.resolve_project(None).await.unwrap_err();
        assert!(matches!(err, SyncError::ProjectDiscovery));
    }

    #[tokio::test]
    async fn update_rejection_carries_status_and_body() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;
        client.resolve_project(Some("prod")).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/api/project/prod/custom_cloud_pricing"))
            .respond_with(ResponseTemplate::new(422).set_body_string("rates out of range"))
            .mount(&server)
            .await;

        let err = client.update_pricing(&rates()).await.unwrap_err();
        match err {
            SyncError::UpdateRejected { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "rates out of range");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn identical_updates_post_identical_bodies() {
        let server = MockServer::start().await;
        let mut client = logged_in(&server).await;
        client.resolve_project(Some("prod")).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/api/project/prod/custom_cloud_pricing"))
            .and(body_json(serde_json::json!({
                "per_cpu_core": 0.04296875,
                "per_memory_gb": 0.0048828125
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        client.update_pricing(&rates()).await.unwrap();
        client.update_pricing(&rates()).await.unwrap();
    }

    #[tokio::test]
    async fn resolve_before_login_is_internal_error() {
        let server = MockServer::start().await;
        let mut client = CorootClient::new(&server.uri());
        let err = client.resolve_project(None).await.unwrap_err();
        assert!(matches!(err, SyncError::AssertionFailure(_)));
    }

    #[tokio::test]
    async fn update_before_resolution_is_internal_error() {
        let server = MockServer::start().await;
        let client = CorootClient::new(&server.uri());
        let err = client.update_pricing(&rates()).await.unwrap_err();
        assert!(matches!(err, SyncError::AssertionFailure(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = CorootClient::new("https://coroot.example.com/");
        assert_eq!(client.url("/api/login"), "https://coroot.example.com/api/login");
    }
}
