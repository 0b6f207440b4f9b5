//! HTTP client for secondary lookups
//!
//! Answers the visibility and issue-or-pull-request questions the resolver
//! cannot settle from the path alone, using the monitored workflow's own
//! credential.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::core::{LookupError, LookupResult, MonitorConfig, MonitorResult};
use crate::permissions::{AmbiguityLookup, RepoVisibilityChecker, RepositoryReference};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

// ============================================================================
// Endpoint paths
// ============================================================================

/// `repos/{owner}/{repo}` or `repositories/{id}`
pub fn repository_path(repo: &RepositoryReference) -> String {
    match repo {
        RepositoryReference::OwnerRepo { owner, repo } => {
            format!("repos/{}/{}", urlencoding::encode(owner), urlencoding::encode(repo))
        }
        RepositoryReference::Id(id) => format!("repositories/{}", urlencoding::encode(id)),
    }
}

pub fn pull_request_path(repo: &RepositoryReference, number: &str) -> String {
    format!("{}/pulls/{}", repository_path(repo), urlencoding::encode(number))
}

pub fn issue_comment_path(repo: &RepositoryReference, comment_id: &str) -> String {
    format!("{}/issues/comments/{}", repository_path(repo), urlencoding::encode(comment_id))
}

pub fn issue_event_path(repo: &RepositoryReference, event_id: &str) -> String {
    format!("{}/issues/events/{}", repository_path(repo), urlencoding::encode(event_id))
}

// ============================================================================
// Response bodies (only the fields we read)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RepositoryBody {
    private: bool,
}

#[derive(Debug, Deserialize)]
struct IssueCommentBody {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct IssueEventBody {
    issue: IssueBody,
}

#[derive(Debug, Deserialize)]
struct IssueBody {
    html_url: String,
}

// ============================================================================
// Client
// ============================================================================

pub struct GithubClient {
    client: Client,
    api_url: String,
    token: String,
}

impl GithubClient {
    pub fn new(api_url: &str, token: impl Into<String>, timeout: Duration) -> MonitorResult<Self> {
        let client = Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &MonitorConfig) -> MonitorResult<Self> {
        Self::new(&config.api_url, config.token.clone(), config.lookup_timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    /// Status of a `GET` to `path`
    async fn status(&self, path: &str) -> LookupResult<StatusCode> {
        let url = self.url(path);
        tracing::debug!("[GitHub] GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", ACCEPT)
            .send()
            .await?;

        tracing::debug!("[GitHub] {} -> {}", url, response.status());
        Ok(response.status())
    }

    /// Decoded body of a `GET` to `path`; any status but 200 is an error
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> LookupResult<T> {
        let url = self.url(path);
        tracing::debug!("[GitHub] GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!("[GitHub] {} -> {}", url, status);
            return Err(LookupError::Status(status.as_u16()));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RepoVisibilityChecker for GithubClient {
    async fn is_private(&self, repo: &RepositoryReference) -> LookupResult<bool> {
        let body: RepositoryBody = self.get_json(&repository_path(repo)).await?;
        Ok(body.private)
    }
}

#[async_trait]
impl AmbiguityLookup for GithubClient {
    async fn pull_request_exists(&self, repo: &RepositoryReference, number: &str) -> LookupResult<bool> {
        match self.status(&pull_request_path(repo, number)).await? {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(LookupError::Status(other.as_u16())),
        }
    }

    async fn issue_comment_html_url(&self, repo: &RepositoryReference, comment_id: &str) -> LookupResult<String> {
        let body: IssueCommentBody = self.get_json(&issue_comment_path(repo, comment_id)).await?;
        Ok(body.html_url)
    }

    async fn issue_event_html_url(&self, repo: &RepositoryReference, event_id: &str) -> LookupResult<String> {
        let body: IssueEventBody = self.get_json(&issue_event_path(repo, event_id)).await?;
        Ok(body.issue.html_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{AccessLevel, AmbiguityResolver, DisambiguationKey, PermissionRequirement, Scope};
    use std::sync::Arc;

    fn widget() -> RepositoryReference {
        RepositoryReference::owner_repo("acme", "widget")
    }

    fn client(server: &mockito::Server) -> GithubClient {
        GithubClient::new(&server.url(), "ghs_token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_paths_have_the_same_shape_in_both_forms() {
        let by_name = widget();
        let by_id = RepositoryReference::id("42");

        assert_eq!(repository_path(&by_name), "repos/acme/widget");
        assert_eq!(repository_path(&by_id), "repositories/42");

        assert_eq!(pull_request_path(&by_name, "7"), "repos/acme/widget/pulls/7");
        assert_eq!(pull_request_path(&by_id, "7"), "repositories/42/pulls/7");

        assert_eq!(issue_comment_path(&by_id, "9"), "repositories/42/issues/comments/9");
        assert_eq!(issue_event_path(&by_id, "3"), "repositories/42/issues/events/3");

        for (a, b) in [
            (pull_request_path(&by_name, "7"), pull_request_path(&by_id, "7")),
            (issue_comment_path(&by_name, "9"), issue_comment_path(&by_id, "9")),
            (issue_event_path(&by_name, "3"), issue_event_path(&by_id, "3")),
        ] {
            let tail_a: Vec<_> = a.split('/').skip(3).collect();
            let tail_b: Vec<_> = b.split('/').skip(2).collect();
            assert_eq!(tail_a, tail_b);
        }
    }

    #[tokio::test]
    async fn test_repository_visibility() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/widget")
            .match_header("authorization", "Bearer ghs_token")
            .match_header("accept", ACCEPT)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 42, "full_name": "acme/widget", "private": true}"#)
            .create_async()
            .await;

        assert_eq!(client(&server).is_private(&widget()).await, Ok(true));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_visibility_by_id_and_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repositories/42")
            .with_status(200)
            .with_body(r#"{"private": false}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repositories/43")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/repositories/44")
            .with_status(200)
            .with_body(r#"{"message": "odd"}"#)
            .create_async()
            .await;

        let client = client(&server);
        assert_eq!(client.is_private(&RepositoryReference::id("42")).await, Ok(false));
        assert_eq!(
            client.is_private(&RepositoryReference::id("43")).await,
            Err(LookupError::Status(404))
        );
        assert!(matches!(
            client.is_private(&RepositoryReference::id("44")).await,
            Err(LookupError::UnexpectedShape(_))
        ));
    }

    #[tokio::test]
    async fn test_pull_request_exists() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repositories/42/pulls/7")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/repositories/42/pulls/8")
            .with_status(404)
            .create_async()
            .await;

        server
            .mock("GET", "/repositories/42/pulls/9")
            .with_status(502)
            .create_async()
            .await;

        let client = client(&server);
        let repo = RepositoryReference::id("42");
        assert_eq!(client.pull_request_exists(&repo, "7").await, Ok(true));
        assert_eq!(client.pull_request_exists(&repo, "8").await, Ok(false));
        assert_eq!(client.pull_request_exists(&repo, "9").await, Err(LookupError::Status(502)));
    }

    #[tokio::test]
    async fn test_server_error_on_pull_lookup_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/repos/acme/widget/pulls/7")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let resolver = AmbiguityResolver::new(Arc::new(client(&server)));
        let first = resolver
            .resolve(&widget(), DisambiguationKey::IssueNumber, "7", AccessLevel::Write)
            .await;
        assert_eq!(first, vec![PermissionRequirement::new(Scope::Issues, AccessLevel::Write)]);
        failing.assert_async().await;
        failing.remove_async().await;

        let recovered = server
            .mock("GET", "/repos/acme/widget/pulls/7")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let second = resolver
            .resolve(&widget(), DisambiguationKey::IssueNumber, "7", AccessLevel::Write)
            .await;
        assert_eq!(second, vec![PermissionRequirement::new(Scope::PullRequests, AccessLevel::Write)]);
        recovered.assert_async().await;
    }

    #[tokio::test]
    async fn test_comment_and_event_urls() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/widget/issues/comments/900")
            .with_status(200)
            .with_body(r#"{"id": 900, "html_url": "https://github.com/acme/widget/pull/3#issuecomment-900"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/acme/widget/issues/events/77")
            .with_status(200)
            .with_body(r#"{"id": 77, "event": "closed", "issue": {"html_url": "https://github.com/acme/widget/issues/12"}}"#)
            .create_async()
            .await;

        let client = client(&server);
        assert_eq!(
            client.issue_comment_html_url(&widget(), "900").await.unwrap(),
            "https://github.com/acme/widget/pull/3#issuecomment-900"
        );
        assert_eq!(
            client.issue_event_html_url(&widget(), "77").await.unwrap(),
            "https://github.com/acme/widget/issues/12"
        );
    }

    #[tokio::test]
    async fn test_unreachable_api_is_a_transport_error() {
        let client = GithubClient::new("http://127.0.0.1:1", "t", Duration::from_secs(2)).unwrap();
        let result = client.is_private(&widget()).await;
        assert!(matches!(result, Err(LookupError::Transport(_)) | Err(LookupError::Timeout)));
    }
}
