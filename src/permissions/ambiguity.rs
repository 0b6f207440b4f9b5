//! Issue-or-pull-request disambiguation
//!
//! Every pull request is also an issue, so several issue endpoints accept a
//! pull request number, and a pull request comment is an issue comment. The
//! path alone cannot tell which scope the call needs; a lookup against the
//! hosting API can.

use std::sync::Arc;

use async_trait::async_trait;

use super::cache::LookupCache;
use super::index::DisambiguationKey;
use super::types::{AccessLevel, PermissionRequirement, RepositoryReference, Scope};
use crate::core::LookupResult;

/// Lookups used to tell issues from pull requests
#[async_trait]
pub trait AmbiguityLookup: Send + Sync {
    /// Whether the pull request endpoint answers 200 for `number`
    ///
    /// 404 is `Ok(false)`. Any other status is an error, so the answer is
    /// not memoized and a later call asks again.
    async fn pull_request_exists(&self, repo: &RepositoryReference, number: &str) -> LookupResult<bool>;

    /// `html_url` of an issue comment
    async fn issue_comment_html_url(&self, repo: &RepositoryReference, comment_id: &str) -> LookupResult<String>;

    /// `issue.html_url` of an issue event
    async fn issue_event_html_url(&self, repo: &RepositoryReference, event_id: &str) -> LookupResult<String>;
}

/// Pull request pages live under `/pull/`, issue pages under `/issues/`
fn scope_from_html_url(html_url: &str) -> Scope {
    if html_url.contains("/pull/") {
        Scope::PullRequests
    } else {
        Scope::Issues
    }
}

/// Collapses `issues/pull-requests` outcomes to a single scope
pub struct AmbiguityResolver {
    lookup: Arc<dyn AmbiguityLookup>,
    resolved: LookupCache<Scope>,
}

impl AmbiguityResolver {
    pub fn new(lookup: Arc<dyn AmbiguityLookup>) -> Self {
        Self {
            lookup,
            resolved: LookupCache::new(),
        }
    }

    /// Requirement for an ambiguous endpoint at `access`
    ///
    /// For issue numbers a failed lookup means "not a pull request" for this
    /// call only. For comments and events it yields the unknown requirement.
    /// Only successful lookups are memoized.
    pub async fn resolve(
        &self,
        repo: &RepositoryReference,
        key: DisambiguationKey,
        identifier: &str,
        access: AccessLevel,
    ) -> Vec<PermissionRequirement> {
        let cache_key = format!("{}#{}#{}", repo.cache_key(), key, identifier);
        let result = self
            .resolved
            .get_or_fetch(&cache_key, || self.classify(repo, key, identifier))
            .await;

        match result {
            Ok(scope) => {
                tracing::debug!("[Ambiguity] {} {} in {} is {}", key, identifier, repo, scope);
                vec![PermissionRequirement::new(scope, access)]
            }
            Err(err) if key == DisambiguationKey::IssueNumber => {
                tracing::debug!(
                    "[Ambiguity] Pull request lookup for #{} in {} failed ({}), treating as issue",
                    identifier,
                    repo,
                    err
                );
                vec![PermissionRequirement::new(Scope::Issues, access)]
            }
            Err(err) => {
                tracing::warn!("[Ambiguity] Could not resolve {} {} in {}: {}", key, identifier, repo, err);
                vec![PermissionRequirement::unknown()]
            }
        }
    }

    async fn classify(&self, repo: &RepositoryReference, key: DisambiguationKey, identifier: &str) -> LookupResult<Scope> {
        match key {
            DisambiguationKey::IssueNumber => {
                let is_pull = self.lookup.pull_request_exists(repo, identifier).await?;
                Ok(if is_pull { Scope::PullRequests } else { Scope::Issues })
            }
            DisambiguationKey::CommentId => self
                .lookup
                .issue_comment_html_url(repo, identifier)
                .await
                .map(|url| scope_from_html_url(&url)),
            DisambiguationKey::EventId => self
                .lookup
                .issue_event_html_url(repo, identifier)
                .await
                .map(|url| scope_from_html_url(&url)),
        }
    }
}
