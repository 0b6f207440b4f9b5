//! Deterministic stand-in for the hosting API

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::ambiguity::AmbiguityLookup;
use super::types::RepositoryReference;
use super::visibility::RepoVisibilityChecker;
use crate::core::{LookupError, LookupResult};

fn key(repo: &str, identifier: &str) -> String {
    format!("{}#{}", repo.to_lowercase(), identifier)
}

/// Repositories, pull requests, comments and events known to the fake.
/// Anything not registered answers like a 404.
#[derive(Default)]
pub struct FakeGithub {
    visibility: HashMap<String, LookupResult<bool>>,
    pulls: HashSet<String>,
    pull_errors: HashMap<String, LookupError>,
    comments: HashMap<String, String>,
    events: HashMap<String, String>,
    visibility_calls: AtomicUsize,
    ambiguity_calls: AtomicUsize,
}

impl FakeGithub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_public_repo(mut self, repo: &str) -> Self {
        self.visibility.insert(repo.to_lowercase(), Ok(false));
        self
    }

    pub fn with_private_repo(mut self, repo: &str) -> Self {
        self.visibility.insert(repo.to_lowercase(), Ok(true));
        self
    }

    pub fn with_visibility_error(mut self, repo: &str, err: LookupError) -> Self {
        self.visibility.insert(repo.to_lowercase(), Err(err));
        self
    }

    pub fn with_pull_request(mut self, repo: &str, number: &str) -> Self {
        self.pulls.insert(key(repo, number));
        self
    }

    pub fn with_pull_request_error(mut self, repo: &str, number: &str, err: LookupError) -> Self {
        self.pull_errors.insert(key(repo, number), err);
        self
    }

    pub fn with_comment(mut self, repo: &str, comment_id: &str, html_url: &str) -> Self {
        self.comments.insert(key(repo, comment_id), html_url.to_string());
        self
    }

    pub fn with_event(mut self, repo: &str, event_id: &str, issue_html_url: &str) -> Self {
        self.events.insert(key(repo, event_id), issue_html_url.to_string());
        self
    }

    pub fn visibility_calls(&self) -> usize {
        self.visibility_calls.load(Ordering::SeqCst)
    }

    pub fn ambiguity_calls(&self) -> usize {
        self.ambiguity_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoVisibilityChecker for FakeGithub {
    async fn is_private(&self, repo: &RepositoryReference) -> LookupResult<bool> {
        self.visibility_calls.fetch_add(1, Ordering::SeqCst);
        self.visibility
            .get(&repo.cache_key())
            .cloned()
            .unwrap_or(Err(LookupError::Status(404)))
    }
}

#[async_trait]
impl AmbiguityLookup for FakeGithub {
    async fn pull_request_exists(&self, repo: &RepositoryReference, number: &str) -> LookupResult<bool> {
        self.ambiguity_calls.fetch_add(1, Ordering::SeqCst);
        let key = key(&repo.cache_key(), number);
        if let Some(err) = self.pull_errors.get(&key) {
            return Err(err.clone());
        }
        Ok(self.pulls.contains(&key))
    }

    async fn issue_comment_html_url(&self, repo: &RepositoryReference, comment_id: &str) -> LookupResult<String> {
        self.ambiguity_calls.fetch_add(1, Ordering::SeqCst);
        self.comments
            .get(&key(&repo.cache_key(), comment_id))
            .cloned()
            .ok_or(LookupError::Status(404))
    }

    async fn issue_event_html_url(&self, repo: &RepositoryReference, event_id: &str) -> LookupResult<String> {
        self.ambiguity_calls.fetch_add(1, Ordering::SeqCst);
        self.events
            .get(&key(&repo.cache_key(), event_id))
            .cloned()
            .ok_or(LookupError::Status(404))
    }
}
