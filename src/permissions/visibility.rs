//! Public/private status of repositories
//!
//! Reading a public repository needs no token scope, so several fallback
//! families drop their read requirement when the target is public. A failed
//! check counts as private so a requirement is never under-reported.

use std::sync::Arc;

use async_trait::async_trait;

use super::cache::LookupCache;
use super::types::RepositoryReference;
use crate::core::LookupResult;

/// Source of truth for repository visibility
#[async_trait]
pub trait RepoVisibilityChecker: Send + Sync {
    /// Whether the repository is private
    async fn is_private(&self, repo: &RepositoryReference) -> LookupResult<bool>;
}

/// Memoized visibility, kept for the lifetime of the process
pub struct RepoVisibilityCache {
    checker: Arc<dyn RepoVisibilityChecker>,
    entries: LookupCache<bool>,
}

impl RepoVisibilityCache {
    pub fn new(checker: Arc<dyn RepoVisibilityChecker>) -> Self {
        Self {
            checker,
            entries: LookupCache::new(),
        }
    }

    /// Whether `repo` is public; `false` when the check fails
    pub async fn is_public(&self, repo: &RepositoryReference) -> bool {
        let result = self
            .entries
            .get_or_fetch(&repo.cache_key(), || async {
                self.checker.is_private(repo).await.map(|private| !private)
            })
            .await;

        match result {
            Ok(public) => {
                tracing::debug!("[Visibility] {} is {}", repo, if public { "public" } else { "private" });
                public
            }
            Err(err) => {
                tracing::warn!("[Visibility] Could not check {} ({}), assuming private", repo, err);
                false
            }
        }
    }

    /// Cached status without a lookup
    pub async fn cached(&self, repo: &RepositoryReference) -> Option<bool> {
        self.entries.get(&repo.cache_key()).await
    }
}
