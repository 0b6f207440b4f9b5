//! Permission resolution for one observed request
//!
//! Order of evaluation: cross-repository gate, route index, ambiguity
//! expansion, pattern fallback.

use std::sync::Arc;

use super::ambiguity::{AmbiguityLookup, AmbiguityResolver};
use super::fallback::PatternFallbackClassifier;
use super::index::{OutcomeKind, RouteIndex, RouteOutcome};
use super::rules::RuleTable;
use super::types::{PermissionRequirement, QueryParams, RepositoryReference, Scope};
use super::visibility::{RepoVisibilityCache, RepoVisibilityChecker};
use crate::core::{MonitorResult, RepositoryIdentity};

/// Split a decoded path into segments
///
/// The leading `/` and at most one trailing `/` are dropped; `/` alone has
/// no segments.
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

/// Classifies observed requests against the repository under test
///
/// Built once at startup; the rule index is immutable and the lookup caches
/// are owned here, so `resolve` can be called concurrently through a shared
/// reference.
pub struct PermissionResolver {
    index: RouteIndex,
    visibility: Arc<RepoVisibilityCache>,
    ambiguity: AmbiguityResolver,
    fallback: PatternFallbackClassifier,
    repository: RepositoryIdentity,
}

impl PermissionResolver {
    pub fn new(
        table: &RuleTable,
        repository: RepositoryIdentity,
        visibility: Arc<dyn RepoVisibilityChecker>,
        ambiguity: Arc<dyn AmbiguityLookup>,
    ) -> MonitorResult<Self> {
        let index = RouteIndex::build(table)?;
        let visibility = Arc::new(RepoVisibilityCache::new(visibility));

        tracing::info!(
            "[Resolver] {} routes indexed for {} (id {})",
            index.len(),
            repository.full_name(),
            repository.id()
        );

        Ok(Self {
            index,
            fallback: PatternFallbackClassifier::new(Arc::clone(&visibility)),
            visibility,
            ambiguity: AmbiguityResolver::new(ambiguity),
            repository,
        })
    }

    /// Resolver over the builtin rule table, with one collaborator answering
    /// both kinds of secondary lookup
    pub fn builtin<L>(repository: RepositoryIdentity, lookups: Arc<L>) -> MonitorResult<Self>
    where
        L: RepoVisibilityChecker + AmbiguityLookup + 'static,
    {
        let table = RuleTable::builtin()?;
        Self::new(&table, repository, lookups.clone(), lookups)
    }

    pub fn repository(&self) -> &RepositoryIdentity {
        &self.repository
    }

    pub fn visibility(&self) -> &RepoVisibilityCache {
        &self.visibility
    }

    /// Requirements for `method` on the decoded `path`
    ///
    /// Never fails: an unrecognised request yields the unknown requirement.
    pub async fn resolve(&self, method: &str, path: &str, query: &QueryParams) -> Vec<PermissionRequirement> {
        let segments = split_path(path);

        let repo = RepositoryReference::from_api_segments(&segments);
        if let Some(repo) = &repo {
            if !self.is_repository_under_test(repo) {
                tracing::debug!("[Resolver] {} {} targets {}, skipping", method, path, repo);
                return Vec::new();
            }
        }

        let requirements = match (self.index.lookup(method, &segments), repo) {
            (Some(outcome), Some(repo)) => self.expand(outcome, &repo, &segments).await,
            (Some(outcome), None) => self.expand_unrooted(outcome),
            (None, _) => self.fallback.classify(method, &segments, query).await,
        };

        if requirements.iter().any(PermissionRequirement::is_unknown) {
            tracing::warn!("[Resolver] No rule for {} {}; the rule table needs an entry", method, path);
        } else {
            tracing::debug!("[Resolver] {} {} -> {:?}", method, path, requirements);
        }
        requirements
    }

    fn is_repository_under_test(&self, repo: &RepositoryReference) -> bool {
        match repo {
            RepositoryReference::OwnerRepo { owner, repo } => {
                self.repository.same_repository_by_owner_repo(owner, repo)
            }
            RepositoryReference::Id(id) => self.repository.same_repository_by_id(id),
        }
    }

    async fn expand(
        &self,
        outcome: RouteOutcome,
        repo: &RepositoryReference,
        segments: &[&str],
    ) -> Vec<PermissionRequirement> {
        match outcome.kind {
            OutcomeKind::Disambiguate { key, position } => match segments.get(position) {
                Some(identifier) => self.ambiguity.resolve(repo, key, identifier, outcome.access).await,
                None => vec![PermissionRequirement::unknown()],
            },
            _ => self.expand_unrooted(outcome),
        }
    }

    /// Outcomes that need no secondary lookup
    fn expand_unrooted(&self, outcome: RouteOutcome) -> Vec<PermissionRequirement> {
        match outcome.kind {
            OutcomeKind::Scope(scope) => vec![PermissionRequirement::new(scope, outcome.access)],
            OutcomeKind::IssuesAndPullRequests => vec![
                PermissionRequirement::new(Scope::Issues, outcome.access),
                PermissionRequirement::new(Scope::PullRequests, outcome.access),
            ],
            // rule tables only place ambiguous rules under a repository root
            OutcomeKind::Disambiguate { .. } => vec![PermissionRequirement::unknown()],
        }
    }
}
