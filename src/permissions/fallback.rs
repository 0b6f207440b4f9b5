//! Shape-based classification for paths the rule table does not cover
//!
//! Repository endpoints are grouped by the segment that follows the
//! repository root (`/repos/{owner}/{repo}/<family>/...` or
//! `/repositories/{id}/<family>/...`); `GET` needs `read`, anything else
//! `write`. Git smart-HTTP endpoints on the web host are handled here too.

use std::sync::Arc;

use super::types::{
    first_query_value, AccessLevel, PermissionRequirement, QueryParams, RepositoryReference, Scope,
};
use super::visibility::RepoVisibilityCache;

const UPLOAD_PACK: &str = "git-upload-pack";
const RECEIVE_PACK: &str = "git-receive-pack";

/// Scope of a repository endpoint family, and whether reads of a public
/// repository are exempt
fn repository_family(resource: &str) -> Option<(Scope, bool)> {
    let family = match resource {
        "actions" | "environments" => (Scope::Actions, true),
        "check-runs" | "check-suites" => (Scope::Checks, false),
        "releases" | "git" | "commits" => (Scope::Contents, true),
        "deployments" => (Scope::Deployments, false),
        "pages" => (Scope::Pages, false),
        "pulls" => (Scope::PullRequests, false),
        "projects" => (Scope::RepositoryProjects, false),
        "code-scanning" => (Scope::SecurityEvents, false),
        "statuses" => (Scope::Statuses, false),
        _ => return None,
    };
    Some(family)
}

/// Repository addressed by a git smart-HTTP path (`/{owner}/{repo}[.git]/...`)
fn git_repository(owner: &str, repo: &str) -> RepositoryReference {
    RepositoryReference::owner_repo(owner, repo.strip_suffix(".git").unwrap_or(repo))
}

pub struct PatternFallbackClassifier {
    visibility: Arc<RepoVisibilityCache>,
}

impl PatternFallbackClassifier {
    pub fn new(visibility: Arc<RepoVisibilityCache>) -> Self {
        Self { visibility }
    }

    /// Classify by path shape; the unknown requirement when nothing applies
    pub async fn classify(&self, method: &str, segments: &[&str], query: &QueryParams) -> Vec<PermissionRequirement> {
        let access = AccessLevel::for_method(method);
        let is_read = access == AccessLevel::Read;

        if let Some(repo) = RepositoryReference::from_api_segments(segments) {
            let root_len = repo.root_len();
            if segments.len() == root_len {
                // the repository itself is readable with an empty permission set
                if is_read {
                    return Vec::new();
                }
            } else if let Some((scope, public_read_exempt)) = repository_family(segments[root_len]) {
                if public_read_exempt && is_read && self.visibility.is_public(&repo).await {
                    return Vec::new();
                }
                return vec![PermissionRequirement::new(scope, access)];
            }
        }

        match segments {
            ["orgs" | "users", _, "packages", ..] | ["user", "packages", ..] => {
                vec![PermissionRequirement::new(Scope::Packages, access)]
            }
            ["projects", ..] => vec![PermissionRequirement::new(Scope::RepositoryProjects, access)],
            ["users", _] if is_read => Vec::new(),
            [owner, repo, "info", "refs", ..] => match first_query_value(query, "service") {
                Some(UPLOAD_PACK) => self.upload_pack(&git_repository(owner, repo)).await,
                Some(RECEIVE_PACK) => vec![PermissionRequirement::new(Scope::Contents, AccessLevel::Write)],
                _ => vec![PermissionRequirement::unknown()],
            },
            [owner, repo, UPLOAD_PACK, ..] => self.upload_pack(&git_repository(owner, repo)).await,
            [_, _, RECEIVE_PACK, ..] => vec![PermissionRequirement::new(Scope::Contents, AccessLevel::Write)],
            _ => vec![PermissionRequirement::unknown()],
        }
    }

    /// Fetching from a public repository needs no scope
    async fn upload_pack(&self, repo: &RepositoryReference) -> Vec<PermissionRequirement> {
        if self.visibility.is_public(repo).await {
            Vec::new()
        } else {
            vec![PermissionRequirement::new(Scope::Contents, AccessLevel::Read)]
        }
    }
}
