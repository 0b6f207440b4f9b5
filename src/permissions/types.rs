//! Vocabulary of the classification engine
//!
//! Scopes and access levels as understood by the hosting API's token model,
//! the requirement pair emitted per request, and repository references.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Parsed query string: key -> all values in order of appearance
pub type QueryParams = HashMap<String, Vec<String>>;

/// First value of a query parameter, if any
pub fn first_query_value<'a>(query: &'a QueryParams, key: &str) -> Option<&'a str> {
    query
        .get(key)
        .and_then(|values| values.first())
        .map(String::as_str)
}

/// Named permission category of a workflow token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Actions,
    Checks,
    Contents,
    Deployments,
    IdToken,
    Issues,
    Packages,
    Pages,
    PullRequests,
    RepositoryProjects,
    SecurityEvents,
    Statuses,
    /// No rule or heuristic applies; the rule table needs a new entry
    Unknown,
}

impl Scope {
    /// Name as written in a workflow `permissions:` block
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Actions => "actions",
            Scope::Checks => "checks",
            Scope::Contents => "contents",
            Scope::Deployments => "deployments",
            Scope::IdToken => "id-token",
            Scope::Issues => "issues",
            Scope::Packages => "packages",
            Scope::Pages => "pages",
            Scope::PullRequests => "pull-requests",
            Scope::RepositoryProjects => "repository-projects",
            Scope::SecurityEvents => "security-events",
            Scope::Statuses => "statuses",
            Scope::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scope = match s {
            "actions" => Scope::Actions,
            "checks" => Scope::Checks,
            "contents" => Scope::Contents,
            "deployments" => Scope::Deployments,
            "id-token" => Scope::IdToken,
            "issues" => Scope::Issues,
            "packages" => Scope::Packages,
            "pages" => Scope::Pages,
            "pull-requests" => Scope::PullRequests,
            "repository-projects" => Scope::RepositoryProjects,
            "security-events" => Scope::SecurityEvents,
            "statuses" => Scope::Statuses,
            "unknown" => Scope::Unknown,
            other => return Err(format!("unknown scope `{}`", other)),
        };
        Ok(scope)
    }
}

/// Access level qualifying a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessLevel {
    Read,
    Write,
    Unknown,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Unknown => "unknown",
        }
    }

    /// `read` for GET, `write` for every other method
    pub fn for_method(method: &str) -> Self {
        if method.eq_ignore_ascii_case("GET") {
            AccessLevel::Read
        } else {
            AccessLevel::Write
        }
    }

    /// The level that grants both `self` and `other`
    pub fn strongest(self, other: AccessLevel) -> AccessLevel {
        match (self, other) {
            (AccessLevel::Write, _) | (_, AccessLevel::Write) => AccessLevel::Write,
            (AccessLevel::Read, _) | (_, AccessLevel::Read) => AccessLevel::Read,
            _ => AccessLevel::Unknown,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(AccessLevel::Read),
            "write" => Ok(AccessLevel::Write),
            "unknown" => Ok(AccessLevel::Unknown),
            other => Err(format!("unknown access level `{}`", other)),
        }
    }
}

/// One `(scope, access-level)` pair required by an observed request
///
/// Serializes as a single-entry object, e.g. `{"contents": "read"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermissionRequirement {
    pub scope: Scope,
    pub access: AccessLevel,
}

impl PermissionRequirement {
    pub fn new(scope: Scope, access: AccessLevel) -> Self {
        Self { scope, access }
    }

    /// The classification-gap sentinel
    pub fn unknown() -> Self {
        Self::new(Scope::Unknown, AccessLevel::Unknown)
    }

    pub fn is_unknown(&self) -> bool {
        self.scope == Scope::Unknown
    }
}

impl fmt::Display for PermissionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.access)
    }
}

impl Serialize for PermissionRequirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.scope.as_str(), self.access.as_str())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for PermissionRequirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut entries = entries.into_iter();
        match (entries.next(), entries.next()) {
            (Some((scope, access)), None) => Ok(Self {
                scope: scope.parse().map_err(de::Error::custom)?,
                access: access.parse().map_err(de::Error::custom)?,
            }),
            _ => Err(de::Error::custom("expected exactly one scope entry")),
        }
    }
}

/// HTTP methods the rule table can be keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    /// Parse a method name case-insensitively
    pub fn parse(method: &str) -> Option<Self> {
        let method = match method.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            _ => return None,
        };
        Some(method)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repository as addressed in an API path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RepositoryReference {
    /// `/repos/{owner}/{repo}/...`
    OwnerRepo { owner: String, repo: String },
    /// `/repositories/{id}/...`
    Id(String),
}

impl RepositoryReference {
    pub fn owner_repo(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepositoryReference::OwnerRepo {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        RepositoryReference::Id(id.into())
    }

    /// Parse `owner/repo`
    pub fn parse_full_name(full_name: &str) -> Option<Self> {
        let (owner, repo) = full_name.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self::owner_repo(owner, repo))
    }

    /// Repository addressed by the leading segments of an API path, if any
    pub fn from_api_segments(segments: &[&str]) -> Option<Self> {
        match segments {
            ["repos", owner, repo, ..] => Some(Self::owner_repo(*owner, *repo)),
            ["repositories", id, ..] => Some(Self::id(*id)),
            _ => None,
        }
    }

    /// Number of path segments taken by the repository root
    /// (`repos/{owner}/{repo}` or `repositories/{id}`)
    pub fn root_len(&self) -> usize {
        match self {
            RepositoryReference::OwnerRepo { .. } => 3,
            RepositoryReference::Id(_) => 2,
        }
    }

    /// Case-insensitive key, stable across spellings of the same repository
    pub fn cache_key(&self) -> String {
        self.to_string().to_lowercase()
    }

    /// Case-insensitive equality
    pub fn matches(&self, other: &RepositoryReference) -> bool {
        match (self, other) {
            (
                RepositoryReference::OwnerRepo { owner, repo },
                RepositoryReference::OwnerRepo {
                    owner: other_owner,
                    repo: other_repo,
                },
            ) => owner.eq_ignore_ascii_case(other_owner) && repo.eq_ignore_ascii_case(other_repo),
            (RepositoryReference::Id(id), RepositoryReference::Id(other_id)) => {
                id.eq_ignore_ascii_case(other_id)
            }
            _ => false,
        }
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryReference::OwnerRepo { owner, repo } => write!(f, "{}/{}", owner, repo),
            RepositoryReference::Id(id) => f.write_str(id),
        }
    }
}
