//! Permission classification engine
//!
//! Maps an observed API request to the workflow-token scopes it needs:
//! - **Rule table**: explicit entries for irregular endpoints (`rules`)
//! - **Route index**: prefix tree built once from the rule table (`index`)
//! - **Secondary lookups**: repository visibility and issue-or-pull-request
//!   disambiguation, memoized for the life of the process
//! - **Fallback**: heuristics on the path shape for everything else
//!
//! ## Example
//!
//! ```rust,ignore
//! use permission_monitor::permissions::{PermissionResolver, QueryParams};
//! use std::sync::Arc;
//!
//! let github = Arc::new(GithubClient::new(api_url, token, timeout)?);
//! let resolver = PermissionResolver::builtin(identity, github)?;
//!
//! let required = resolver.resolve("PUT", "/repos/acme/widget/pulls/42/merge", &QueryParams::new()).await;
//! // [contents: write]
//! ```

pub mod ambiguity;
pub mod cache;
pub mod fallback;
pub mod index;
pub mod resolver;
pub mod rules;
pub mod types;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;

pub use ambiguity::{AmbiguityLookup, AmbiguityResolver};
pub use cache::LookupCache;
pub use fallback::PatternFallbackClassifier;
pub use index::{DisambiguationKey, OutcomeKind, RouteIndex, RouteNode, RouteOutcome};
pub use resolver::{split_path, PermissionResolver};
pub use rules::{PathTemplate, Rule, RuleTable, ScopeTag, TemplateSegment};
pub use types::{
    first_query_value, AccessLevel, HttpMethod, PermissionRequirement, QueryParams, RepositoryReference, Scope,
};
pub use visibility::{RepoVisibilityCache, RepoVisibilityChecker};
