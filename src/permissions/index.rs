//! Prefix tree over rule templates
//!
//! Each node keeps literal children, an optional wildcard child standing for
//! any placeholder, and the outcomes of templates that end at that depth,
//! keyed by HTTP method. Path segments and methods live in separate maps so
//! a segment named like a method can never shadow an outcome.

use std::collections::HashMap;
use std::fmt;

use super::rules::{Rule, RuleTable, ScopeTag, TemplateSegment};
use super::types::{AccessLevel, HttpMethod, Scope};
use crate::core::{MonitorError, MonitorResult};

/// Which kind of identifier decides between `issues` and `pull-requests`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisambiguationKey {
    IssueNumber,
    CommentId,
    EventId,
}

impl DisambiguationKey {
    pub fn from_placeholder(name: &str) -> Option<Self> {
        match name {
            "issue_number" => Some(DisambiguationKey::IssueNumber),
            "comment_id" => Some(DisambiguationKey::CommentId),
            "event_id" => Some(DisambiguationKey::EventId),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisambiguationKey::IssueNumber => "issue_number",
            DisambiguationKey::CommentId => "comment_id",
            DisambiguationKey::EventId => "event_id",
        }
    }
}

impl fmt::Display for DisambiguationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification stored at a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Scope(Scope),
    /// Issue-or-pull-request; the identifier is the path segment at `position`
    Disambiguate {
        key: DisambiguationKey,
        position: usize,
    },
    /// Both `issues` and `pull-requests`
    IssuesAndPullRequests,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOutcome {
    pub kind: OutcomeKind,
    pub access: AccessLevel,
}

impl RouteOutcome {
    fn from_rule(rule: &Rule) -> MonitorResult<Self> {
        let kind = match rule.tag {
            ScopeTag::Scope(scope) => OutcomeKind::Scope(scope),
            ScopeTag::IssuesAndPullRequests => OutcomeKind::IssuesAndPullRequests,
            ScopeTag::IssueOrPullRequest => {
                let (key, position) = disambiguation_slot(rule)?;
                OutcomeKind::Disambiguate { key, position }
            }
        };
        Ok(Self {
            kind,
            access: rule.access,
        })
    }
}

/// Find the placeholder that identifies the issue, comment or event
///
/// It is the first placeholder after the repository root carrying one of the
/// known identifier names.
fn disambiguation_slot(rule: &Rule) -> MonitorResult<(DisambiguationKey, usize)> {
    let root_len = rule.template.root_len().ok_or_else(|| {
        MonitorError::InvalidRule(format!("{} is not rooted at a repository", rule))
    })?;

    rule.template
        .segments()
        .iter()
        .enumerate()
        .skip(root_len)
        .find_map(|(position, segment)| {
            segment
                .placeholder_name()
                .and_then(DisambiguationKey::from_placeholder)
                .map(|key| (key, position))
        })
        .ok_or_else(|| {
            MonitorError::InvalidRule(format!("{} has no issue, comment or event identifier", rule))
        })
}

/// A node of the route tree
#[derive(Debug, Default)]
pub struct RouteNode {
    children: HashMap<String, RouteNode>,
    wildcard: Option<Box<RouteNode>>,
    methods: HashMap<HttpMethod, RouteOutcome>,
}

impl RouteNode {
    fn child_mut(&mut self, segment: &TemplateSegment) -> &mut RouteNode {
        match segment {
            TemplateSegment::Literal(literal) => self.children.entry(literal.clone()).or_default(),
            TemplateSegment::Placeholder(_) => self.wildcard.get_or_insert_with(Default::default).as_mut(),
        }
    }

    /// Literal child first, wildcard child otherwise
    fn next(&self, segment: &str) -> Option<&RouteNode> {
        self.children.get(segment).or(self.wildcard.as_deref())
    }

    pub fn outcome(&self, method: HttpMethod) -> Option<RouteOutcome> {
        self.methods.get(&method).copied()
    }

    fn count(&self) -> usize {
        self.methods.len()
            + self.children.values().map(RouteNode::count).sum::<usize>()
            + self.wildcard.as_ref().map(|w| w.count()).unwrap_or(0)
    }
}

/// Route lookup built once from a rule table
#[derive(Debug, Default)]
pub struct RouteIndex {
    root: RouteNode,
}

impl RouteIndex {
    pub fn build(table: &RuleTable) -> MonitorResult<Self> {
        let mut index = Self::default();
        for rule in table.iter() {
            index.insert(rule)?;
        }
        tracing::debug!("[RouteIndex] Indexed {} outcomes", index.len());
        Ok(index)
    }

    fn insert(&mut self, rule: &Rule) -> MonitorResult<()> {
        let outcome = RouteOutcome::from_rule(rule)?;

        let mut node = &mut self.root;
        for segment in rule.template.segments() {
            node = node.child_mut(segment);
        }

        if let Some(existing) = node.methods.get(&rule.method) {
            if *existing != outcome {
                return Err(MonitorError::InvalidRule(format!(
                    "{} conflicts with an earlier rule for the same method and path",
                    rule
                )));
            }
        }
        node.methods.insert(rule.method, outcome);
        Ok(())
    }

    /// Walk the tree for `segments` and return the outcome for `method`
    ///
    /// `None` when the walk falls off the tree, ends at a node without
    /// outcomes for this method, or the method is not one the table knows.
    pub fn lookup(&self, method: &str, segments: &[&str]) -> Option<RouteOutcome> {
        let method = HttpMethod::parse(method)?;

        let mut node = &self.root;
        for segment in segments {
            node = node.next(segment)?;
        }

        node.outcome(method)
    }

    /// Number of `(path, method)` outcomes in the tree
    pub fn len(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(rules: Vec<Rule>) -> RouteIndex {
        RouteIndex::build(&RuleTable::from_rules(rules)).unwrap()
    }

    fn segments(path: &str) -> Vec<&str> {
        path.trim_start_matches('/').split('/').collect()
    }

    #[test]
    fn test_builtin_index_builds() {
        let table = RuleTable::builtin().unwrap();
        let index = RouteIndex::build(&table).unwrap();
        assert_eq!(index.len(), table.len());
    }

    #[test]
    fn test_literal_preferred_over_wildcard() {
        let index = index_of(vec![
            Rule::new(HttpMethod::Get, "/repos/{owner}/{repo}/issues/{issue_number}", ScopeTag::IssueOrPullRequest, AccessLevel::Read).unwrap(),
            Rule::new(HttpMethod::Get, "/repos/{owner}/{repo}/issues/events", ScopeTag::IssuesAndPullRequests, AccessLevel::Read).unwrap(),
        ]);

        let events = index.lookup("GET", &segments("/repos/a/b/issues/events")).unwrap();
        assert_eq!(events.kind, OutcomeKind::IssuesAndPullRequests);

        let issue = index.lookup("GET", &segments("/repos/a/b/issues/17")).unwrap();
        assert_eq!(
            issue.kind,
            OutcomeKind::Disambiguate {
                key: DisambiguationKey::IssueNumber,
                position: 4
            }
        );
    }

    #[test]
    fn test_method_miss_and_path_miss() {
        let index = index_of(vec![Rule::new(
            HttpMethod::Get,
            "/repos/{owner}/{repo}/branches",
            ScopeTag::Scope(Scope::Contents),
            AccessLevel::Read,
        )
        .unwrap()]);

        assert!(index.lookup("GET", &segments("/repos/a/b/branches")).is_some());
        assert!(index.lookup("POST", &segments("/repos/a/b/branches")).is_none());
        assert!(index.lookup("GET", &segments("/repos/a/b/tags")).is_none());
        // intermediate node without outcomes
        assert!(index.lookup("GET", &segments("/repos/a/b")).is_none());
        assert!(index.lookup("BREW", &segments("/repos/a/b/branches")).is_none());
    }

    #[test]
    fn test_method_named_segment_does_not_collide() {
        let index = index_of(vec![
            Rule::new(HttpMethod::Get, "/repos/{owner}/{repo}/GET", ScopeTag::Scope(Scope::Pages), AccessLevel::Read).unwrap(),
            Rule::new(HttpMethod::Get, "/repos/{owner}/{repo}", ScopeTag::Scope(Scope::Contents), AccessLevel::Read).unwrap(),
        ]);

        let repo = index.lookup("GET", &segments("/repos/a/b")).unwrap();
        assert_eq!(repo.kind, OutcomeKind::Scope(Scope::Contents));
        let odd = index.lookup("GET", &segments("/repos/a/b/GET")).unwrap();
        assert_eq!(odd.kind, OutcomeKind::Scope(Scope::Pages));
    }

    #[test]
    fn test_disambiguation_positions_per_form() {
        let index = index_of(vec![
            Rule::new(HttpMethod::Get, "/repos/{owner}/{repo}/issues/comments/{comment_id}/reactions", ScopeTag::IssueOrPullRequest, AccessLevel::Read).unwrap(),
            Rule::new(HttpMethod::Get, "/repos/{owner}/{repo}/issues/events/{event_id}", ScopeTag::IssueOrPullRequest, AccessLevel::Read).unwrap(),
        ]);

        let owner_form = index
            .lookup("GET", &segments("/repos/a/b/issues/comments/9/reactions"))
            .unwrap();
        assert_eq!(
            owner_form.kind,
            OutcomeKind::Disambiguate {
                key: DisambiguationKey::CommentId,
                position: 5
            }
        );

        let id_form = index
            .lookup("GET", &segments("/repositories/42/issues/events/7"))
            .unwrap();
        assert_eq!(
            id_form.kind,
            OutcomeKind::Disambiguate {
                key: DisambiguationKey::EventId,
                position: 4
            }
        );
    }

    #[test]
    fn test_ambiguous_rule_without_identifier_is_rejected() {
        let table = RuleTable::from_rules(vec![Rule::new(
            HttpMethod::Get,
            "/repos/{owner}/{repo}/issues/{number}",
            ScopeTag::IssueOrPullRequest,
            AccessLevel::Read,
        )
        .unwrap()]);
        assert!(matches!(RouteIndex::build(&table), Err(MonitorError::InvalidRule(_))));
    }

    #[test]
    fn test_conflicting_rules_are_rejected() {
        let table = RuleTable::from_rules(vec![
            Rule::new(HttpMethod::Get, "/repos/{owner}/{repo}/labels", ScopeTag::Scope(Scope::Issues), AccessLevel::Read).unwrap(),
            Rule::new(HttpMethod::Get, "/repos/{owner}/{repo}/labels", ScopeTag::Scope(Scope::Contents), AccessLevel::Read).unwrap(),
        ]);
        assert!(RouteIndex::build(&table).is_err());
    }
}
