//! Rule table for endpoints that do not follow the generic path shape
//!
//! Most endpoints are classified by `fallback` from the segment following
//! the repository root. The rules here cover the rest: endpoints whose scope
//! differs from what their path suggests, and issue endpoints that also
//! accept pull request numbers.
//!
//! Rules are written once in `/repos/{owner}/{repo}/...` form; the table
//! derives the `/repositories/{id}/...` twin of every rule when it is built.

use std::fmt;

use super::types::{AccessLevel, HttpMethod, Scope};
use crate::core::{MonitorError, MonitorResult};

/// One segment of a path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    /// `{name}`; the name is kept for readability and disambiguation
    Placeholder(String),
}

impl TemplateSegment {
    pub fn placeholder_name(&self) -> Option<&str> {
        match self {
            TemplateSegment::Placeholder(name) => Some(name),
            TemplateSegment::Literal(_) => None,
        }
    }
}

/// Endpoint path pattern such as `/repos/{owner}/{repo}/labels/{name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<TemplateSegment>,
}

impl PathTemplate {
    /// Parse a template; it must start with `/` and contain no empty segments
    pub fn parse(template: &str) -> MonitorResult<Self> {
        let rest = template.strip_prefix('/').ok_or_else(|| {
            MonitorError::InvalidRule(format!("template `{}` must start with `/`", template))
        })?;

        let mut segments = Vec::new();
        for segment in rest.split('/') {
            if segment.is_empty() {
                return Err(MonitorError::InvalidRule(format!(
                    "template `{}` contains an empty segment",
                    template
                )));
            }
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) if !name.is_empty() => {
                    segments.push(TemplateSegment::Placeholder(name.to_string()))
                }
                Some(_) => {
                    return Err(MonitorError::InvalidRule(format!(
                        "template `{}` contains an unnamed placeholder",
                        template
                    )))
                }
                None => segments.push(TemplateSegment::Literal(segment.to_string())),
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    /// Whether this template is rooted at `/repos/{owner}/{repo}`
    pub fn is_owner_repo_form(&self) -> bool {
        matches!(
            self.segments.as_slice(),
            [TemplateSegment::Literal(root), TemplateSegment::Placeholder(_), TemplateSegment::Placeholder(_), ..]
                if root == "repos"
        )
    }

    /// Whether this template is rooted at `/repositories/{id}`
    pub fn is_id_form(&self) -> bool {
        matches!(
            self.segments.as_slice(),
            [TemplateSegment::Literal(root), TemplateSegment::Placeholder(_), ..]
                if root == "repositories"
        )
    }

    /// Number of segments taken by the repository root, if repository-scoped
    pub fn root_len(&self) -> Option<usize> {
        if self.is_owner_repo_form() {
            Some(3)
        } else if self.is_id_form() {
            Some(2)
        } else {
            None
        }
    }

    /// The same template rooted at `/repositories/{id}`
    pub fn to_id_form(&self) -> Option<PathTemplate> {
        if !self.is_owner_repo_form() {
            return None;
        }
        let mut segments = vec![
            TemplateSegment::Literal("repositories".to_string()),
            TemplateSegment::Placeholder("id".to_string()),
        ];
        segments.extend(self.segments[3..].iter().cloned());
        Some(Self { segments })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(s) => write!(f, "/{}", s)?,
                TemplateSegment::Placeholder(name) => write!(f, "/{{{}}}", name)?,
            }
        }
        Ok(())
    }
}

/// What a rule says about the scope an endpoint needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTag {
    /// A single known scope
    Scope(Scope),
    /// `issues/pull-requests`: the identifier in the path may denote either an
    /// issue or a pull request, and a lookup decides which scope applies
    IssueOrPullRequest,
    /// `issues,pull-requests`: both scopes are needed at once
    IssuesAndPullRequests,
}

impl fmt::Display for ScopeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeTag::Scope(scope) => write!(f, "{}", scope),
            ScopeTag::IssueOrPullRequest => f.write_str("issues/pull-requests"),
            ScopeTag::IssuesAndPullRequests => f.write_str("issues,pull-requests"),
        }
    }
}

/// `(method, template, scope, access-level)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub method: HttpMethod,
    pub template: PathTemplate,
    pub tag: ScopeTag,
    pub access: AccessLevel,
}

impl Rule {
    pub fn new(method: HttpMethod, template: &str, tag: ScopeTag, access: AccessLevel) -> MonitorResult<Self> {
        Ok(Self {
            method,
            template: PathTemplate::parse(template)?,
            tag,
            access,
        })
    }

    /// The `/repositories/{id}` twin of an owner/repo rule
    pub fn to_id_form(&self) -> Option<Rule> {
        Some(Rule {
            method: self.method,
            template: self.template.to_id_form()?,
            tag: self.tag,
            access: self.access,
        })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}: {}", self.method, self.template, self.tag, self.access)
    }
}

/// Immutable set of rules
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Build a table from owner/repo-form rules, adding the id-form twin of each
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut all = Vec::new();
        for rule in rules {
            let twin = rule.to_id_form();
            all.push(rule);
            all.extend(twin);
        }
        Self { rules: all }
    }

    /// The built-in rules for the hosting API
    pub fn builtin() -> MonitorResult<Self> {
        let rules = BUILTIN_RULES
            .iter()
            .map(|spec| Rule::new(spec.method, spec.template, spec.tag, spec.access))
            .collect::<MonitorResult<Vec<_>>>()?;

        let table = Self::from_rules(rules);
        tracing::debug!("[RuleTable] Built {} rules", table.len());
        Ok(table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

struct RuleSpec {
    method: HttpMethod,
    template: &'static str,
    tag: ScopeTag,
    access: AccessLevel,
}

const fn rule(method: HttpMethod, template: &'static str, tag: ScopeTag, access: AccessLevel) -> RuleSpec {
    RuleSpec {
        method,
        template,
        tag,
        access,
    }
}

use AccessLevel::{Read, Write};
use HttpMethod::{Delete, Get, Patch, Post, Put};

const CONTENTS: ScopeTag = ScopeTag::Scope(Scope::Contents);
const ISSUES: ScopeTag = ScopeTag::Scope(Scope::Issues);
const ISSUE_OR_PR: ScopeTag = ScopeTag::IssueOrPullRequest;
const ISSUES_AND_PRS: ScopeTag = ScopeTag::IssuesAndPullRequests;

const BUILTIN_RULES: &[RuleSpec] = &[
    // contents
    rule(Get, "/repos/{owner}/{repo}/codeowners/errors", CONTENTS, Read),
    rule(Put, "/repos/{owner}/{repo}/pulls/{pull_number}/merge", CONTENTS, Write),
    rule(Put, "/repos/{owner}/{repo}/pulls/{pull_number}/update-branch", CONTENTS, Write),
    rule(Post, "/repos/{owner}/{repo}/comments/{comment_id}/reactions", CONTENTS, Write),
    rule(Delete, "/repos/{owner}/{repo}/comments/{comment_id}/reactions/{reaction_id}", CONTENTS, Write),
    rule(Get, "/repos/{owner}/{repo}/branches", CONTENTS, Read),
    rule(Post, "/repos/{owner}/{repo}/merge-upstream", CONTENTS, Write),
    rule(Post, "/repos/{owner}/{repo}/merges", CONTENTS, Write),
    rule(Patch, "/repos/{owner}/{repo}/comments/{comment_id}", CONTENTS, Write),
    rule(Delete, "/repos/{owner}/{repo}/comments/{comment_id}", CONTENTS, Write),
    rule(Post, "/repos/{owner}/{repo}/dispatches", CONTENTS, Write),
    // issues that may be pull requests
    rule(Post, "/repos/{owner}/{repo}/issues/{issue_number}/assignees", ISSUE_OR_PR, Write),
    rule(Delete, "/repos/{owner}/{repo}/issues/{issue_number}/assignees", ISSUE_OR_PR, Write),
    rule(Get, "/repos/{owner}/{repo}/issues/{issue_number}/comments", ISSUE_OR_PR, Read),
    rule(Post, "/repos/{owner}/{repo}/issues/{issue_number}/comments", ISSUE_OR_PR, Write),
    rule(Get, "/repos/{owner}/{repo}/issues/comments", ISSUES_AND_PRS, Read),
    rule(Get, "/repos/{owner}/{repo}/issues/comments/{comment_id}", ISSUE_OR_PR, Read),
    rule(Patch, "/repos/{owner}/{repo}/issues/comments/{comment_id}", ISSUE_OR_PR, Write),
    rule(Delete, "/repos/{owner}/{repo}/issues/comments/{comment_id}", ISSUE_OR_PR, Write),
    rule(Get, "/repos/{owner}/{repo}/issues/{issue_number}/events", ISSUE_OR_PR, Read),
    rule(Get, "/repos/{owner}/{repo}/issues/events", ISSUES_AND_PRS, Read),
    rule(Get, "/repos/{owner}/{repo}/issues/events/{event_id}", ISSUE_OR_PR, Read),
    rule(Get, "/repos/{owner}/{repo}/issues/{issue_number}/timeline", ISSUE_OR_PR, Read),
    rule(Get, "/repos/{owner}/{repo}/assignees", ISSUES_AND_PRS, Read),
    rule(Get, "/repos/{owner}/{repo}/issues", ISSUES_AND_PRS, Read),
    rule(Post, "/repos/{owner}/{repo}/issues", ISSUES, Write),
    rule(Get, "/repos/{owner}/{repo}/issues/{issue_number}", ISSUE_OR_PR, Read),
    rule(Patch, "/repos/{owner}/{repo}/issues/{issue_number}", ISSUE_OR_PR, Write),
    rule(Put, "/repos/{owner}/{repo}/issues/{issue_number}/lock", ISSUE_OR_PR, Write),
    rule(Delete, "/repos/{owner}/{repo}/issues/{issue_number}/lock", ISSUE_OR_PR, Write),
    rule(Get, "/repos/{owner}/{repo}/issues/{issue_number}/labels", ISSUE_OR_PR, Read),
    rule(Post, "/repos/{owner}/{repo}/issues/{issue_number}/labels", ISSUE_OR_PR, Write),
    rule(Put, "/repos/{owner}/{repo}/issues/{issue_number}/labels", ISSUE_OR_PR, Write),
    rule(Delete, "/repos/{owner}/{repo}/issues/{issue_number}/labels", ISSUE_OR_PR, Write),
    rule(Delete, "/repos/{owner}/{repo}/issues/{issue_number}/labels/{name}", ISSUE_OR_PR, Write),
    rule(Get, "/repos/{owner}/{repo}/issues/{issue_number}/reactions", ISSUE_OR_PR, Read),
    rule(Post, "/repos/{owner}/{repo}/issues/{issue_number}/reactions", ISSUE_OR_PR, Write),
    rule(Delete, "/repos/{owner}/{repo}/issues/{issue_number}/reactions/{reaction_id}", ISSUE_OR_PR, Write),
    rule(Get, "/repos/{owner}/{repo}/issues/comments/{comment_id}/reactions", ISSUE_OR_PR, Read),
    rule(Post, "/repos/{owner}/{repo}/issues/comments/{comment_id}/reactions", ISSUE_OR_PR, Write),
    rule(Delete, "/repos/{owner}/{repo}/issues/comments/{comment_id}/reactions", ISSUE_OR_PR, Write),
    // labels and milestones
    rule(Get, "/repos/{owner}/{repo}/labels", ISSUES, Read),
    rule(Post, "/repos/{owner}/{repo}/labels", ISSUES, Write),
    rule(Get, "/repos/{owner}/{repo}/labels/{name}", ISSUES, Read),
    rule(Patch, "/repos/{owner}/{repo}/labels/{name}", ISSUES, Write),
    rule(Delete, "/repos/{owner}/{repo}/labels/{name}", ISSUES, Write),
    rule(Get, "/repos/{owner}/{repo}/milestones", ISSUES, Read),
    rule(Post, "/repos/{owner}/{repo}/milestones", ISSUES, Write),
    rule(Get, "/repos/{owner}/{repo}/milestones/{milestone_number}", ISSUES, Read),
    rule(Patch, "/repos/{owner}/{repo}/milestones/{milestone_number}", ISSUES, Write),
    rule(Delete, "/repos/{owner}/{repo}/milestones/{milestone_number}", ISSUES, Write),
    rule(Get, "/repos/{owner}/{repo}/milestones/{milestone_number}/labels", ISSUES, Read),
];
