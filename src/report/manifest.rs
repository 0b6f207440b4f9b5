//! Minimal `permissions:` block for a workflow job
//!
//! Aggregates permission records: for each scope the strongest level seen
//! wins. Unknown requirements are not scopes; the calls that produced them
//! are kept apart so they can be reported.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use super::record::PermissionRecord;
use crate::permissions::{AccessLevel, Scope};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionManifest {
    scopes: BTreeMap<Scope, AccessLevel>,
    unclassified: Vec<PermissionRecord>,
}

impl PermissionManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate `records`, keeping only those whose host is in `hosts` when given
    pub fn from_records<'a, I>(records: I, hosts: Option<&HashSet<String>>) -> Self
    where
        I: IntoIterator<Item = &'a PermissionRecord>,
    {
        let mut manifest = Self::new();
        for record in records {
            if let Some(hosts) = hosts {
                if !hosts.contains(&record.host.to_ascii_lowercase()) {
                    continue;
                }
            }
            manifest.add(record);
        }
        manifest
    }

    pub fn add(&mut self, record: &PermissionRecord) {
        for requirement in &record.permissions {
            if requirement.is_unknown() {
                continue;
            }
            self.require(requirement.scope, requirement.access);
        }

        if record.is_unclassified() {
            tracing::warn!(
                "[Manifest] The token was used to call {} {}{} but the permission is unknown; add a rule for it",
                record.method,
                record.host,
                record.path
            );
            self.unclassified.push(record.clone());
        }
    }

    /// Record that `scope` needs at least `access`
    pub fn require(&mut self, scope: Scope, access: AccessLevel) {
        self.scopes
            .entry(scope)
            .and_modify(|current| *current = current.strongest(access))
            .or_insert(access);
    }

    /// Combine with another manifest, e.g. from another run of the same job
    pub fn merge(&mut self, other: &PermissionManifest) {
        for (scope, access) in &other.scopes {
            self.require(*scope, *access);
        }
        self.unclassified.extend(other.unclassified.iter().cloned());
    }

    pub fn get(&self, scope: Scope) -> Option<AccessLevel> {
        self.scopes.get(&scope).copied()
    }

    pub fn scopes(&self) -> impl Iterator<Item = (Scope, AccessLevel)> + '_ {
        self.scopes.iter().map(|(scope, access)| (*scope, *access))
    }

    pub fn unclassified(&self) -> &[PermissionRecord] {
        &self.unclassified
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// YAML `permissions:` block
    pub fn render_yaml(&self) -> String {
        if self.scopes.is_empty() {
            return "permissions: {}\n".to_string();
        }

        let mut yaml = String::from("permissions:\n");
        for (scope, access) in &self.scopes {
            yaml.push_str(&format!("  {}: {}\n", scope, access));
        }
        yaml
    }

    /// Artifact form: `{"<scope>": "<level>"}`
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .scopes
            .iter()
            .map(|(scope, access)| (scope.to_string(), Value::String(access.to_string())))
            .collect();
        Value::Object(map)
    }

    /// Read an artifact written by [`to_json`](Self::to_json)
    pub fn from_json(value: &Value) -> Option<Self> {
        let mut manifest = Self::new();
        for (scope, access) in value.as_object()? {
            let scope = scope.parse().ok()?;
            let access = access.as_str()?.parse().ok()?;
            manifest.require(scope, access);
        }
        Some(manifest)
    }
}
