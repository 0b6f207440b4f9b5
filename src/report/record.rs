//! One classified request as written to the permission log

use serde::{Deserialize, Serialize};

use crate::permissions::PermissionRequirement;

/// Serializes to a single JSON line:
/// `{"method":"GET","host":"api.github.com","path":"/repos/a/b/issues","permissions":[{"issues":"read"}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub method: String,
    pub host: String,
    pub path: String,
    pub permissions: Vec<PermissionRequirement>,
}

impl PermissionRecord {
    pub fn new(
        method: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
        permissions: Vec<PermissionRequirement>,
    ) -> Self {
        Self {
            method: method.into(),
            host: host.into(),
            path: path.into(),
            permissions,
        }
    }

    /// Whether any requirement is the unknown sentinel
    pub fn is_unclassified(&self) -> bool {
        self.permissions.iter().any(PermissionRequirement::is_unknown)
    }
}
