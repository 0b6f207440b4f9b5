//! Gate + resolver: turns observed requests into permission records

use std::sync::Arc;

use super::gate::{GateDecision, RequestGate};
use super::request::ObservedRequest;
use crate::core::{MonitorConfig, MonitorResult};
use crate::github::GithubClient;
use crate::permissions::{AccessLevel, PermissionRequirement, PermissionResolver, Scope};
use crate::report::PermissionRecord;

pub struct Monitor {
    gate: RequestGate,
    resolver: Arc<PermissionResolver>,
}

impl Monitor {
    pub fn new(config: &MonitorConfig, resolver: Arc<PermissionResolver>) -> Self {
        Self {
            gate: RequestGate::new(config),
            resolver,
        }
    }

    /// Monitor backed by the hosting API for secondary lookups
    pub fn from_config(config: &MonitorConfig) -> MonitorResult<Self> {
        let github = Arc::new(GithubClient::from_config(config)?);
        let resolver = PermissionResolver::builtin(config.repository.clone(), github)?;
        Ok(Self::new(config, Arc::new(resolver)))
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// The record to persist for `request`, if it is in scope
    pub async fn observe(&self, request: &ObservedRequest) -> MonitorResult<Option<PermissionRecord>> {
        let record = match self.gate.decide(request)? {
            GateDecision::Classify(parsed) => {
                let permissions = self.resolver.resolve(&request.method, &parsed.path, &parsed.query).await;
                PermissionRecord::new(request.method.as_str(), parsed.host, parsed.path, permissions)
            }
            GateDecision::IdToken(parsed) => {
                tracing::info!("[Monitor] Identity token requested from {}", parsed.host);
                PermissionRecord::new(
                    request.method.as_str(),
                    parsed.host,
                    parsed.path,
                    vec![PermissionRequirement::new(Scope::IdToken, AccessLevel::Write)],
                )
            }
            GateDecision::Ignore => return Ok(None),
        };

        Ok(Some(record))
    }
}
