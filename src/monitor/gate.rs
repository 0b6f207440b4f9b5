//! Decides which observed requests are classified
//!
//! Only requests carrying the monitored workflow's credential to a monitored
//! host are classified. A `GET` to the identity-token endpoint carrying the
//! identity-token credential is reported as `id-token: write`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::request::{ObservedRequest, ParsedRequest};
use crate::core::{IdTokenEndpoint, MonitorConfig, MonitorResult};

/// Whether an `Authorization` header value carries `token`
///
/// `Basic` credentials are base64-decoded first (git over HTTPS sends the
/// token as the password).
pub fn contains_token(header: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }

    let trimmed = header.trim();
    if let Some(scheme) = trimmed.get(..6).filter(|s| s.eq_ignore_ascii_case("basic ")) {
        return match STANDARD.decode(trimmed[scheme.len()..].trim()) {
            Ok(decoded) => String::from_utf8_lossy(&decoded).contains(token),
            Err(_) => false,
        };
    }

    header.contains(token)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Classify with the permission resolver
    Classify(ParsedRequest),
    /// Identity-token request; needs `id-token: write`
    IdToken(ParsedRequest),
    Ignore,
}

pub struct RequestGate {
    token: String,
    hosts: Vec<String>,
    id_token: Option<IdTokenEndpoint>,
}

impl RequestGate {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            token: config.token.clone(),
            hosts: config.hosts.clone(),
            id_token: config.id_token.clone(),
        }
    }

    fn is_monitored_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    pub fn decide(&self, request: &ObservedRequest) -> MonitorResult<GateDecision> {
        let parsed = request.parse()?;

        for header in request.headers_starting_with("authorization") {
            if contains_token(header, &self.token) {
                if self.is_monitored_host(&parsed.host) {
                    return Ok(GateDecision::Classify(parsed));
                }
                tracing::debug!("[Gate] Token sent to unmonitored host {}", parsed.host);
            } else if let Some(endpoint) = &self.id_token {
                if contains_token(header, &endpoint.token)
                    && request.method.eq_ignore_ascii_case("GET")
                    && endpoint.matches(&parsed.host, &parsed.path)
                {
                    return Ok(GateDecision::IdToken(parsed));
                }
            }
        }

        Ok(GateDecision::Ignore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RepositoryIdentity;

    fn gate() -> RequestGate {
        let config = MonitorConfig::new(
            "https://api.github.com",
            "ghs_secret",
            RepositoryIdentity::new("acme/widget", "42").unwrap(),
        )
        .unwrap()
        .with_host("github.com")
        .with_id_token(IdTokenEndpoint::from_url("https://token.actions.example/idtoken/abc?audience=x", "eyJ_id").unwrap());
        RequestGate::new(&config)
    }

    #[test]
    fn test_contains_token() {
        assert!(contains_token("Bearer ghs_secret", "ghs_secret"));
        assert!(contains_token("token ghs_secret", "ghs_secret"));
        assert!(!contains_token("Bearer other", "ghs_secret"));

        let basic = format!("Basic {}", STANDARD.encode("x-access-token:ghs_secret"));
        assert!(contains_token(&basic, "ghs_secret"));
        assert!(contains_token(&format!("BASIC {}", STANDARD.encode("x:ghs_secret")), "ghs_secret"));
        assert!(!contains_token("Basic !!!", "ghs_secret"));
        assert!(!contains_token("Bearer anything", ""));
        assert!(!contains_token("Bäsic ghs", "ghs_secret"));
    }

    #[test]
    fn test_monitored_token_on_monitored_host() {
        let request = ObservedRequest::new("GET", "https://api.github.com/repos/acme/widget/issues?state=open")
            .with_header("Authorization", "Bearer ghs_secret");

        match gate().decide(&request).unwrap() {
            GateDecision::Classify(parsed) => {
                assert_eq!(parsed.host, "api.github.com");
                assert_eq!(parsed.path, "/repos/acme/widget/issues");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_git_basic_auth_on_web_host() {
        let basic = format!("Basic {}", STANDARD.encode("x-access-token:ghs_secret"));
        let request = ObservedRequest::new("GET", "https://github.com/acme/widget/info/refs?service=git-upload-pack")
            .with_header("authorization", basic);
        assert!(matches!(gate().decide(&request).unwrap(), GateDecision::Classify(_)));
    }

    #[test]
    fn test_ignored_requests() {
        // unmonitored host
        let request = ObservedRequest::new("GET", "https://example.com/repos/acme/widget")
            .with_header("Authorization", "Bearer ghs_secret");
        assert_eq!(gate().decide(&request).unwrap(), GateDecision::Ignore);

        // other credential
        let request = ObservedRequest::new("GET", "https://api.github.com/repos/acme/widget")
            .with_header("Authorization", "Bearer ghp_personal");
        assert_eq!(gate().decide(&request).unwrap(), GateDecision::Ignore);

        // no credential
        let request = ObservedRequest::new("GET", "https://api.github.com/zen");
        assert_eq!(gate().decide(&request).unwrap(), GateDecision::Ignore);
    }

    #[test]
    fn test_id_token_request() {
        let request = ObservedRequest::new("GET", "https://token.actions.example/IDTOKEN/abc?audience=sts")
            .with_header("Authorization", "Bearer eyJ_id");
        assert!(matches!(gate().decide(&request).unwrap(), GateDecision::IdToken(_)));

        // wrong method or path
        let request = ObservedRequest::new("POST", "https://token.actions.example/idtoken/abc")
            .with_header("Authorization", "Bearer eyJ_id");
        assert_eq!(gate().decide(&request).unwrap(), GateDecision::Ignore);

        let request = ObservedRequest::new("GET", "https://token.actions.example/idtoken/other")
            .with_header("Authorization", "Bearer eyJ_id");
        assert_eq!(gate().decide(&request).unwrap(), GateDecision::Ignore);
    }
}
