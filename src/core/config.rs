//! Monitor configuration
//!
//! Built programmatically with the `with_*` methods, or from the workflow
//! environment with [`MonitorConfig::from_env`].

use std::env;
use std::time::Duration;

use reqwest::Url;

use super::error::{MonitorError, MonitorResult};
use crate::permissions::RepositoryReference;

/// Secondary lookups give up after this long unless configured otherwise
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(5000);

/// `1`, `true`, `yes` or `on`, ignoring case
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Whether `MONITOR_DEBUG` asks for debug output
///
/// Read on its own, ahead of [`MonitorConfig::from_env`], because logging is
/// set up before the rest of the configuration is loaded.
pub fn debug_requested() -> bool {
    debug_requested_from(|name| env::var(name).ok())
}

/// Same as [`debug_requested`] over an arbitrary variable source
pub fn debug_requested_from<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup("MONITOR_DEBUG").map(|v| parse_flag(&v)).unwrap_or(false)
}

/// Lower-cased host of `url`
fn host_of(url: &str) -> MonitorResult<String> {
    let parsed = Url::parse(url).map_err(|e| MonitorError::invalid(format!("`{}` is not a URL: {}", url, e)))?;
    parsed
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| MonitorError::invalid(format!("`{}` has no host", url)))
}

/// The repository whose workflow is being monitored, in both address forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryIdentity {
    owner: String,
    repo: String,
    id: String,
}

impl RepositoryIdentity {
    /// `full_name` is `owner/repo`, `id` the numeric repository id
    pub fn new(full_name: &str, id: &str) -> MonitorResult<Self> {
        let (owner, repo) = match RepositoryReference::parse_full_name(full_name.trim()) {
            Some(RepositoryReference::OwnerRepo { owner, repo }) => (owner, repo),
            _ => {
                return Err(MonitorError::invalid(format!(
                    "repository `{}` is not in owner/repo form",
                    full_name
                )))
            }
        };

        let id = id.trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MonitorError::invalid(format!("repository id `{}` is not numeric", id)));
        }

        Ok(Self {
            owner,
            repo,
            id: id.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Whether `/repositories/{id}` addresses this repository
    pub fn same_repository_by_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }

    /// Whether `/repos/{owner}/{repo}` addresses this repository
    pub fn same_repository_by_owner_repo(&self, owner: &str, repo: &str) -> bool {
        self.owner.eq_ignore_ascii_case(owner) && self.repo.eq_ignore_ascii_case(repo)
    }
}

/// Identity-token endpoint of the workflow runner
///
/// A `GET` to exactly this host and path carrying the identity-token
/// credential means the workflow needs `id-token: write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTokenEndpoint {
    pub host: String,
    pub path: String,
    pub token: String,
}

impl IdTokenEndpoint {
    pub fn from_url(url: &str, token: impl Into<String>) -> MonitorResult<Self> {
        let parsed = Url::parse(url).map_err(|e| MonitorError::invalid(format!("`{}` is not a URL: {}", url, e)))?;
        Ok(Self {
            host: host_of(url)?,
            path: parsed.path().to_string(),
            token: token.into(),
        })
    }

    pub fn matches(&self, host: &str, path: &str) -> bool {
        self.host.eq_ignore_ascii_case(host) && self.path.eq_ignore_ascii_case(path)
    }
}

/// Everything the monitor needs at startup
///
/// ```ignore
/// let config = MonitorConfig::new("https://api.github.com", token, identity)?
///     .with_host("github.com")
///     .with_lookup_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// API base URL, without a trailing `/`
    pub api_url: String,

    /// Credential of the monitored workflow; also used for secondary lookups
    pub token: String,

    /// Repository under test
    pub repository: RepositoryIdentity,

    /// Lower-cased hosts whose traffic is classified
    pub hosts: Vec<String>,

    pub id_token: Option<IdTokenEndpoint>,

    pub lookup_timeout: Duration,
}

impl MonitorConfig {
    /// Configuration monitoring only the API host
    pub fn new(api_url: &str, token: impl Into<String>, repository: RepositoryIdentity) -> MonitorResult<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(MonitorError::missing("token"));
        }
        let api_url = api_url.trim_end_matches('/').to_string();
        let hosts = vec![host_of(&api_url)?];

        Ok(Self {
            api_url,
            token,
            repository,
            hosts,
            id_token: None,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        })
    }

    /// Replace the monitored hosts
    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.hosts = Vec::new();
        for host in hosts {
            self = self.with_host(host.as_ref());
        }
        self
    }

    /// Monitor one more host
    pub fn with_host(mut self, host: &str) -> Self {
        let host = host.trim().to_ascii_lowercase();
        if !host.is_empty() && !self.hosts.contains(&host) {
            self.hosts.push(host);
        }
        self
    }

    pub fn with_id_token(mut self, endpoint: IdTokenEndpoint) -> Self {
        self.id_token = Some(endpoint);
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn is_monitored_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    /// Read the configuration from the process environment
    ///
    /// Reads:
    /// - `GITHUB_API_URL`, `GITHUB_REPOSITORY`, `GITHUB_REPOSITORY_ID` (required)
    /// - `MONITOR_TOKEN`, falling back to `GITHUB_TOKEN` (required)
    /// - `MONITOR_HOSTS` (comma-separated; defaults to the API, server and
    ///   identity-token hosts)
    /// - `GITHUB_SERVER_URL`
    /// - `ACTIONS_ID_TOKEN_REQUEST_URL`, `ACTIONS_ID_TOKEN_REQUEST_TOKEN`
    /// - `MONITOR_LOOKUP_TIMEOUT_MS` (positive; defaults to 5000)
    pub fn from_env() -> MonitorResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> MonitorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &str| var(name).ok_or_else(|| MonitorError::missing(name));

        let api_url = required("GITHUB_API_URL")?;
        let token = var("MONITOR_TOKEN")
            .or_else(|| var("GITHUB_TOKEN"))
            .ok_or_else(|| MonitorError::missing("MONITOR_TOKEN or GITHUB_TOKEN"))?;
        let repository = RepositoryIdentity::new(&required("GITHUB_REPOSITORY")?, &required("GITHUB_REPOSITORY_ID")?)?;

        let mut config = Self::new(&api_url, token, repository)?;

        if let Some(url) = var("ACTIONS_ID_TOKEN_REQUEST_URL") {
            let token = var("ACTIONS_ID_TOKEN_REQUEST_TOKEN").unwrap_or_default();
            config = config.with_id_token(IdTokenEndpoint::from_url(&url, token)?);
        }

        config = match var("MONITOR_HOSTS") {
            Some(hosts) => config.with_hosts(hosts.split(',')),
            None => {
                let mut defaults = config.hosts.clone();
                if let Some(server_url) = var("GITHUB_SERVER_URL") {
                    defaults.push(host_of(&server_url)?);
                }
                if let Some(endpoint) = &config.id_token {
                    defaults.push(endpoint.host.clone());
                }
                config.with_hosts(defaults)
            }
        };

        if let Some(ms) = var("MONITOR_LOOKUP_TIMEOUT_MS") {
            let ms = ms
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| MonitorError::invalid(format!("MONITOR_LOOKUP_TIMEOUT_MS `{}` is not a positive number", ms)))?;
            config = config.with_lookup_timeout(Duration::from_millis(ms));
        }

        tracing::info!(
            "[Config] Monitoring {} on {:?} (lookup timeout {:?})",
            config.repository.full_name(),
            config.hosts,
            config.lookup_timeout
        );
        Ok(config)
    }
}
