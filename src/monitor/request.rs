//! Intercepted HTTP request as handed over by the capture layer

use std::collections::BTreeMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::core::{MonitorError, MonitorResult};
use crate::permissions::QueryParams;

/// One line of a capture file: `{"method": .., "url": .., "headers": {..}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ObservedRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Values of headers whose trimmed name starts with `prefix`, ignoring case
    pub fn headers_starting_with<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers.iter().filter_map(move |(name, value)| {
            let matches = name
                .trim()
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
            matches.then_some(value.as_str())
        })
    }

    /// Split the URL into host, decoded path and query
    pub fn parse(&self) -> MonitorResult<ParsedRequest> {
        let url = Url::parse(&self.url)
            .map_err(|e| MonitorError::InvalidRequest(format!("`{}`: {}", self.url, e)))?;

        let url_host = url
            .host_str()
            .ok_or_else(|| MonitorError::InvalidRequest(format!("`{}` has no host", self.url)))?;
        let host = self
            .headers
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("host"))
            .map(|(_, value)| strip_port(value.trim()))
            .unwrap_or(url_host)
            .to_ascii_lowercase();

        let path = urlencoding::decode(url.path())
            .map_err(|e| MonitorError::InvalidRequest(format!("`{}`: {}", self.url, e)))?
            .into_owned();

        let mut query = QueryParams::new();
        for (key, value) in url.query_pairs() {
            query.entry(key.into_owned()).or_default().push(value.into_owned());
        }

        Ok(ParsedRequest { host, path, query })
    }
}

/// `host:port` -> `host`; bracketed IPv6 literals keep their brackets
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            if name.starts_with('[') || !name.contains(':') {
                name
            } else {
                host
            }
        }
        _ => host,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Lower-cased; the `Host` header wins over the URL
    pub host: String,
    /// Percent-decoded, with leading `/`
    pub path: String,
    pub query: QueryParams,
}
