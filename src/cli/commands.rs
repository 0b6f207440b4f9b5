//! Command implementations behind the binary

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::core::{MonitorError, MonitorResult};
use crate::monitor::{Monitor, ObservedRequest};
use crate::report::{read_records, PermissionLog, PermissionManifest};

/// Outcome counts of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub total: usize,
    pub recorded: usize,
    pub ignored: usize,
    pub unclassified: usize,
    pub failed: usize,
}

/// Load a capture file: one `ObservedRequest` JSON object per line
pub fn read_capture(path: &Path) -> MonitorResult<Vec<ObservedRequest>> {
    let reader = BufReader::new(File::open(path)?);
    let mut requests = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request = serde_json::from_str(&line)
            .map_err(|e| MonitorError::InvalidRecord(format!("{}:{}: {}", path.display(), number + 1, e)))?;
        requests.push(request);
    }

    Ok(requests)
}

/// Run captured requests through the monitor, up to `concurrency` at a time,
/// appending every record to `log`
///
/// A request that cannot be interpreted is counted and skipped.
pub async fn replay(
    monitor: Arc<Monitor>,
    requests: Vec<ObservedRequest>,
    log: &PermissionLog,
    concurrency: usize,
) -> MonitorResult<ReplayStats> {
    let mut stats = ReplayStats {
        total: requests.len(),
        ..Default::default()
    };

    let mut results = stream::iter(requests)
        .map(|request| {
            let monitor = Arc::clone(&monitor);
            async move {
                let result = monitor.observe(&request).await;
                (request, result)
            }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some((request, result)) = results.next().await {
        match result {
            Ok(Some(record)) => {
                if record.is_unclassified() {
                    stats.unclassified += 1;
                }
                log.append(&record)?;
                stats.recorded += 1;
            }
            Ok(None) => stats.ignored += 1,
            Err(err) => {
                tracing::warn!("[Replay] Skipping {} {}: {}", request.method, request.url, err);
                stats.failed += 1;
            }
        }
    }

    tracing::info!("[Replay] {:?}", stats);
    Ok(stats)
}

/// Manifest over one or more permission logs, merged with earlier artifacts
pub fn summarize(
    logs: &[impl AsRef<Path>],
    hosts: Option<&HashSet<String>>,
    artifacts: &[impl AsRef<Path>],
) -> MonitorResult<PermissionManifest> {
    let mut manifest = PermissionManifest::new();

    for log in logs {
        let records = read_records(log)?;
        tracing::debug!("[Summarize] {} record(s) in {:?}", records.len(), log.as_ref());
        manifest.merge(&PermissionManifest::from_records(&records, hosts));
    }

    for artifact in artifacts {
        let artifact = artifact.as_ref();
        let value: serde_json::Value = serde_json::from_reader(BufReader::new(File::open(artifact)?))?;
        let earlier = PermissionManifest::from_json(&value)
            .ok_or_else(|| MonitorError::InvalidRecord(format!("{} is not a permissions artifact", artifact.display())))?;
        manifest.merge(&earlier);
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MonitorConfig, RepositoryIdentity};
    use crate::permissions::testing::FakeGithub;
    use crate::permissions::{AccessLevel, PermissionResolver, Scope};
    use std::fs;
    use tempfile::TempDir;

    fn monitor() -> Arc<Monitor> {
        let identity = RepositoryIdentity::new("acme/widget", "42").unwrap();
        let config = MonitorConfig::new("https://api.github.com", "ghs_secret", identity.clone()).unwrap();
        let github = Arc::new(FakeGithub::new().with_private_repo("acme/widget"));
        let resolver = PermissionResolver::builtin(identity, github).unwrap();
        Arc::new(Monitor::new(&config, Arc::new(resolver)))
    }

    fn capture_line(method: &str, url: &str, authorized: bool) -> String {
        let mut request = ObservedRequest::new(method, url);
        if authorized {
            request = request.with_header("Authorization", "token ghs_secret");
        }
        serde_json::to_string(&request).unwrap()
    }

    #[tokio::test]
    async fn test_replay_then_summarize() {
        let temp_dir = TempDir::new().unwrap();
        let capture = temp_dir.path().join("capture.jsonl");
        let lines = [
            capture_line("GET", "https://api.github.com/repos/acme/widget/issues", true),
            capture_line("PUT", "https://api.github.com/repos/acme/widget/pulls/1/merge", true),
            capture_line("GET", "https://api.github.com/repos/acme/widget/commits", true),
            capture_line("GET", "https://api.github.com/repos/acme/widget/hooks", true),
            capture_line("GET", "https://api.github.com/zen", false),
            String::new(),
            r#"{"method":"GET","url":"::bad::","headers":{"Authorization":"token ghs_secret"}}"#.to_string(),
        ];
        fs::write(&capture, lines.join("\n")).unwrap();

        let requests = read_capture(&capture).unwrap();
        assert_eq!(requests.len(), 6);

        let log = PermissionLog::open(temp_dir.path().join("permissions.jsonl")).unwrap();
        let stats = replay(monitor(), requests, &log, 3).await.unwrap();
        assert_eq!(
            stats,
            ReplayStats {
                total: 6,
                recorded: 4,
                ignored: 1,
                unclassified: 1,
                failed: 1,
            }
        );

        let manifest = summarize(&[log.path()], None, &[] as &[&Path]).unwrap();
        assert_eq!(manifest.get(Scope::Contents), Some(AccessLevel::Write));
        assert_eq!(manifest.get(Scope::Issues), Some(AccessLevel::Read));
        assert_eq!(manifest.get(Scope::PullRequests), Some(AccessLevel::Read));
        assert_eq!(manifest.unclassified().len(), 1);
    }

    #[test]
    fn test_summarize_merges_artifacts_and_filters_hosts() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("log.jsonl");
        fs::write(
            &log,
            concat!(
                r#"{"method":"GET","host":"api.github.com","path":"/repos/a/b/labels","permissions":[{"issues":"read"}]}"#,
                "\n",
                r#"{"method":"POST","host":"uploads.example.com","path":"/x","permissions":[{"packages":"write"}]}"#,
                "\n"
            ),
        )
        .unwrap();
        let artifact = temp_dir.path().join("permissions");
        fs::write(&artifact, r#"{"issues":"write","actions":"read"}"#).unwrap();

        let hosts: HashSet<String> = ["api.github.com".to_string()].into();
        let manifest = summarize(&[&log], Some(&hosts), &[&artifact]).unwrap();

        assert_eq!(manifest.get(Scope::Issues), Some(AccessLevel::Write));
        assert_eq!(manifest.get(Scope::Actions), Some(AccessLevel::Read));
        assert_eq!(manifest.get(Scope::Packages), None);
    }

    #[test]
    fn test_bad_capture_line_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let capture = temp_dir.path().join("capture.jsonl");
        fs::write(&capture, "{\"method\":\"GET\"}\n").unwrap();

        assert!(matches!(read_capture(&capture), Err(MonitorError::InvalidRecord(_))));
    }
}
