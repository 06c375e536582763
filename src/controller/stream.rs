use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::controller::watch::{ListerWatcher, Notification};
use crate::event::Event;
use crate::queue::ChangeKind;

/// One line of the watch wire format: `{"type":"ADDED","object":{...}}`.
#[derive(Debug, Deserialize)]
struct WatchLine {
    #[serde(rename = "type")]
    change_type: String,
    #[serde(default)]
    object: Option<Event>,
}

/// Reads watch notifications as newline-delimited JSON from a file or
/// stdin, the same shape the platform's watch endpoint emits. The stream
/// counts as synced from the moment it opens; every line is live.
pub struct JsonStreamWatcher {
    source: Option<PathBuf>,
}

impl JsonStreamWatcher {
    /// Watch a file of JSON lines. Each controller opens its own reader.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
        }
    }

    /// Watch the process's stdin. Only one controller can consume it.
    pub fn stdin() -> Self {
        Self { source: None }
    }
}

impl ListerWatcher for JsonStreamWatcher {
    async fn watch(
        &self,
        namespace: &str,
        token: CancellationToken,
    ) -> Result<mpsc::Receiver<Notification>> {
        let (tx, rx) = mpsc::channel(64);
        let namespace = namespace.to_string();
        match &self.source {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("opening watch source {}", path.display()))?;
                tokio::spawn(read_stream(BufReader::new(file), namespace, tx, token));
            }
            None => {
                tokio::spawn(read_stream(
                    BufReader::new(tokio::io::stdin()),
                    namespace,
                    tx,
                    token,
                ));
            }
        }
        Ok(rx)
    }
}

async fn read_stream<R>(
    reader: R,
    namespace: String,
    tx: mpsc::Sender<Notification>,
    token: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    if tx.send(Notification::Synced).await.is_err() {
        return;
    }

    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            _ = token.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "reading watch stream");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let parsed: WatchLine = match serde_json::from_str(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "malformed watch line, skipping");
                continue;
            }
        };

        let change = match parsed.change_type.as_str() {
            "ADDED" => ChangeKind::Added,
            "MODIFIED" => ChangeKind::Modified,
            other => {
                debug!(change_type = other, "ignoring watch line");
                continue;
            }
        };
        let Some(event) = parsed.object else {
            warn!(change_type = %parsed.change_type, "watch line without object, skipping");
            continue;
        };

        // Namespaced watches drop events from other namespaces.
        if !namespace.is_empty() && event.metadata.namespace != namespace {
            continue;
        }

        if tx.send(Notification::Apply(change, event)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect(path: &std::path::Path, namespace: &str) -> Vec<Notification> {
        let watcher = JsonStreamWatcher::from_path(path);
        let token = CancellationToken::new();
        let mut rx = watcher.watch(namespace, token).await.expect("watch");
        let mut notifications = Vec::new();
        while let Some(notification) = rx.recv().await {
            notifications.push(notification);
        }
        notifications
    }

    fn watch_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        for line in lines {
            writeln!(file, "{line}").expect("write");
        }
        file
    }

    #[tokio::test]
    async fn test_synced_first_then_events_in_order() {
        let file = watch_file(&[
            r#"{"type":"ADDED","object":{"metadata":{"name":"a.1","namespace":"logging"}}}"#,
            r#"{"type":"MODIFIED","object":{"metadata":{"name":"a.1","namespace":"logging","resourceVersion":"2"}}}"#,
        ]);

        let notifications = collect(file.path(), "").await;
        assert_eq!(notifications.len(), 3);
        assert!(matches!(notifications[0], Notification::Synced));
        assert!(matches!(
            &notifications[1],
            Notification::Apply(ChangeKind::Added, event) if event.key() == "logging/a.1"
        ));
        assert!(matches!(
            &notifications[2],
            Notification::Apply(ChangeKind::Modified, _)
        ));
    }

    #[tokio::test]
    async fn test_namespace_scoped_watch_filters() {
        let file = watch_file(&[
            r#"{"type":"ADDED","object":{"metadata":{"name":"a.1","namespace":"logging"}}}"#,
            r#"{"type":"ADDED","object":{"metadata":{"name":"b.1","namespace":"tracing"}}}"#,
        ]);

        let notifications = collect(file.path(), "tracing").await;
        assert_eq!(notifications.len(), 2);
        assert!(matches!(
            &notifications[1],
            Notification::Apply(ChangeKind::Added, event) if event.key() == "tracing/b.1"
        ));
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_lines_are_skipped() {
        let file = watch_file(&[
            "not json",
            r#"{"type":"DELETED","object":{"metadata":{"name":"a.1"}}}"#,
            r#"{"type":"ADDED"}"#,
            r#"{"type":"ADDED","object":{"metadata":{"name":"b.1","namespace":"logging"}}}"#,
        ]);

        let notifications = collect(file.path(), "").await;
        assert_eq!(notifications.len(), 2);
        assert!(matches!(
            &notifications[1],
            Notification::Apply(ChangeKind::Added, event) if event.metadata.name == "b.1"
        ));
    }

    #[tokio::test]
    async fn test_missing_source_file_is_an_error() {
        let watcher = JsonStreamWatcher::from_path("/nonexistent/events.json");
        let token = CancellationToken::new();
        assert!(watcher.watch("", token).await.is_err());
    }
}
