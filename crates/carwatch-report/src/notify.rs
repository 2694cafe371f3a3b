use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::render::RenderedReport;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing envelope: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, report: &RenderedReport, address: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a> {
    pub to: &'a str,
    pub subject: &'a str,
    pub body_file: &'a str,
    pub written_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    root: PathBuf,
}

impl OutboxNotifier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn report_dir(&self, report: &RenderedReport) -> PathBuf {
        self.root.join(report.date.to_string())
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn deliver(&self, report: &RenderedReport, address: &str) -> Result<(), NotifyError> {
        if address.trim().is_empty() {
            return Err(NotifyError::Rejected("empty delivery address".to_string()));
        }

        let dir = self.report_dir(report);
        fs::create_dir_all(&dir).await.map_err(|source| NotifyError::Io {
            path: dir.clone(),
            source,
        })?;

        write_atomically(&dir.join("report.html"), report.html_body.as_bytes()).await?;

        let envelope = Envelope {
            to: address,
            subject: &report.subject,
            body_file: "report.html",
            written_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        write_atomically(&dir.join("envelope.json"), &bytes).await?;

        info!(outbox = %dir.display(), to = address, subject = %report.subject, "report queued");
        Ok(())
    }
}

// Temp file + rename so a reader never sees a half-written report.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), NotifyError> {
    let io_err = |source| NotifyError::Io {
        path: path.to_path_buf(),
        source,
    };
    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path).await.map_err(io_err)?;
    file.write_all(bytes).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;
    drop(file);

    if let Err(source) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(io_err(source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn report() -> RenderedReport {
        RenderedReport {
            date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            subject: "Maverick Daily Report - 2025-06-30".into(),
            html_body: "<h2>hello</h2>".into(),
        }
    }

    #[tokio::test]
    async fn outbox_writes_body_and_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = OutboxNotifier::new(dir.path());
        notifier.deliver(&report(), "me@example.com").await.unwrap();

        let day_dir = dir.path().join("2025-06-30");
        let body = std::fs::read_to_string(day_dir.join("report.html")).unwrap();
        assert_eq!(body, "<h2>hello</h2>");

        let envelope: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(day_dir.join("envelope.json")).unwrap())
                .unwrap();
        assert_eq!(envelope["to"], "me@example.com");
        assert_eq!(envelope["subject"], "Maverick Daily Report - 2025-06-30");
        assert!(!day_dir.join("report.tmp").exists());
    }

    #[tokio::test]
    async fn blank_address_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = OutboxNotifier::new(dir.path());
        let err = notifier.deliver(&report(), "  ").await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(_)));
        assert!(!dir.path().join("2025-06-30").exists());
    }
}
