use std::time::Duration;

use carwatch_adapters::{FreshnessProbe, PageSnapshot, ProbeError};
use carwatch_storage::{ListingStore, StoreError};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

pub const DEFAULT_REMOVAL_MARKER: &str = "ya no está disponible";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Delay between consecutive probes. Never applied before the first one.
    pub pacing: Duration,
    pub probe_timeout: Duration,
    pub removal_marker: String,
    pub resume_after: i64,
    pub page_size: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(1500),
            probe_timeout: Duration::from_secs(30),
            removal_marker: DEFAULT_REMOVAL_MARKER.to_string(),
            resume_after: 0,
            page_size: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Present,
    Removed,
}

pub fn classify(snapshot: &PageSnapshot, removal_marker: &str) -> Liveness {
    let marker = removal_marker.trim();
    if marker.is_empty() {
        return Liveness::Present;
    }
    if snapshot.body.to_lowercase().contains(&marker.to_lowercase()) {
        Liveness::Removed
    } else {
        Liveness::Present
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub checked: u64,
    pub removed: u64,
    pub probe_failures: u64,
    pub write_failures: u64,
    /// Highest id probed; pass it back as `resume_after` to continue an interrupted sweep.
    pub last_id: i64,
}

#[derive(Debug, Clone)]
pub struct Sweeper {
    config: SweepConfig,
}

impl Sweeper {
    pub fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub async fn sweep(
        &self,
        store: &ListingStore,
        probe: &dyn FreshnessProbe,
    ) -> Result<SweepSummary, StoreError> {
        let mut summary = SweepSummary {
            last_id: self.config.resume_after,
            ..Default::default()
        };
        let page_size = self.config.page_size.max(1);

        loop {
            let page = store.list_active_after(summary.last_id, page_size).await?;
            let full = page.len() as i64 == page_size;

            for record in page {
                if summary.checked > 0 && !self.config.pacing.is_zero() {
                    tokio::time::sleep(self.config.pacing).await;
                }
                summary.checked += 1;
                summary.last_id = record.id;

                let span = info_span!("probe", id = record.id, link = %record.link);
                let snapshot = match self.probe_once(probe, &record.link).instrument(span).await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        summary.probe_failures += 1;
                        warn!(id = record.id, link = %record.link, error = %err, "probe failed; keeping record available");
                        continue;
                    }
                };

                if classify(&snapshot, &self.config.removal_marker) == Liveness::Present {
                    continue;
                }

                match store.mark_unavailable(record.id).await {
                    Ok(true) => {
                        summary.removed += 1;
                        debug!(id = record.id, "listing marked unavailable");
                    }
                    Ok(false) => {}
                    Err(err) if err.is_unavailable() => return Err(err),
                    Err(err) => {
                        summary.write_failures += 1;
                        warn!(id = record.id, error = %err, "could not mark listing unavailable");
                    }
                }
            }

            if !full {
                break;
            }
        }

        info!(
            checked = summary.checked,
            removed = summary.removed,
            probe_failures = summary.probe_failures,
            "availability sweep finished"
        );
        Ok(summary)
    }

    async fn probe_once(
        &self,
        probe: &dyn FreshnessProbe,
        link: &str,
    ) -> Result<PageSnapshot, ProbeError> {
        match tokio::time::timeout(self.config.probe_timeout, probe.snapshot(link)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.config.probe_timeout)),
        }
    }
}
