mod config;
mod reconcile;
mod sweep;

use std::time::Duration;

use anyhow::{Context, Result};
use carwatch_adapters::{
    ClassifierRules, FixtureCollector, FreshnessProbe, HttpCollector, HttpProbe, ListingCollector,
    ResultPageParser,
};
use carwatch_report::{
    render_digest, Notifier, OutboxNotifier, RenderedReport, RunStats, ViewBuilder, ViewCounts,
};
use carwatch_storage::{BackoffPolicy, HttpClientConfig, HttpFetcher, ListingStore, MigrationReport};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub use config::SyncConfig;
pub use reconcile::{reconcile, should_overwrite_price, ReconcileSummary};
pub use sweep::{classify, Liveness, SweepConfig, SweepSummary, Sweeper, DEFAULT_REMOVAL_MARKER};

pub const CRATE_NAME: &str = "carwatch-sync";

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source_id: String,
    pub batch_size: usize,
    pub reconcile: ReconcileSummary,
    pub sweep: Option<SweepSummary>,
    pub counts: ViewCounts,
    pub total_in_store: u64,
    pub report_subject: String,
}

pub struct SyncPipeline {
    config: SyncConfig,
    collector: Box<dyn ListingCollector>,
    probe: Box<dyn FreshnessProbe>,
    notifier: Box<dyn Notifier>,
}

impl SyncPipeline {
    pub fn from_config(config: SyncConfig, today: NaiveDate) -> Result<Self> {
        let mut rules =
            ClassifierRules::for_search_term(&config.search_term).with_fuzz_cutoff(config.fuzz_cutoff);
        if let Some(path) = &config.rules_path {
            rules = rules.with_rules_file(path)?;
        }
        let parser = ResultPageParser::new(config.base_url.clone(), rules, today);

        let collector: Box<dyn ListingCollector> = if config.source_urls.is_empty() {
            Box::new(FixtureCollector::new(config.fixtures_dir.clone(), parser))
        } else {
            let http = HttpFetcher::new(http_config(&config, BackoffPolicy::default()))?;
            Box::new(HttpCollector::new(http, config.source_urls.clone(), parser))
        };
        let probe = HttpProbe::new(HttpFetcher::new(http_config(&config, BackoffPolicy::none()))?);
        let notifier = OutboxNotifier::new(config.outbox_dir.clone());

        Ok(Self::with_collaborators(
            config,
            collector,
            Box::new(probe),
            Box::new(notifier),
        ))
    }

    pub fn with_collaborators(
        config: SyncConfig,
        collector: Box<dyn ListingCollector>,
        probe: Box<dyn FreshnessProbe>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            collector,
            probe,
            notifier,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn run_once(&self, today: NaiveDate) -> Result<SyncRunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id, source = self.collector.source_id());
        self.run_phases(run_id, today).instrument(span).await
    }

    async fn run_phases(&self, run_id: Uuid, today: NaiveDate) -> Result<SyncRunSummary> {
        let started_at = Utc::now();
        let store = ListingStore::connect(&self.config.database_url)
            .await
            .with_context(|| format!("opening listing store {}", self.config.database_url))?;

        let batch = self
            .collector
            .collect()
            .await
            .with_context(|| format!("collecting from {}", self.collector.source_id()))?;
        info!(items = batch.len(), "collected scraped batch");

        let reconciled = reconcile(&store, &batch, today)
            .await
            .context("reconciling scraped batch")?;

        let swept = if self.config.sweep_enabled {
            let summary = Sweeper::new(self.config.sweep.clone())
                .sweep(&store, self.probe.as_ref())
                .await
                .context("sweeping listing availability")?;
            Some(summary)
        } else {
            None
        };

        let views = ViewBuilder::new(self.config.views)
            .build(&store, today)
            .await
            .context("building listing views")?;

        let stats = RunStats {
            created: reconciled.created,
            updated: reconciled.updated,
            parse_failures: reconciled.parse_failures,
            failed: reconciled.failed,
            swept: swept.is_some(),
            checked: swept.map_or(0, |s| s.checked),
            removed: swept.map_or(0, |s| s.removed),
            probe_failures: swept.map_or(0, |s| s.probe_failures),
        };
        let report = render_digest(&self.config.search_term, stats, &batch, &views, &self.config.views)
            .context("rendering daily digest")?;

        self.notifier
            .deliver(&report, &self.config.report_to)
            .await
            .with_context(|| format!("delivering report to {}", self.config.report_to))?;

        let summary = SyncRunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            source_id: self.collector.source_id().to_string(),
            batch_size: batch.len(),
            reconcile: reconciled,
            sweep: swept,
            counts: views.counts,
            total_in_store: views.total_in_store,
            report_subject: report.subject,
        };
        info!(
            created = summary.reconcile.created,
            updated = summary.reconcile.updated,
            removed = summary.sweep.map_or(0, |s| s.removed),
            "sync run complete"
        );
        Ok(summary)
    }

    pub async fn maybe_build_scheduler(&self) -> Result<Option<JobScheduler>> {
        if !self.config.scheduler_enabled {
            return Ok(None);
        }

        let sched = JobScheduler::new().await.context("creating scheduler")?;
        let cron = self.config.sync_cron.clone();
        let config = self.config.clone();
        let job = Job::new_async(cron.as_str(), move |_uuid, _l| {
            let config = config.clone();
            Box::pin(async move {
                if let Err(err) = run_sync_once(config, Local::now().date_naive()).await {
                    error!(error = ?err, "scheduled sync failed");
                }
            })
        })
        .with_context(|| format!("creating scheduler job for cron {cron}"))?;
        sched.add(job).await.context("adding scheduler job")?;
        Ok(Some(sched))
    }
}

fn http_config(config: &SyncConfig, backoff: BackoffPolicy) -> HttpClientConfig {
    HttpClientConfig {
        timeout: Duration::from_secs(config.http_timeout_secs),
        user_agent: Some(config.user_agent.clone()),
        backoff,
    }
}

pub async fn run_sync_once(config: SyncConfig, today: NaiveDate) -> Result<SyncRunSummary> {
    SyncPipeline::from_config(config, today)?.run_once(today).await
}

pub async fn run_sync_once_from_env() -> Result<SyncRunSummary> {
    run_sync_once(SyncConfig::from_env(), Local::now().date_naive()).await
}

/// Standalone availability pass; `resume_after` overrides `CARWATCH_SWEEP_RESUME_AFTER`.
pub async fn run_sweep_once_from_env(resume_after: Option<i64>) -> Result<SweepSummary> {
    let mut config = SyncConfig::from_env();
    if let Some(id) = resume_after {
        config.sweep.resume_after = id;
    }
    let store = ListingStore::connect(&config.database_url)
        .await
        .with_context(|| format!("opening listing store {}", config.database_url))?;
    let probe = HttpProbe::new(HttpFetcher::new(http_config(&config, BackoffPolicy::none()))?);
    let summary = Sweeper::new(config.sweep.clone())
        .sweep(&store, &probe)
        .await
        .context("sweeping listing availability")?;
    Ok(summary)
}

pub async fn report_from_env() -> Result<RenderedReport> {
    let config = SyncConfig::from_env();
    let today = Local::now().date_naive();
    let store = ListingStore::connect(&config.database_url)
        .await
        .with_context(|| format!("opening listing store {}", config.database_url))?;
    let views = ViewBuilder::new(config.views)
        .build(&store, today)
        .await
        .context("building listing views")?;
    let report = render_digest(&config.search_term, RunStats::default(), &[], &views, &config.views)?;
    Ok(report)
}

pub async fn migrate_from_env() -> Result<MigrationReport> {
    let config = SyncConfig::from_env();
    let store = ListingStore::open(&config.database_url)
        .await
        .with_context(|| format!("opening listing store {}", config.database_url))?;
    let report = store
        .migrate(Local::now().date_naive())
        .await
        .context("migrating listing schema")?;
    Ok(report)
}
