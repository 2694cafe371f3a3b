use anyhow::{Context, Result};
use carwatch_storage::ListingStore;
use carwatch_sync::{SyncConfig, SyncPipeline};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "carwatch")]
#[command(about = "Classifieds car listing watcher")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect, reconcile, optionally sweep, then deliver the daily digest.
    Sync,
    /// Re-check every available listing for the removal marker.
    Sweep {
        /// Skip ids up to this one; pass the `last_id` of an interrupted sweep.
        #[arg(long)]
        resume_after: Option<i64>,
    },
    /// Print today's digest HTML from the store without scraping.
    Report,
    /// Create or upgrade the listing table.
    Migrate,
    /// Pin a listing's price so rescrapes stop overwriting it.
    SetPrice { link: String, price: String },
    /// Let rescrapes manage a listing's price again.
    ClearPrice { link: String },
    /// Run `sync` on CARWATCH_SYNC_CRON until interrupted.
    Schedule,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let summary = carwatch_sync::run_sync_once_from_env().await?;
            println!(
                "sync complete: run_id={} batch={} created={} updated={} parse_failures={} removed={} report=\"{}\"",
                summary.run_id,
                summary.batch_size,
                summary.reconcile.created,
                summary.reconcile.updated,
                summary.reconcile.parse_failures,
                summary.sweep.map_or(0, |s| s.removed),
                summary.report_subject
            );
        }
        Commands::Sweep { resume_after } => {
            let summary = carwatch_sync::run_sweep_once_from_env(resume_after).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Report => {
            let report = carwatch_sync::report_from_env().await?;
            println!("{}", report.html_body);
        }
        Commands::Migrate => {
            let report = carwatch_sync::migrate_from_env().await?;
            println!(
                "migrate complete: added_columns={:?} backfilled_years={}",
                report.added_columns, report.backfilled_years
            );
        }
        Commands::SetPrice { link, price } => {
            let store = open_store().await?;
            if !store.set_manual_price(&link, &price).await? {
                anyhow::bail!("no listing with link {link}");
            }
            println!("price pinned: {link} -> {price}");
        }
        Commands::ClearPrice { link } => {
            let store = open_store().await?;
            if !store.clear_manual_price(&link).await? {
                anyhow::bail!("no listing with link {link}");
            }
            println!("price unpinned: {link}");
        }
        Commands::Schedule => {
            let mut config = SyncConfig::from_env();
            config.scheduler_enabled = true;
            let pipeline = SyncPipeline::from_config(config, Local::now().date_naive())?;
            let Some(mut sched) = pipeline.maybe_build_scheduler().await? else {
                anyhow::bail!("scheduler could not be built");
            };
            sched.start().await.context("starting scheduler")?;
            info!(cron = %pipeline.config().sync_cron, "scheduler running; ctrl-c to stop");
            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            sched.shutdown().await.context("stopping scheduler")?;
        }
    }

    Ok(())
}

async fn open_store() -> Result<ListingStore> {
    let config = SyncConfig::from_env();
    ListingStore::connect(&config.database_url)
        .await
        .with_context(|| format!("opening listing store {}", config.database_url))
}
