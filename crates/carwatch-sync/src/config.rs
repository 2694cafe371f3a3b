use std::path::PathBuf;
use std::time::Duration;

use carwatch_adapters::DEFAULT_FUZZ_CUTOFF;
use carwatch_report::ViewConfig;

use crate::sweep::SweepConfig;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_url: String,
    pub search_term: String,
    pub fuzz_cutoff: u8,
    pub rules_path: Option<PathBuf>,
    pub base_url: String,
    pub source_urls: Vec<String>,
    pub fixtures_dir: PathBuf,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub sweep_enabled: bool,
    pub sweep: SweepConfig,
    pub views: ViewConfig,
    pub report_to: String,
    pub outbox_dir: PathBuf,
    pub scheduler_enabled: bool,
    pub sync_cron: String,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True" | "yes"))
                .unwrap_or(default)
        };
        let sweep_defaults = SweepConfig::default();
        let view_defaults = ViewConfig::default();

        Self {
            database_url: text("DATABASE_URL", "sqlite://carwatch.db"),
            search_term: text("CARWATCH_SEARCH_TERM", "Maverick"),
            fuzz_cutoff: parsed(&lookup, "CARWATCH_FUZZ_CUTOFF").unwrap_or(DEFAULT_FUZZ_CUTOFF),
            rules_path: lookup("CARWATCH_RULES_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            base_url: text("CARWATCH_BASE_URL", "https://www.clasificadosonline.com"),
            source_urls: lookup("CARWATCH_SOURCE_URLS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|url| !url.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            fixtures_dir: PathBuf::from(text("CARWATCH_FIXTURES_DIR", "./fixtures/pages")),
            user_agent: text("CARWATCH_USER_AGENT", "carwatch-bot/0.1"),
            http_timeout_secs: parsed(&lookup, "CARWATCH_HTTP_TIMEOUT_SECS").unwrap_or(20),
            sweep_enabled: flag("CARWATCH_SWEEP_ENABLED", false),
            sweep: SweepConfig {
                pacing: parsed(&lookup, "CARWATCH_SWEEP_PACING_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(sweep_defaults.pacing),
                probe_timeout: parsed(&lookup, "CARWATCH_PROBE_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(sweep_defaults.probe_timeout),
                removal_marker: lookup("CARWATCH_REMOVAL_MARKER")
                    .unwrap_or_else(|| sweep_defaults.removal_marker.clone()),
                resume_after: parsed(&lookup, "CARWATCH_SWEEP_RESUME_AFTER")
                    .unwrap_or(sweep_defaults.resume_after),
                ..sweep_defaults
            },
            views: ViewConfig {
                price_cap: parsed(&lookup, "CARWATCH_PRICE_CAP").unwrap_or(view_defaults.price_cap),
                aged_days: parsed(&lookup, "CARWATCH_AGED_DAYS").unwrap_or(view_defaults.aged_days),
                limit: parsed(&lookup, "CARWATCH_VIEW_LIMIT").unwrap_or(view_defaults.limit),
                available_only: flag("CARWATCH_AVAILABLE_ONLY", view_defaults.available_only),
            },
            report_to: text("CARWATCH_REPORT_TO", "me@localhost"),
            outbox_dir: PathBuf::from(text("CARWATCH_OUTBOX_DIR", "./outbox")),
            scheduler_enabled: flag("CARWATCH_SCHEDULER_ENABLED", false),
            sync_cron: text("CARWATCH_SYNC_CRON", "0 0 7 * * *"),
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
