mod parse;
mod rules;

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use carwatch_core::ScrapedListing;
use carwatch_storage::{FetchError, HttpFetcher};
use thiserror::Error;
use tracing::{info, warn};

pub use parse::{ParsedPage, ResultPageParser};
pub use rules::{partial_ratio, ClassifierRules, DEFAULT_FUZZ_CUTOFF};

pub const CRATE_NAME: &str = "carwatch-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[async_trait]
pub trait ListingCollector: Send + Sync {
    fn source_id(&self) -> &str;

    async fn collect(&self) -> Result<Vec<ScrapedListing>, AdapterError>;
}

#[derive(Debug, Clone)]
pub struct FixtureCollector {
    dir: PathBuf,
    parser: ResultPageParser,
}

impl FixtureCollector {
    pub fn new(dir: impl Into<PathBuf>, parser: ResultPageParser) -> Self {
        Self {
            dir: dir.into(),
            parser,
        }
    }

    fn page_paths(&self) -> Result<Vec<PathBuf>, AdapterError> {
        let io_err = |source| AdapterError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut paths = fs::read_dir(&self.dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "html"))
            .collect::<Vec<_>>();
        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl ListingCollector for FixtureCollector {
    fn source_id(&self) -> &str {
        "fixtures"
    }

    async fn collect(&self) -> Result<Vec<ScrapedListing>, AdapterError> {
        let mut out = Vec::new();
        for path in self.page_paths()? {
            let html = read_page(&path)?;
            let page = self.parser.parse(&html)?;
            info!(
                page = %path.display(),
                listings = page.listings.len(),
                off_topic = page.off_topic,
                "parsed fixture page"
            );
            out.extend(page.listings);
        }
        Ok(out)
    }
}

fn read_page(path: &Path) -> Result<String, AdapterError> {
    fs::read_to_string(path).map_err(|source| AdapterError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct HttpCollector {
    http: HttpFetcher,
    page_urls: Vec<String>,
    parser: ResultPageParser,
}

impl HttpCollector {
    pub fn new(http: HttpFetcher, page_urls: Vec<String>, parser: ResultPageParser) -> Self {
        Self {
            http,
            page_urls,
            parser,
        }
    }
}

#[async_trait]
impl ListingCollector for HttpCollector {
    fn source_id(&self) -> &str {
        "http"
    }

    async fn collect(&self) -> Result<Vec<ScrapedListing>, AdapterError> {
        let mut out = Vec::new();
        for url in &self.page_urls {
            let fetched = match self.http.fetch_text(url).await {
                Ok(fetched) => fetched,
                Err(err) => {
                    warn!(%url, error = %err, "result page fetch failed; skipping page");
                    continue;
                }
            };
            let page = self.parser.parse(&fetched.body)?;
            info!(
                %url,
                listings = page.listings.len(),
                off_topic = page.off_topic,
                "parsed result page"
            );
            out.extend(page.listings);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("probe timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("{0}")]
    Message(String),
}

#[async_trait]
pub trait FreshnessProbe: Send + Sync {
    async fn snapshot(&self, link: &str) -> Result<PageSnapshot, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: HttpFetcher,
}

impl HttpProbe {
    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl FreshnessProbe for HttpProbe {
    async fn snapshot(&self, link: &str) -> Result<PageSnapshot, ProbeError> {
        let fetched = self.http.fetch_text(link).await?;
        Ok(PageSnapshot {
            url: fetched.final_url,
            body: fetched.body,
        })
    }
}
