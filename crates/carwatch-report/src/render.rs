use askama::Template;
use carwatch_core::{parse_price, ScrapedListing};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::views::{DigestViews, ListingView, ViewConfig, ViewCounts};

const SAMPLE_SIZE: usize = 10;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("rendering digest template: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub created: u64,
    pub updated: u64,
    pub parse_failures: u64,
    pub failed: u64,
    pub swept: bool,
    pub checked: u64,
    pub removed: u64,
    pub probe_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    pub date: NaiveDate,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Clone)]
struct DigestRow {
    title: String,
    year: String,
    price: String,
    mileage: String,
    link: String,
    days_on_market: i64,
}

impl DigestRow {
    fn from_view(view: &ListingView) -> Self {
        Self {
            title: view.record.title.clone(),
            year: view.record.year.clone(),
            price: view.record.price.clone(),
            mileage: view.record.mileage.clone(),
            link: view.record.link.clone(),
            days_on_market: view.days_on_market,
        }
    }

    fn from_scraped(item: &ScrapedListing) -> Self {
        Self {
            title: item.title.clone(),
            year: item.year.clone(),
            price: item.price.clone(),
            mileage: item.mileage.clone(),
            link: item.link.clone(),
            days_on_market: 0,
        }
    }
}

#[derive(Template)]
#[template(path = "digest.html")]
struct DigestTemplate<'a> {
    search_term: &'a str,
    date: NaiveDate,
    stats: RunStats,
    hybrids_today: usize,
    cheapest_today: Option<DigestRow>,
    total_in_store: u64,
    counts: ViewCounts,
    aged_days: i64,
    price_cap: u64,
    cheapest: Vec<DigestRow>,
    aged: Vec<DigestRow>,
    sample: Vec<DigestRow>,
}

fn cheapest_in_batch(batch: &[ScrapedListing]) -> Option<&ScrapedListing> {
    batch
        .iter()
        .filter(|item| item.is_hybrid)
        .filter_map(|item| parse_price(&item.price).map(|price| (price, item)))
        .min_by_key(|(price, _)| *price)
        .map(|(_, item)| item)
}

pub fn report_subject(search_term: &str, date: NaiveDate) -> String {
    format!("{search_term} Daily Report - {date}")
}

pub fn render_digest(
    search_term: &str,
    stats: RunStats,
    batch: &[ScrapedListing],
    views: &DigestViews,
    config: &ViewConfig,
) -> Result<RenderedReport, RenderError> {
    let template = DigestTemplate {
        search_term,
        date: views.today,
        stats,
        hybrids_today: batch.iter().filter(|item| item.is_hybrid).count(),
        cheapest_today: cheapest_in_batch(batch).map(DigestRow::from_scraped),
        total_in_store: views.total_in_store,
        counts: views.counts,
        aged_days: config.aged_days,
        price_cap: config.price_cap,
        cheapest: views.cheapest_hybrids.iter().map(DigestRow::from_view).collect(),
        aged: views.aged_under_cap.iter().map(DigestRow::from_view).collect(),
        sample: batch.iter().take(SAMPLE_SIZE).map(DigestRow::from_scraped).collect(),
    };

    Ok(RenderedReport {
        date: views.today,
        subject: report_subject(search_term, views.today),
        html_body: template.render()?,
    })
}
