use std::cmp::Ordering;

use carwatch_core::ListingRecord;
use carwatch_storage::{ListingFilter, ListingStore, StoreResult};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    pub price_cap: u64,
    pub aged_days: i64,
    pub limit: usize,
    pub available_only: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            price_cap: 30_000,
            aged_days: 14,
            limit: 12,
            available_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingView {
    pub record: ListingRecord,
    pub numeric_price: Option<u64>,
    pub numeric_mileage: Option<u64>,
    pub days_on_market: i64,
}

impl ListingView {
    pub fn derive(record: ListingRecord, today: NaiveDate) -> Self {
        Self {
            numeric_price: record.numeric_price(),
            numeric_mileage: record.numeric_mileage(),
            days_on_market: record.days_on_market(today),
            record,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViewCounts {
    pub hybrids_total: u64,
    pub aged_hybrids: u64,
    pub aged_under_cap: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestViews {
    pub today: NaiveDate,
    pub cheapest_hybrids: Vec<ListingView>,
    pub aged_under_cap: Vec<ListingView>,
    pub counts: ViewCounts,
    pub total_in_store: u64,
}

// Known values ascending, unknowns after all of them.
fn known_first(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Price ascending, then mileage ascending, then id; unknown prices and mileages sort last.
pub fn cheapest_first(mut views: Vec<ListingView>, limit: usize) -> Vec<ListingView> {
    views.sort_by(|a, b| {
        known_first(a.numeric_price, b.numeric_price)
            .then_with(|| known_first(a.numeric_mileage, b.numeric_mileage))
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    views.truncate(limit);
    views
}

pub fn aged_under_cap(
    views: &[ListingView],
    price_cap: u64,
    aged_days: i64,
    limit: usize,
) -> Vec<ListingView> {
    let mut out: Vec<ListingView> = views
        .iter()
        .filter(|v| v.numeric_price.is_some_and(|price| price <= price_cap))
        .filter(|v| v.days_on_market >= aged_days)
        .cloned()
        .collect();
    out.sort_by(|a, b| {
        b.days_on_market
            .cmp(&a.days_on_market)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    out.truncate(limit);
    out
}

#[derive(Debug, Clone, Copy)]
pub struct ViewBuilder {
    config: ViewConfig,
}

impl ViewBuilder {
    pub fn new(config: ViewConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub async fn build(&self, store: &ListingStore, today: NaiveDate) -> StoreResult<DigestViews> {
        let hybrids: Vec<ListingView> = store
            .list_hybrids(self.config.available_only)
            .await?
            .into_iter()
            .map(|record| ListingView::derive(record, today))
            .collect();

        let aged = aged_under_cap(
            &hybrids,
            self.config.price_cap,
            self.config.aged_days,
            self.config.limit,
        );
        let cheapest = cheapest_first(hybrids, self.config.limit);

        Ok(DigestViews {
            today,
            cheapest_hybrids: cheapest,
            aged_under_cap: aged,
            counts: self.counts(store, today).await?,
            total_in_store: store.count_all().await?,
        })
    }

    pub async fn counts(&self, store: &ListingStore, today: NaiveDate) -> StoreResult<ViewCounts> {
        let hybrids = ListingFilter {
            hybrid_only: true,
            available_only: self.config.available_only,
            ..Default::default()
        };
        let aged = ListingFilter {
            min_age_days: Some(self.config.aged_days),
            ..hybrids
        };
        let aged_capped = ListingFilter {
            max_price: Some(self.config.price_cap),
            ..aged
        };

        Ok(ViewCounts {
            hybrids_total: store.count_matching(&hybrids, today).await?,
            aged_hybrids: store.count_matching(&aged, today).await?,
            aged_under_cap: store.count_matching(&aged_capped, today).await?,
        })
    }
}
