use carwatch_core::{ListingRecord, ScrapedListing};
use carwatch_storage::{ListingCandidate, ListingStore, StoreError, UpsertOutcome};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub created: u64,
    pub updated: u64,
    pub parse_failures: u64,
    pub failed: u64,
}

pub fn should_overwrite_price(existing: &ListingRecord, incoming: &ScrapedListing) -> bool {
    !existing.manual_price && !incoming.price.trim().is_empty()
}

pub async fn reconcile(
    store: &ListingStore,
    batch: &[ScrapedListing],
    today: NaiveDate,
) -> Result<ReconcileSummary, StoreError> {
    let mut summary = ReconcileSummary::default();

    for item in batch {
        let link = item.natural_key();
        if link.is_empty() {
            summary.parse_failures += 1;
            debug!(title = %item.title, "skipping scraped item without a link");
            continue;
        }

        let stored = match store.find_by_link(link).await {
            Ok(existing) => store_item(store, link, item, existing, today).await,
            Err(err) => Err(err),
        };
        match stored {
            Ok(outcome) => tally(&mut summary, outcome),
            Err(err) if err.is_unavailable() => return Err(err),
            Err(err) => {
                summary.failed += 1;
                warn!(link, error = %err, "failed to store scraped listing");
            }
        }
    }

    info!(
        batch = batch.len(),
        created = summary.created,
        updated = summary.updated,
        parse_failures = summary.parse_failures,
        failed = summary.failed,
        "reconciled scraped batch"
    );
    Ok(summary)
}

fn tally(summary: &mut ReconcileSummary, outcome: UpsertOutcome) {
    match outcome {
        UpsertOutcome::Created(_) => summary.created += 1,
        UpsertOutcome::Updated(_) | UpsertOutcome::Duplicate => summary.updated += 1,
    }
}

// `existing` is the lookup result; another writer may have stored the link since.
async fn store_item(
    store: &ListingStore,
    link: &str,
    item: &ScrapedListing,
    existing: Option<ListingRecord>,
    today: NaiveDate,
) -> Result<UpsertOutcome, StoreError> {
    let mut candidate = ListingCandidate {
        link: link.to_string(),
        title: item.title.clone(),
        year: item.year.clone(),
        mileage: item.mileage.clone(),
        price: Some(item.price.clone()),
        is_hybrid: item.is_hybrid,
    };

    match existing {
        Some(existing) => {
            if !should_overwrite_price(&existing, item) {
                candidate.price = None;
            }
            store.upsert(&candidate, today).await
        }
        None => store.insert_new(&candidate, today).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn item(link: &str, price: &str, is_hybrid: bool) -> ScrapedListing {
        ScrapedListing {
            title: format!("Ford Maverick {link}"),
            link: link.into(),
            mileage: "12,000".into(),
            price: price.into(),
            is_hybrid,
            year: "2023".into(),
        }
    }

    async fn store() -> ListingStore {
        ListingStore::connect("sqlite::memory:").await.unwrap()
    }

    async fn snapshot(store: &ListingStore) -> Vec<ListingRecord> {
        let mut all = store.list_hybrids(false).await.unwrap();
        all.sort_by_key(|r| r.id);
        all
    }

    #[test]
    fn price_policy_respects_manual_flag_and_blank_prices() {
        let existing = ListingRecord {
            id: 1,
            link: "A".into(),
            title: "Maverick".into(),
            year: "2023".into(),
            mileage: "".into(),
            price: "$10,000".into(),
            is_hybrid: true,
            date_found: day(1),
            still_available: true,
            manual_price: false,
        };
        assert!(should_overwrite_price(&existing, &item("A", "$9,000", true)));
        assert!(!should_overwrite_price(&existing, &item("A", "  ", true)));

        let pinned = ListingRecord {
            manual_price: true,
            ..existing
        };
        assert!(!should_overwrite_price(&pinned, &item("A", "$9,000", true)));
    }

    #[tokio::test]
    async fn first_sighting_creates_and_blank_rescrape_keeps_price() {
        let store = store().await;

        let first = reconcile(&store, &[item("A", "$10,000", true)], day(1)).await.unwrap();
        assert_eq!((first.created, first.updated), (1, 0));
        let a = store.find_by_link("A").await.unwrap().unwrap();
        assert!(a.still_available);
        assert!(!a.manual_price);
        assert_eq!(a.price, "$10,000");

        let second = reconcile(&store, &[item("A", "", true)], day(2)).await.unwrap();
        assert_eq!((second.created, second.updated), (0, 1));
        assert_eq!(store.find_by_link("A").await.unwrap().unwrap().price, "$10,000");
    }

    #[tokio::test]
    async fn reconciling_the_same_batch_twice_is_idempotent() {
        let store = store().await;
        let batch = vec![
            item("A", "$10,000", true),
            item("B", "Llame", true),
            item("C", "$31,000", true),
        ];

        reconcile(&store, &batch, day(1)).await.unwrap();
        let before = snapshot(&store).await;
        let again = reconcile(&store, &batch, day(1)).await.unwrap();

        assert_eq!(again.created, 0);
        assert_eq!(again.updated, 3);
        assert_eq!(snapshot(&store).await, before);
    }

    #[tokio::test]
    async fn manual_price_and_date_found_survive_rescrapes() {
        let store = store().await;
        reconcile(&store, &[item("A", "$10,000", true)], day(1)).await.unwrap();
        store.set_manual_price("A", "$8,500").await.unwrap();

        for (d, price) in [(3, "$11,000"), (9, ""), (20, "$7,000")] {
            reconcile(&store, &[item("A", price, true)], day(d)).await.unwrap();
        }

        let a = store.find_by_link("A").await.unwrap().unwrap();
        assert_eq!(a.price, "$8,500");
        assert!(a.manual_price);
        assert_eq!(a.date_found, day(1));
    }

    #[tokio::test]
    async fn rescrape_revives_unavailable_listing() {
        let store = store().await;
        reconcile(&store, &[item("A", "$10,000", true)], day(1)).await.unwrap();
        let a = store.find_by_link("A").await.unwrap().unwrap();
        store.mark_unavailable(a.id).await.unwrap();

        reconcile(&store, &[item("A", "$9,000", false)], day(5)).await.unwrap();
        let a = store.find_by_link("A").await.unwrap().unwrap();
        assert!(a.still_available);
        assert!(!a.is_hybrid);
        assert_eq!(a.price, "$9,000");
    }

    #[tokio::test]
    async fn link_stored_by_another_writer_counts_as_updated() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("cars.db").display());
        let ours = ListingStore::connect(&url).await.unwrap();
        let theirs = ListingStore::connect(&url).await.unwrap();

        let existing = ours.find_by_link("A").await.unwrap();
        assert!(existing.is_none());
        reconcile(&theirs, &[item("A", "$10,000", true)], day(1)).await.unwrap();

        let outcome = store_item(&ours, "A", &item("A", "$9,000", true), existing, day(1))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Duplicate);

        let mut summary = ReconcileSummary::default();
        tally(&mut summary, outcome);
        assert_eq!((summary.created, summary.updated, summary.failed), (0, 1, 0));
        assert_eq!(ours.count_all().await.unwrap(), 1);
        assert_eq!(ours.find_by_link("A").await.unwrap().unwrap().price, "$10,000");
    }

    #[tokio::test]
    async fn empty_batch_and_linkless_items() {
        let store = store().await;
        assert_eq!(
            reconcile(&store, &[], day(1)).await.unwrap(),
            ReconcileSummary::default()
        );

        let summary = reconcile(
            &store,
            &[item("", "$5,000", true), item("  ", "$6,000", true), item("B", "$7,000", true)],
            day(1),
        )
        .await
        .unwrap();
        assert_eq!(summary.parse_failures, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(store.count_all().await.unwrap(), 1);
    }
}
