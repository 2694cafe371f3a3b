use std::str::FromStr;
use std::time::Duration;

use carwatch_core::{extract_year, parse_price, ListingRecord, UNKNOWN_YEAR};
use chrono::{Local, NaiveDate};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use thiserror::Error;
use tracing::{debug, info, warn};

const ACTIVE_PAGE_SIZE: i64 = 500;

const LEGACY_TABLE: &str = "cars";

const SELECT_COLUMNS: &str = "id, link, title, year, mileage, price, is_hybrid, date_found, still_available, manual_price";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("listing store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("listing store query failed: {0}")]
    Database(#[source] sqlx::Error),
    #[error("listing store migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err),
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// `price: None` keeps whatever price is stored (or stores an empty price on create).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCandidate {
    pub link: String,
    pub title: String,
    pub year: String,
    pub mileage: String,
    pub price: Option<String>,
    pub is_hybrid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(i64),
    Updated(i64),
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub hybrid_only: bool,
    pub available_only: bool,
    pub max_price: Option<u64>,
    pub min_age_days: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub adopted_legacy_table: bool,
    pub added_columns: Vec<&'static str>,
    pub backfilled_years: u64,
}

#[derive(Debug, Clone)]
pub struct ListingStore {
    pool: SqlitePool,
}

impl ListingStore {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let store = Self::open(database_url).await?;
        let report = store.migrate(Local::now().date_naive()).await?;
        if !report.added_columns.is_empty() || report.backfilled_years > 0 {
            info!(
                added_columns = ?report.added_columns,
                backfilled_years = report.backfilled_years,
                "listing schema upgraded"
            );
        }
        Ok(store)
    }

    pub async fn open(database_url: &str) -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str(database_url)
            .map_err(StoreError::Unavailable)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(StoreError::Unavailable)?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self, today: NaiveDate) -> StoreResult<MigrationReport> {
        let adopted_legacy_table = self.adopt_legacy_table(today).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link TEXT NOT NULL UNIQUE,
                title TEXT,
                mileage TEXT,
                price TEXT,
                is_hybrid BOOLEAN,
                date_found DATE NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let existing: Vec<String> = sqlx::query("SELECT name FROM pragma_table_info('listings')")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()?;

        let upgrades: [(&'static str, &str); 3] = [
            (
                "still_available",
                "ALTER TABLE listings ADD COLUMN still_available BOOLEAN NOT NULL DEFAULT 1",
            ),
            (
                "manual_price",
                "ALTER TABLE listings ADD COLUMN manual_price BOOLEAN NOT NULL DEFAULT 0",
            ),
            (
                "year",
                "ALTER TABLE listings ADD COLUMN year TEXT NOT NULL DEFAULT 'Unknown'",
            ),
        ];

        let mut report = MigrationReport {
            adopted_legacy_table,
            ..MigrationReport::default()
        };
        for (column, ddl) in upgrades {
            if existing.iter().any(|name| name == column) {
                continue;
            }
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|err| StoreError::Migration(format!("adding column {column}: {err}")))?;
            report.added_columns.push(column);
        }

        report.backfilled_years = self.backfill_years(today).await?;
        Ok(report)
    }

    // Older databases keep their rows in `cars`, with the title in a `listing` column.
    async fn adopt_legacy_table(&self, today: NaiveDate) -> StoreResult<bool> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN (?, 'listings')",
        )
        .bind(LEGACY_TABLE)
        .fetch_all(&self.pool)
        .await?;
        let has = |name: &str| tables.iter().any(|t| t == name);
        if !has(LEGACY_TABLE) {
            return Ok(false);
        }
        if has("listings") {
            warn!("both `{LEGACY_TABLE}` and `listings` exist; leaving `{LEGACY_TABLE}` untouched");
            return Ok(false);
        }

        let migration_err = |step: &str, err: sqlx::Error| StoreError::Migration(format!("{step}: {err}"));
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("ALTER TABLE {LEGACY_TABLE} RENAME TO listings"))
            .execute(&mut *tx)
            .await
            .map_err(|err| migration_err("renaming legacy table", err))?;

        let title_column: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('listings') WHERE name = 'listing'",
        )
        .fetch_one(&mut *tx)
        .await?;
        if title_column > 0 {
            sqlx::query("ALTER TABLE listings RENAME COLUMN listing TO title")
                .execute(&mut *tx)
                .await
                .map_err(|err| migration_err("renaming listing column", err))?;
        }

        sqlx::query("UPDATE listings SET date_found = ? WHERE date_found IS NULL")
            .bind(today)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn backfill_years(&self, today: NaiveDate) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query("SELECT id, title FROM listings WHERE year IS NULL OR year = ?")
            .bind(UNKNOWN_YEAR)
            .fetch_all(&mut *tx)
            .await?;

        let mut updated = 0;
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let title: Option<String> = row.try_get("title")?;
            let year = extract_year(title.as_deref().unwrap_or_default(), today);
            if year == UNKNOWN_YEAR {
                continue;
            }
            sqlx::query("UPDATE listings SET year = ? WHERE id = ?")
                .bind(&year)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            updated += 1;
        }
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn find_by_link(&self, link: &str) -> StoreResult<Option<ListingRecord>> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM listings WHERE link = ?"))
            .bind(link)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose().map_err(Into::into)
    }

    /// Create-or-update keyed on `link`, committed as one transaction.
    ///
    /// The `?5` guard only replaces the price when the candidate carries one and the
    /// stored row is not operator-priced.
    pub async fn upsert(
        &self,
        candidate: &ListingCandidate,
        today: NaiveDate,
    ) -> StoreResult<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;

        // Writing first makes the transaction take the write lock before it reads.
        if let Some(id) = insert_if_absent(&mut *tx, candidate, today).await? {
            tx.commit().await?;
            return Ok(UpsertOutcome::Created(id));
        }

        let id: i64 = sqlx::query_scalar("SELECT id FROM listings WHERE link = ?")
            .bind(&candidate.link)
            .fetch_one(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            UPDATE listings
               SET title = ?1,
                   year = ?2,
                   mileage = ?3,
                   is_hybrid = ?4,
                   still_available = 1,
                   price = CASE WHEN ?5 IS NOT NULL AND manual_price = 0 THEN ?5 ELSE price END
             WHERE id = ?6
            "#,
        )
        .bind(&candidate.title)
        .bind(&candidate.year)
        .bind(&candidate.mileage)
        .bind(candidate.is_hybrid)
        .bind(candidate.price.as_deref())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(UpsertOutcome::Updated(id))
    }

    /// Create only; `Duplicate` when the link was stored after the caller looked it up.
    pub async fn insert_new(
        &self,
        candidate: &ListingCandidate,
        today: NaiveDate,
    ) -> StoreResult<UpsertOutcome> {
        match insert_if_absent(&self.pool, candidate, today).await? {
            Some(id) => Ok(UpsertOutcome::Created(id)),
            None => {
                debug!(link = %candidate.link, "link already stored; treating as duplicate");
                Ok(UpsertOutcome::Duplicate)
            }
        }
    }

    pub async fn mark_unavailable(&self, id: i64) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE listings SET still_available = 0 WHERE id = ? AND still_available = 1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_active_after(&self, after_id: i64, limit: i64) -> StoreResult<Vec<ListingRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM listings WHERE still_available = 1 AND id > ? ORDER BY id ASC LIMIT ?"
        ))
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    pub async fn list_active(&self) -> StoreResult<Vec<ListingRecord>> {
        let mut out = Vec::new();
        let mut after_id = 0;
        loop {
            let page = self.list_active_after(after_id, ACTIVE_PAGE_SIZE).await?;
            let Some(last) = page.last() else {
                break;
            };
            after_id = last.id;
            let full = page.len() as i64 == ACTIVE_PAGE_SIZE;
            out.extend(page);
            if !full {
                break;
            }
        }
        Ok(out)
    }

    pub async fn list_hybrids(&self, available_only: bool) -> StoreResult<Vec<ListingRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM listings WHERE is_hybrid = 1 AND (?1 = 0 OR still_available = 1) ORDER BY id ASC"
        ))
        .bind(available_only)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    pub async fn count_all(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    pub async fn count_matching(&self, filter: &ListingFilter, today: NaiveDate) -> StoreResult<u64> {
        let found_on_or_before = filter
            .min_age_days
            .map(|days| today - chrono::Duration::days(days));

        let where_clause = "(?1 = 0 OR is_hybrid = 1) \
             AND (?2 = 0 OR still_available = 1) \
             AND (?3 IS NULL OR date_found <= ?3)";

        match filter.max_price {
            None => {
                let count: i64 =
                    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM listings WHERE {where_clause}"))
                        .bind(filter.hybrid_only)
                        .bind(filter.available_only)
                        .bind(found_on_or_before)
                        .fetch_one(&self.pool)
                        .await?;
                Ok(count.max(0) as u64)
            }
            Some(cap) => {
                let prices: Vec<Option<String>> =
                    sqlx::query_scalar(&format!("SELECT price FROM listings WHERE {where_clause}"))
                        .bind(filter.hybrid_only)
                        .bind(filter.available_only)
                        .bind(found_on_or_before)
                        .fetch_all(&self.pool)
                        .await?;
                Ok(prices
                    .iter()
                    .filter_map(|price| parse_price(price.as_deref().unwrap_or_default()))
                    .filter(|price| *price <= cap)
                    .count() as u64)
            }
        }
    }

    pub async fn set_manual_price(&self, link: &str, price: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE listings SET price = ?, manual_price = 1 WHERE link = ?")
            .bind(price)
            .bind(link)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_manual_price(&self, link: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE listings SET manual_price = 0 WHERE link = ?")
            .bind(link)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_if_absent<'e, E>(
    executor: E,
    candidate: &ListingCandidate,
    today: NaiveDate,
) -> Result<Option<i64>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO listings
            (link, title, year, mileage, price, is_hybrid, date_found, still_available, manual_price)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1, 0)
        ON CONFLICT(link) DO NOTHING
        "#,
    )
    .bind(&candidate.link)
    .bind(&candidate.title)
    .bind(&candidate.year)
    .bind(&candidate.mileage)
    .bind(candidate.price.as_deref().unwrap_or_default())
    .bind(candidate.is_hybrid)
    .bind(today)
    .execute(executor)
    .await?;

    Ok((result.rows_affected() > 0).then(|| result.last_insert_rowid()))
}

// Columns added by later schema revisions may be NULL in legacy rows.
fn record_from_row(row: &SqliteRow) -> Result<ListingRecord, sqlx::Error> {
    Ok(ListingRecord {
        id: row.try_get("id")?,
        link: row.try_get("link")?,
        title: row.try_get::<Option<String>, _>("title")?.unwrap_or_default(),
        year: row
            .try_get::<Option<String>, _>("year")?
            .unwrap_or_else(|| UNKNOWN_YEAR.to_string()),
        mileage: row.try_get::<Option<String>, _>("mileage")?.unwrap_or_default(),
        price: row.try_get::<Option<String>, _>("price")?.unwrap_or_default(),
        is_hybrid: row.try_get::<Option<bool>, _>("is_hybrid")?.unwrap_or(false),
        date_found: row.try_get("date_found")?,
        still_available: row.try_get::<Option<bool>, _>("still_available")?.unwrap_or(true),
        manual_price: row.try_get::<Option<bool>, _>("manual_price")?.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(link: &str, price: Option<&str>, is_hybrid: bool) -> ListingCandidate {
        ListingCandidate {
            link: link.to_string(),
            title: "2023 Ford Maverick".to_string(),
            year: "2023".to_string(),
            mileage: "12,000".to_string(),
            price: price.map(str::to_string),
            is_hybrid,
        }
    }

    async fn memory_store() -> ListingStore {
        ListingStore::connect("sqlite::memory:").await.expect("memory store")
    }

    #[tokio::test]
    async fn upsert_creates_then_updates_by_link() {
        let store = memory_store().await;
        let today = day(2025, 6, 1);

        let first = store.upsert(&candidate("A", Some("$10,000"), true), today).await.unwrap();
        let UpsertOutcome::Created(id) = first else {
            panic!("expected create, got {first:?}");
        };

        let second = store
            .upsert(&candidate("A", Some("$9,000"), false), day(2025, 6, 9))
            .await
            .unwrap();
        assert_eq!(second, UpsertOutcome::Updated(id));

        let record = store.find_by_link("A").await.unwrap().unwrap();
        assert_eq!(record.price, "$9,000");
        assert!(!record.is_hybrid);
        assert_eq!(record.date_found, today);
        assert!(record.still_available);
        assert!(!record.manual_price);
        assert_eq!(store.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_without_price_keeps_stored_price() {
        let store = memory_store().await;
        let today = day(2025, 6, 1);
        store.upsert(&candidate("A", Some("$10,000"), true), today).await.unwrap();
        store.upsert(&candidate("A", None, true), today).await.unwrap();
        assert_eq!(store.find_by_link("A").await.unwrap().unwrap().price, "$10,000");
    }

    #[tokio::test]
    async fn manual_price_survives_upsert_even_when_price_is_offered() {
        let store = memory_store().await;
        let today = day(2025, 6, 1);
        store.upsert(&candidate("A", Some("$10,000"), true), today).await.unwrap();
        assert!(store.set_manual_price("A", "$8,500").await.unwrap());

        store.upsert(&candidate("A", Some("$12,000"), true), today).await.unwrap();
        let record = store.find_by_link("A").await.unwrap().unwrap();
        assert_eq!(record.price, "$8,500");
        assert!(record.manual_price);

        assert!(store.clear_manual_price("A").await.unwrap());
        store.upsert(&candidate("A", Some("$12,000"), true), today).await.unwrap();
        assert_eq!(store.find_by_link("A").await.unwrap().unwrap().price, "$12,000");
    }

    #[tokio::test]
    async fn unavailable_records_leave_active_list_and_come_back_on_rescrape() {
        let store = memory_store().await;
        let today = day(2025, 6, 1);
        for link in ["A", "B", "C"] {
            store.upsert(&candidate(link, Some("$1"), true), today).await.unwrap();
        }
        let b = store.find_by_link("B").await.unwrap().unwrap();
        assert!(store.mark_unavailable(b.id).await.unwrap());
        assert!(!store.mark_unavailable(b.id).await.unwrap());

        let active: Vec<String> = store.list_active().await.unwrap().into_iter().map(|r| r.link).collect();
        assert_eq!(active, vec!["A", "C"]);

        store.upsert(&candidate("B", None, true), today).await.unwrap();
        assert!(store.find_by_link("B").await.unwrap().unwrap().still_available);
    }

    #[tokio::test]
    async fn active_pages_resume_after_id() {
        let store = memory_store().await;
        let today = day(2025, 6, 1);
        for link in ["A", "B", "C", "D"] {
            store.upsert(&candidate(link, None, false), today).await.unwrap();
        }
        let first = store.list_active_after(0, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        let rest = store.list_active_after(first[1].id, 10).await.unwrap();
        let links: Vec<_> = rest.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(links, vec!["C", "D"]);
    }

    #[tokio::test]
    async fn count_matching_combines_predicates() {
        let store = memory_store().await;
        store.upsert(&candidate("old-cheap", Some("$9,000"), true), day(2025, 5, 1)).await.unwrap();
        store.upsert(&candidate("old-pricey", Some("31000"), true), day(2025, 5, 1)).await.unwrap();
        store.upsert(&candidate("new-cheap", Some("$9,000"), true), day(2025, 5, 28)).await.unwrap();
        store.upsert(&candidate("old-call", Some("call"), true), day(2025, 5, 1)).await.unwrap();
        store.upsert(&candidate("gas", Some("$5,000"), false), day(2025, 5, 1)).await.unwrap();
        let today = day(2025, 6, 1);

        let hybrids = ListingFilter {
            hybrid_only: true,
            ..Default::default()
        };
        assert_eq!(store.count_matching(&hybrids, today).await.unwrap(), 4);

        let aged = ListingFilter {
            min_age_days: Some(14),
            ..hybrids
        };
        assert_eq!(store.count_matching(&aged, today).await.unwrap(), 3);

        let aged_under_cap = ListingFilter {
            max_price: Some(30_000),
            ..aged
        };
        assert_eq!(store.count_matching(&aged_under_cap, today).await.unwrap(), 1);

        let old_cheap = store.find_by_link("old-cheap").await.unwrap().unwrap();
        store.mark_unavailable(old_cheap.id).await.unwrap();
        let scoped = ListingFilter {
            available_only: true,
            ..aged_under_cap
        };
        assert_eq!(store.count_matching(&scoped, today).await.unwrap(), 0);
    }

    async fn file_db() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("mavericks.db").display());
        (dir, url)
    }

    #[tokio::test]
    async fn connect_adopts_cars_table_from_older_databases() {
        let (_dir, url) = file_db().await;
        let legacy = ListingStore::open(&url).await.unwrap();
        sqlx::query(
            "CREATE TABLE cars (id INTEGER NOT NULL PRIMARY KEY, listing VARCHAR, link VARCHAR UNIQUE, \
             mileage VARCHAR, price VARCHAR, is_hybrid BOOLEAN, date_found DATE)",
        )
        .execute(legacy.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO cars (listing, link, mileage, price, is_hybrid, date_found) \
             VALUES ('Ford Maverick 2022 Hybrid', 'https://x/1', NULL, '$20,000', 1, '2025-01-02')",
        )
        .execute(legacy.pool())
        .await
        .unwrap();

        let report = legacy.migrate(day(2025, 6, 1)).await.unwrap();
        assert!(report.adopted_legacy_table);
        assert_eq!(report.added_columns, vec!["still_available", "manual_price", "year"]);
        assert_eq!(report.backfilled_years, 1);
        legacy.pool().close().await;

        let store = ListingStore::connect(&url).await.unwrap();
        assert_eq!(store.count_all().await.unwrap(), 1);
        let record = store.find_by_link("https://x/1").await.unwrap().unwrap();
        assert_eq!(record.title, "Ford Maverick 2022 Hybrid");
        assert_eq!(record.year, "2022");
        assert_eq!(record.date_found, day(2025, 1, 2));
        assert!(record.still_available);
        assert!(!record.manual_price);
        assert_eq!(record.mileage, "");

        let cars: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'cars'")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(cars, 0);
        assert_eq!(store.migrate(day(2025, 6, 1)).await.unwrap(), MigrationReport::default());
    }

    #[tokio::test]
    async fn insert_after_stale_lookup_is_a_duplicate_not_an_error() {
        let (_dir, url) = file_db().await;
        let first = ListingStore::connect(&url).await.unwrap();
        let second = ListingStore::connect(&url).await.unwrap();
        let today = day(2025, 6, 1);

        assert!(first.find_by_link("A").await.unwrap().is_none());
        let won = second.upsert(&candidate("A", Some("$10,000"), true), today).await.unwrap();
        assert!(matches!(won, UpsertOutcome::Created(_)));

        let lost = first
            .insert_new(&candidate("A", Some("$8,000"), true), today)
            .await
            .unwrap();
        assert_eq!(lost, UpsertOutcome::Duplicate);
        assert_eq!(first.count_all().await.unwrap(), 1);
        assert_eq!(first.find_by_link("A").await.unwrap().unwrap().price, "$10,000");
    }

    #[tokio::test]
    async fn connect_to_unreachable_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/missing/dir/db.sqlite", dir.path().display());
        let err = ListingStore::connect(&url).await.unwrap_err();
        assert!(err.is_unavailable(), "{err:?}");
    }
}
