mod fetch;
mod listings;

pub use fetch::{
    classify_reqwest_error, classify_status, BackoffPolicy, FetchError, FetchedText,
    HttpClientConfig, HttpFetcher, RetryDisposition,
};
pub use listings::{
    ListingCandidate, ListingFilter, ListingStore, MigrationReport, StoreError, StoreResult,
    UpsertOutcome,
};

pub const CRATE_NAME: &str = "carwatch-storage";
