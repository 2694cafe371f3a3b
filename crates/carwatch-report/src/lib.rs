mod notify;
mod render;
mod views;

pub use notify::{Envelope, Notifier, NotifyError, OutboxNotifier};
pub use render::{render_digest, report_subject, RenderError, RenderedReport, RunStats};
pub use views::{
    aged_under_cap, cheapest_first, DigestViews, ListingView, ViewBuilder, ViewConfig, ViewCounts,
};

pub const CRATE_NAME: &str = "carwatch-report";
