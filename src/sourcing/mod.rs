// src/sourcing/mod.rs
pub mod config;
pub mod factory;
pub mod providers;
pub mod types;

pub use config::{DataMode, PlatformCfg, SourcingConfig};
pub use factory::AdapterFactory;
pub use types::SourceAdapter;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_requests_total",
            "Aggregate searches accepted by the engine."
        );
        describe_counter!(
            "aggregate_results_total",
            "Listings returned to callers after ranking."
        );
        describe_counter!(
            "adapter_failures_total",
            "Adapter searches that failed, timed out or panicked."
        );
        describe_counter!(
            "adapter_listings_total",
            "Listings normalized by adapters."
        );
        describe_histogram!("adapter_search_ms", "Adapter search time in milliseconds.");
        describe_histogram!("adapter_parse_ms", "Adapter payload parse time in milliseconds.");
    });
}
