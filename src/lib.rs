// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod engine;
pub mod extract;
pub mod margin;
pub mod metrics;
pub mod product;
pub mod ranker;
pub mod sourcing;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::engine::{AggregateReport, AggregationEngine, PartialFailure};
pub use crate::product::{ProductId, ProductSource, SearchOutcome};
pub use crate::sourcing::{AdapterFactory, SourceAdapter, SourcingConfig};

use tracing::{info, warn};

/// Build the full HTTP app from `SourcingConfig::load_default()`.
///
/// `/metrics` is mounted when the Prometheus recorder could be installed;
/// another recorder already owning the process is logged and tolerated.
pub async fn app() -> anyhow::Result<axum::Router> {
    let cfg = SourcingConfig::load_default()?;
    info!(
        mode = ?cfg.mode,
        adapter_timeout_ms = cfg.adapter_timeout_ms,
        max_results = cfg.max_results,
        "sourcing config loaded"
    );

    let engine = AggregationEngine::from_config(&cfg);
    let mut router = api::router(api::AppState::new(engine));

    match crate::metrics::Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => warn!(error = ?e, "metrics endpoint disabled"),
    }
    Ok(router)
}
