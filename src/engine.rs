// src/engine.rs
//! Aggregation engine: fan a query out to every requested adapter, wait for
//! all of them, release them, then merge and rank what succeeded.
//!
//! Per-source problems never fail the call. Unknown platforms, adapter
//! errors, timeouts and panics are all reported as `warnings` next to the
//! (possibly empty) ranked results. The only hard error is an empty query.
//!
//! Every adapter built for a call is closed exactly once, after all searches
//! have settled and before results are merged. If the returned future is
//! dropped mid-flight, or a constructor panics, the adapters built so far are
//! closed on a background task instead.

use anyhow::{bail, Result};
use futures::future::join_all;
use futures::FutureExt;
use metrics::{counter, histogram};
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::product::{ProductSource, SearchOutcome};
use crate::ranker::rank;
use crate::sourcing::factory::normalize_platform;
use crate::sourcing::{ensure_metrics_described, AdapterFactory, SourceAdapter, SourcingConfig};

pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(15);

pub const REASON_UNSUPPORTED: &str = "unsupported platform";

/// A platform that contributed nothing, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialFailure {
    pub platform: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub query: String,
    /// Ranked ascending by total.
    pub results: Vec<ProductSource>,
    pub warnings: Vec<PartialFailure>,
    /// Registry keys of the adapters that were actually run, in request order.
    pub platforms_queried: Vec<String>,
    pub generated_at: String,
}

struct Lane {
    platform: String,
    adapter: Box<dyn SourceAdapter>,
    closed: bool,
}

/// Owns every adapter built for one call. Lanes still open when the guard is
/// dropped (cancelled call, panicking constructor) are closed on a spawned
/// task.
struct LaneGuard {
    lanes: Vec<Lane>,
    close_timeout: Duration,
}

impl LaneGuard {
    fn new(close_timeout: Duration) -> Self {
        Self {
            lanes: Vec::new(),
            close_timeout,
        }
    }

    async fn close(&mut self) {
        close_lanes(&mut self.lanes, self.close_timeout).await;
    }
}

impl Drop for LaneGuard {
    fn drop(&mut self) {
        let mut pending: Vec<Lane> = self.lanes.drain(..).filter(|l| !l.closed).collect();
        if pending.is_empty() {
            return;
        }
        let timeout = self.close_timeout;
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                warn!(
                    adapters = pending.len(),
                    "aggregate abandoned, closing adapters in background"
                );
                rt.spawn(async move { close_lanes(&mut pending, timeout).await });
            }
            Err(_) => {
                warn!(adapters = pending.len(), "no runtime to close abandoned adapters")
            }
        }
    }
}

#[derive(Debug)]
pub struct AggregationEngine {
    factory: AdapterFactory,
    adapter_timeout: Duration,
}

impl AggregationEngine {
    pub fn new(factory: AdapterFactory, adapter_timeout: Duration) -> Self {
        Self {
            factory,
            adapter_timeout,
        }
    }

    pub fn from_config(cfg: &SourcingConfig) -> Self {
        Self::new(AdapterFactory::from_config(cfg), cfg.adapter_timeout())
    }

    pub fn factory(&self) -> &AdapterFactory {
        &self.factory
    }

    pub fn adapter_timeout(&self) -> Duration {
        self.adapter_timeout
    }

    /// Search `platforms` (all known platforms when `None`) for `query`.
    pub async fn aggregate(
        &self,
        query: &str,
        platforms: Option<&[String]>,
    ) -> Result<AggregateReport> {
        ensure_metrics_described();

        let query = query.trim();
        if query.is_empty() {
            bail!("query must be a non-empty string");
        }
        counter!("aggregate_requests_total").increment(1);

        let requested = match platforms {
            Some(p) => p.to_vec(),
            None => self.factory.platforms(),
        };
        let mut guard = LaneGuard::new(self.adapter_timeout);
        let mut warnings = self.resolve(&requested, &mut guard.lanes);

        let outcomes = self.fan_out(query, &mut guard.lanes).await;
        guard.close().await;

        let mut merged = Vec::new();
        for (lane, outcome) in guard.lanes.iter().zip(outcomes) {
            match outcome {
                SearchOutcome::Success { results } => merged.extend(results),
                SearchOutcome::Failure { error } => {
                    counter!("adapter_failures_total", "platform" => lane.platform.clone())
                        .increment(1);
                    warnings.push(PartialFailure {
                        platform: lane.platform.clone(),
                        reason: error,
                    });
                }
            }
        }
        let platforms_queried: Vec<String> =
            guard.lanes.iter().map(|l| l.platform.clone()).collect();

        let results = rank(merged);
        counter!("aggregate_results_total").increment(results.len() as u64);
        info!(
            target: "aggregate",
            query,
            adapters = platforms_queried.len(),
            results = results.len(),
            warnings = warnings.len(),
            "aggregate search finished"
        );

        Ok(AggregateReport {
            query: query.to_string(),
            results,
            warnings,
            platforms_queried,
            generated_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Ranked results only; warnings are dropped.
    pub async fn aggregate_results(
        &self,
        query: &str,
        platforms: Option<&[String]>,
    ) -> Result<Vec<ProductSource>> {
        Ok(self.aggregate(query, platforms).await?.results)
    }

    // One adapter per distinct known platform, in request order. Adapters go
    // straight into `lanes` so a later constructor panic still closes them.
    fn resolve(&self, requested: &[String], lanes: &mut Vec<Lane>) -> Vec<PartialFailure> {
        let mut seen = HashSet::new();
        let mut warnings = Vec::new();
        for name in requested {
            let key = normalize_platform(name);
            if !seen.insert(key.clone()) {
                continue;
            }
            match self.factory.create(&key) {
                Some(adapter) => lanes.push(Lane {
                    platform: key,
                    adapter,
                    closed: false,
                }),
                None => {
                    debug!(platform = %name, "dropping unsupported platform");
                    warnings.push(PartialFailure {
                        platform: name.trim().to_string(),
                        reason: REASON_UNSUPPORTED.to_string(),
                    });
                }
            }
        }
        warnings
    }

    async fn fan_out(&self, query: &str, lanes: &mut [Lane]) -> Vec<SearchOutcome> {
        let timeout = self.adapter_timeout;
        let searches = lanes.iter_mut().map(|lane| {
            let Lane {
                platform, adapter, ..
            } = lane;
            let platform = platform.as_str();
            async move {
                let t0 = Instant::now();
                // the call itself sits inside the guard so a panic while
                // building the future is caught too
                let guarded =
                    AssertUnwindSafe(async { adapter.search(query).await }).catch_unwind();
                let outcome = match tokio::time::timeout(timeout, guarded).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(panic)) => SearchOutcome::failure(format!(
                        "adapter panicked: {}",
                        panic_message(&*panic)
                    )),
                    Err(_) => SearchOutcome::failure(format!(
                        "timed out after {} ms",
                        timeout.as_millis()
                    )),
                };
                let ms = t0.elapsed().as_secs_f64() * 1_000.0;
                histogram!("adapter_search_ms", "platform" => platform.to_string()).record(ms);
                match &outcome {
                    SearchOutcome::Success { results } => {
                        debug!(platform, results = results.len(), elapsed_ms = ms, "adapter ok")
                    }
                    SearchOutcome::Failure { error } => {
                        warn!(platform, error = %error, elapsed_ms = ms, "adapter failed")
                    }
                }
                outcome
            }
        });
        join_all(searches).await
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(AdapterFactory::default(), DEFAULT_ADAPTER_TIMEOUT)
    }
}

// Each open lane is closed once, bounded by `timeout`. A panicking or stuck
// close still marks the lane closed.
async fn close_lanes(lanes: &mut [Lane], timeout: Duration) {
    let closes = lanes.iter_mut().filter(|l| !l.closed).map(|lane| {
        let Lane {
            platform,
            adapter,
            closed,
        } = lane;
        let platform = platform.as_str();
        async move {
            let guarded = AssertUnwindSafe(async { adapter.close().await }).catch_unwind();
            match tokio::time::timeout(timeout, guarded).await {
                Ok(Ok(())) => {}
                Ok(Err(panic)) => {
                    warn!(platform, panic = %panic_message(&*panic), "adapter close panicked")
                }
                Err(_) => warn!(platform, "adapter close timed out"),
            }
            *closed = true;
        }
    });
    join_all(closes).await;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_query_is_a_hard_error() {
        let engine = AggregationEngine::default();
        assert!(engine.aggregate("   ", None).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_platforms_run_once() {
        let engine = AggregationEngine::default();
        let req = vec!["Amazon".to_string(), "amazon ".to_string(), "AMAZON".to_string()];
        let report = engine.aggregate("mouse", Some(&req)).await.unwrap();
        assert_eq!(report.platforms_queried, vec!["amazon"]);
        assert_eq!(report.results.len(), 3);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn default_platforms_are_all_known() {
        let engine = AggregationEngine::default();
        let report = engine.aggregate("mouse", None).await.unwrap();
        assert_eq!(report.platforms_queried, vec!["amazon", "walmart", "ebay"]);
        assert_eq!(report.results.len(), 9);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*s), "boom");
        let s: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*s), "bang");
        let s: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*s), "non-string panic payload");
    }
}
