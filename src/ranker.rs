// src/ranker.rs
//! Merge order for the aggregate: cheapest landed cost first.

use crate::product::ProductSource;

/// Stable ascending sort on `total`. Equal totals keep their input order,
/// which for the engine means adapter request order.
pub fn rank(mut results: Vec<ProductSource>) -> Vec<ProductSource> {
    results.sort_by(|a, b| a.total.total_cmp(&b.total));
    results
}

pub fn is_ranked(results: &[ProductSource]) -> bool {
    results.windows(2).all(|w| w[0].total <= w[1].total)
}
