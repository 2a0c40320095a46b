// src/product.rs
//! Canonical listing record shared by every adapter, plus the per-adapter
//! search outcome value.
//!
//! A `ProductSource` is a value object: built once inside an adapter for one
//! search call, never mutated afterwards. The only way to build one is
//! `ProductSource::new`, which keeps `total == round2(price + shipping)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest reliability score a platform can be configured with.
pub const MAX_RELIABILITY: f64 = 5.0;

/// Listing id as reported by the source. Unique only within one adapter batch;
/// use [`ProductSource::key`] for identity across sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Int(i64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Int(n) => write!(f, "{n}"),
            ProductId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ProductId {
    fn from(n: i64) -> Self {
        ProductId::Int(n)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        ProductId::Text(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        ProductId::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProductSourceRepr")]
pub struct ProductSource {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub source: String,
    pub url: String,
    pub reliability: f64,
    pub shipping: f64,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProductSource {
    /// Build a record; `total` is derived, never supplied.
    ///
    /// Negative or non-finite money values are treated as 0 and reliability is
    /// clamped into `[0, 5]`.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: f64,
        shipping: f64,
        source: impl Into<String>,
        url: impl Into<String>,
        reliability: f64,
    ) -> Self {
        let price = non_negative(price);
        let shipping = non_negative(shipping);
        let reliability = if reliability.is_finite() {
            reliability.clamp(0.0, MAX_RELIABILITY)
        } else {
            0.0
        };
        Self {
            id: id.into(),
            name: name.into(),
            price,
            source: source.into(),
            url: url.into(),
            reliability,
            shipping,
            total: round2(price + shipping),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image.filter(|s| !s.trim().is_empty());
        self
    }

    /// Composite identity `(source, id)`; ids collide freely across sources.
    pub fn key(&self) -> (&str, &ProductId) {
        (&self.source, &self.id)
    }

    pub fn has_free_shipping(&self) -> bool {
        self.shipping == 0.0
    }
}

// Incoming records are rebuilt through `new`; a supplied `total` is ignored.
#[derive(Deserialize)]
struct ProductSourceRepr {
    id: ProductId,
    name: String,
    price: f64,
    source: String,
    url: String,
    reliability: f64,
    #[serde(default)]
    shipping: f64,
    #[serde(default)]
    image: Option<String>,
}

impl From<ProductSourceRepr> for ProductSource {
    fn from(r: ProductSourceRepr) -> Self {
        ProductSource::new(
            r.id,
            r.name,
            r.price,
            r.shipping,
            r.source,
            r.url,
            r.reliability,
        )
        .with_image(r.image)
    }
}

/// Round half away from zero to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn non_negative(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Result of one adapter's search. Failures are values so a single source can
/// never abort the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "OutcomeRepr", from = "OutcomeRepr")]
pub enum SearchOutcome {
    Success { results: Vec<ProductSource> },
    Failure { error: String },
}

impl SearchOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        SearchOutcome::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Success { .. })
    }
}

// Wire shape: `{"success": true, "results": [...]}` / `{"success": false, "error": "..."}`.
#[derive(Serialize, Deserialize)]
struct OutcomeRepr {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    results: Option<Vec<ProductSource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<SearchOutcome> for OutcomeRepr {
    fn from(o: SearchOutcome) -> Self {
        match o {
            SearchOutcome::Success { results } => OutcomeRepr {
                success: true,
                results: Some(results),
                error: None,
            },
            SearchOutcome::Failure { error } => OutcomeRepr {
                success: false,
                results: None,
                error: Some(error),
            },
        }
    }
}

impl From<OutcomeRepr> for SearchOutcome {
    fn from(r: OutcomeRepr) -> Self {
        if r.success {
            SearchOutcome::Success {
                results: r.results.unwrap_or_default(),
            }
        } else {
            SearchOutcome::Failure {
                error: r.error.unwrap_or_else(|| "unknown error".to_string()),
            }
        }
    }
}
