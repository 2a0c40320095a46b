// src/sourcing/providers/mod.rs

/// Struct and constructors shared by the built-in marketplace adapters.
/// Expects `NAME` and `DEFAULT_RELIABILITY` in the invoking module.
macro_rules! marketplace_adapter {
    ($adapter:ident) => {
        pub struct $adapter {
            settings: $crate::sourcing::providers::AdapterSettings,
            session: $crate::sourcing::providers::Session,
        }

        impl $adapter {
            pub fn new(settings: $crate::sourcing::providers::AdapterSettings) -> Self {
                Self {
                    settings,
                    session: $crate::sourcing::providers::Session::default(),
                }
            }

            pub fn mock() -> Self {
                Self::with_mode($crate::sourcing::providers::Mode::Mock)
            }

            pub fn from_fixture_str(s: &str) -> Self {
                Self::with_mode($crate::sourcing::providers::Mode::Fixture(s.to_string()))
            }

            pub fn from_endpoint(endpoint: impl Into<String>) -> Self {
                Self::with_mode($crate::sourcing::providers::Mode::Http {
                    endpoint: endpoint.into(),
                })
            }

            fn with_mode(mode: $crate::sourcing::providers::Mode) -> Self {
                Self::new($crate::sourcing::providers::AdapterSettings::new(
                    mode,
                    DEFAULT_RELIABILITY,
                ))
            }

            pub fn session_open(&self) -> bool {
                self.session.is_open()
            }

            fn release_session(&mut self) {
                if self.session.release() {
                    tracing::debug!(platform = NAME, "session released");
                }
            }
        }
    };
}

pub mod amazon;
pub mod ebay;
pub mod walmart;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::time::Duration;

use crate::product::ProductSource;

const USER_AGENT: &str = concat!("source-and-sell/", env!("CARGO_PKG_VERSION"));

/// Where an adapter gets its raw listings from.
#[derive(Debug, Clone)]
pub enum Mode {
    /// Deterministic listings derived from the query; no I/O.
    Mock,
    /// A vendor-shaped JSON payload held in memory.
    Fixture(String),
    /// A vendor-shaped JSON search endpoint, queried with `?q=<query>&limit=<n>`.
    Http { endpoint: String },
}

/// Per-instance knobs shared by every built-in adapter.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub mode: Mode,
    pub reliability: f64,
    pub max_results: usize,
    pub request_timeout: Duration,
}

impl AdapterSettings {
    pub fn new(mode: Mode, reliability: f64) -> Self {
        Self {
            mode,
            reliability,
            max_results: 5,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_max_results(mut self, n: usize) -> Self {
        self.max_results = n;
        self
    }

    pub fn with_request_timeout(mut self, t: Duration) -> Self {
        self.request_timeout = t;
        self
    }
}

/// HTTP session owned by exactly one adapter. Opened on first use, dropped
/// by `release`.
#[derive(Debug, Default)]
pub struct Session {
    client: Option<reqwest::Client>,
}

impl Session {
    pub fn acquire(&mut self, timeout: Duration) -> Result<reqwest::Client> {
        if let Some(c) = &self.client {
            return Ok(c.clone());
        }
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building http session")?;
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Returns true if a live session was actually dropped.
    pub fn release(&mut self) -> bool {
        self.client.take().is_some()
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }
}

/// Raw payload for the non-mock modes.
pub(crate) async fn load_payload(
    settings: &AdapterSettings,
    session: &mut Session,
    platform: &'static str,
    query: &str,
) -> Result<String> {
    match &settings.mode {
        Mode::Fixture(s) => Ok(s.clone()),
        Mode::Http { endpoint } => {
            if endpoint.trim().is_empty() {
                bail!("{platform}: no endpoint configured");
            }
            let client = session.acquire(settings.request_timeout)?;
            let limit = settings.max_results.to_string();
            let resp = client
                .get(endpoint.as_str())
                .query(&[("q", query), ("limit", limit.as_str())])
                .send()
                .await
                .with_context(|| format!("{platform} http get()"))?
                .error_for_status()
                .with_context(|| format!("{platform} non-2xx"))?;
            resp.text()
                .await
                .with_context(|| format!("{platform} http .text()"))
        }
        Mode::Mock => bail!("{platform}: mock mode has no payload"),
    }
}

pub(crate) fn ensure_query(query: &str) -> Result<&str> {
    let q = query.trim();
    if q.is_empty() {
        bail!("empty query");
    }
    Ok(q)
}

/// Public search page for `query`; used whenever a listing has no usable link.
pub(crate) fn search_url(base: &str, param: &str, query: &str) -> String {
    Url::parse_with_params(base, &[(param, query)])
        .map(|u| u.to_string())
        .unwrap_or_else(|_| base.to_string())
}

/// Absolute deep link, resolving site-relative paths against `origin`.
pub(crate) fn resolve_link(origin: &str, link: Option<&str>) -> Option<String> {
    let link = link.map(str::trim).filter(|l| !l.is_empty())?;
    if let Ok(u) = Url::parse(link) {
        return Some(u.to_string());
    }
    Url::parse(origin)
        .and_then(|o| o.join(link))
        .map(|u| u.to_string())
        .ok()
}

/// Canned listings for `Mode::Mock`: `(price, shipping)` rows, first row
/// gets a direct link, the rest fall back to the search page.
pub(crate) fn mock_listings(
    platform: &'static str,
    reliability: f64,
    query: &str,
    rows: &[(f64, f64)],
    direct_link: impl Fn(usize) -> String,
    fallback: &str,
    max_results: usize,
) -> Vec<ProductSource> {
    rows.iter()
        .take(max_results)
        .enumerate()
        .map(|(i, &(price, shipping))| {
            let url = if i == 0 {
                direct_link(i + 1)
            } else {
                fallback.to_string()
            };
            ProductSource::new(
                (i + 1) as i64,
                query.to_string(),
                price,
                shipping,
                platform,
                url,
                reliability,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_query() {
        let u = search_url("https://www.amazon.com/s", "k", "wireless earbuds & case");
        assert_eq!(u, "https://www.amazon.com/s?k=wireless+earbuds+%26+case");
    }

    #[test]
    fn relative_links_resolve_against_origin() {
        assert_eq!(
            resolve_link("https://www.walmart.com", Some("/ip/123")).as_deref(),
            Some("https://www.walmart.com/ip/123")
        );
        assert_eq!(
            resolve_link("https://www.walmart.com", Some("https://x.test/a")).as_deref(),
            Some("https://x.test/a")
        );
        assert_eq!(resolve_link("https://www.walmart.com", Some("  ")), None);
        assert_eq!(resolve_link("https://www.walmart.com", None), None);
    }

    #[test]
    fn session_release_is_idempotent() {
        let mut s = Session::default();
        assert!(!s.release());
        s.acquire(Duration::from_secs(1)).unwrap();
        assert!(s.is_open());
        assert!(s.release());
        assert!(!s.release());
        assert!(!s.is_open());
    }
}
