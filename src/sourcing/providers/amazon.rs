// src/sourcing/providers/amazon.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use super::{ensure_query, load_payload, mock_listings, resolve_link, search_url, Mode};
use crate::extract::{clean_title, parse_price, parse_shipping};
use crate::product::{ProductId, ProductSource};
use crate::sourcing::types::SourceAdapter;

pub const NAME: &str = "Amazon";
pub const DEFAULT_RELIABILITY: f64 = 4.5;

const ORIGIN: &str = "https://www.amazon.com";
const SEARCH_BASE: &str = "https://www.amazon.com/s";

const MOCK_ROWS: [(f64, f64); 3] = [(49.99, 0.0), (29.99, 4.99), (19.99, 5.99)];

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    results: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    asin: Option<String>,
    title: Option<String>,
    price: Option<String>,
    delivery: Option<String>,
    link: Option<String>,
    thumbnail: Option<String>,
}

marketplace_adapter!(AmazonAdapter);

impl AmazonAdapter {
    fn parse(&self, query: &str, body: &str) -> Result<Vec<ProductSource>> {
        let t0 = std::time::Instant::now();
        let payload: Payload = serde_json::from_str(body).context("parsing amazon search json")?;
        let fallback = search_url(SEARCH_BASE, "k", query);

        let out: Vec<ProductSource> = payload
            .results
            .into_iter()
            .filter_map(|it| {
                let name = clean_title(it.title.as_deref().unwrap_or_default());
                if name.is_empty() {
                    return None;
                }
                Some((name, it))
            })
            .take(self.settings.max_results)
            .enumerate()
            .map(|(i, (name, it))| {
                let id: ProductId = match it.asin.filter(|a| !a.trim().is_empty()) {
                    Some(asin) => asin.into(),
                    None => ((i + 1) as i64).into(),
                };
                let url = resolve_link(ORIGIN, it.link.as_deref())
                    .unwrap_or_else(|| fallback.clone());
                ProductSource::new(
                    id,
                    name,
                    parse_price(it.price.as_deref().unwrap_or_default()),
                    parse_shipping(it.delivery.as_deref()),
                    NAME,
                    url,
                    self.settings.reliability,
                )
                .with_image(it.thumbnail)
            })
            .collect();

        histogram!("adapter_parse_ms", "platform" => NAME)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("adapter_listings_total", "platform" => NAME).increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for AmazonAdapter {
    fn source(&self) -> &str {
        NAME
    }

    fn reliability(&self) -> f64 {
        self.settings.reliability
    }

    async fn fetch(&mut self, query: &str) -> Result<Vec<ProductSource>> {
        let query = ensure_query(query)?;
        if let Mode::Mock = self.settings.mode {
            return Ok(mock_listings(
                NAME,
                self.settings.reliability,
                query,
                &MOCK_ROWS,
                |n| format!("{ORIGIN}/dp/MOCK{n:06}"),
                &search_url(SEARCH_BASE, "k", query),
                self.settings.max_results,
            ));
        }
        let body = load_payload(&self.settings, &mut self.session, NAME, query).await?;
        self.parse(query, &body)
    }

    async fn close(&mut self) {
        self.release_session();
    }
}
