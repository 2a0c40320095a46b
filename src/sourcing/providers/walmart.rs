// src/sourcing/providers/walmart.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use super::{ensure_query, load_payload, mock_listings, resolve_link, search_url, Mode};
use crate::extract::{clean_title, parse_price, parse_shipping};
use crate::product::ProductSource;
use crate::sourcing::types::SourceAdapter;

pub const NAME: &str = "Walmart";
pub const DEFAULT_RELIABILITY: f64 = 4.2;

const ORIGIN: &str = "https://www.walmart.com";
const SEARCH_BASE: &str = "https://www.walmart.com/search";

const MOCK_ROWS: [(f64, f64); 3] = [(42.99, 0.0), (24.99, 3.99), (17.99, 5.99)];

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    // Banner / "sponsored" header rows come without an item id.
    us_item_id: Option<String>,
    name: Option<String>,
    price_info: Option<PriceInfo>,
    fulfillment: Option<String>,
    canonical_url: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceInfo {
    current_price: Option<String>,
}

marketplace_adapter!(WalmartAdapter);

impl WalmartAdapter {
    fn parse(&self, query: &str, body: &str) -> Result<Vec<ProductSource>> {
        let t0 = std::time::Instant::now();
        let payload: Payload =
            serde_json::from_str(body).context("parsing walmart search json")?;
        let fallback = search_url(SEARCH_BASE, "q", query);

        let out: Vec<ProductSource> = payload
            .items
            .into_iter()
            .filter_map(|it| {
                let id = it.us_item_id.clone().filter(|s| !s.trim().is_empty())?;
                Some((id, it))
            })
            .take(self.settings.max_results)
            .map(|(id, it)| {
                let price = it
                    .price_info
                    .and_then(|p| p.current_price)
                    .map(|p| parse_price(&p))
                    .unwrap_or(0.0);
                let name = it
                    .name
                    .as_deref()
                    .map(clean_title)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| query.to_string());
                let url = resolve_link(ORIGIN, it.canonical_url.as_deref())
                    .unwrap_or_else(|| fallback.clone());
                ProductSource::new(
                    id,
                    name,
                    price,
                    parse_shipping(it.fulfillment.as_deref()),
                    NAME,
                    url,
                    self.settings.reliability,
                )
                .with_image(it.image_url)
            })
            .collect();

        histogram!("adapter_parse_ms", "platform" => NAME)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("adapter_listings_total", "platform" => NAME).increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for WalmartAdapter {
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
                |n| format!("{ORIGIN}/ip/{}", 900_000 + n),
                &search_url(SEARCH_BASE, "q", query),
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
