// src/sourcing/providers/ebay.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use super::{ensure_query, load_payload, mock_listings, resolve_link, search_url, Mode};
use crate::extract::{clean_title, parse_price};
use crate::product::{ProductId, ProductSource};
use crate::sourcing::types::SourceAdapter;

pub const NAME: &str = "eBay";
pub const DEFAULT_RELIABILITY: f64 = 3.8;

const ORIGIN: &str = "https://www.ebay.com";
const SEARCH_BASE: &str = "https://www.ebay.com/sch/i.html";

// eBay's result list opens with a placeholder card that is not a listing.
const PLACEHOLDER_TITLE: &str = "Shop on eBay";

const MOCK_ROWS: [(f64, f64); 3] = [(39.99, 4.99), (22.50, 3.99), (15.99, 0.0)];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(default)]
    item_summaries: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    item_id: Option<String>,
    title: Option<String>,
    price: Option<Amount>,
    shipping_cost: Option<Amount>,
    item_web_url: Option<String>,
    image: Option<Image>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Image {
    image_url: Option<String>,
}

fn amount(a: Option<Amount>) -> f64 {
    let Some(v) = a.and_then(|a| a.value) else {
        return 0.0;
    };
    v.trim().parse::<f64>().unwrap_or_else(|_| parse_price(&v))
}

marketplace_adapter!(EbayAdapter);

impl EbayAdapter {
    fn parse(&self, query: &str, body: &str) -> Result<Vec<ProductSource>> {
        let t0 = std::time::Instant::now();
        let payload: Payload = serde_json::from_str(body).context("parsing ebay search json")?;
        let fallback = search_url(SEARCH_BASE, "_nkw", query);

        let out: Vec<ProductSource> = payload
            .item_summaries
            .into_iter()
            .filter(|it| {
                it.title
                    .as_deref()
                    .map(|t| !t.trim().eq_ignore_ascii_case(PLACEHOLDER_TITLE))
                    .unwrap_or(true)
            })
            .take(self.settings.max_results)
            .enumerate()
            .map(|(i, it)| {
                let id: ProductId = match it.item_id.filter(|s| !s.trim().is_empty()) {
                    Some(s) => s.into(),
                    None => ((i + 1) as i64).into(),
                };
                let name = it
                    .title
                    .as_deref()
                    .map(clean_title)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| query.to_string());
                let url = resolve_link(ORIGIN, it.item_web_url.as_deref())
                    .unwrap_or_else(|| fallback.clone());
                ProductSource::new(
                    id,
                    name,
                    amount(it.price),
                    amount(it.shipping_cost),
                    NAME,
                    url,
                    self.settings.reliability,
                )
                .with_image(it.image.and_then(|i| i.image_url))
            })
            .collect();

        histogram!("adapter_parse_ms", "platform" => NAME)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("adapter_listings_total", "platform" => NAME).increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for EbayAdapter {
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
                |n| format!("{ORIGIN}/itm/{}", 100_000_000 + n),
                &search_url(SEARCH_BASE, "_nkw", query),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn placeholder_skipped_and_amounts_parsed() {
        let json = r#"{"itemSummaries":[
            {"title":"Shop on eBay","price":{"value":"20.00"}},
            {"itemId":"v1|1","title":"Buds","price":{"value":"39.99"},"shippingCost":{"value":"4.99"},"itemWebUrl":"https://www.ebay.com/itm/1","image":{"imageUrl":"https://i.ebayimg.test/1.jpg"}},
            {"itemId":"v1|2","title":"Buds 2","price":{"value":"US $1,015.99"},"shippingCost":null}
        ]}"#;
        let mut e = EbayAdapter::from_fixture_str(json);
        let items = e.fetch("buds").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, ProductId::from("v1|1"));
        assert_eq!(items[0].total, 44.98);
        assert_eq!(items[0].image.as_deref(), Some("https://i.ebayimg.test/1.jpg"));
        assert_eq!(items[1].price, 1015.99);
        assert_eq!(items[1].shipping, 0.0);
        assert_eq!(items[1].url, "https://www.ebay.com/sch/i.html?_nkw=buds");
    }

    #[tokio::test]
    async fn empty_query_fails_without_io() {
        let mut e = EbayAdapter::mock();
        let out = e.search("   ").await;
        assert!(!out.is_success());
        assert!(!e.session_open());
    }
}
