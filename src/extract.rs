// src/extract.rs
//! Text-to-number policy shared by the adapters: prices, shipping notes and
//! listing titles arrive as free text and are normalized here.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3}(?:,\d{3})+|\d+)\.(\d{2})").unwrap());
static RE_DOLLAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{2}))?").unwrap());
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// First two-decimal amount in `text`, thousands separators stripped.
/// Returns 0.0 when nothing matches.
pub fn parse_price(text: &str) -> f64 {
    RE_PRICE
        .captures(text)
        .and_then(|c| format!("{}.{}", c[1].replace(',', ""), &c[2]).parse().ok())
        .unwrap_or(0.0)
}

/// Shipping cost from a delivery note.
///
/// * missing or blank → 0.0
/// * mentions "free" (any case) → 0.0
/// * otherwise the first dollar amount, then any two-decimal amount, else 0.0
pub fn parse_shipping(text: Option<&str>) -> f64 {
    let Some(t) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return 0.0;
    };
    if t.to_ascii_lowercase().contains("free") {
        return 0.0;
    }
    if let Some(c) = RE_DOLLAR.captures(t) {
        let whole = c[1].replace(',', "");
        let cents = c.get(2).map(|m| m.as_str()).unwrap_or("00");
        if let Ok(v) = format!("{whole}.{cents}").parse::<f64>() {
            return v;
        }
    }
    parse_price(t)
}

/// Decode entities, strip tags and collapse whitespace in a listing title.
pub fn clean_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();
    let stripped = RE_TAGS.replace_all(&decoded, "");
    RE_WS.replace_all(&stripped, " ").trim().to_string()
}
