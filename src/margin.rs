// src/margin.rs
//! Resale quote for a sourced listing: what is left after buying at the
//! landed cost and paying the marketplace fee on the sale.

use serde::Serialize;

use crate::product::{round2, ProductSource};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginQuote {
    pub cost: f64,
    pub sale_price: f64,
    pub fee_pct: f64,
    pub fees: f64,
    pub profit: f64,
    /// Profit as a percentage of the sale price; 0 when the sale price is 0.
    pub margin_pct: f64,
}

impl MarginQuote {
    /// `fee_pct` is clamped into `[0, 100]`; money inputs below 0 count as 0.
    pub fn compute(cost: f64, sale_price: f64, fee_pct: f64) -> Self {
        let cost = cost.max(0.0);
        let sale_price = sale_price.max(0.0);
        let fee_pct = fee_pct.clamp(0.0, 100.0);

        let fees = round2(sale_price * fee_pct / 100.0);
        let profit = round2(sale_price - fees - cost);
        let margin_pct = if sale_price > 0.0 {
            round2(profit / sale_price * 100.0)
        } else {
            0.0
        };

        Self {
            cost: round2(cost),
            sale_price: round2(sale_price),
            fee_pct,
            fees,
            profit,
            margin_pct,
        }
    }

    /// Quote using the listing's total (price + shipping) as cost basis.
    pub fn for_source(source: &ProductSource, sale_price: f64, fee_pct: f64) -> Self {
        Self::compute(source.total, sale_price, fee_pct)
    }

    pub fn is_profitable(&self) -> bool {
        self.profit > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_comes_off_the_sale() {
        let q = MarginQuote::compute(23.98, 49.99, 13.0);
        assert_eq!(q.fees, 6.5);
        assert_eq!(q.profit, 19.51);
        assert_eq!(q.margin_pct, 39.03);
        assert!(q.is_profitable());
    }

    #[test]
    fn uses_listing_total() {
        let p = ProductSource::new(1, "buds", 29.99, 4.99, "Amazon", "u", 4.5);
        let q = MarginQuote::for_source(&p, 30.0, 0.0);
        assert_eq!(q.cost, 34.98);
        assert_eq!(q.profit, -4.98);
        assert!(!q.is_profitable());
    }

    #[test]
    fn degenerate_inputs() {
        let q = MarginQuote::compute(5.0, 0.0, 250.0);
        assert_eq!(q.fee_pct, 100.0);
        assert_eq!(q.margin_pct, 0.0);
        assert_eq!(q.profit, -5.0);
    }
}
