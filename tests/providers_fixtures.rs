// tests/providers_fixtures.rs
use source_and_sell::product::{round2, ProductId, ProductSource};
use source_and_sell::sourcing::providers::{
    amazon::AmazonAdapter, ebay::EbayAdapter, walmart::WalmartAdapter,
};
use source_and_sell::SourceAdapter;
use std::fs;

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}"))
        .unwrap_or_else(|_| panic!("missing tests/fixtures/{name}"))
}

fn assert_totals_hold(items: &[ProductSource]) {
    for it in items {
        assert!(
            (it.total - round2(it.price + it.shipping)).abs() < 1e-9,
            "total invariant broken for {:?}",
            it.key()
        );
        assert!(it.price >= 0.0 && it.shipping >= 0.0);
        assert!((0.0..=5.0).contains(&it.reliability));
    }
}

#[tokio::test]
async fn amazon_fixture_normalizes_and_caps() {
    let mut a = AmazonAdapter::from_fixture_str(&fixture("amazon_search.json"));
    let items = a.fetch("wireless earbuds").await.expect("amazon parse ok");

    assert_eq!(items.len(), 5, "capped at 5, untitled ad row skipped");
    assert_totals_hold(&items);
    assert!(items.iter().all(|i| i.source == "Amazon" && i.reliability == 4.5));

    assert_eq!(items[0].id, ProductId::from("B0C1EARBUD"));
    assert_eq!(items[0].name, "Wireless Earbuds, Bluetooth 5.3 & Charging Case");
    assert_eq!(items[0].total, 49.99);
    assert!(items[0].image.is_some());

    assert_eq!(items[1].name, "Sport Earbuds Over-Ear Hooks");
    assert_eq!(items[1].total, 34.98);
    assert_eq!(items[1].url, "https://www.amazon.com/dp/B0C2EARBUD");

    assert_eq!(items[2].total, 25.98);
    assert_eq!(items[2].url, "https://www.amazon.com/s?k=wireless+earbuds");

    assert_eq!(items[3].price, 1199.0);
    assert_eq!(items[3].shipping, 0.0);

    a.close().await;
    a.close().await;
}

#[tokio::test]
async fn walmart_fixture_skips_header_rows() {
    let mut w = WalmartAdapter::from_fixture_str(&fixture("walmart_search.json"));
    let items = w.fetch("wireless earbuds").await.expect("walmart parse ok");

    assert_eq!(items.len(), 3);
    assert_totals_hold(&items);
    let totals: Vec<f64> = items.iter().map(|i| i.total).collect();
    assert_eq!(totals, vec![42.99, 28.98, 23.98]);
    assert_eq!(
        items[0].url,
        "https://www.walmart.com/ip/onn-Wireless-Earbuds/400112233"
    );
    assert_eq!(items[2].url, "https://www.walmart.com/search?q=wireless+earbuds");
}

#[tokio::test]
async fn ebay_fixture_skips_placeholder() {
    let mut e = EbayAdapter::from_fixture_str(&fixture("ebay_search.json"));
    let items = e.fetch("wireless earbuds").await.expect("ebay parse ok");

    assert_eq!(items.len(), 3);
    assert_totals_hold(&items);
    assert!(items.iter().all(|i| i.name != "Shop on eBay"));
    let totals: Vec<f64> = items.iter().map(|i| i.total).collect();
    assert_eq!(totals, vec![44.98, 26.49, 15.99]);
    assert!(items[2].has_free_shipping());
}

#[tokio::test]
async fn mock_adapters_echo_query_and_link_back() {
    let mut adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(AmazonAdapter::mock()),
        Box::new(WalmartAdapter::mock()),
        Box::new(EbayAdapter::mock()),
    ];
    for a in adapters.iter_mut() {
        let items = a.fetch("usb hub").await.expect("mock never fails");
        assert_eq!(items.len(), 3);
        assert_totals_hold(&items);
        assert!(items.iter().all(|i| i.name == "usb hub"));
        // ids restart per batch; identity is (source, id)
        assert_eq!(items[0].id, ProductId::Int(1));
        assert!(items[1].url.contains("usb+hub"));
        a.close().await;
    }
}
