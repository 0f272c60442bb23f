use super::*;
use catalog_watcher::discovery::CatalogCrawler;
use std::collections::HashSet;

fn items(codes: impl IntoIterator<Item = u32>) -> Vec<String> {
    codes.into_iter().map(|n| item_url(&format!("SKU-{:03}", n))).collect()
}

#[tokio::test]
async fn test_two_pages_with_duplicates_yield_unique_records() {
    // Page 2 repeats three items from page 1.
    let page_one = items(1..=10);
    let page_two = items([1, 2, 3, 11, 12, 13, 14, 15, 16, 17]);
    let mut driver = FakeDriver::new().with_catalog(CATALOG_URL, vec![page_one, page_two]);

    let crawler = CatalogCrawler::new(site_config(), &catalog_config(&[CATALOG_URL]), timeout());
    let records = crawler
        .discover_all(&mut driver, &[CATALOG_URL.to_string()])
        .await;

    assert_eq!(records.len(), 17);
    let unique: HashSet<_> = records.iter().map(|r| r.item_url.as_str()).collect();
    assert_eq!(unique.len(), 17);
    assert!(records.iter().all(|r| r.catalog_referer == CATALOG_URL));

    let visited: Vec<_> = driver.navigations.iter().map(|(url, _)| url.clone()).collect();
    assert_eq!(
        visited,
        vec![
            CATALOG_URL.to_string(),
            page_url(CATALOG_URL, 1),
            page_url(CATALOG_URL, 2),
        ]
    );
}

#[tokio::test]
async fn test_failed_catalog_does_not_abort_others() {
    let broken = "https://shop.example.com/nav/broken";
    let mut driver = FakeDriver::new()
        .with_catalog(CATALOG_URL, vec![items(1..=4)])
        // Listing loads but the pagination control never shows up.
        .page(broken, FakePage::listing(items(90..=95)));

    let crawler = CatalogCrawler::new(
        site_config(),
        &catalog_config(&[broken, CATALOG_URL]),
        timeout(),
    );
    let records = crawler
        .discover_all(&mut driver, &[broken.to_string(), CATALOG_URL.to_string()])
        .await;

    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.catalog_referer == CATALOG_URL));
}

#[tokio::test]
async fn test_missing_listing_page_fails_that_catalog() {
    let mut driver = FakeDriver::new().page(CATALOG_URL, FakePage::catalog(3));
    let crawler = CatalogCrawler::new(site_config(), &catalog_config(&[CATALOG_URL]), timeout());

    let result = crawler.discover(&mut driver, CATALOG_URL).await;

    assert!(matches!(result, Err(AppError::Discovery { .. })));
}

#[tokio::test]
async fn test_same_item_in_two_catalogs_keeps_last_referer() {
    let other = "https://shop.example.com/nav/running";
    let mut driver = FakeDriver::new()
        .with_catalog(CATALOG_URL, vec![items([1, 2])])
        .with_catalog(other, vec![items([2, 3])]);

    let crawler = CatalogCrawler::new(
        site_config(),
        &catalog_config(&[CATALOG_URL, other]),
        timeout(),
    );
    let records = crawler
        .discover_all(&mut driver, &[CATALOG_URL.to_string(), other.to_string()])
        .await;

    assert_eq!(records.len(), 3);
    let shared = records
        .iter()
        .find(|r| r.item_url == item_url("SKU-002"))
        .unwrap();
    assert_eq!(shared.catalog_referer, other);
}
