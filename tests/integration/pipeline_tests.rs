use super::*;
use catalog_watcher::browser::FingerprintRotation;
use catalog_watcher::detection::{ChangeDetector, ChangeRules};
use catalog_watcher::discovery::CatalogCrawler;
use catalog_watcher::extraction::DetailExtractor;
use catalog_watcher::models::{ItemSnapshot, ProductPayload};
use catalog_watcher::plugins::NotificationDispatcher;
use catalog_watcher::retry::{RetryController, RetryPolicy};
use catalog_watcher::store::{load_snapshot, save_snapshot, MemoryStore};
use catalog_watcher::Pipeline;
use chrono::NaiveDate;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn snapshot_of(code: &str, payload: Value) -> ItemSnapshot {
    let payload: ProductPayload = serde_json::from_value(payload).unwrap();
    ItemSnapshot::from_payload("nike", item_url(code), payload)
}

fn pipeline(store: Arc<MemoryStore>, notifier: &RecordingNotifier) -> Pipeline {
    let mut dispatcher = NotificationDispatcher::new();
    dispatcher.register(Box::new(notifier.clone()));
    let dispatcher = Arc::new(dispatcher);

    Pipeline::new(
        vec![CATALOG_URL.to_string()],
        CatalogCrawler::new(site_config(), &catalog_config(&[CATALOG_URL]), timeout()),
        Box::new(DetailExtractor::new(site_config(), timeout())),
        RetryController::new(
            RetryPolicy::new(3, Duration::from_millis(3000), 5.0),
            FingerprintRotation::new(vec!["ua-1".to_string()], 1920, 1080),
        ),
        ChangeDetector::new(store, dispatcher.clone(), ChangeRules::default()),
        dispatcher,
    )
}

/// Four items: a price drop, a restock, a new same-day release and one unchanged.
fn storefront() -> FakeDriver {
    let mut release = product_payload("SKU-C", 800, true);
    release["releaseDate"] = json!("2024-06-01T09:30:00Z");

    FakeDriver::new()
        .with_catalog(
            CATALOG_URL,
            vec![vec![
                item_url("SKU-A"),
                item_url("SKU-B"),
                item_url("SKU-C"),
                item_url("SKU-D"),
            ]],
        )
        .page(item_url("SKU-A"), FakePage::item(product_payload("SKU-A", 65, true)))
        .page(item_url("SKU-B"), FakePage::item(product_payload("SKU-B", 200, true)))
        .page(item_url("SKU-C"), FakePage::item(release))
        .page(item_url("SKU-D"), FakePage::item(product_payload("SKU-D", 300, true)))
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for snapshot in [
        snapshot_of("SKU-A", product_payload("SKU-A", 100, true)),
        snapshot_of("SKU-B", product_payload("SKU-B", 200, false)),
        snapshot_of("SKU-D", product_payload("SKU-D", 300, true)),
    ] {
        save_snapshot(store.as_ref(), &snapshot).await.unwrap();
    }
    store
}

#[tokio::test(start_paused = true)]
async fn test_full_run_notifies_changes_and_sends_digest() {
    let store = seeded_store().await;
    let notifier = RecordingNotifier::default();
    let mut driver = storefront();

    let report = pipeline(store.clone(), &notifier)
        .run(&mut driver, today())
        .await;

    assert_eq!(report.discovered, 4);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.skipped, 0);
    assert!(report.summary_sent);
    assert_eq!(report.notifications_delivered, 3);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 3);

    assert!(messages[0].text.starts_with("⚡ Price change for Sneaker SKU-A!"));
    assert!(messages[0].text.contains("Price changed from 100.00 to 65.00 (↓ 35.00%)"));
    assert_eq!(
        messages[0].image_url.as_deref(),
        Some("https://img.example.com/SKU-A-1.jpg")
    );

    assert!(messages[1].text.starts_with("🚨 Restock for Sneaker SKU-B!"));
    assert!(messages[1].text.contains("Available sizes: 40, 41"));

    let digest = &messages[2].text;
    assert!(digest.contains("📊 Daily Price Summary 📊"));
    assert!(digest.contains("👟 Sneaker SKU-A"));
    assert!(digest.contains("🎉 Today's Releases (until 10:00) 🎉"));
    assert!(digest.contains("👟 Sneaker SKU-C"));
    assert!(messages[2].image_url.is_none());

    // Three seeds plus the drop, the restock and the first sighting.
    assert_eq!(store.write_count().await, 6);
    assert_eq!(store.len().await, 4);

    let stored = load_snapshot(store.as_ref(), "nike", "SKU-A").await.unwrap().unwrap();
    assert_eq!(stored.effective_price(), Some(65.into()));
}

#[tokio::test(start_paused = true)]
async fn test_second_run_is_idempotent() {
    let store = seeded_store().await;
    let notifier = RecordingNotifier::default();

    pipeline(store.clone(), &notifier)
        .run(&mut storefront(), today())
        .await;
    let writes_after_first = store.write_count().await;
    let messages_after_first = notifier.messages().len();

    let report = pipeline(store.clone(), &notifier)
        .run(&mut storefront(), today())
        .await;

    assert_eq!(store.write_count().await, writes_after_first);

    // Only the release digest goes out again.
    let messages = notifier.messages();
    assert_eq!(messages.len(), messages_after_first + 1);
    let digest = &messages.last().unwrap().text;
    assert!(!digest.contains("Daily Price Summary"));
    assert!(digest.contains("👟 Sneaker SKU-C"));
    assert_eq!(report.succeeded, 4);
}

#[tokio::test(start_paused = true)]
async fn test_first_sighting_is_stored_silently() {
    let store = Arc::new(MemoryStore::new());
    let notifier = RecordingNotifier::default();
    let mut driver = FakeDriver::new()
        .with_catalog(CATALOG_URL, vec![vec![item_url("SKU-N")]])
        .page(item_url("SKU-N"), FakePage::item(product_payload("SKU-N", 400, false)));

    let report = pipeline(store.clone(), &notifier)
        .run(&mut driver, today())
        .await;

    assert_eq!(report.succeeded, 1);
    assert!(!report.summary_sent);
    assert!(notifier.messages().is_empty());

    let stored = load_snapshot(store.as_ref(), "nike", "SKU-N").await.unwrap().unwrap();
    assert!(!stored.stocked);
    assert_eq!(stored.available_sizes, vec!["40".to_string()]);
    assert_eq!(
        stored.images.first().map(|i| i.url.as_str()),
        Some("https://img.example.com/SKU-N-1.jpg")
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_item_is_skipped_and_run_continues() {
    let store = Arc::new(MemoryStore::new());
    let notifier = RecordingNotifier::default();
    let mut driver = FakeDriver::new()
        .with_catalog(CATALOG_URL, vec![vec![item_url("SKU-X"), item_url("SKU-Y")]])
        .visits(item_url("SKU-X"), vec![ItemVisit::Empty; 3])
        .page(item_url("SKU-Y"), FakePage::item(product_payload("SKU-Y", 150, true)));

    let report = pipeline(store.clone(), &notifier)
        .run(&mut driver, today())
        .await;

    assert_eq!(report.discovered, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(driver.visit_times(&item_url("SKU-X")).len(), 3);
    assert_eq!(driver.recreations.len(), 2);

    assert!(load_snapshot(store.as_ref(), "nike", "SKU-X").await.unwrap().is_none());
    assert!(load_snapshot(store.as_ref(), "nike", "SKU-Y").await.unwrap().is_some());
}
