// tests/scan_cycle.rs
// Whole-cycle behaviour with an in-memory extractor and a recording notifier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use advert_notifier::error::{FetchError, StoreError};
use advert_notifier::notify::format_message;
use advert_notifier::{
    AdvertRecord, AdvertStore, Extractor, Notifier, Scanner, SourceConfig, SqliteStore,
};
use tokio_util::sync::CancellationToken;

/// Serves fixed adverts per target; any target not listed fails to fetch.
#[derive(Default)]
struct StaticExtractor {
    pages: HashMap<String, Vec<AdvertRecord>>,
}

impl StaticExtractor {
    fn page(mut self, target: &str, adverts: Vec<AdvertRecord>) -> Self {
        self.pages.insert(target.to_string(), adverts);
        self
    }
}

#[async_trait::async_trait]
impl Extractor for StaticExtractor {
    async fn extract(&self, _portal: &str, target: &str) -> Result<Vec<AdvertRecord>, FetchError> {
        self.pages
            .get(target)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                target: target.to_string(),
                status: reqwest::StatusCode::BAD_GATEWAY,
            })
    }
}

#[derive(Clone, Default)]
struct Recorder {
    sent: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for Recorder {
    async fn send(&self, record: &AdvertRecord) -> bool {
        self.sent.lock().unwrap().push(format_message(record));
        true
    }
}

fn ad(portal: &str, id: &str, title: &str) -> AdvertRecord {
    AdvertRecord {
        source_id: portal.into(),
        external_id: id.into(),
        title: title.into(),
        url: format!("https://{portal}.example/{id}"),
        price: None,
    }
}

fn source(portal: &str, targets: &[&str]) -> SourceConfig {
    SourceConfig {
        portal: portal.into(),
        targets: targets.iter().map(|t| t.to_string()).collect(),
    }
}

fn scanner(
    sources: Vec<SourceConfig>,
    ex: StaticExtractor,
    store: SqliteStore,
    rec: &Recorder,
) -> Scanner {
    Scanner::new(sources, Box::new(ex), Box::new(store), Box::new(rec.clone()))
}

#[tokio::test]
async fn new_advert_is_stored_and_notified_once() {
    let rec = Recorder::default();
    let ex = StaticExtractor::default().page("t1", vec![ad("x", "1", "Desk")]);
    let s = scanner(
        vec![source("x", &["t1"])],
        ex,
        SqliteStore::open_in_memory().unwrap(),
        &rec,
    );

    let report = s.run_cycle().await;

    assert_eq!(report.adverts.notified, 1);
    assert_eq!(s.store().count().unwrap(), 1);
    assert!(s.store().exists("x", "1").unwrap());
    let msgs = rec.messages();
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].contains("Desk"));
}

#[tokio::test]
async fn already_stored_advert_is_not_notified() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert(&ad("x", "1", "Desk")).unwrap();

    let rec = Recorder::default();
    let ex = StaticExtractor::default().page("t1", vec![ad("x", "1", "Desk")]);
    let s = scanner(vec![source("x", &["t1"])], ex, store, &rec);

    let report = s.run_cycle().await;

    assert_eq!(report.adverts.known, 1);
    assert_eq!(report.adverts.new_adverts(), 0);
    assert_eq!(s.store().count().unwrap(), 1);
    assert!(rec.messages().is_empty());
}

#[tokio::test]
async fn second_pass_over_same_content_is_silent() {
    let rec = Recorder::default();
    let ex = StaticExtractor::default()
        .page("t1", vec![ad("x", "1", "Desk"), ad("x", "2", "Chair")])
        .page("t2", vec![ad("y", "1", "Lamp")]);
    let s = scanner(
        vec![source("x", &["t1"]), source("y", &["t2"])],
        ex,
        SqliteStore::open_in_memory().unwrap(),
        &rec,
    );

    let first = s.run_cycle().await;
    let second = s.run_cycle().await;

    assert_eq!(first.adverts.notified, 3);
    assert_eq!(second.adverts.new_adverts(), 0);
    assert_eq!(second.adverts.known, 3);
    assert_eq!(s.store().count().unwrap(), 3);
    assert_eq!(rec.messages().len(), 3);
}

#[tokio::test]
async fn failing_target_does_not_stop_the_cycle() {
    let rec = Recorder::default();
    // "t1" is unknown to the extractor and fails to fetch
    let ex = StaticExtractor::default().page("t2", vec![ad("x", "7", "Bookshelf")]);
    let s = scanner(
        vec![source("x", &["t1", "t2"])],
        ex,
        SqliteStore::open_in_memory().unwrap(),
        &rec,
    );

    let report = s.run_cycle().await;

    assert_eq!(report.targets_scanned, 2);
    assert_eq!(report.targets_failed, 1);
    assert_eq!(report.adverts.notified, 1);
    assert!(rec.messages()[0].contains("Bookshelf"));
}

#[tokio::test]
async fn stop_during_wait_ends_loop_promptly() {
    let rec = Recorder::default();
    let ex = StaticExtractor::default().page("t1", vec![ad("x", "1", "Desk")]);
    let s = scanner(
        vec![source("x", &["t1"])],
        ex,
        SqliteStore::open_in_memory().unwrap(),
        &rec,
    );

    let token = CancellationToken::new();
    let stopper = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        stopper.cancel();
    });

    let started = Instant::now();
    let cycles = s.run_interval(Duration::from_secs(5), &token).await;

    assert_eq!(cycles, 1);
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "loop took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn cancelled_before_start_runs_no_cycle() {
    let rec = Recorder::default();
    let s = scanner(
        vec![source("x", &["t1"])],
        StaticExtractor::default(),
        SqliteStore::open_in_memory().unwrap(),
        &rec,
    );
    let token = CancellationToken::new();
    token.cancel();
    assert_eq!(s.run_interval(Duration::from_secs(5), &token).await, 0);
}

/// Answers lookups but refuses every write, like a database on a full disk.
struct ReadOnlyStore;

impl AdvertStore for ReadOnlyStore {
    fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn exists(&self, _: &str, _: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn insert(&self, _: &AdvertRecord) -> Result<(), StoreError> {
        Err(std::io::Error::other("disk full").into())
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(0)
    }
}

#[tokio::test]
async fn unwritable_store_counts_failures_and_sends_nothing() {
    let rec = Recorder::default();
    let ex = StaticExtractor::default()
        .page("t1", vec![ad("x", "1", "Desk"), ad("x", "2", "Chair")]);
    let s = Scanner::new(
        vec![source("x", &["t1"])],
        Box::new(ex),
        Box::new(ReadOnlyStore),
        Box::new(rec.clone()),
    );

    let report = s.run_cycle().await;

    assert_eq!(report.adverts_seen, 2);
    assert_eq!(report.adverts.store_failed, 2);
    assert_eq!(report.adverts.new_adverts(), 0);
    assert!(rec.messages().is_empty());
}
