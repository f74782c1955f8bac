//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test the full
//! claim, fetch, extract, filter and persist cycle end-to-end against an
//! on-disk SQLite frontier.

use frontier_crawler::config::Config;
use frontier_crawler::crawler::{run_crawl, seed_frontier, PoolReport, WorkerPool};
use frontier_crawler::state::UrlStatus;
use frontier_crawler::storage::{
    Claim, Document, FailureRecord, FrontierEntry, FrontierStore, NewDocument, SqliteStore,
    StorageError, StorageResult,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration backed by a database inside `dir`
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.database_path = dir
        .path()
        .join("frontier.db")
        .to_string_lossy()
        .into_owned();
    config.crawler.workers = 2;
    config.crawler.max_concurrency = 2;
    config.crawler.fetch_timeout_ms = 2_000;
    config.crawler.idle_wait_ms = 50;
    config.frontier.claim_lease_ms = 60_000;
    config
}

fn open(config: &Config) -> SqliteStore {
    SqliteStore::open(Path::new(&config.storage.database_path)).expect("Failed to open DB")
}

fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>{} body</p>{}</body></html>",
        title, title, anchors
    )
}

/// Cancels `cancel` once `done` holds for the store, or after `deadline`
fn stop_when<F>(config: &Config, cancel: CancellationToken, deadline: Duration, done: F)
where
    F: Fn(&SqliteStore) -> bool + Send + 'static,
{
    let db_path = config.storage.database_path.clone();
    tokio::spawn(async move {
        let started = Instant::now();
        loop {
            tokio::time::sleep(Duration::from_millis(25)).await;
            let finished = SqliteStore::open(Path::new(&db_path))
                .map(|store| done(&store))
                .unwrap_or(false);
            if finished || started.elapsed() > deadline {
                break;
            }
        }
        cancel.cancel();
    });
}

/// Runs the full crawler until `done` holds (or the deadline passes)
async fn crawl_until<F>(config: &Config, deadline: Duration, done: F) -> PoolReport
where
    F: Fn(&SqliteStore) -> bool + Send + 'static,
{
    let cancel = CancellationToken::new();
    stop_when(config, cancel.clone(), deadline, done);
    run_crawl(config, cancel).await.expect("Crawl failed")
}

fn status_of(store: &SqliteStore, url: &str) -> Option<UrlStatus> {
    store.get_entry(url).ok().flatten().map(|entry| entry.status)
}

/// Store that hands out at most `limit` claims, then reports an empty frontier
struct ClaimLimit {
    inner: SqliteStore,
    remaining: AtomicUsize,
}

impl FrontierStore for ClaimLimit {
    fn claim_one(&self) -> StorageResult<Option<Claim>> {
        let allowed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if allowed {
            self.inner.claim_one()
        } else {
            Ok(None)
        }
    }

    fn enqueue(&self, urls: &[String]) -> StorageResult<usize> {
        self.inner.enqueue(urls)
    }

    fn mark_completed(&self, url: &str) -> StorageResult<()> {
        self.inner.mark_completed(url)
    }

    fn mark_failed(&self, claim: &Claim, reason: &str) -> StorageResult<FailureRecord> {
        self.inner.mark_failed(claim, reason)
    }

    fn release(&self, claim: &Claim) -> StorageResult<()> {
        self.inner.release(claim)
    }

    fn requeue_expired(&self, lease: Duration) -> StorageResult<usize> {
        self.inner.requeue_expired(lease)
    }

    fn record_page(
        &self,
        claim: &Claim,
        links: &[String],
        document: &NewDocument,
    ) -> StorageResult<usize> {
        self.inner.record_page(claim, links, document)
    }

    fn get_entry(&self, url: &str) -> StorageResult<Option<FrontierEntry>> {
        self.inner.get_entry(url)
    }

    fn count_by_status(&self, status: UrlStatus) -> StorageResult<u64> {
        self.inner.count_by_status(status)
    }

    fn count_documents(&self) -> StorageResult<u64> {
        self.inner.count_documents()
    }

    fn documents_for_url(&self, url: &str) -> StorageResult<Vec<Document>> {
        self.inner.documents_for_url(url)
    }

    fn top_fail_reasons(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        self.inner.top_fail_reasons(limit)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_page_round_trip() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page(
            "Hello",
            &[
                "/b",
                "c#section",
                "https://other.example.org/d",
                "/e.pdf",
                "/de/f",
            ],
        )))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let page = format!("{}/a", base_url);

    let store = open(&config);
    seed_frontier(&store, &[page.clone()]).unwrap();

    // Only the seed is crawled, so discovered links stay PENDING
    let limited = Arc::new(ClaimLimit {
        inner: store,
        remaining: AtomicUsize::new(1),
    });
    let pool = WorkerPool::from_config(Arc::clone(&limited), &config).unwrap();

    let cancel = CancellationToken::new();
    let watched = page.clone();
    stop_when(&config, cancel.clone(), Duration::from_secs(10), move |store| {
        status_of(store, &watched) == Some(UrlStatus::Completed)
    });
    let report = pool.run(cancel).await.unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(report.links_discovered, 2);

    let store = open(&config);
    assert_eq!(status_of(&store, &page), Some(UrlStatus::Completed));
    assert_eq!(
        status_of(&store, &format!("{}/b", base_url)),
        Some(UrlStatus::Pending)
    );
    assert_eq!(
        status_of(&store, &format!("{}/c", base_url)),
        Some(UrlStatus::Pending)
    );
    assert_eq!(store.count_by_status(UrlStatus::Pending).unwrap(), 2);

    assert_eq!(store.count_documents().unwrap(), 1);
    let documents = store.documents_for_url(&page).unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title.as_deref(), Some("Hello"));
    assert_eq!(documents[0].url, page);
    assert!(documents[0].content.contains("Hello body"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_known_links_keep_their_status() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(html_page("Home", &["/done", "/dead"])),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let done_url = format!("{}/done", base_url);
    let dead_url = format!("{}/dead", base_url);

    // Pre-existing rows: one failed, one completed
    let store = open(&config).with_retry_threshold(1);
    store.enqueue(&[dead_url.clone()]).unwrap();
    let claim = store.claim_one().unwrap().unwrap();
    store.mark_failed(&claim, "HTTP 404").unwrap();
    store.enqueue(&[done_url.clone()]).unwrap();
    store.mark_completed(&done_url).unwrap();
    seed_frontier(&store, &[format!("{}/", base_url)]).unwrap();

    let report = crawl_until(&config, Duration::from_secs(10), |store| {
        store.count_by_status(UrlStatus::Pending).unwrap_or(1) == 0
            && store.count_by_status(UrlStatus::InProgress).unwrap_or(1) == 0
    })
    .await;

    assert_eq!(report.completed, 1);
    assert_eq!(report.links_discovered, 0);

    let store = open(&config);
    assert_eq!(status_of(&store, &done_url), Some(UrlStatus::Completed));
    let dead = store.get_entry(&dead_url).unwrap().unwrap();
    assert_eq!(dead.status, UrlStatus::Failed);
    assert_eq!(dead.retry_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_three_timeouts_mark_url_failed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.workers = 1;
    config.crawler.fetch_timeout_ms = 200;
    let url = format!("{}/slow", mock_server.uri());
    config.frontier.seeds = vec![url.clone()];

    let watched = url.clone();
    let report = crawl_until(&config, Duration::from_secs(15), move |store| {
        status_of(store, &watched) == Some(UrlStatus::Failed)
    })
    .await;

    assert_eq!(report.fetch_failed, 3);
    assert_eq!(report.completed, 0);

    let store = open(&config);
    let entry = store.get_entry(&url).unwrap().unwrap();
    assert_eq!(entry.status, UrlStatus::Failed);
    assert_eq!(entry.retry_count, 3);
    assert_eq!(entry.fail_reason.as_deref(), Some("timeout"));

    // Terminal: excluded from every later claim
    assert_eq!(store.claim_one().unwrap(), None);
    assert_eq!(store.count_documents().unwrap(), 0);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_idle_wait_on_empty_frontier() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.workers = 1;
    config.crawler.idle_wait_ms = 300;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        trigger.cancel();
    });

    let report = run_crawl(&config, cancel).await.unwrap();

    // Polls at roughly 0, 300, 600 and 900ms; never more often
    assert_eq!(report.claimed, 0);
    assert!(report.idle_waits >= 2, "idle waits: {}", report.idle_waits);
    assert!(report.idle_waits <= 4, "idle waits: {}", report.idle_waits);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_workers_never_fetch_the_same_page_twice() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let children: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("Root", &child_refs)))
        .mount(&mock_server)
        .await;
    for child in &children {
        Mock::given(method("GET"))
            .and(path(child.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(html_page(child, &["/"]))
                    .set_delay(Duration::from_millis(20)),
            )
            .mount(&mock_server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.workers = 6;
    config.crawler.max_concurrency = 4;
    config.frontier.seeds = vec![format!("{}/", base_url)];

    let report = crawl_until(&config, Duration::from_secs(20), |store| {
        store.count_by_status(UrlStatus::Completed).unwrap_or(0) == 21
    })
    .await;

    assert_eq!(report.completed, 21);
    assert_eq!(report.claimed, 21);

    let store = open(&config);
    assert_eq!(store.count_documents().unwrap(), 21);

    let requests = mock_server.received_requests().await.unwrap();
    let mut seen = HashSet::new();
    for request in &requests {
        assert!(
            seen.insert(request.url.path().to_string()),
            "{} fetched twice",
            request.url.path()
        );
    }
    assert_eq!(seen.len(), 21);
}

#[test]
fn test_claims_are_exclusive_across_store_handles() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("frontier.db");
    let urls: Vec<String> = (0..300)
        .map(|i| format!("https://example.com/page/{}", i))
        .collect();
    SqliteStore::open(&db_path).unwrap().enqueue(&urls).unwrap();

    // One store handle per thread, as separate worker processes would have
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let store = SqliteStore::open(&db_path).unwrap();
            std::thread::spawn(move || {
                let mut claimed = Vec::new();
                while let Some(claim) = store.claim_one().unwrap() {
                    claimed.push(claim.url);
                }
                claimed
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for url in handle.join().unwrap() {
            assert!(seen.insert(url.clone()), "{} claimed twice", url);
        }
    }
    assert_eq!(seen.len(), 300);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_claim_is_recovered_on_start() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orphan"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("Orphan", &[])))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.fetch_timeout_ms = 100;
    config.frontier.claim_lease_ms = 150;
    let url = format!("{}/orphan", mock_server.uri());

    // A worker that crashed after claiming
    let store = open(&config);
    store.enqueue(&[url.clone()]).unwrap();
    let crashed = store.claim_one().unwrap().unwrap();
    assert_eq!(crashed.url, url);
    std::thread::sleep(Duration::from_millis(250));

    let watched = url.clone();
    let report = crawl_until(&config, Duration::from_secs(10), move |store| {
        status_of(store, &watched) == Some(UrlStatus::Completed)
    })
    .await;

    assert_eq!(report.completed, 1);
    let store = open(&config);
    let entry = store.get_entry(&url).unwrap().unwrap();
    assert_eq!(entry.status, UrlStatus::Completed);
    assert_eq!(entry.retry_count, 0);

    // The crashed worker's late result must not land on the recovered URL
    let late = store.record_page(
        &crashed,
        &[format!("{}/late", mock_server.uri())],
        &NewDocument {
            title: None,
            content: "late".to_string(),
            url: url.clone(),
        },
    );
    assert!(matches!(late, Err(StorageError::ClaimLost(_))));
    assert_eq!(store.documents_for_url(&url).unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_releases_in_flight_claim() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hang"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.workers = 1;
    config.crawler.fetch_timeout_ms = 10_000;
    let url = format!("{}/hang", mock_server.uri());
    config.frontier.seeds = vec![url.clone()];

    let watched = url.clone();
    let report = crawl_until(&config, Duration::from_secs(10), move |store| {
        status_of(store, &watched) == Some(UrlStatus::InProgress)
    })
    .await;

    assert_eq!(report.released, 1);
    let entry = open(&config).get_entry(&url).unwrap().unwrap();
    assert_eq!(entry.status, UrlStatus::Pending);
    assert_eq!(entry.retry_count, 0);
    assert_eq!(entry.claimed_at, None);
}
