//! End-to-end harvest runs against a mock listing site

use crate::common::{review_page, test_config, BOT_CHALLENGE, NO_RESULTS};
use review_harvester::cache::FsPageCache;
use review_harvester::config::Config;
use review_harvester::fetch::{Credentials, FetchClient, SoftFailureKind};
use review_harvester::harvest::{
    run_harvest, HarvestEvent, HarvestOrchestrator, ProgressReporter,
};
use review_harvester::output::AggregateWriter;
use review_harvester::request::EntityId;
use review_harvester::state::EntityState;
use review_harvester::storage::{
    open_storage, CheckpointRecord, CheckpointStore, RunStatus, SharedStorage, Storage,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entity(id: &str) -> EntityId {
    EntityId::new(id).unwrap()
}

fn aggregate_json(config: &Config, id: &str) -> Option<String> {
    std::fs::read_to_string(Path::new(&config.output.aggregate_dir).join(format!("{}.json", id)))
        .ok()
}

async fn harvest(config: &Config, ids: &[&str], fresh: bool) -> review_harvester::harvest::HarvestReport {
    let entities = ids.iter().map(|id| entity(id)).collect();
    run_harvest(config, "test-hash", Some(entities), fresh, CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_sweep_covers_every_combination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product-reviews/B01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(review_page("Kettle", 120, &["R1", "R2"])),
        )
        .expect(128)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), 2);

    let report = harvest(&config, &["B01"], false).await;

    assert_eq!(report.completed, 1);
    assert_eq!(report.network_requests, 128);
    assert_eq!(report.cache_hits, 0);

    let json: serde_json::Value =
        serde_json::from_str(&aggregate_json(&config, "B01").unwrap()).unwrap();
    assert_eq!(json["name"], "Kettle");
    assert_eq!(json["total_rating_count"], 120);
    assert_eq!(json["reviews"].as_array().unwrap().len(), 2);
    assert_eq!(
        json["reviews"][0]["found_under"].as_array().unwrap().len(),
        128
    );

    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    let checkpoint = storage.get_checkpoint(&entity("B01")).unwrap().unwrap();
    assert_eq!(checkpoint.status, EntityState::Completed);
    assert_eq!(checkpoint.review_count, 2);
    assert_eq!(storage.count_harvested_products().unwrap(), 1);
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_filtered_pages_merge_with_provenance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("filterByStar", "five_star"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(review_page("Kettle", 135, &["R1", "R5"])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("filterByStar", "one_star"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NO_RESULTS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(review_page("Kettle", 120, &["R1"])),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), 1);

    let report = harvest(&config, &["B01"], false).await;
    assert_eq!(report.completed, 1);
    assert_eq!(report.empty_results, 8);
    assert_eq!(report.hard_failures, 0);

    let json: serde_json::Value =
        serde_json::from_str(&aggregate_json(&config, "B01").unwrap()).unwrap();
    assert_eq!(json["total_rating_count"], 135);
    assert_eq!(json["failures"], serde_json::json!([]));

    let reviews = json["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0]["id"], "R1");
    assert_eq!(reviews[0]["found_under"].as_array().unwrap().len(), 56);
    assert_eq!(reviews[1]["id"], "R5");
    assert_eq!(reviews[1]["found_under"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_warm_cache_rerun_is_identical() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(review_page("Kettle", 77, &["R1", "R2"])),
        )
        .expect(64)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), 1);

    let first = harvest(&config, &["B01"], false).await;
    let first_json = aggregate_json(&config, "B01").unwrap();

    let second = harvest(&config, &["B01"], true).await;
    let second_json = aggregate_json(&config, "B01").unwrap();

    assert_eq!(first.network_requests, 64);
    assert_eq!(second.network_requests, 0);
    assert_eq!(second.cache_hits, 64);
    assert_eq!(second.completed, 1);
    assert_eq!(first_json, second_json);
}

#[tokio::test]
async fn test_checkpointed_entity_is_never_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product-reviews/BDONE"))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_page("X", 1, &["R1"])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/product-reviews/BNEW"))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_page("Y", 1, &["R2"])))
        .expect(64)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), 1);

    {
        let mut storage = open_storage(Path::new(&config.output.database_path)).unwrap();
        storage
            .save_checkpoint(&CheckpointRecord::new(
                entity("BDONE"),
                EntityState::Completed,
                0,
                1,
                None,
            ))
            .unwrap();
    }

    let report = harvest(&config, &["BDONE", "BNEW"], false).await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.completed, 1);
    assert!(aggregate_json(&config, "BDONE").is_none());
    assert!(aggregate_json(&config, "BNEW").is_some());
}

#[tokio::test]
async fn test_catalog_is_the_default_identifier_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_page("X", 1, &["R1"])))
        .expect(128)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), 1);
    {
        let mut storage = open_storage(Path::new(&config.output.database_path)).unwrap();
        storage
            .insert_products(&[entity("CAT1"), entity("CAT2")])
            .unwrap();
    }

    let report = run_harvest(&config, "test-hash", None, false, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.completed, 2);
    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(storage.count_harvested_products().unwrap(), 2);
}

#[tokio::test]
async fn test_not_found_pages_and_failure_tolerance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("filterByStar", "one_star"))
        .respond_with(ResponseTemplate::new(404))
        .expect(16)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_page("K", 3, &["R1"])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), dir.path(), 1);

    let strict = harvest(&config, &["BSTRICT"], false).await;
    assert_eq!(strict.partially_failed, 1);
    assert_eq!(strict.hard_failures, 8);

    let json: serde_json::Value =
        serde_json::from_str(&aggregate_json(&config, "BSTRICT").unwrap()).unwrap();
    let failures = json["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 8);
    assert_eq!(failures[0]["reason"]["hard_failure"]["kind"], "not_found");

    config.harvest.failure_tolerance = 8;
    let tolerant = harvest(&config, &["BTOLERANT"], false).await;
    assert_eq!(tolerant.completed, 1);

    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    let checkpoint = storage.get_checkpoint(&entity("BSTRICT")).unwrap().unwrap();
    assert_eq!(checkpoint.status, EntityState::PartiallyFailed);
    assert_eq!(checkpoint.failure_count, 8);
}

#[tokio::test]
async fn test_blocked_pages_are_recovered_by_a_fresh_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("sortBy", "helpful"))
        .and(query_param("filterByStar", "critical"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BOT_CHALLENGE))
        .up_to_n_times(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_page("K", 3, &["R1"])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), 1);

    let blocked = harvest(&config, &["BBLOCK"], false).await;
    assert_eq!(blocked.partially_failed, 1);
    assert_eq!(blocked.soft_failure_count(SoftFailureKind::BotChallenge), 4);

    let recovered = harvest(&config, &["BBLOCK"], true).await;
    assert_eq!(recovered.completed, 1);
    assert_eq!(recovered.network_requests, 4);
    assert_eq!(recovered.cache_hits, 60);

    let json: serde_json::Value =
        serde_json::from_str(&aggregate_json(&config, "BBLOCK").unwrap()).unwrap();
    assert_eq!(json["failures"], serde_json::json!([]));
    assert_eq!(
        json["reviews"][0]["found_under"].as_array().unwrap().len(),
        64
    );
}

#[tokio::test]
async fn test_unwritable_cache_dir_is_fatal() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let mut config = test_config("http://127.0.0.1:9", dir.path(), 1);
    config.output.cache_dir = blocker.join("pages").display().to_string();

    let result = run_harvest(
        &config,
        "test-hash",
        Some(vec![entity("B01")]),
        false,
        CancellationToken::new(),
    )
    .await;

    assert!(result.is_err());
    assert!(!Path::new(&config.output.database_path).exists());
}

/// Cancels the run once `after` requests have resolved
struct CancelAfter {
    cancel: CancellationToken,
    after: usize,
    resolved: AtomicUsize,
}

impl ProgressReporter for CancelAfter {
    fn report(&self, event: HarvestEvent) {
        if let HarvestEvent::RequestResolved { .. } = event {
            if self.resolved.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
                self.cancel.cancel();
            }
        }
    }
}

#[tokio::test]
async fn test_cancellation_discards_partial_aggregate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_page("K", 3, &["R1"])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), dir.path(), 1);
    config.harvest.max_concurrent_fetches = 1;

    let cache = FsPageCache::new(&config.output.cache_dir).unwrap();
    let client = Arc::new(
        FetchClient::new(&config, &Credentials::anonymous(), Arc::new(cache)).unwrap(),
    );
    let storage = SharedStorage::new(open_storage(Path::new(&config.output.database_path)).unwrap());
    let writer = AggregateWriter::new(&config.output.aggregate_dir).unwrap();

    let cancel = CancellationToken::new();
    let reporter = Arc::new(CancelAfter {
        cancel: cancel.clone(),
        after: 1,
        resolved: AtomicUsize::new(0),
    });

    let report = HarvestOrchestrator::new(
        &config.harvest,
        client,
        Arc::new(storage.clone()),
        Arc::new(storage.clone()),
        writer,
    )
    .with_reporter(reporter)
    .with_cancellation(cancel)
    .run(vec![entity("BCANCEL"), entity("BLATER")])
    .await
    .unwrap();

    assert_eq!(report.cancelled, 2);
    assert_eq!(report.network_requests, 1);
    assert!(!storage.is_complete(&entity("BCANCEL")).unwrap());
    assert!(aggregate_json(&config, "BCANCEL").is_none());
    assert_eq!(storage.lock().unwrap().count_harvested_products().unwrap(), 0);
}

#[tokio::test]
async fn test_repeated_identifier_is_swept_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(review_page("K", 3, &["R1"]))
                .set_delay(Duration::from_millis(5)),
        )
        .expect(64)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), 1);

    let report = harvest(&config, &["BDUP", "BDUP"], false).await;

    assert_eq!(report.completed, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.network_requests, 64);

    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(storage.count_harvested_products().unwrap(), 1);
    assert_eq!(storage.count_products().unwrap(), 1);
}

/// Listing site that answers every request after a delay and records the
/// largest number of requests it was serving at once
struct CountingServer {
    base_url: String,
    peak: Arc<AtomicUsize>,
    served: Arc<AtomicUsize>,
}

impl CountingServer {
    async fn start(body: String, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let served = Arc::new(AtomicUsize::new(0));

        let (open, max, done) = (in_flight.clone(), peak.clone(), served.clone());
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let (open, max, done, body) = (open.clone(), max.clone(), done.clone(), body.clone());
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }

                    let now = open.fetch_add(1, Ordering::SeqCst) + 1;
                    max.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    open.fetch_sub(1, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);

                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url,
            peak,
            served,
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn test_fetch_bound_is_shared_across_entities() {
    let server =
        CountingServer::start(review_page("K", 3, &["R1"]), Duration::from_millis(10)).await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server.base_url, dir.path(), 1);
    config.harvest.max_concurrent_fetches = 3;

    let report = harvest(&config, &["BA", "BB", "BC"], false).await;

    assert_eq!(report.completed, 3);
    assert_eq!(report.network_requests, 192);
    assert_eq!(server.served(), 192);
    assert!(server.peak() >= 1);
    assert!(
        server.peak() <= 3,
        "{} requests were open at once",
        server.peak()
    );
}
