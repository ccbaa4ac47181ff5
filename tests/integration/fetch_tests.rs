//! Fetch client behavior against a mock listing site

use crate::common::{fetch_client, review_page, BOT_CHALLENGE, LOGIN_WALL, NO_RESULTS};
use review_harvester::cache::{FsPageCache, MemoryPageCache, PageCache};
use review_harvester::config::{HarvestConfig, SiteConfig};
use review_harvester::fetch::{
    build_http_client, Credentials, FetchClient, FetchOutcome, HardFailureKind, RetryPolicy,
    SoftFailureKind,
};
use review_harvester::request::{RequestPlanner, RequestSpec};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn first_spec(entity: &str) -> RequestSpec {
    RequestPlanner::new(1).plan(entity).unwrap().remove(0)
}

#[tokio::test]
async fn test_cache_hit_avoids_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("network"))
        .expect(0)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryPageCache::new());
    let spec = first_spec("B01");
    let base = Url::parse(&server.uri()).unwrap();
    let body = review_page("Kettle", 10, &["R1"]);
    cache.put(&spec.cache_key(&base).unwrap(), &body).unwrap();

    let client = fetch_client(&server.uri(), cache, 3);
    let outcome = client.fetch(&spec).await;

    assert_eq!(
        outcome,
        FetchOutcome::Success {
            body,
            from_cache: true
        }
    );
    assert_eq!(client.stats().network_requests, 0);
    assert_eq!(client.stats().cache_hits, 1);
}

#[tokio::test]
async fn test_success_is_written_through() {
    let server = MockServer::start().await;
    let body = review_page("Kettle", 10, &["R1"]);
    Mock::given(method("GET"))
        .and(path("/product-reviews/B01"))
        .and(query_param("sortBy", "recent"))
        .and(query_param("pageNumber", "1"))
        .and(query_param("filterByStar", "all_stars"))
        .and(query_param("formatType", "all_formats"))
        .and(query_param("mediaType", "all_contents"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let cache = Arc::new(FsPageCache::new(dir.path()).unwrap());
    let client = fetch_client(&server.uri(), cache.clone(), 3);
    let spec = first_spec("B01");

    let first = client.fetch(&spec).await;
    assert_eq!(
        first,
        FetchOutcome::Success {
            body: body.clone(),
            from_cache: false
        }
    );
    client.flush().await;
    assert_eq!(client.pending_writes(), 0);

    let second = client.fetch(&spec).await;
    assert_eq!(
        second,
        FetchOutcome::Success {
            body,
            from_cache: true
        }
    );
    assert_eq!(client.stats().network_requests, 1);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = fetch_client(&server.uri(), Arc::new(MemoryPageCache::new()), 3);
    let outcome = client.fetch(&first_spec("B404")).await;

    assert_eq!(outcome, FetchOutcome::HardFailure(HardFailureKind::NotFound));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryPageCache::new());
    let client = fetch_client(&server.uri(), cache.clone(), 3);
    let outcome = client.fetch(&first_spec("B503")).await;

    assert_eq!(
        outcome,
        FetchOutcome::HardFailure(HardFailureKind::ExhaustedRetries { attempts: 3 })
    );
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_transient_error_then_success() {
    let server = MockServer::start().await;
    let body = review_page("Kettle", 10, &["R1"]);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = fetch_client(&server.uri(), Arc::new(MemoryPageCache::new()), 3);
    let outcome = client.fetch(&first_spec("B502")).await;

    assert_eq!(
        outcome,
        FetchOutcome::Success {
            body,
            from_cache: false
        }
    );
    assert_eq!(client.stats().network_requests, 2);
}

#[tokio::test]
async fn test_unexpected_status_is_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let client = fetch_client(&server.uri(), Arc::new(MemoryPageCache::new()), 5);
    let outcome = client.fetch(&first_spec("B403")).await;

    assert_eq!(
        outcome,
        FetchOutcome::HardFailure(HardFailureKind::UnexpectedStatus { status: 403 })
    );
}

#[tokio::test]
async fn test_soft_failures_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BOT_CHALLENGE))
        .expect(2)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryPageCache::new());
    let client = fetch_client(&server.uri(), cache.clone(), 3);
    let spec = first_spec("BBOT");

    for _ in 0..2 {
        assert_eq!(
            client.fetch(&spec).await,
            FetchOutcome::SoftFailure(SoftFailureKind::BotChallenge)
        );
    }
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_login_wall_and_empty_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product-reviews/BLOGIN"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_WALL))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/product-reviews/BEMPTY"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NO_RESULTS))
        .mount(&server)
        .await;

    let client = fetch_client(&server.uri(), Arc::new(MemoryPageCache::new()), 3);

    let login = client.fetch(&first_spec("BLOGIN")).await;
    assert_eq!(login, FetchOutcome::SoftFailure(SoftFailureKind::LoginWall));

    let empty = client.fetch(&first_spec("BEMPTY")).await;
    assert_eq!(empty, FetchOutcome::SoftFailure(SoftFailureKind::NoResults));
    assert!(empty.failure_reason().is_none());
}

#[tokio::test]
async fn test_credentials_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("cookie", "session-id=abc; session-token=xyz"))
        .and(header("accept-language", "en-US"))
        .and(header("user-agent", "harvest-test-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_page("K", 1, &[])))
        .expect(1)
        .mount(&server)
        .await;

    let site = SiteConfig {
        base_url: server.uri(),
        user_agent: "harvest-test-agent".to_string(),
    };
    let credentials = Credentials::anonymous()
        .with_cookie("session-id", "abc")
        .with_cookie("session-token", "xyz")
        .with_header("Accept-Language", "en-US");
    let http = build_http_client(&site, &HarvestConfig::default(), &credentials).unwrap();

    let client = FetchClient::with_client(
        http,
        Url::parse(&server.uri()).unwrap(),
        Arc::new(MemoryPageCache::new()),
        RetryPolicy {
            attempts: 1,
            base_delay: Duration::from_millis(1),
        },
    );

    assert!(client.fetch(&first_spec("BCRED")).await.is_success());
}

#[tokio::test]
async fn test_malformed_url_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = fetch_client(&server.uri(), Arc::new(MemoryPageCache::new()), 3);
    let outcome = client.fetch_url("not a url at all").await;

    assert_eq!(outcome, FetchOutcome::HardFailure(HardFailureKind::InvalidUrl));
    assert_eq!(client.stats().network_requests, 0);
}

#[tokio::test]
async fn test_connection_refused_exhausts_retries() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = fetch_client(
        &format!("http://{}", address),
        Arc::new(MemoryPageCache::new()),
        2,
    );
    let outcome = client.fetch(&first_spec("BDOWN")).await;

    assert_eq!(
        outcome,
        FetchOutcome::HardFailure(HardFailureKind::ExhaustedRetries { attempts: 2 })
    );
}
