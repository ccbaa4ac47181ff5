//! Merging extracted pages into aggregates

use crate::common::{fetch_client, review_page, BOT_CHALLENGE};
use review_harvester::cache::MemoryPageCache;
use review_harvester::extract::{PageExtractor, ReviewPageExtractor};
use review_harvester::fetch::FetchOutcome;
use review_harvester::merge::{Aggregate, AggregateMerger};
use review_harvester::request::{RequestPlanner, RequestSpec};
use std::sync::Arc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fold(specs: &[RequestSpec], pages: &[String], order: &[usize]) -> Aggregate {
    let extractor = ReviewPageExtractor::new();
    let mut merger = AggregateMerger::new(specs[0].entity.clone());
    for &i in order {
        merger.merge(&specs[i], extractor.extract(&pages[i]));
    }
    merger.finalize()
}

#[test]
fn test_arrival_order_does_not_change_the_document() {
    let specs = RequestPlanner::new(2).plan("B01").unwrap();
    let pages = vec![
        review_page("Kettle", 120, &["R1", "R2"]),
        review_page("Kettle 1.7L", 135, &["R2", "R3"]),
        review_page("", 128, &["R3", "R4"]),
        review_page("Kettle", 90, &[]),
    ];

    let orders: [&[usize]; 4] = [&[0, 1, 2, 3], &[3, 2, 1, 0], &[2, 0, 3, 1], &[1, 3, 0, 2]];
    let documents: Vec<String> = orders
        .iter()
        .map(|order| serde_json::to_string_pretty(&fold(&specs, &pages, order)).unwrap())
        .collect();

    for document in &documents[1..] {
        assert_eq!(document, &documents[0]);
    }

    let aggregate = fold(&specs, &pages, orders[0]);
    assert_eq!(aggregate.name.as_deref(), Some("Kettle"));
    assert_eq!(aggregate.total_rating_count, Some(135));
    assert_eq!(aggregate.review_count(), 4);
}

#[test]
fn test_duplicate_review_keeps_both_origins() {
    let specs = RequestPlanner::new(1).plan("B01").unwrap();
    let pages = vec![
        review_page("Kettle", 120, &["R1"]),
        review_page("Kettle", 135, &["R1"]),
    ];

    let aggregate = fold(&specs, &pages, &[0, 1]);

    assert_eq!(aggregate.review_count(), 1);
    let record = aggregate.review("R1").unwrap();
    assert_eq!(record.found_under.len(), 2);
    assert!(record.found_under.contains(&specs[0]));
    assert!(record.found_under.contains(&specs[1]));
    assert_eq!(aggregate.total_rating_count, Some(135));
}

#[tokio::test]
async fn test_soft_failure_then_later_success() {
    let server = MockServer::start().await;
    let body = review_page("Kettle", 50, &["R9", "R10"]);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BOT_CHALLENGE))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = fetch_client(&server.uri(), Arc::new(MemoryPageCache::new()), 3);
    let extractor = ReviewPageExtractor::new();
    let spec = RequestPlanner::new(1).plan("BSOFT").unwrap().remove(0);
    let mut merger = AggregateMerger::new(spec.entity.clone());

    for _ in 0..2 {
        match client.fetch(&spec).await {
            FetchOutcome::Success { body, .. } => merger.merge(&spec, extractor.extract(&body)),
            other => merger.record_outcome(&spec, &other),
        }
    }

    let aggregate = merger.finalize();
    assert_eq!(aggregate.failure_count(), 0);
    let ids: Vec<_> = aggregate.reviews.iter().map(|r| r.review.id.as_str()).collect();
    assert_eq!(ids, vec!["R10", "R9"]);
}
