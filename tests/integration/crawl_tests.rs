//! End-to-end tests of both crawl phases

use crate::support::{
    captcha_page, clusters_body, mount_captcha, rectangle, search_config, session_for,
    ChallengedEndpoint, CountingSolver, SITE_KEY,
};
use cianparser::api::{FilterTerm, KnownFilter, RangeBounds, RawFilter};
use cianparser::config::{CaptchaConfig, Config, HttpConfig, OutputConfig};
use cianparser::crawler::{crawl, PoolError, CLUSTERS_PATH, OFFERS_PATH};
use cianparser::{CianError, Coordinator};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn clusters_path() -> String {
    format!("/{}", CLUSTERS_PATH)
}

fn offers_path() -> String {
    format!("/{}", OFFERS_PATH)
}

/// Answers cluster queries from a list of canned bodies, one per call
struct SequencedClusters {
    calls: AtomicUsize,
    bodies: Vec<serde_json::Value>,
}

impl Respond for SequencedClusters {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let body = &self.bodies[call.min(self.bodies.len() - 1)];
        ResponseTemplate::new(200).set_body_json(body.clone())
    }
}

/// Echoes every requested ID back as a listing whose room count is the ID
struct EchoOffers;

impl Respond for EchoOffers {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("Request body is not JSON");
        let offers: Vec<serde_json::Value> = body["cianOfferIds"]
            .as_array()
            .expect("Missing cianOfferIds")
            .iter()
            .map(|id| serde_json::json!({ "category": "flatSale", "roomsCount": id }))
            .collect();

        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "offersSerialized": offers,
        }))
    }
}

fn create_coordinator(server: &MockServer) -> (Coordinator, Arc<CountingSolver>) {
    let solver = CountingSolver::new(Duration::from_millis(50));
    let coordinator =
        Coordinator::with_solver(session_for(server), solver.clone(), search_config());
    (coordinator, solver)
}

#[tokio::test]
async fn test_collect_ids_dedups_across_cells() {
    let server = MockServer::start().await;

    // 0.1° x 0.05° at the equator is two 6 km cells side by side
    Mock::given(method("POST"))
        .and(path(clusters_path()))
        .respond_with(SequencedClusters {
            calls: AtomicUsize::new(0),
            bodies: vec![
                clusters_body(&[&[5, 3], &[5]]),
                clusters_body(&[&[7, 3]]),
            ],
        })
        .expect(2)
        .mount(&server)
        .await;

    let (coordinator, solver) = create_coordinator(&server);
    let area = rectangle(0.0, 0.0, 0.1, 0.05);

    let ids = coordinator.collect_ids(&area, 6000.0, 1).await.unwrap();

    assert_eq!(ids, vec![5, 3, 7]);
    assert_eq!(solver.calls(), 0);
}

#[tokio::test]
async fn test_cluster_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(clusters_path()))
        .and(body_partial_json(serde_json::json!({
            "zoom": 15,
            "jsonQuery": { "_type": "flatsale" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(clusters_body(&[&[1]])))
        .expect(1)
        .mount(&server)
        .await;

    let (coordinator, _) = create_coordinator(&server);
    let area = rectangle(37.60, 55.70, 37.61, 55.71);

    let ids = coordinator.collect_ids(&area, 6000.0, 2).await.unwrap();
    assert_eq!(ids, vec![1]);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let bbox = &body["bbox"][0];
    assert_eq!(bbox["topLeft"]["lat"], 55.71);
    assert_eq!(bbox["topLeft"]["lng"], 37.60);
    assert_eq!(bbox["bottomRight"]["lat"], 55.70);
    assert_eq!(bbox["bottomRight"]["lng"], 37.61);
}

#[tokio::test]
async fn test_collect_offers_in_batches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(offers_path()))
        .respond_with(EchoOffers)
        .expect(3)
        .mount(&server)
        .await;

    let (coordinator, _) = create_coordinator(&server);
    let ids: Vec<i64> = (1..=61).collect();

    let offers = coordinator.collect_offers(&ids, 28, 2).await.unwrap();

    let rooms: Vec<u32> = offers.iter().filter_map(|o| o.rooms_count).collect();
    assert_eq!(rooms, (1..=61).collect::<Vec<u32>>());

    let mut sizes: Vec<usize> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["cianOfferIds"].as_array().unwrap().len()
        })
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![5, 28, 28]);
}

#[tokio::test]
async fn test_unexpected_status_fails_phase() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(clusters_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let (coordinator, solver) = create_coordinator(&server);
    let area = rectangle(37.60, 55.70, 37.61, 55.71);

    let err = coordinator.collect_ids(&area, 6000.0, 1).await.unwrap_err();

    let CianError::Pool(PoolError::Failed { pool, failures }) = &err else {
        panic!("Expected aggregated pool failure, got {:?}", err);
    };
    assert_eq!(pool, "get clusters");
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        &failures[0].error,
        CianError::UnexpectedStatus { status: 500, body, .. } if body == "internal error"
    ));
    assert_eq!(solver.calls(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(offers_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let (coordinator, _) = create_coordinator(&server);

    let err = coordinator.collect_offers(&[1, 2, 3], 28, 1).await.unwrap_err();

    let CianError::Pool(pool_error) = &err else {
        panic!("Expected pool error, got {:?}", err);
    };
    assert!(matches!(
        pool_error.failures()[0].error,
        CianError::Decode { .. }
    ));
}

#[tokio::test]
async fn test_challenge_mid_crawl_solved_once() {
    let server = MockServer::start().await;
    let solved = Arc::new(AtomicBool::new(false));

    Mock::given(method("POST"))
        .and(path(clusters_path()))
        .respond_with(ChallengedEndpoint {
            solved: Arc::clone(&solved),
            body: clusters_body(&[&[11, 12]]),
        })
        .mount(&server)
        .await;
    mount_captcha(&server, &solved, captcha_page(SITE_KEY), 302).await;

    let (coordinator, solver) = create_coordinator(&server);
    // Two-by-two grid, every cell sees the challenge on its first request
    let area = rectangle(0.0, 0.0, 0.1, 0.1);

    let ids = coordinator.collect_ids(&area, 6000.0, 4).await.unwrap();

    assert_eq!(ids, vec![11, 12]);
    assert_eq!(solver.calls(), 1);
}

#[tokio::test]
async fn test_full_run_with_configured_settings() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(clusters_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(clusters_body(&[&[1, 2], &[3]])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(offers_path()))
        .respond_with(EchoOffers)
        .expect(1)
        .mount(&server)
        .await;

    let (coordinator, _) = create_coordinator(&server);
    let offers = coordinator
        .run(&rectangle(37.60, 55.70, 37.61, 55.71))
        .await
        .unwrap();

    assert_eq!(offers.len(), 3);
    assert_eq!(offers[2].rooms_count, Some(3));
}

#[tokio::test]
async fn test_filters_reach_json_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(clusters_path()))
        .and(body_partial_json(serde_json::json!({
            "jsonQuery": {
                "_type": "flatsale",
                "price": { "type": "range", "value": { "gte": 1000000, "lte": 9000000 } },
                "geo": { "type": "geo", "value": [{ "type": "district", "id": 13 }] },
            },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(clusters_body(&[&[4]])))
        .expect(1)
        .mount(&server)
        .await;

    let mut search = search_config();
    search.query.insert(
        "price".to_string(),
        FilterTerm::Known(KnownFilter::Range(RangeBounds {
            gte: Some(1_000_000.into()),
            lte: Some(9_000_000.into()),
        })),
    );
    search.query.insert(
        "geo".to_string(),
        FilterTerm::Raw(RawFilter {
            kind: "geo".to_string(),
            value: serde_json::json!([{ "type": "district", "id": 13 }]),
        }),
    );
    let coordinator = Coordinator::with_solver(
        session_for(&server),
        CountingSolver::new(Duration::ZERO),
        search,
    );

    let ids = coordinator
        .collect_ids(&rectangle(37.60, 55.70, 37.61, 55.71), 6000.0, 1)
        .await
        .unwrap();
    assert_eq!(ids, vec![4]);
}

#[tokio::test]
async fn test_null_fields_do_not_fail_phase() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(clusters_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "filtered": [
                { "count": 2, "clusterOfferIds": [8, 9], "subdomain": null, "coordinates": null },
                { "count": null, "clusterOfferIds": null },
            ],
            "offersCount": null,
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(offers_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "offersSerialized": [
                { "category": null, "geo": null, "bargainTerms": { "priceRur": null } },
                { "category": "flatSale", "geo": { "address": null }, "bargainTerms": null },
            ],
        })))
        .mount(&server)
        .await;

    let (coordinator, _) = create_coordinator(&server);
    let offers = coordinator
        .run(&rectangle(37.60, 55.70, 37.61, 55.71))
        .await
        .unwrap();

    assert_eq!(offers.len(), 2);
    assert_eq!(offers[0].category, "");
    assert_eq!(offers[1].category, "flatSale");
}

#[tokio::test]
async fn test_crawl_from_config() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(clusters_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(clusters_body(&[&[1, 2]])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(offers_path()))
        .respond_with(EchoOffers)
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        search: search_config(),
        http: HttpConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            ..HttpConfig::default()
        },
        captcha: CaptchaConfig {
            api_key: "test-key".to_string(),
            service_url: server.uri(),
            initial_delay_secs: 15,
            poll_interval_secs: 5,
            timeout_secs: 180,
        },
        output: OutputConfig {
            offers_path: "offers.json".to_string(),
        },
    };

    let offers = crawl(&config, &rectangle(37.60, 55.70, 37.61, 55.71))
        .await
        .unwrap();

    let rooms: Vec<u32> = offers.iter().filter_map(|o| o.rooms_count).collect();
    assert_eq!(rooms, vec![1, 2]);
}
