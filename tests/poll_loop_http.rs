//! End-to-end: a poll loop over real HTTP against mocked registry and
//! Hyperion endpoints.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hyperion_poller::api::hyperion::HyperionClient;
use hyperion_poller::discovery::EndpointDirectory;
use hyperion_poller::health::HealthChecker;
use hyperion_poller::poller::events;
use hyperion_poller::pool::EndpointSelector;
use hyperion_poller::{PollEvent, PollLoop, PollerConfig};

const CHAIN: &str = "1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4";

fn health_body(now_ms: i64) -> serde_json::Value {
    json!({
        "host": "wax.mock",
        "health": [
            {"service": "NodeosRPC", "status": "OK", "time": now_ms},
            {"service": "Elasticsearch", "status": "OK", "time": now_ms,
             "service_data": {"last_indexed_block": 4957010, "total_indexed_blocks": 4957010}}
        ],
        "features": {"index_deltas": true, "index_all_deltas": true, "index_transfer_memo": true}
    })
}

async fn mount_hyperion(server: &MockServer, healthy: bool) {
    let mut body = health_body(chrono::Utc::now().timestamp_millis());
    if !healthy {
        body["health"][0]["status"] = json!("Error");
    }
    Mock::given(method("GET"))
        .and(path("/v2/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/history/get_actions"))
        .and(query_param("block_num", "4957000-100000000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "actions": [
                {"block_num": 4957001, "global_sequence": 900, "timestamp": "2021-01-01T00:00:00.000",
                 "act": {"account": "atomicassets", "name": "transfer", "data": {}}},
                {"block_num": 4957003, "global_sequence": 901, "timestamp": "2021-01-01T00:00:01.000",
                 "act": {"account": "atomicassets", "name": "logmint", "data": {}}}
            ]
        })))
        .mount(server)
        .await;
}

fn config(endpoints: Vec<String>) -> PollerConfig {
    PollerConfig {
        endpoints,
        fetch_endpoint_list: true,
        chain_id: Some(CHAIN.to_string()),
        start_block: 4_957_000,
        account: "koilamarkett".into(),
        loop_wait_seconds: 1,
        request_timeout_ms: 2000,
        ..Default::default()
    }
}

#[tokio::test]
async fn polls_configured_endpoint_when_registry_is_down() {
    let registry = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/apps/nodestatus/{}.json", CHAIN)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&registry)
        .await;

    let healthy = MockServer::start().await;
    mount_hyperion(&healthy, true).await;
    let unhealthy = MockServer::start().await;
    mount_hyperion(&unhealthy, false).await;

    let cfg = config(vec![healthy.uri(), unhealthy.uri()]);
    let client = Arc::new(HyperionClient::new(cfg.request_timeout()).unwrap());
    let directory = EndpointDirectory::new(client.inner().clone(), registry.uri());

    let (tx, mut rx) = events::channel(16);
    let poll_loop = PollLoop::new(&cfg, client.clone(), tx)
        // Mock servers live on loopback.
        .with_checker(HealthChecker::new(client).with_blocked_hosts(vec![]))
        .with_selector(EndpointSelector::seeded(11))
        .with_staleness(Duration::from_secs(60))
        .with_directory(directory, CHAIN);

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(poll_loop.run(stop_rx));

    let first = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no event before timeout");
    let batch = match first {
        Some(PollEvent::Actions(batch)) => batch,
        other => panic!("expected actions, got {:?}", other),
    };
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].name(), Some("transfer"));
    assert_eq!(batch[1].global_sequence, Some(901));

    assert_eq!(rx.recv().await, Some(PollEvent::SuccessfulQuery));
    stop_tx.send(true).unwrap();

    let state = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
    assert_eq!(state.candidates, vec![healthy.uri(), unhealthy.uri()]);
    assert_eq!(state.healthy, vec![healthy.uri()]);
    assert_eq!(state.cursor.next_block(), 4_957_004);
    assert_eq!(state.cursor.last_sequence(), 901);

    // Only the healthy node was ever asked for actions.
    let unhealthy_requests = unhealthy.received_requests().await.unwrap();
    assert!(unhealthy_requests
        .iter()
        .all(|r| r.url.path() == "/v2/health"));
}
