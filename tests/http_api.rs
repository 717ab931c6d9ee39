//! End-to-end tests of the JSON API over a loopback listener

use lora_hat_gateway::gateway::{GatewayService, ReceiveLoopConfig};
use lora_hat_gateway::http;
use lora_hat_gateway::radio::mock::MockRadio;
use lora_hat_gateway::RadioHandle;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

async fn serve(service: Arc<GatewayService>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, http::router(service)).await.unwrap();
    });
    addr
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

#[tokio::test]
async fn test_health_and_stats_in_simulation() {
    let service = Arc::new(GatewayService::new(RadioHandle::simulated(), 100));
    let addr = serve(service).await;
    let client = reqwest::Client::new();

    let health: Value = client.get(url(addr, "/api/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(
        health,
        json!({"status": "ok", "service": "gatemesh-lora-hat", "lora_available": false, "connected": true})
    );

    let stats: Value = client.get(url(addr, "/api/lora/stats")).send().await.unwrap().json().await.unwrap();
    assert_eq!(stats["success"], true);
    assert_eq!(stats["connected"], true);
    assert_eq!(stats["stats"]["packets_received"], 0);
    assert_eq!(stats["stats"]["last_rssi"], Value::Null);
    assert_eq!(
        stats["config"],
        json!({"frequency": 915.0, "bandwidth": 125000, "coding_rate": 5, "spreading_factor": 7, "tx_power": 20})
    );
}

#[tokio::test]
async fn test_connect_converts_units_and_merges() {
    let mock = MockRadio::new();
    let service = Arc::new(GatewayService::new(RadioHandle::hardware(mock.clone()), 100));
    let addr = serve(service).await;
    let client = reqwest::Client::new();

    let response = client
        .post(url(addr, "/api/lora/connect"))
        .json(&json!({"frequency": 868.1, "bandwidth": 250, "spreadingFactor": 9}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["deviceName"], "Raspberry Pi LoRa HAT (RFM9x)");
    assert_eq!(body["config"]["bandwidth"], 250_000);

    // Empty body reconnects with what is already configured
    let body: Value = client
        .post(url(addr, "/api/lora/connect"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["config"]["frequency"], 868.1);
    assert_eq!(body["config"]["spreading_factor"], 9);

    let body: Value = client
        .post(url(addr, "/api/lora/connect"))
        .json(&json!({"txPower": 17}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["config"]["frequency"], 868.1);
    assert_eq!(body["config"]["tx_power"], 17);
    assert_eq!(mock.opened_configs().len(), 3);
}

#[tokio::test]
async fn test_connect_failures_are_500() {
    let mock = MockRadio::new();
    let service = Arc::new(GatewayService::new(RadioHandle::hardware(mock.clone()), 100));
    let addr = serve(service).await;
    let client = reqwest::Client::new();

    let bad_field = client
        .post(url(addr, "/api/lora/connect"))
        .json(&json!({"spreadingFactor": 42}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_field.status(), 500);
    let body: Value = bad_field.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("SF42"));

    let malformed = client
        .post(url(addr, "/api/lora/connect"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 500);

    mock.fail_next_open("no response on SPI");
    let driver = client
        .post(url(addr, "/api/lora/connect"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(driver.status(), 500);
    let body: Value = driver.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("no response on SPI"));
}

#[tokio::test]
async fn test_send_reports_bytes_and_mock_flag() {
    let payload = json!({"to": "^all", "text": "hi"});
    let expected = serde_json::to_vec(&payload).unwrap().len();
    let client = reqwest::Client::new();

    let simulated = serve(Arc::new(GatewayService::new(RadioHandle::simulated(), 100))).await;
    let body: Value = client
        .post(url(simulated, "/api/lora/send"))
        .json(&payload)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"success": true, "bytes_sent": expected, "mock": true}));

    let mock = MockRadio::new();
    let hardware = serve(Arc::new(GatewayService::new(RadioHandle::hardware(mock.clone()), 100))).await;

    let not_connected = client
        .post(url(hardware, "/api/lora/send"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(not_connected.status(), 500);

    client.post(url(hardware, "/api/lora/connect")).send().await.unwrap();
    let body: Value = client
        .post(url(hardware, "/api/lora/send"))
        .json(&payload)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"success": true, "bytes_sent": expected}));
    assert_eq!(mock.transmitted().len(), 1);
}

#[tokio::test]
async fn test_send_relays_keys_in_client_order() {
    let mock = MockRadio::new();
    let addr = serve(Arc::new(GatewayService::new(RadioHandle::hardware(mock.clone()), 100))).await;
    let client = reqwest::Client::new();
    client.post(url(addr, "/api/lora/connect")).send().await.unwrap();

    let document = r#"{"to":"^all","from":"!a1b2c3d4","channel":0,"text":"hello"}"#;
    let response = client
        .post(url(addr, "/api/lora/send"))
        .header("content-type", "application/json")
        .body(document)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(mock.transmitted(), vec![document.as_bytes().to_vec()]);
}

#[tokio::test]
async fn test_poll_and_disconnect() {
    let mock = MockRadio::new();
    let service = Arc::new(GatewayService::new(RadioHandle::hardware(mock.clone()), 100));
    let receiver = service.start(ReceiveLoopConfig {
        receive_timeout: Duration::from_millis(50),
        ..Default::default()
    });
    let addr = serve(service).await;
    let client = reqwest::Client::new();

    let empty: Value = client.get(url(addr, "/api/lora/poll")).send().await.unwrap().json().await.unwrap();
    assert_eq!(empty, json!([]));

    client.post(url(addr, "/api/lora/connect")).send().await.unwrap();
    mock.queue_frame(b"{\"from\":\"!a1b2c3d4\"}", Some(-97.5), Some(-1.25));

    let deadline = Instant::now() + Duration::from_secs(3);
    let mut packets = Vec::new();
    while packets.is_empty() && Instant::now() < deadline {
        let body: Value = client.get(url(addr, "/api/lora/poll")).send().await.unwrap().json().await.unwrap();
        packets = body.as_array().cloned().unwrap_or_default();
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0]["data"], "{\"from\":\"!a1b2c3d4\"}");
    assert_eq!(packets[0]["rssi"], -97.5);
    assert_eq!(packets[0]["snr"], -1.25);
    assert!(packets[0]["timestamp"].as_f64().unwrap() > 1_600_000_000.0);

    let body: Value = client
        .post(url(addr, "/api/lora/disconnect"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"success": true, "message": "Disconnected from LoRa radio"}));

    let stats: Value = client.get(url(addr, "/api/lora/stats")).send().await.unwrap().json().await.unwrap();
    assert_eq!(stats["connected"], false);
    assert_eq!(stats["stats"]["packets_received"], 1);

    receiver.shutdown().await;
}

#[tokio::test]
async fn test_cors_preflight_allowed() {
    let addr = serve(Arc::new(GatewayService::new(RadioHandle::simulated(), 100))).await;
    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, url(addr, "/api/lora/send"))
        .header("origin", "http://mesh.local")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
