//! The reqwest transport against real sockets.
//!
//! Mock servers bind inside the Archicad port window, so every test here
//! runs serially.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::TcpListener;
use std::time::Duration;

use multiconn_common::{Port, codes};
use multiconn_cli::application::{MultiConn, Transport};
use multiconn_cli::domain::{MultiConnConfig, Status};
use multiconn_cli::infra::http::HttpTransport;
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_millis(500);

/// A mock server on the first free port of the window.
async fn archicad_server() -> (MockServer, Port) {
    let (listener, port) = Port::all()
        .find_map(|port| {
            TcpListener::bind(("127.0.0.1", port.get()))
                .ok()
                .map(|l| (l, port))
        })
        .expect("a free port in the Archicad window");
    let server = MockServer::builder().listener(listener).start().await;
    (server, port)
}

fn transport() -> HttpTransport {
    HttpTransport::localhost().expect("client builds")
}

async fn mount_bootstrap(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"command": "API.GetProductInfo"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "succeeded": true,
            "result": {"version": 27, "buildNumber": 4001, "languageCode": "GER"}
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "parameters": {"addOnCommandId": {"commandName": "GetProjectInfo"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "succeeded": true,
            "result": {"addOnCommandResponse": {
                "isUntitled": false,
                "isTeamwork": false,
                "projectPath": "/projects/House.pln",
                "projectName": "House"
            }}
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "parameters": {"addOnCommandId": {"commandName": "GetArchicadLocation"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "succeeded": true,
            "result": {"addOnCommandResponse": {"archicadLocation": "/opt/archicad/ARCHICAD"}}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
#[serial]
async fn test_post_json_returns_body() {
    let (server, port) = archicad_server().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"command": "API.IsAlive"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"succeeded": true, "result": {"isAlive": true}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let body = transport()
        .post_json(port, &json!({"command": "API.IsAlive", "parameters": {}}), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(body["result"]["isAlive"], true);
}

#[tokio::test]
#[serial]
async fn test_http_status_becomes_error_code() {
    let (server, port) = archicad_server().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = transport()
        .post_json(port, &json!({}), TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err.code, 500);
}

#[tokio::test]
#[serial]
async fn test_invalid_json_is_malformed() {
    let (server, port) = archicad_server().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = transport()
        .post_json(port, &json!({}), TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::MALFORMED);
}

#[tokio::test]
#[serial]
async fn test_slow_instance_times_out() {
    let (server, port) = archicad_server().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"succeeded": true}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = transport()
        .post_json(port, &json!({}), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::TIMEOUT);
}

#[tokio::test]
#[serial]
async fn test_probe_and_connection_errors() {
    let (server, port) = archicad_server().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    assert!(transport().probe(port, TIMEOUT).await);

    drop(server);
    assert!(!transport().probe(port, TIMEOUT).await);
    let err = transport()
        .post_json(port, &json!({}), TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::CONNECTION);
}

#[tokio::test]
#[serial]
async fn test_scan_and_connect_over_http() {
    let (server, port) = archicad_server().await;
    mount_bootstrap(&server).await;

    let mut conn = MultiConn::with_defaults(MultiConnConfig::default()).unwrap();
    conn.discover(None).await.unwrap();

    let handle = conn.get(port).expect("instance registered");
    assert!(handle.is_fully_initialized());
    assert_eq!(handle.product_info().as_ref().unwrap().build, 4001);
    assert_eq!(conn.primary_port(), Some(port));
    assert_eq!(conn.primary().unwrap().status(), Status::Active);

    let outcomes = conn.connect().from_ports(&[port]).await;
    assert_eq!(outcomes[0].status, Status::Active);
}
