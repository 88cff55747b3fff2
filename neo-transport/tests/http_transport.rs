//! HTTP transport tests against a local mock controller

use mockito::Server;
use neo_transport::{HttpTransport, Transport, TransportConfig, TransportError, CONTENT_TYPE};
use std::time::Duration;

const LOGIN_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?><response id="G1000" origin="device" destination="transcoder-collector" command="add" category="login"><session sid="949098745790" type="pull"/></response>"#;

#[tokio::test]
async fn test_post_sends_xml_and_returns_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/neoreq/")
        .match_header("content-type", CONTENT_TYPE)
        .match_body(r#"<request id="G1000"/>"#)
        .with_status(200)
        .with_body(LOGIN_RESPONSE)
        .create_async()
        .await;

    let transport =
        HttpTransport::new(TransportConfig::new(format!("{}/neoreq/", server.url()))).unwrap();

    let body = transport
        .post(r#"<request id="G1000"/>"#.to_string())
        .await
        .unwrap();

    assert_eq!(body, LOGIN_RESPONSE);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_error_status_is_reported() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/neoreq/")
        .with_status(500)
        .create_async()
        .await;

    let transport =
        HttpTransport::new(TransportConfig::new(format!("{}/neoreq/", server.url()))).unwrap();

    let result = transport.post("<request/>".to_string()).await;

    match result {
        Err(TransportError::Status(code)) => assert_eq!(code, 500),
        other => panic!("Expected TransportError::Status, got {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Port 1 is reserved and nothing listens there
    let config = TransportConfig::new("http://127.0.0.1:1/neoreq/")
        .with_connect_timeout(Duration::from_millis(500))
        .with_connect_retries(0);
    let transport = HttpTransport::new(config).unwrap();

    let result = transport.post("<request/>".to_string()).await;

    assert!(matches!(
        result,
        Err(TransportError::Network(_)) | Err(TransportError::Timeout(_))
    ));
}
