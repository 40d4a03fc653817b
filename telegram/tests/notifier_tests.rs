//! Bot API request shape and delivery classification.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use ovh_sniper_core::{Notifier, NotifyError, Retryable};
use ovh_sniper_telegram::TelegramNotifier;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notifier(server: &MockServer) -> TelegramNotifier {
    TelegramNotifier::new(&server.uri(), "123:abc", "42", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_message_is_posted_as_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_json(json!({"chat_id": "42", "text": "KSA is available"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = notifier(&server)
        .send_message("KSA is available")
        .await
        .unwrap();

    assert_eq!(delivery.status, 200);
    assert!(delivery.is_delivered());
}

#[tokio::test]
async fn test_refused_message_is_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let delivery = notifier(&server).send_message("hello").await.unwrap();

    assert_eq!(delivery.status, 400);
    assert!(!delivery.is_delivered());
}

#[tokio::test]
async fn test_other_success_codes_are_not_delivered() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let delivery = notifier(&server).send_message("hello").await.unwrap();

    assert!(!delivery.is_delivered());
}

#[tokio::test]
async fn test_unreachable_api_is_retryable_transport_error() {
    let server = MockServer::start().await;
    let notifier = notifier(&server);
    drop(server);

    let err = notifier.send_message("hello").await.unwrap_err();

    assert!(matches!(err, NotifyError::Transport(_)));
    assert!(err.is_retryable());
    assert!(!err.to_string().contains("123:abc"));
}
