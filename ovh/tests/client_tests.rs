//! HTTP-level tests for the OVH client against a mock server.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use ovh_sniper_core::{
    ApiError, AvailabilityStatus, CheckoutRequest, ConfigurationRequest, CreateCartRequest,
    EcoItemRequest, ShopApi,
};
use ovh_sniper_ovh::{Credentials, Endpoint, OvhClient, signature};
use ovh_sniper_testing::test_clock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// `test_clock()` is 2025-01-01T00:00:00Z; the server is 30 seconds ahead.
const SERVER_TIME: i64 = 1_735_689_630;

async fn server_with_time() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/time"))
        .and(header("X-Ovh-Application", "ak"))
        .respond_with(ResponseTemplate::new(200).set_body_json(SERVER_TIME))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn client(server: &MockServer) -> OvhClient {
    OvhClient::new(
        Endpoint::custom(&server.uri()),
        Credentials {
            application_key: "ak".to_string(),
            application_secret: "secret".to_string(),
            consumer_key: "consumer".to_string(),
        },
        Duration::from_secs(5),
    )
    .unwrap()
    .with_clock(Arc::new(test_clock()))
}

#[tokio::test]
async fn test_signed_get_account() {
    let server = server_with_time().await;
    let expected = signature::sign(
        "secret",
        "consumer",
        "GET",
        &format!("{}/me", server.uri()),
        "",
        SERVER_TIME,
    );

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("X-Ovh-Application", "ak"))
        .and(header("X-Ovh-Consumer", "consumer"))
        .and(header("X-Ovh-Timestamp", SERVER_TIME.to_string().as_str()))
        .and(header("X-Ovh-Signature", expected.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ovhSubsidiary": "CA", "nichandle": "ab12345-ovh"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let account = client(&server).account().await.unwrap();
    assert_eq!(account.ovh_subsidiary, "CA");
}

#[tokio::test]
async fn test_availabilities_query_and_time_delta_cached() {
    let server = server_with_time().await;

    Mock::given(method("GET"))
        .and(path("/dedicated/server/datacenter/availabilities"))
        .and(query_param("datacenters", "bhs"))
        .and(query_param("planCode", "24ska01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "planCode": "24ska01",
            "server": "24ska01",
            "datacenters": [{"datacenter": "bhs", "availability": "72H"}]
        }])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    for _ in 0..2 {
        let records = client.availabilities("bhs", "24ska01").await.unwrap();
        assert_eq!(
            records[0].datacenters[0].availability,
            AvailabilityStatus::Other("72H".to_string())
        );
    }
    // server_with_time() expects exactly one /auth/time call.
}

#[tokio::test]
async fn test_create_cart_is_unauthenticated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order/cart"))
        .and(header("X-Ovh-Application", "ak"))
        .and(body_json(json!({"ovhSubsidiary": "CA"})))
        .and(|request: &Request| !request.headers.contains_key("X-Ovh-Signature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cartId": "abc",
            "expire": "2025-01-02T00:00:00+00:00",
            "items": [],
            "readOnly": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cart = client(&server)
        .create_cart(&CreateCartRequest {
            ovh_subsidiary: "CA".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(cart.cart_id, "abc");
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn test_assign_sends_empty_object_and_accepts_null() {
    let server = server_with_time().await;

    Mock::given(method("POST"))
        .and(path("/order/cart/abc/assign"))
        .and(body_string("{}"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).assign_cart("abc").await.unwrap();
}

#[tokio::test]
async fn test_eco_item_and_configuration() {
    let server = server_with_time().await;

    Mock::given(method("POST"))
        .and(path("/order/cart/abc/eco"))
        .and(body_json(json!({
            "planCode": "24ska01",
            "duration": "P1M",
            "pricingMode": "default",
            "quantity": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "itemId": 42,
            "cartId": "abc",
            "duration": "P1M",
            "settings": {"planCode": "24ska01"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/order/cart/abc/item/42/configuration"))
        .and(body_json(json!({"label": "dedicated_os", "value": "none_64.en"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "label": "dedicated_os",
            "value": "none_64.en"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let item = client
        .add_eco_item(
            "abc",
            &EcoItemRequest {
                plan_code: "24ska01".to_string(),
                duration: "P1M".to_string(),
                pricing_mode: "default".to_string(),
                quantity: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(item.item_id, 42);

    let configuration = client
        .configure_item("abc", 42, &ConfigurationRequest::new("dedicated_os", "none_64.en"))
        .await
        .unwrap();
    assert_eq!(configuration.id, 7);
}

#[tokio::test]
async fn test_checkout_signature_covers_body() {
    let server = server_with_time().await;
    let expected = signature::sign(
        "secret",
        "consumer",
        "POST",
        &format!("{}/order/cart/abc/checkout", server.uri()),
        "{}",
        SERVER_TIME,
    );

    Mock::given(method("POST"))
        .and(path("/order/cart/abc/checkout"))
        .and(header("X-Ovh-Signature", expected.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderId": 123_456_789,
            "url": "https://www.ovh.com/cgi-bin/order/displayOrder.cgi?orderId=123456789",
            "prices": {"withTax": {"text": "29.99 CAD", "value": 29.99, "currencyCode": "CAD"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let order = client(&server)
        .checkout("abc", &CheckoutRequest::default())
        .await
        .unwrap();
    let result = order.to_result().unwrap();

    assert_eq!(result.order_id, 123_456_789);
    assert_eq!(result.total_price_text, "29.99 CAD");
}

#[tokio::test]
async fn test_status_mapping() {
    let server = server_with_time().await;

    Mock::given(method("GET"))
        .and(path("/order/cart/limited/checkout"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/order/cart/down/checkout"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/order/cart/bad/checkout"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "class": "Client::BadRequest",
            "message": "Cart is empty"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/order/cart/garbled/checkout"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = client(&server);

    assert_eq!(client.quotation("limited").await, Err(ApiError::RateLimited));
    assert_eq!(
        client.quotation("down").await,
        Err(ApiError::Upstream {
            status: 503,
            message: "Service Unavailable".to_string(),
        })
    );
    assert_eq!(
        client.quotation("bad").await,
        Err(ApiError::Api {
            status: 400,
            message: "Cart is empty".to_string(),
        })
    );
    assert!(matches!(
        client.quotation("garbled").await,
        Err(ApiError::Decode(_))
    ));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let server = MockServer::start().await;
    let client = client(&server);
    drop(server);

    let err = client
        .create_cart(&CreateCartRequest {
            ovh_subsidiary: "CA".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
}
