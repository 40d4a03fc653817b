//! OVH API client implementation

use crate::endpoint::Endpoint;
use crate::signature;
use async_trait::async_trait;
use ovh_sniper_core::{
    Account, ApiError, Cart, CartItem, CheckoutRequest, Clock, ConfigurationRequest,
    CreateCartRequest, EcoItemRequest, EcoOptionRequest, ItemConfiguration, Order,
    ServerAvailability, ShopApi, SystemClock,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Application credentials.
#[derive(Clone)]
pub struct Credentials {
    /// Application key (`X-Ovh-Application`)
    pub application_key: String,
    /// Application secret, only used to sign
    pub application_secret: String,
    /// Consumer key (`X-Ovh-Consumer`)
    pub consumer_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("application_key", &self.application_key)
            .field("application_secret", &"<redacted>")
            .field("consumer_key", &"<redacted>")
            .finish()
    }
}

/// Body sent with POST calls that take no parameters.
#[derive(Serialize)]
struct EmptyBody {}

/// OVH API client
///
/// Signs authenticated calls with the application secret and consumer key.
/// The signing timestamp is corrected by the delta to the server clock,
/// fetched once from `/auth/time`.
#[derive(Clone)]
pub struct OvhClient {
    http: Client,
    endpoint: Endpoint,
    credentials: Credentials,
    clock: Arc<dyn Clock>,
    time_delta: Arc<OnceCell<i64>>,
}

impl OvhClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(
        endpoint: Endpoint,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            credentials,
            clock: Arc::new(SystemClock),
            time_delta: Arc::new(OnceCell::new()),
        })
    }

    /// Replace the clock used for signing timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Endpoint in use.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Server time minus local time, in seconds.
    async fn time_delta(&self) -> Result<i64, ApiError> {
        self.time_delta
            .get_or_try_init(|| async {
                let url = self.url("/auth/time", &[])?;
                let request = self
                    .http
                    .get(url)
                    .header("X-Ovh-Application", &self.credentials.application_key);
                let server_time: i64 = self.send(request, "/auth/time").await?;

                let delta = server_time - self.clock.now().timestamp();
                tracing::debug!(delta, "Server time delta computed");
                Ok::<_, ApiError>(delta)
            })
            .await
            .copied()
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let raw = format!("{}{path}", self.endpoint.base_url());
        let parsed = if query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, query)
        };
        parsed.map_err(|e| ApiError::InvalidRequest(format!("{raw}: {e}")))
    }

    async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        need_auth: bool,
    ) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path, query)?;
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?
            .unwrap_or_default();

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header("X-Ovh-Application", &self.credentials.application_key);

        if !body.is_empty() {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        if need_auth {
            let timestamp = self.clock.now().timestamp() + self.time_delta().await?;
            let signature = signature::sign(
                &self.credentials.application_secret,
                &self.credentials.consumer_key,
                method.as_str(),
                url.as_str(),
                &body,
                timestamp,
            );
            request = request
                .header("X-Ovh-Consumer", &self.credentials.consumer_key)
                .header("X-Ovh-Timestamp", timestamp.to_string())
                .header("X-Ovh-Signature", signature);
        }

        tracing::debug!(%method, path, "Calling OVH API");
        self.send(request, path).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), error_message(&text)));
        }

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        self.call(Method::GET, path, query, None::<&EmptyBody>, true)
            .await
    }

    async fn post<B, T>(&self, path: &str, body: &B, need_auth: bool) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.call(Method::POST, path, &[], Some(body), need_auth)
            .await
    }
}

/// OVH errors carry `{"class": ..., "message": ...}`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

impl fmt::Debug for OvhClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OvhClient")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ShopApi for OvhClient {
    async fn account(&self) -> Result<Account, ApiError> {
        self.get("/me", &[]).await
    }

    async fn availabilities(
        &self,
        datacenter: &str,
        plan_code: &str,
    ) -> Result<Vec<ServerAvailability>, ApiError> {
        self.get(
            "/dedicated/server/datacenter/availabilities",
            &[("datacenters", datacenter), ("planCode", plan_code)],
        )
        .await
    }

    async fn create_cart(&self, request: &CreateCartRequest) -> Result<Cart, ApiError> {
        self.post("/order/cart", request, false).await
    }

    async fn assign_cart(&self, cart_id: &str) -> Result<(), ApiError> {
        self.post(&format!("/order/cart/{cart_id}/assign"), &EmptyBody {}, true)
            .await
    }

    async fn add_eco_item(
        &self,
        cart_id: &str,
        request: &EcoItemRequest,
    ) -> Result<CartItem, ApiError> {
        self.post(&format!("/order/cart/{cart_id}/eco"), request, true)
            .await
    }

    async fn add_eco_option(
        &self,
        cart_id: &str,
        request: &EcoOptionRequest,
    ) -> Result<CartItem, ApiError> {
        self.post(&format!("/order/cart/{cart_id}/eco/options"), request, true)
            .await
    }

    async fn configure_item(
        &self,
        cart_id: &str,
        item_id: u64,
        request: &ConfigurationRequest,
    ) -> Result<ItemConfiguration, ApiError> {
        self.post(
            &format!("/order/cart/{cart_id}/item/{item_id}/configuration"),
            request,
            true,
        )
        .await
    }

    async fn quotation(&self, cart_id: &str) -> Result<Order, ApiError> {
        self.get(&format!("/order/cart/{cart_id}/checkout"), &[])
            .await
    }

    async fn checkout(&self, cart_id: &str, request: &CheckoutRequest) -> Result<Order, ApiError> {
        self.post(&format!("/order/cart/{cart_id}/checkout"), request, true)
            .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Tests can unwrap

    use super::*;

    fn client() -> OvhClient {
        OvhClient::new(
            Endpoint::default(),
            Credentials {
                application_key: "ak".to_string(),
                application_secret: "secret".to_string(),
                consumer_key: "consumer".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_url_with_query() {
        let url = client()
            .url(
                "/dedicated/server/datacenter/availabilities",
                &[("datacenters", "bhs"), ("planCode", "24ska01")],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://eu.api.ovh.com/1.0/dedicated/server/datacenter/availabilities?datacenters=bhs&planCode=24ska01"
        );
    }

    #[test]
    fn test_url_without_query_has_no_question_mark() {
        let client = client();
        assert_eq!(client.endpoint(), &Endpoint::default());

        let url = client.url("/me", &[]).unwrap();
        assert_eq!(url.as_str(), "https://eu.api.ovh.com/1.0/me");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"class":"Client::BadRequest","message":"Invalid planCode"}"#),
            "Invalid planCode"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let debug = format!("{:?}", client());
        assert!(debug.contains("ak"));
        assert!(!debug.contains("secret\""));
        assert!(!debug.contains("consumer\""));
    }
}
