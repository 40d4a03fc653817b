//! Telegram Bot API client

use async_trait::async_trait;
use ovh_sniper_core::{Delivery, NotifyError, Notifier};
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Public Bot API base URL.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends messages to a single chat through a bot.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        bot_token: &str,
        chat_id: &str,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    /// Chat the messages go to.
    #[must_use]
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<Delivery, NotifyError> {
        let response = self
            .http
            .post(self.send_message_url())
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            // reqwest errors embed the URL, which carries the token
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let delivery = Delivery {
            status: response.status().as_u16(),
        };

        if delivery.is_delivered() {
            tracing::debug!(chat_id = %self.chat_id, "Message delivered");
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = delivery.status, body = %body, "Message refused");
        }

        Ok(delivery)
    }
}
