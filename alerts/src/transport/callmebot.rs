use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{NotificationTransport, TransportError};

pub const DEFAULT_CALLMEBOT_URL: &str = "https://api.callmebot.com/whatsapp.php";

/// WhatsApp delivery through the CallMeBot HTTP gateway.
///
/// The destination is the phone number with country code (`+1234567890`).
#[derive(Clone)]
pub struct CallMeBotTransport {
    http: Client,
    url: String,
    api_key: String,
}

impl CallMeBotTransport {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, TransportError> {
        Self::with_url(DEFAULT_CALLMEBOT_URL.to_string(), api_key, timeout)
    }

    pub fn with_url(url: String, api_key: String, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url, api_key })
    }
}

#[async_trait]
impl NotificationTransport for CallMeBotTransport {
    #[instrument(skip(self, message), level = "debug")]
    async fn send(&self, destination: &str, message: &str) -> Result<u16, TransportError> {
        // reqwest percent-encodes the query, including the message text.
        let resp = self
            .http
            .get(&self.url)
            .query(&[
                ("phone", destination),
                ("text", message),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        debug!(status, "callmebot responded");

        Ok(status)
    }
}
