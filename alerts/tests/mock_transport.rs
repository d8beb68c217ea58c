use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use alerts::transport::{NotificationTransport, TransportError};

/// Records every send and answers with a fixed status.
pub struct MockTransport {
    pub status: u16,
    pub latency: Duration,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn answering(status: u16) -> Self {
        Self {
            status,
            latency: Duration::ZERO,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn sends(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl NotificationTransport for MockTransport {
    async fn send(&self, destination: &str, message: &str) -> Result<u16, TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.sent
            .lock()
            .push((destination.to_string(), message.to_string()));
        Ok(self.status)
    }
}
