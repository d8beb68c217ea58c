pub mod callmebot;

use async_trait::async_trait;
use thiserror::Error;

pub use callmebot::CallMeBotTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Delivers a rendered message to a destination.
///
/// Returns the status code the remote side answered with; interpreting it
/// is the caller's job. No retries happen here.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, destination: &str, message: &str) -> Result<u16, TransportError>;
}
