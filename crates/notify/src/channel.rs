use async_trait::async_trait;
use thiserror::Error;

use crate::cards::MessageCard;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Request(String),
    #[error("webhook endpoint returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn deliver(&self, card: &MessageCard) -> Result<(), DeliveryError>;
}

/// Posts cards as JSON to a configured webhook endpoint.
pub struct WebhookChannel {
    client: reqwest::Client,
    endpoint: String,
    secret: Option<String>,
}

impl WebhookChannel {
    pub fn new(endpoint: impl Into<String>, secret: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into(), secret }
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    async fn deliver(&self, card: &MessageCard) -> Result<(), DeliveryError> {
        let mut request = self.client.post(&self.endpoint).json(card);
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        let response =
            request.send().await.map_err(|error| DeliveryError::Request(error.to_string()))?;
        if !response.status().is_success() {
            return Err(DeliveryError::Status(response.status().as_u16()));
        }

        Ok(())
    }
}

/// Swallows every card. Used when no webhook endpoint is configured.
#[derive(Default)]
pub struct NoopChannel;

#[async_trait]
impl DeliveryChannel for NoopChannel {
    async fn deliver(&self, _card: &MessageCard) -> Result<(), DeliveryError> {
        Ok(())
    }
}
