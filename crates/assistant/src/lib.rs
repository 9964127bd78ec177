use std::future::Future;
use std::pin::Pin;

pub mod error;
pub mod webhook;

pub use error::{ExchangeError, ExchangeResult};
pub use webhook::WebhookAssistant;

/// Reply shown and persisted in place of the assistant's answer when the
/// remote call fails for any reason.
pub const FALLBACK_REPLY: &str = "There was an error fetching the bot's response.";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One outbound question to the remote assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub conversation_id: String,
    pub user_id: String,
    pub text: String,
}

impl ExchangeRequest {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            text: text.into(),
        }
    }
}

/// Single-operation seam to the remote assistant: one question in, one
/// plain-text reply out. No retry, no cancellation, no mutual exclusion
/// between overlapping exchanges.
pub trait Assistant: Send + Sync {
    fn exchange(&self, request: ExchangeRequest) -> BoxFuture<'_, ExchangeResult<String>>;
}

/// Maps any exchange failure to [`FALLBACK_REPLY`] after logging it, so the
/// caller can treat the result as a normal reply.
pub async fn reply_or_fallback(assistant: &dyn Assistant, request: ExchangeRequest) -> String {
    match assistant.exchange(request).await {
        Ok(reply) => reply,
        Err(error) => {
            tracing::warn!("assistant exchange failed: {error}");
            FALLBACK_REPLY.to_string()
        }
    }
}
