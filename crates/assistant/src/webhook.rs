use snafu::ResultExt;
use url::Url;

use crate::error::{
    ExchangeResult, InvalidWebhookUrlSnafu, ReadResponseBodySnafu, SendRequestSnafu,
    UnexpectedStatusSnafu,
};
use crate::{Assistant, BoxFuture, ExchangeRequest};

/// Remote assistant reached through a fixed HTTPS webhook.
///
/// The exchange is one GET carrying the conversation id, user id and raw
/// text as query parameters; the reply is the response body verbatim.
pub struct WebhookAssistant {
    http: reqwest::Client,
    endpoint: Url,
}

impl WebhookAssistant {
    pub fn new(endpoint: &str) -> ExchangeResult<Self> {
        let endpoint = Url::parse(endpoint).context(InvalidWebhookUrlSnafu {
            stage: "webhook-assistant-new",
            raw: endpoint.to_string(),
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }

    /// Full request URL for one exchange. The parameter names are the wire
    /// contract of the webhook and must not change.
    fn request_url(&self, request: &ExchangeRequest) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("chatId", &request.conversation_id)
            .append_pair("userId", &request.user_id)
            .append_pair("chatInput", &request.text);
        url
    }

    async fn exchange_inner(&self, request: ExchangeRequest) -> ExchangeResult<String> {
        let response = self
            .http
            .get(self.request_url(&request))
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "webhook-send",
            })?;

        let status = response.status();
        let body = response.text().await.context(ReadResponseBodySnafu {
            stage: "webhook-read-body",
        })?;

        if !status.is_success() {
            return UnexpectedStatusSnafu {
                stage: "webhook-status",
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        Ok(body)
    }
}

impl Assistant for WebhookAssistant {
    fn exchange(&self, request: ExchangeRequest) -> BoxFuture<'_, ExchangeResult<String>> {
        Box::pin(self.exchange_inner(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant() -> WebhookAssistant {
        WebhookAssistant::new("https://example.app.n8n.cloud/webhook/abc-123").unwrap()
    }

    #[test]
    fn request_url_carries_exactly_the_three_wire_parameters() {
        let url = assistant().request_url(&ExchangeRequest::new(
            "chat_17_x9",
            "user-1",
            "Czym jest VAT?",
        ));

        assert_eq!(
            url.as_str(),
            "https://example.app.n8n.cloud/webhook/abc-123\
             ?chatId=chat_17_x9&userId=user-1&chatInput=Czym+jest+VAT%3F"
        );
    }

    #[test]
    fn request_url_encodes_reserved_characters_in_the_message() {
        let url = assistant().request_url(&ExchangeRequest::new("c", "u", "a&b=c"));

        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        assert_eq!(
            query,
            vec![
                ("chatId".to_string(), "c".to_string()),
                ("userId".to_string(), "u".to_string()),
                ("chatInput".to_string(), "a&b=c".to_string()),
            ]
        );
    }

    #[test]
    fn invalid_endpoint_is_rejected_at_construction() {
        assert!(WebhookAssistant::new("not a url").is_err());
    }
}
