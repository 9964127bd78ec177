use std::collections::HashMap;
use std::sync::Mutex;

use asystent_assistant::{Assistant, ExchangeError, ExchangeRequest, ExchangeResult};
use asystent_backend::{
    BackendError, BackendResult, NewStoredMessage, RatingStore, RatingUpsert, StoredMessage,
    TranscriptStore,
};

/// In-memory stand-in for the hosted backend, mimicking its append, filter
/// and upsert semantics.
#[derive(Default)]
pub(crate) struct FakeBackend {
    fail: bool,
    messages: Mutex<Vec<NewStoredMessage>>,
    ratings: Mutex<HashMap<(String, u32, String), RatingUpsert>>,
}

impl FakeBackend {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn stored_messages(&self) -> Vec<NewStoredMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub(crate) fn stored_ratings(&self) -> Vec<RatingUpsert> {
        let mut rows: Vec<_> = self.ratings.lock().unwrap().values().cloned().collect();
        rows.sort_by_key(|row| (row.chat_id.clone(), row.message_index, row.user_id.clone()));
        rows
    }

    fn failure(stage: &'static str) -> BackendError {
        BackendError::UnexpectedStatus {
            stage,
            status: 503,
            body: "service unavailable".to_string(),
        }
    }
}

impl TranscriptStore for FakeBackend {
    fn append_message(
        &self,
        input: NewStoredMessage,
    ) -> asystent_backend::BoxFuture<'_, BackendResult<()>> {
        Box::pin(async move {
            if self.fail {
                return Err(Self::failure("store-append-message"));
            }
            self.messages.lock().unwrap().push(input);
            Ok(())
        })
    }

    fn list_messages(
        &self,
        chat_id: String,
    ) -> asystent_backend::BoxFuture<'_, BackendResult<Vec<StoredMessage>>> {
        Box::pin(async move {
            if self.fail {
                return Err(Self::failure("store-list-messages"));
            }
            let rows = self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|row| row.chat_id == chat_id)
                .map(|row| StoredMessage {
                    user_id: row.user_id.clone(),
                    chat_id: row.chat_id.clone(),
                    message: row.message.clone(),
                    is_bot: row.is_bot,
                    created_at: None,
                })
                .collect();
            Ok(rows)
        })
    }
}

impl RatingStore for FakeBackend {
    fn upsert_rating(
        &self,
        input: RatingUpsert,
    ) -> asystent_backend::BoxFuture<'_, BackendResult<()>> {
        Box::pin(async move {
            if self.fail {
                return Err(Self::failure("store-upsert-rating"));
            }
            let key = (
                input.chat_id.clone(),
                input.message_index,
                input.user_id.clone(),
            );
            self.ratings.lock().unwrap().insert(key, input);
            Ok(())
        })
    }
}

/// Canned assistant that records what it was asked.
pub(crate) struct FakeAssistant {
    reply: Option<String>,
    seen: Mutex<Vec<ExchangeRequest>>,
}

impl FakeAssistant {
    pub(crate) fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            reply: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<ExchangeRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Assistant for FakeAssistant {
    fn exchange(
        &self,
        request: ExchangeRequest,
    ) -> asystent_assistant::BoxFuture<'_, ExchangeResult<String>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(ExchangeError::UnexpectedStatus {
                    stage: "webhook-status",
                    status: 500,
                    body: "boom".to_string(),
                }),
            }
        })
    }
}
