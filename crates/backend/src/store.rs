use std::sync::Arc;

use arc_swap::ArcSwapOption;
use snafu::ResultExt;
use url::Url;

use crate::auth::Session;
use crate::client::{BackendClient, ensure_success};
use crate::error::{
    BackendError, BackendResult, DecodeResponseSnafu, ReadResponseBodySnafu, SendRequestSnafu,
};
use crate::types::{NewStoredMessage, RatingUpsert, StoredMessage};
use crate::{BoxFuture, RatingStore, TranscriptStore};

const CONVERSATIONS_TABLE: &str = "conversations";
const RATINGS_TABLE: &str = "message_ratings";

/// Composite key the ratings table resolves conflicts on; last write wins.
const RATING_CONFLICT_COLUMNS: &str = "chat_id,message_index,user_id";

/// REST data-API adapter for the two hosted tables.
///
/// Every call attaches the publishable API key and the signed-in user's
/// bearer token; callers treat writes as fire-and-forget and only log the
/// returned errors.
pub struct RestStore {
    client: BackendClient,
    session: Arc<ArcSwapOption<Session>>,
}

impl RestStore {
    pub fn new(client: BackendClient, session: Arc<ArcSwapOption<Session>>) -> Self {
        Self { client, session }
    }

    fn bearer_token(&self, stage: &'static str) -> BackendResult<String> {
        self.session
            .load_full()
            .map(|session| session.access_token.clone())
            .ok_or(BackendError::NotSignedIn { stage })
    }

    /// Read query for one conversation, oldest row first.
    fn list_messages_url(&self, chat_id: &str) -> Url {
        let mut url = self.client.table_url(CONVERSATIONS_TABLE);
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("chat_id", &format!("eq.{chat_id}"))
            .append_pair("order", "created_at.asc");
        url
    }

    /// Upsert endpoint targeting the composite conflict key.
    fn upsert_rating_url(&self) -> Url {
        let mut url = self.client.table_url(RATINGS_TABLE);
        url.query_pairs_mut()
            .append_pair("on_conflict", RATING_CONFLICT_COLUMNS);
        url
    }

    async fn append_message_inner(&self, input: NewStoredMessage) -> BackendResult<()> {
        let stage = "store-append-message";
        let token = self.bearer_token(stage)?;

        let response = self
            .client
            .http()
            .post(self.client.table_url(CONVERSATIONS_TABLE))
            .header("apikey", self.client.api_key())
            .bearer_auth(token)
            .header("Prefer", "return=minimal")
            .json(&input)
            .send()
            .await
            .context(SendRequestSnafu { stage })?;

        ensure_success(stage, response).await?;
        Ok(())
    }

    async fn list_messages_inner(&self, chat_id: String) -> BackendResult<Vec<StoredMessage>> {
        let stage = "store-list-messages";
        let token = self.bearer_token(stage)?;

        let response = self
            .client
            .http()
            .get(self.list_messages_url(&chat_id))
            .header("apikey", self.client.api_key())
            .bearer_auth(token)
            .send()
            .await
            .context(SendRequestSnafu { stage })?;

        let response = ensure_success(stage, response).await?;
        let payload = response
            .text()
            .await
            .context(ReadResponseBodySnafu { stage })?;

        serde_json::from_str(&payload).context(DecodeResponseSnafu { stage })
    }

    async fn upsert_rating_inner(&self, input: RatingUpsert) -> BackendResult<()> {
        let stage = "store-upsert-rating";
        let token = self.bearer_token(stage)?;

        let response = self
            .client
            .http()
            .post(self.upsert_rating_url())
            .header("apikey", self.client.api_key())
            .bearer_auth(token)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&input)
            .send()
            .await
            .context(SendRequestSnafu { stage })?;

        ensure_success(stage, response).await?;
        Ok(())
    }
}

impl TranscriptStore for RestStore {
    fn append_message(&self, input: NewStoredMessage) -> BoxFuture<'_, BackendResult<()>> {
        Box::pin(self.append_message_inner(input))
    }

    fn list_messages(&self, chat_id: String) -> BoxFuture<'_, BackendResult<Vec<StoredMessage>>> {
        Box::pin(self.list_messages_inner(chat_id))
    }
}

impl RatingStore for RestStore {
    fn upsert_rating(&self, input: RatingUpsert) -> BoxFuture<'_, BackendResult<()>> {
        Box::pin(self.upsert_rating_inner(input))
    }
}
