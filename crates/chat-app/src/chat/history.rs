use asystent_backend::{NewStoredMessage, RatingStore, RatingUpsert, StoredMessage, TranscriptStore};

use crate::chat::message::{Sender, Transcript};

pub fn sender_for_row(is_bot: bool) -> Sender {
    if is_bot { Sender::Bot } else { Sender::User }
}

/// Rebuilds the ordered transcript from stored rows (already sorted by
/// creation time by the store query).
pub fn transcript_from_rows(rows: Vec<StoredMessage>) -> Transcript {
    let mut transcript = Transcript::new();
    for row in rows {
        transcript.push_done(sender_for_row(row.is_bot), row.message);
    }
    transcript
}

/// Fetches the prior messages of one conversation.
///
/// Runs once per conversation establishment. A retrieval failure is logged
/// and yields an empty transcript; it never blocks the view.
pub async fn load_transcript<S>(store: &S, chat_id: &str) -> Transcript
where
    S: TranscriptStore + ?Sized,
{
    match store.list_messages(chat_id.to_string()).await {
        Ok(rows) => transcript_from_rows(rows),
        Err(error) => {
            tracing::warn!("failed to fetch conversation history: {error}");
            Transcript::new()
        }
    }
}

/// Best-effort append of one message row; failures are logged and dropped.
pub async fn persist_message<S>(store: &S, input: NewStoredMessage)
where
    S: TranscriptStore + ?Sized,
{
    if let Err(error) = store.append_message(input).await {
        tracing::warn!("failed to store message: {error}");
    }
}

/// Best-effort rating upsert; failures are logged and dropped, the optimistic
/// local value is never rolled back.
pub async fn persist_rating<S>(store: &S, input: RatingUpsert)
where
    S: RatingStore + ?Sized,
{
    if let Err(error) = store.upsert_rating(input).await {
        tracing::warn!("failed to store rating: {error}");
    }
}
