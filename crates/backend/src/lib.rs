use std::future::Future;
use std::pin::Pin;

pub mod auth;
pub mod client;
pub mod error;
pub mod store;
pub mod types;

pub use auth::{AuthClient, Session, SessionUser};
pub use client::BackendClient;
pub use error::{BackendError, BackendResult};
pub use store::RestStore;
pub use types::{NewStoredMessage, RatingUpsert, StoredMessage};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Append/read access to the hosted `conversations` table.
pub trait TranscriptStore: Send + Sync {
    /// Inserts one message row. `created_at` is assigned server side.
    fn append_message(&self, input: NewStoredMessage) -> BoxFuture<'_, BackendResult<()>>;

    /// Returns every stored message for one conversation, oldest first.
    fn list_messages(&self, chat_id: String) -> BoxFuture<'_, BackendResult<Vec<StoredMessage>>>;
}

/// Upsert access to the hosted `message_ratings` table.
pub trait RatingStore: Send + Sync {
    /// Inserts or replaces the rating row for the composite key
    /// (chat_id, message_index, user_id). Last write wins.
    fn upsert_rating(&self, input: RatingUpsert) -> BoxFuture<'_, BackendResult<()>>;
}

pub trait Backend: TranscriptStore + RatingStore {}

impl<T> Backend for T where T: TranscriptStore + RatingStore {}
