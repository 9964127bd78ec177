/// Event contracts for chat module wiring.
pub mod events;
/// History loading and best-effort persistence glue.
pub mod history;
pub mod login;
/// Transcript domain model and reply splitting.
pub mod message;
pub mod message_input;
pub mod message_list;
pub mod scroll_manager;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

pub use events::{RatingClicked, SignOutClicked, Submit, TopicPicked};
pub use login::LoginView;
pub use message::{
    EntryId, EntryStatus, PendingToken, RELATED_TOPICS_MARKER, ReplyParts, ResolveRejection,
    Sender, Transcript, TranscriptEntry, split_reply,
};
pub use message_input::MessageInput;
pub use message_list::MessageList;
pub use scroll_manager::ScrollManager;
pub use view::ChatView;
