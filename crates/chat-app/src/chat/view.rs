use std::collections::HashMap;
use std::sync::Arc;

use asystent_assistant::{Assistant, ExchangeRequest, FALLBACK_REPLY, reply_or_fallback};
use asystent_backend::{Backend, NewStoredMessage, RatingUpsert};
use gpui::*;
use gpui_component::{
    ActiveTheme, Icon, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    label::Label,
    v_flex,
};
use gpui_tokio_bridge::Tokio;

use crate::chat::events::{RatingClicked, SignOutClicked, Submit, TopicPicked};
use crate::chat::history::{load_transcript, persist_message, persist_rating};
use crate::chat::message::{PendingToken, Sender, Transcript, split_reply};
use crate::chat::{MessageInput, MessageList};
use crate::session::{ActiveSession, ConversationId};

const SIDEBAR_WIDTH: Pixels = px(280.);
const HEADER_HEIGHT: Pixels = px(48.);
const MAX_STARS: u8 = 5;

/// Coordinator for one conversation: transcript state, the send cycle,
/// ratings and the sidebar/header chrome around the message list.
///
/// The remote collaborators arrive injected; this view never constructs
/// clients of its own.
pub struct ChatView {
    store: Arc<dyn Backend>,
    assistant: Arc<dyn Assistant>,
    user_id: String,
    user_email: String,
    conversation_id: ConversationId,
    transcript: Transcript,
    ratings: HashMap<usize, u8>,
    related_topics: Vec<String>,
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
}

impl EventEmitter<SignOutClicked> for ChatView {}

impl ChatView {
    pub fn new(
        store: Arc<dyn Backend>,
        assistant: Arc<dyn Assistant>,
        active: &ActiveSession,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        let this = Self {
            store,
            assistant,
            user_id: active.session.user.id.clone(),
            user_email: active.session.user.email.clone(),
            conversation_id: active.conversation_id.clone(),
            transcript: Transcript::new(),
            ratings: HashMap::new(),
            related_topics: Vec::new(),
            message_list: message_list.clone(),
            message_input: message_input.clone(),
        };

        cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
            this.handle_submit(event.text.clone(), cx);
        })
        .detach();

        cx.subscribe(&message_list, |this, _, event: &RatingClicked, cx| {
            this.handle_rating(event.index, event.stars, cx);
        })
        .detach();

        cx.subscribe(&message_list, |this, _, event: &TopicPicked, cx| {
            // A picked suggestion re-enters the submit path as if typed.
            this.handle_submit(event.text.clone(), cx);
        })
        .detach();

        this.spawn_history_load(cx);
        this
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// One fetch per conversation establishment; failures already collapsed
    /// to an empty transcript inside the loader.
    fn spawn_history_load(&self, cx: &mut Context<Self>) {
        let store = Arc::clone(&self.store);
        let chat_id = self.conversation_id.as_str().to_string();
        let task = Tokio::spawn(cx, async move { load_transcript(store.as_ref(), &chat_id).await });

        cx.spawn(async move |this, cx| {
            let Ok(loaded) = task.await else {
                return;
            };

            let _ = this.update(cx, |this, cx| {
                // A submit that raced the fetch wins; a fresh conversation's
                // history is empty anyway.
                if this.transcript.is_empty() && !loaded.is_empty() {
                    this.transcript = loaded;
                    this.message_list
                        .update(cx, |list, cx| list.reset_scroll_tracking(cx));
                    this.sync_list(cx);
                }
            });
        })
        .detach();
    }

    fn handle_submit(&mut self, text: String, cx: &mut Context<Self>) {
        if text.trim().is_empty() {
            return;
        }

        self.related_topics.clear();
        self.transcript.push_done(Sender::User, text.clone());
        let token = self.transcript.begin_pending();
        self.sync_list(cx);

        let assistant = Arc::clone(&self.assistant);
        let request = ExchangeRequest::new(
            self.conversation_id.as_str(),
            self.user_id.as_str(),
            text.as_str(),
        );
        let task = Tokio::spawn(cx, async move {
            reply_or_fallback(assistant.as_ref(), request).await
        });

        cx.spawn(async move |this, cx| {
            let reply = match task.await {
                Ok(reply) => reply,
                Err(error) => {
                    tracing::error!("exchange task failed to join: {error}");
                    FALLBACK_REPLY.to_string()
                }
            };

            let _ = this.update(cx, |this, cx| {
                this.finish_exchange(token, text, reply, cx);
            });
        })
        .detach();
    }

    /// Resolves the placeholder in place, then persists both sides of the
    /// exchange. The fallback string travels the same path as a real reply.
    fn finish_exchange(
        &mut self,
        token: PendingToken,
        user_text: String,
        reply: String,
        cx: &mut Context<Self>,
    ) {
        if let Err(rejection) = self.transcript.resolve(token, reply.clone()) {
            tracing::warn!("ignoring reply for a placeholder that is gone: {rejection:?}");
            return;
        }

        self.related_topics = split_reply(&reply).topics;
        self.spawn_persist_message(user_text, false, cx);
        self.spawn_persist_message(reply, true, cx);
        self.sync_list(cx);
    }

    fn spawn_persist_message(&self, message: String, is_bot: bool, cx: &mut Context<Self>) {
        let store = Arc::clone(&self.store);
        let input = NewStoredMessage {
            user_id: self.user_id.clone(),
            chat_id: self.conversation_id.as_str().to_string(),
            message,
            is_bot,
        };

        Tokio::spawn(cx, async move {
            persist_message(store.as_ref(), input).await;
        })
        .detach();
    }

    /// Optimistic local rating plus a best-effort upsert; no rollback.
    fn handle_rating(&mut self, index: usize, stars: u8, cx: &mut Context<Self>) {
        let Some(entry) = self.transcript.entries().get(index) else {
            return;
        };
        if !entry.is_settled_reply() || !(1..=MAX_STARS).contains(&stars) {
            return;
        }

        self.ratings.insert(index, stars);

        let store = Arc::clone(&self.store);
        let input = RatingUpsert {
            message_index: index as u32,
            user_id: self.user_id.clone(),
            chat_id: self.conversation_id.as_str().to_string(),
            rating: stars,
            message: entry.text.clone(),
        };

        Tokio::spawn(cx, async move {
            persist_rating(store.as_ref(), input).await;
        })
        .detach();

        self.sync_list(cx);
    }

    fn sync_list(&mut self, cx: &mut Context<Self>) {
        let entries = self.transcript.entries().to_vec();
        let ratings = self.ratings.clone();
        let topics = self.related_topics.clone();

        self.message_list.update(cx, |list, cx| {
            list.set_transcript(entries, ratings, topics, cx);
        });
        cx.notify();
    }

    fn render_sidebar(&self, cx: &Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("chat-sidebar")
            .w(SIDEBAR_WIDTH)
            .h_full()
            .flex_shrink_0()
            .border_r_1()
            .border_color(theme.border)
            .bg(theme.background)
            .child(
                h_flex()
                    .h(HEADER_HEIGHT)
                    .px_3()
                    .flex_shrink_0()
                    .items_center()
                    .justify_between()
                    .border_b_1()
                    .border_color(theme.border)
                    .child(
                        div()
                            .text_sm()
                            .font_weight(FontWeight::MEDIUM)
                            .text_color(theme.foreground)
                            .child("Historia czatu"),
                    )
                    .child(
                        Button::new("sign-out")
                            .ghost()
                            .small()
                            .child("Wyloguj się")
                            .on_click(cx.listener(|_, _, _window, cx| {
                                cx.emit(SignOutClicked);
                            })),
                    ),
            )
            .child(div().id("sidebar-conversations").flex_1().min_h_0())
            .child(
                h_flex()
                    .p_3()
                    .gap_2()
                    .flex_shrink_0()
                    .items_center()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(
                        div()
                            .size(px(28.))
                            .rounded_full()
                            .border_1()
                            .border_color(theme.border)
                            .bg(theme.muted)
                            .flex()
                            .items_center()
                            .justify_center()
                            .child(
                                Icon::new(IconName::CircleUser)
                                    .size(px(16.))
                                    .text_color(theme.foreground),
                            ),
                    )
                    .child(
                        Label::new(self.user_email.clone())
                            .text_xs()
                            .text_color(theme.muted_foreground),
                    ),
            )
    }
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        h_flex()
            .id("chat-view")
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(self.render_sidebar(cx))
            .child(
                v_flex()
                    .flex_1()
                    .h_full()
                    .min_w_0()
                    .child(
                        h_flex()
                            .h(HEADER_HEIGHT)
                            .px_4()
                            .gap_2()
                            .flex_shrink_0()
                            .items_center()
                            .border_b_1()
                            .border_color(theme.border)
                            .child(
                                Icon::new(IconName::CircleUser)
                                    .size(px(20.))
                                    .text_color(theme.foreground),
                            )
                            .child(
                                div()
                                    .text_sm()
                                    .font_weight(FontWeight::MEDIUM)
                                    .text_color(theme.foreground)
                                    .child("Asystent AI"),
                            ),
                    )
                    .child(
                        div()
                            .id("chat-view-message-list")
                            .flex_1()
                            .min_h_0()
                            .child(self.message_list.clone()),
                    )
                    .child(
                        div()
                            .id("chat-view-message-input")
                            .flex_shrink_0()
                            .w_full()
                            .child(self.message_input.clone()),
                    ),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::EntryStatus;
    use crate::chat::test_support::{FakeAssistant, FakeBackend};

    /// Drives one send cycle exactly the way `handle_submit`/`finish_exchange`
    /// do, without a UI context: optimistic append, placeholder, exchange,
    /// in-place resolution, persistence of both sides.
    async fn run_send_cycle(
        transcript: &mut Transcript,
        related_topics: &mut Vec<String>,
        backend: &FakeBackend,
        assistant: &FakeAssistant,
        conversation_id: &str,
        user_id: &str,
        text: &str,
    ) {
        if text.trim().is_empty() {
            return;
        }

        related_topics.clear();
        transcript.push_done(Sender::User, text);
        let token = transcript.begin_pending();

        let request = ExchangeRequest::new(conversation_id, user_id, text);
        let reply = reply_or_fallback(assistant, request).await;

        transcript.resolve(token, reply.clone()).unwrap();
        *related_topics = split_reply(&reply).topics;

        persist_message(
            backend,
            NewStoredMessage {
                user_id: user_id.to_string(),
                chat_id: conversation_id.to_string(),
                message: text.to_string(),
                is_bot: false,
            },
        )
        .await;
        persist_message(
            backend,
            NewStoredMessage {
                user_id: user_id.to_string(),
                chat_id: conversation_id.to_string(),
                message: reply,
                is_bot: true,
            },
        )
        .await;
    }

    #[tokio::test]
    async fn a_send_cycle_appends_user_and_reply_and_stores_two_rows() {
        let backend = FakeBackend::default();
        let assistant = FakeAssistant::replying("Hi there");
        let mut transcript = Transcript::new();
        let mut topics = Vec::new();

        run_send_cycle(
            &mut transcript,
            &mut topics,
            &backend,
            &assistant,
            "chat_1_abc",
            "user-1",
            "Hello",
        )
        .await;

        let entries = transcript.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sender, Sender::User);
        assert_eq!(entries[0].text, "Hello");
        assert_eq!(entries[1].sender, Sender::Bot);
        assert_eq!(entries[1].text, "Hi there");
        assert_eq!(entries[1].status, EntryStatus::Done);
        assert!(!transcript.has_pending());

        let stored = backend.stored_messages();
        assert_eq!(stored.len(), 2);
        assert!(!stored[0].is_bot);
        assert_eq!(stored[0].message, "Hello");
        assert!(stored[1].is_bot);
        assert_eq!(stored[1].message, "Hi there");

        let requests = assistant.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].conversation_id, "chat_1_abc");
        assert_eq!(requests[0].user_id, "user-1");
        assert_eq!(requests[0].text, "Hello");
    }

    #[tokio::test]
    async fn whitespace_only_input_changes_nothing() {
        let backend = FakeBackend::default();
        let assistant = FakeAssistant::replying("unused");
        let mut transcript = Transcript::new();
        let mut topics = Vec::new();

        run_send_cycle(
            &mut transcript,
            &mut topics,
            &backend,
            &assistant,
            "chat_1_abc",
            "user-1",
            "   \n ",
        )
        .await;

        assert!(transcript.is_empty());
        assert!(backend.stored_messages().is_empty());
        assert!(assistant.requests().is_empty());
    }

    #[tokio::test]
    async fn a_failed_exchange_displays_and_persists_the_fallback() {
        let backend = FakeBackend::default();
        let assistant = FakeAssistant::failing();
        let mut transcript = Transcript::new();
        let mut topics = Vec::new();

        run_send_cycle(
            &mut transcript,
            &mut topics,
            &backend,
            &assistant,
            "chat_1_abc",
            "user-1",
            "Hello",
        )
        .await;

        let entries = transcript.entries();
        assert_eq!(entries[1].text, FALLBACK_REPLY);
        assert_eq!(entries[1].status, EntryStatus::Done);

        let stored = backend.stored_messages();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].message, FALLBACK_REPLY);
        assert!(stored[1].is_bot);
    }

    #[tokio::test]
    async fn a_reply_with_the_marker_populates_suggestions_and_a_new_send_clears_them() {
        let backend = FakeBackend::default();
        let assistant = FakeAssistant::replying("Body text RELATED_TOPICS: TopicA | TopicB");
        let mut transcript = Transcript::new();
        let mut topics = Vec::new();

        run_send_cycle(
            &mut transcript,
            &mut topics,
            &backend,
            &assistant,
            "chat_1_abc",
            "user-1",
            "Hello",
        )
        .await;

        assert_eq!(topics, vec!["TopicA".to_string(), "TopicB".to_string()]);
        // The raw reply is persisted untouched; only rendering splits it.
        assert_eq!(
            backend.stored_messages()[1].message,
            "Body text RELATED_TOPICS: TopicA | TopicB"
        );

        let plain = FakeAssistant::replying("plain");
        run_send_cycle(
            &mut transcript,
            &mut topics,
            &backend,
            &plain,
            "chat_1_abc",
            "user-1",
            "TopicA",
        )
        .await;

        assert!(topics.is_empty());
        assert_eq!(transcript.entries().len(), 4);
    }
}
