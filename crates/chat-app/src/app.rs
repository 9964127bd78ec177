use std::sync::Arc;

use asystent_assistant::Assistant;
use asystent_backend::{AuthClient, Backend};
use gpui::*;
use gpui_component::ActiveTheme;

use crate::chat::{ChatView, LoginView, SignOutClicked};
use crate::session::{SessionCache, SessionChanged, SessionManager};

gpui::actions!(asystent, [Quit]);

/// Root view: the login gate until a session exists, then the chat.
///
/// The backend store and the assistant are constructed once at startup and
/// injected here; every chat view created for a new session reuses them.
pub struct AppShell {
    session_manager: Entity<SessionManager>,
    login_view: Entity<LoginView>,
    chat_view: Option<Entity<ChatView>>,
    store: Arc<dyn Backend>,
    assistant: Arc<dyn Assistant>,
}

impl AppShell {
    pub fn new(
        auth: Arc<AuthClient>,
        store: Arc<dyn Backend>,
        assistant: Arc<dyn Assistant>,
        cache: SessionCache,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let session_manager = cx.new(|_| SessionManager::new(auth, cache));
        let login_view = cx.new(|cx| LoginView::new(session_manager.clone(), window, cx));

        cx.subscribe_in(
            &session_manager,
            window,
            |this, _, _: &SessionChanged, window, cx| {
                this.sync_session_views(window, cx);
            },
        )
        .detach();

        // Try to pick up the previous session before showing the login gate.
        session_manager.update(cx, |manager, cx| manager.restore(cx));

        Self {
            session_manager,
            login_view,
            chat_view: None,
            store,
            assistant,
        }
    }

    /// Builds or tears down the chat view on login transitions. The chat
    /// view is keyed by conversation: re-emissions for the same login leave
    /// the running conversation untouched.
    fn sync_session_views(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let active = self.session_manager.read(cx).active().cloned();

        match active {
            Some(active) => {
                let already_current = self.chat_view.as_ref().is_some_and(|chat_view| {
                    chat_view.read(cx).conversation_id() == &active.conversation_id
                });

                if !already_current {
                    let store = Arc::clone(&self.store);
                    let assistant = Arc::clone(&self.assistant);
                    let chat_view =
                        cx.new(|cx| ChatView::new(store, assistant, &active, window, cx));

                    cx.subscribe(&chat_view, |this, _, _: &SignOutClicked, cx| {
                        this.session_manager
                            .update(cx, |manager, cx| manager.sign_out(cx));
                    })
                    .detach();

                    self.chat_view = Some(chat_view);
                }
            }
            None => {
                self.chat_view = None;
            }
        }

        cx.notify();
    }
}

impl Render for AppShell {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let content: AnyElement = match &self.chat_view {
            Some(chat_view) => chat_view.clone().into_any_element(),
            None => self.login_view.clone().into_any_element(),
        };

        div()
            .size_full()
            .bg(cx.theme().background)
            .child(content)
    }
}
